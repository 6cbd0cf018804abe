//! Normalized botanical domain types shared by adapters, the sync engine,
//! and the content store.

pub mod timestamp;

use serde::{Deserialize, Serialize};

use crate::{ProviderId, ValidationError};

pub use timestamp::UtcDateTime;

/// One normalized upstream plant entry as returned by a provider page.
///
/// Only `external_id` and `scientific_name` are guaranteed; everything else
/// is provider-dependent and validated at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantRecord {
    pub external_id: String,
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub edible: Option<bool>,
    pub edible_parts: Vec<String>,
    pub toxicity: Option<String>,
    pub growth_habit: Option<String>,
    pub categories: Vec<String>,
    pub image_url: Option<String>,
}

impl PlantRecord {
    pub fn new(
        external_id: impl Into<String>,
        scientific_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let external_id = external_id.into();
        if external_id.trim().is_empty() {
            return Err(ValidationError::EmptyExternalId);
        }
        let scientific_name = scientific_name.into();
        if scientific_name.trim().is_empty() {
            return Err(ValidationError::EmptyScientificName);
        }

        Ok(Self {
            external_id,
            scientific_name,
            common_name: None,
            family: None,
            genus: None,
            edible: None,
            edible_parts: Vec::new(),
            toxicity: None,
            growth_habit: None,
            categories: Vec::new(),
            image_url: None,
        })
    }
}

/// Enrichment payload: only `Some` fields are merged into an existing draft,
/// so empty upstream data can never clobber curated content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlantPatch {
    pub common_name: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub edible: Option<bool>,
    pub edible_parts: Option<Vec<String>>,
    pub toxicity: Option<String>,
    pub growth_habit: Option<String>,
    pub image_url: Option<String>,
}

impl PlantPatch {
    pub fn is_empty(&self) -> bool {
        self.common_name.is_none()
            && self.family.is_none()
            && self.genus.is_none()
            && self.edible.is_none()
            && self.edible_parts.is_none()
            && self.toxicity.is_none()
            && self.growth_habit.is_none()
            && self.image_url.is_none()
    }
}

/// Provenance tag carried by every imported draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub provider: ProviderId,
    pub external_id: String,
    pub last_synced_at: Option<UtcDateTime>,
}

/// A draft to be created in the content store, always unpublished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDraft {
    pub provider: ProviderId,
    pub record: PlantRecord,
    /// True when the candidate heuristic could not decide and the record was
    /// accepted for manual review rather than on a positive signal.
    pub needs_review: bool,
    pub imported_at: UtcDateTime,
}

/// Summary of a stored draft selected for enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct StaleDraft {
    pub id: String,
    pub provider: ProviderId,
    pub external_id: String,
    pub scientific_name: String,
    pub last_synced_at: Option<UtcDateTime>,
}
