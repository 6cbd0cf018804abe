//! Trefle adapter.
//!
//! Trefle authenticates with a `token` query parameter and paginates its
//! species listing with `page`/`limit`. An empty `data` array marks the end
//! of the catalog.

use serde::Deserialize;

use crate::adapter::{FetchError, ProviderAdapter};
use crate::domain::{PlantPatch, PlantRecord};
use crate::http_client::HttpRequest;
use crate::ProviderId;

const DEFAULT_BASE_URL: &str = "https://trefle.io";

/// Trefle API adapter.
#[derive(Debug, Clone)]
pub struct TrefleAdapter {
    token: Option<String>,
    base_url: String,
}

impl Default for TrefleAdapter {
    fn default() -> Self {
        Self {
            token: std::env::var("FLORADEX_TREFLE_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            base_url: String::from(DEFAULT_BASE_URL),
        }
    }
}

impl TrefleAdapter {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            base_url: String::from(DEFAULT_BASE_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn token(&self) -> &str {
        self.token.as_deref().unwrap_or_default()
    }
}

impl ProviderAdapter for TrefleAdapter {
    fn provider(&self) -> ProviderId {
        ProviderId::Trefle
    }

    fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    fn page_request(&self, page: u32, page_size: u32) -> HttpRequest {
        HttpRequest::get(format!(
            "{}/api/v1/species?page={page}&limit={page_size}&token={}",
            self.base_url,
            self.token()
        ))
    }

    fn parse_page(&self, body: &str) -> Result<Vec<PlantRecord>, FetchError> {
        let response: TrefleListResponse = serde_json::from_str(body).map_err(|e| {
            FetchError::invalid_response(format!("trefle species payload did not parse: {e}"))
        })?;

        response
            .data
            .into_iter()
            .map(normalize_species)
            .collect::<Result<Vec<_>, _>>()
    }

    fn enrich_request(&self, query: &str) -> HttpRequest {
        HttpRequest::get(format!(
            "{}/api/v1/species/search?q={}&token={}",
            self.base_url,
            urlencoding::encode(query),
            self.token()
        ))
    }

    fn parse_enrich(&self, body: &str) -> Result<Option<PlantPatch>, FetchError> {
        let response: TrefleListResponse = serde_json::from_str(body).map_err(|e| {
            FetchError::invalid_response(format!("trefle search payload did not parse: {e}"))
        })?;

        let Some(best_match) = response.data.into_iter().next() else {
            return Ok(None);
        };

        Ok(Some(PlantPatch {
            common_name: best_match.common_name,
            family: best_match.family,
            genus: best_match.genus,
            edible: best_match.edible,
            edible_parts: best_match.edible_part.filter(|parts| !parts.is_empty()),
            toxicity: best_match.specifications.and_then(|s| s.toxicity),
            growth_habit: None,
            image_url: best_match.image_url,
        }))
    }
}

fn normalize_species(species: TrefleSpecies) -> Result<PlantRecord, FetchError> {
    let Some(id) = species.id else {
        return Err(FetchError::invalid_response(
            "trefle species entry is missing its id",
        ));
    };
    let Some(scientific_name) = species
        .scientific_name
        .filter(|name| !name.trim().is_empty())
    else {
        return Err(FetchError::invalid_response(format!(
            "trefle species {id} is missing its scientific name"
        )));
    };

    let mut record = PlantRecord::new(id.to_string(), scientific_name)
        .map_err(|e| FetchError::invalid_response(e.to_string()))?;
    record.common_name = species.common_name;
    record.family = species.family;
    record.genus = species.genus;
    record.edible = species.edible;
    record.edible_parts = species.edible_part.unwrap_or_default();
    record.image_url = species.image_url;
    if let Some(specifications) = species.specifications {
        record.toxicity = specifications.toxicity;
        record.growth_habit = specifications.growth_habit;
    }
    if let Some(vegetable) = species.vegetable {
        if vegetable {
            record.categories.push(String::from("vegetable"));
        }
    }

    Ok(record)
}

// Trefle API response structures

#[derive(Debug, Clone, Deserialize)]
struct TrefleListResponse {
    #[serde(default)]
    data: Vec<TrefleSpecies>,
}

#[derive(Debug, Clone, Deserialize)]
struct TrefleSpecies {
    id: Option<i64>,
    scientific_name: Option<String>,
    common_name: Option<String>,
    family: Option<String>,
    genus: Option<String>,
    edible: Option<bool>,
    edible_part: Option<Vec<String>>,
    vegetable: Option<bool>,
    image_url: Option<String>,
    specifications: Option<TrefleSpecifications>,
}

#[derive(Debug, Clone, Deserialize)]
struct TrefleSpecifications {
    toxicity: Option<String>,
    growth_habit: Option<String>,
}
