//! Permapeople adapter.
//!
//! Permapeople authenticates with a key-id/key-secret header pair and
//! returns plant attributes as a key/value list rather than fixed columns,
//! so normalization maps the documented keys and ignores the rest.

use serde::Deserialize;

use crate::adapter::{FetchError, ProviderAdapter};
use crate::domain::{PlantPatch, PlantRecord};
use crate::http_client::HttpRequest;
use crate::ProviderId;

const DEFAULT_BASE_URL: &str = "https://permapeople.org";

/// Permapeople API adapter.
#[derive(Debug, Clone)]
pub struct PermapeopleAdapter {
    key_id: Option<String>,
    key_secret: Option<String>,
    base_url: String,
}

impl Default for PermapeopleAdapter {
    fn default() -> Self {
        Self {
            key_id: non_empty_env("FLORADEX_PERMAPEOPLE_KEY_ID"),
            key_secret: non_empty_env("FLORADEX_PERMAPEOPLE_KEY_SECRET"),
            base_url: String::from(DEFAULT_BASE_URL),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl PermapeopleAdapter {
    pub fn with_keys(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: Some(key_id.into()),
            key_secret: Some(key_secret.into()),
            base_url: String::from(DEFAULT_BASE_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn authenticated(&self, request: HttpRequest) -> HttpRequest {
        request
            .with_header(
                "x-permapeople-key-id",
                self.key_id.clone().unwrap_or_default(),
            )
            .with_header(
                "x-permapeople-key-secret",
                self.key_secret.clone().unwrap_or_default(),
            )
    }
}

impl ProviderAdapter for PermapeopleAdapter {
    fn provider(&self) -> ProviderId {
        ProviderId::Permapeople
    }

    fn is_configured(&self) -> bool {
        self.key_id.is_some() && self.key_secret.is_some()
    }

    fn page_request(&self, page: u32, page_size: u32) -> HttpRequest {
        self.authenticated(HttpRequest::get(format!(
            "{}/api/plants?page={page}&size={page_size}",
            self.base_url
        )))
    }

    fn parse_page(&self, body: &str) -> Result<Vec<PlantRecord>, FetchError> {
        let response: PermapeopleListResponse = serde_json::from_str(body).map_err(|e| {
            FetchError::invalid_response(format!("permapeople plants payload did not parse: {e}"))
        })?;

        response
            .data
            .into_iter()
            .map(normalize_plant)
            .collect::<Result<Vec<_>, _>>()
    }

    fn enrich_request(&self, query: &str) -> HttpRequest {
        self.authenticated(
            HttpRequest::post(format!("{}/api/search", self.base_url))
                .with_header("content-type", "application/json")
                .with_body(
                    serde_json::json!({ "q": query })
                        .to_string(),
                ),
        )
    }

    fn parse_enrich(&self, body: &str) -> Result<Option<PlantPatch>, FetchError> {
        let response: PermapeopleSearchResponse = serde_json::from_str(body).map_err(|e| {
            FetchError::invalid_response(format!("permapeople search payload did not parse: {e}"))
        })?;

        let Some(best_match) = response.plants.into_iter().next() else {
            return Ok(None);
        };

        let attributes = Attributes::from_pairs(&best_match.data);
        Ok(Some(PlantPatch {
            common_name: best_match.name.filter(|name| !name.trim().is_empty()),
            family: attributes.family,
            genus: None,
            edible: attributes.edible,
            edible_parts: attributes.edible_parts,
            toxicity: attributes.toxicity,
            growth_habit: attributes.growth_habit,
            image_url: None,
        }))
    }
}

fn normalize_plant(plant: PermapeoplePlant) -> Result<PlantRecord, FetchError> {
    let Some(id) = plant.id else {
        return Err(FetchError::invalid_response(
            "permapeople plant entry is missing its id",
        ));
    };
    let Some(scientific_name) = plant
        .scientific_name
        .filter(|name| !name.trim().is_empty())
    else {
        return Err(FetchError::invalid_response(format!(
            "permapeople plant {id} is missing its scientific name"
        )));
    };

    let mut record = PlantRecord::new(id.to_string(), scientific_name)
        .map_err(|e| FetchError::invalid_response(e.to_string()))?;
    record.common_name = plant.name.filter(|name| !name.trim().is_empty());

    let attributes = Attributes::from_pairs(&plant.data);
    record.family = attributes.family;
    record.edible = attributes.edible;
    record.edible_parts = attributes.edible_parts.unwrap_or_default();
    record.toxicity = attributes.toxicity;
    record.growth_habit = attributes.growth_habit;
    record.categories = attributes.categories;

    Ok(record)
}

/// The documented subset of Permapeople's key/value attribute list.
#[derive(Debug, Default)]
struct Attributes {
    family: Option<String>,
    edible: Option<bool>,
    edible_parts: Option<Vec<String>>,
    toxicity: Option<String>,
    growth_habit: Option<String>,
    categories: Vec<String>,
}

impl Attributes {
    fn from_pairs(pairs: &[PermapeopleKeyValue]) -> Self {
        let mut attributes = Self::default();

        for pair in pairs {
            let Some(value) = pair.value.as_deref().map(str::trim) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }

            match pair.key.to_ascii_lowercase().as_str() {
                "family" => attributes.family = Some(value.to_owned()),
                "edible" => attributes.edible = parse_bool(value),
                "edible parts" => {
                    attributes.edible_parts = Some(split_list(value));
                }
                "toxicity" | "warning" => attributes.toxicity = Some(value.to_owned()),
                "growth" | "growth habit" => attributes.growth_habit = Some(value.to_owned()),
                "layer" | "usage" => attributes.categories.extend(split_list(value)),
                _ => {}
            }
        }

        attributes
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|part| part.trim().to_ascii_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

// Permapeople API response structures

#[derive(Debug, Clone, Deserialize)]
struct PermapeopleListResponse {
    #[serde(default)]
    data: Vec<PermapeoplePlant>,
}

#[derive(Debug, Clone, Deserialize)]
struct PermapeopleSearchResponse {
    #[serde(default)]
    plants: Vec<PermapeoplePlant>,
}

#[derive(Debug, Clone, Deserialize)]
struct PermapeoplePlant {
    id: Option<i64>,
    name: Option<String>,
    scientific_name: Option<String>,
    #[serde(default)]
    data: Vec<PermapeopleKeyValue>,
}

#[derive(Debug, Clone, Deserialize)]
struct PermapeopleKeyValue {
    key: String,
    value: Option<String>,
}
