use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in checkpoints, provenance, and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Trefle,
    Permapeople,
}

impl ProviderId {
    pub const ALL: [Self; 2] = [Self::Trefle, Self::Permapeople];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trefle => "trefle",
            Self::Permapeople => "permapeople",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trefle" => Ok(Self::Trefle),
            "permapeople" => Ok(Self::Permapeople),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}
