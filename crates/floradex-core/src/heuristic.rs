//! Candidate acceptance heuristic for imported records.
//!
//! Decides whether an upstream record is worth storing as a draft. The rules
//! are enumerated data, decoupled from the import loop, so they can be tested
//! and tuned on their own.

use crate::domain::PlantRecord;

/// Verdict for one upstream record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateVerdict {
    /// A positive human-use signal matched.
    Accept { reason: String },
    /// No decisive signal either way; store the draft flagged for manual
    /// review.
    Review,
    /// A known-unwanted signal matched; count as skipped, do not store.
    Reject { reason: String },
}

impl CandidateVerdict {
    pub const fn is_reject(&self) -> bool {
        matches!(self, Self::Reject { .. })
    }
}

/// Enumerated inclusion and exclusion rules.
#[derive(Debug, Clone)]
pub struct CandidateRules {
    /// Categories that disqualify a record outright.
    pub exclude_categories: Vec<String>,
    /// Toxicity markers that disqualify a record outright.
    pub exclude_toxicity: Vec<String>,
    /// Categories that count as a positive human-use signal.
    pub include_categories: Vec<String>,
}

impl Default for CandidateRules {
    fn default() -> Self {
        Self {
            exclude_categories: vec![
                String::from("weed"),
                String::from("noxious"),
                String::from("invasive"),
            ],
            exclude_toxicity: vec![String::from("high"), String::from("severe")],
            include_categories: vec![
                String::from("vegetable"),
                String::from("herb"),
                String::from("fruit"),
                String::from("medicinal"),
            ],
        }
    }
}

impl CandidateRules {
    pub fn evaluate(&self, record: &PlantRecord) -> CandidateVerdict {
        if let Some(category) = self.matching_category(record, &self.exclude_categories) {
            return CandidateVerdict::Reject {
                reason: format!("excluded category '{category}'"),
            };
        }

        if let Some(toxicity) = record.toxicity.as_deref() {
            let toxicity = toxicity.to_ascii_lowercase();
            if self
                .exclude_toxicity
                .iter()
                .any(|marker| toxicity.contains(marker))
            {
                return CandidateVerdict::Reject {
                    reason: format!("toxicity marked '{toxicity}'"),
                };
            }
        }

        if record.edible == Some(true) {
            return CandidateVerdict::Accept {
                reason: String::from("marked edible"),
            };
        }
        if !record.edible_parts.is_empty() {
            return CandidateVerdict::Accept {
                reason: String::from("has edible parts"),
            };
        }
        if let Some(category) = self.matching_category(record, &self.include_categories) {
            return CandidateVerdict::Accept {
                reason: format!("category '{category}'"),
            };
        }

        CandidateVerdict::Review
    }

    fn matching_category(&self, record: &PlantRecord, list: &[String]) -> Option<String> {
        record.categories.iter().find_map(|category| {
            let category = category.to_ascii_lowercase();
            list.iter()
                .find(|candidate| category.contains(candidate.as_str()))
                .map(|_| category)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(external_id: &str) -> PlantRecord {
        PlantRecord::new(external_id, "Testus plantus").expect("valid record")
    }

    #[test]
    fn edible_flag_is_accepted() {
        let mut candidate = record("1");
        candidate.edible = Some(true);

        assert!(matches!(
            CandidateRules::default().evaluate(&candidate),
            CandidateVerdict::Accept { .. }
        ));
    }

    #[test]
    fn edible_parts_are_accepted_without_the_flag() {
        let mut candidate = record("2");
        candidate.edible_parts = vec![String::from("leaves")];

        assert!(matches!(
            CandidateRules::default().evaluate(&candidate),
            CandidateVerdict::Accept { .. }
        ));
    }

    #[test]
    fn excluded_category_wins_over_edibility() {
        let mut candidate = record("3");
        candidate.edible = Some(true);
        candidate.categories = vec![String::from("noxious weed")];

        assert!(CandidateRules::default().evaluate(&candidate).is_reject());
    }

    #[test]
    fn severe_toxicity_is_rejected() {
        let mut candidate = record("4");
        candidate.toxicity = Some(String::from("Severe"));

        assert!(CandidateRules::default().evaluate(&candidate).is_reject());
    }

    #[test]
    fn ambiguous_records_default_to_review() {
        let mut candidate = record("5");
        candidate.edible = Some(false);

        assert_eq!(
            CandidateRules::default().evaluate(&candidate),
            CandidateVerdict::Review
        );
        assert_eq!(
            CandidateRules::default().evaluate(&record("6")),
            CandidateVerdict::Review
        );
    }
}
