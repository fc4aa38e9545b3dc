use serde::{Deserialize, Serialize};
use std::fmt::Display;

mod candidate;
mod evaluation;
mod profile;

pub use candidate::{Candidate, CandidatePool};
pub use evaluation::{EvaluationRecord, EvaluationRow, EvaluationSnapshot, EvaluationState};
pub use profile::{FollowUpAnswer, InterestProfile};

/// Exhibition booth as listed in the booth catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booth {
    /// Booth identifier such as "A1234"
    pub id: String,
    pub company_name_kor: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub company_description: String,
    #[serde(default)]
    pub products: String,
    #[serde(default)]
    pub products_description: String,
}

/// One row returned by the similarity-search collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoothMatch {
    pub booth: Booth,
    pub similarity: f64,
}

/// A booth ranked by the external ranking service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedRecommendation {
    /// Persisted rankings use `id` for the booth identifier
    #[serde(alias = "id")]
    pub booth_id: String,
    #[serde(default)]
    pub rationale: String,
    /// 1-based position in the ranking service's answer
    #[serde(default)]
    pub rank: usize,
}

impl RankedRecommendation {
    pub fn new(booth_id: impl Into<String>, rationale: impl Into<String>, rank: usize) -> Self {
        Self {
            booth_id: booth_id.into(),
            rationale: rationale.into(),
            rank,
        }
    }
}

impl Display for RankedRecommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}", self.rank, self.booth_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booth_deserialization_with_missing_optional_fields() {
        let json = r#"{
            "id": "A1234",
            "company_name_kor": "행복우유"
        }"#;

        let booth: Booth = serde_json::from_str(json).unwrap();
        assert_eq!(booth.id, "A1234");
        assert_eq!(booth.company_name_kor, "행복우유");
        assert_eq!(booth.category, None);
        assert!(booth.products.is_empty());
    }

    #[test]
    fn test_ranked_recommendation_accepts_persisted_id_field() {
        let json = r#"{"id": "B2404", "rationale": "치즈 전문"}"#;

        let rec: RankedRecommendation = serde_json::from_str(json).unwrap();
        assert_eq!(rec.booth_id, "B2404");
        assert_eq!(rec.rationale, "치즈 전문");
        assert_eq!(rec.rank, 0);
    }

    #[test]
    fn test_ranked_recommendation_display() {
        let rec = RankedRecommendation::new("A2101", "", 3);
        assert_eq!(format!("{}", rec), "#3 A2101");
    }
}
