use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::AppError;

const MIN_RATING: i32 = 1;
const MAX_RATING: i32 = 5;

/// Raw evaluation row as stored in the `evaluation` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EvaluationRow {
    pub booth_id: String,
    pub booth_rating: Option<i32>,
    pub rec_rating: Option<i32>,
    pub is_deleted: Option<bool>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of one (user, booth) evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationState {
    /// A row exists but no rating has been recorded
    Pending,
    /// At least one rating has been recorded
    Rated,
    /// The recommendation was deleted (tombstone)
    Deleted,
}

/// Validated evaluation record for one (user, booth) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationRecord {
    pub booth_id: String,
    pub booth_rating: Option<u8>,
    pub recommendation_rating: Option<u8>,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EvaluationRecord {
    pub fn rated(
        booth_id: impl Into<String>,
        booth_rating: Option<u8>,
        recommendation_rating: Option<u8>,
    ) -> Self {
        Self {
            booth_id: booth_id.into(),
            booth_rating,
            recommendation_rating,
            deleted: false,
            deleted_at: None,
        }
    }

    pub fn tombstone(booth_id: impl Into<String>, deleted_at: DateTime<Utc>) -> Self {
        Self {
            booth_id: booth_id.into(),
            booth_rating: None,
            recommendation_rating: None,
            deleted: true,
            deleted_at: Some(deleted_at),
        }
    }

    pub fn state(&self) -> EvaluationState {
        if self.deleted {
            EvaluationState::Deleted
        } else if self.booth_rating.is_some() || self.recommendation_rating.is_some() {
            EvaluationState::Rated
        } else {
            EvaluationState::Pending
        }
    }
}

fn validate_rating(field: &str, booth_id: &str, value: Option<i32>) -> Result<Option<u8>, AppError> {
    match value {
        None => Ok(None),
        Some(v) if (MIN_RATING..=MAX_RATING).contains(&v) => Ok(Some(v as u8)),
        Some(v) => Err(AppError::ExternalService(format!(
            "Evaluation for booth {} has out-of-range {}: {}",
            booth_id, field, v
        ))),
    }
}

impl TryFrom<EvaluationRow> for EvaluationRecord {
    type Error = AppError;

    fn try_from(row: EvaluationRow) -> Result<Self, Self::Error> {
        let booth_id = row.booth_id.trim().to_string();
        if booth_id.is_empty() {
            return Err(AppError::ExternalService(
                "Evaluation row is missing a booth id".to_string(),
            ));
        }

        let booth_rating = validate_rating("booth_rating", &booth_id, row.booth_rating)?;
        let recommendation_rating = validate_rating("rec_rating", &booth_id, row.rec_rating)?;
        let deleted = row.is_deleted.unwrap_or(false);

        Ok(Self {
            booth_id,
            booth_rating,
            recommendation_rating,
            deleted,
            // deleted_at only carries meaning for tombstones
            deleted_at: if deleted { row.deleted_at } else { None },
        })
    }
}

/// Read-only per-user projection over stored evaluation records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationSnapshot {
    records: HashMap<String, EvaluationRecord>,
}

impl EvaluationSnapshot {
    pub fn new(records: Vec<EvaluationRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.booth_id.clone(), r))
            .collect();
        Self { records }
    }

    pub fn get(&self, booth_id: &str) -> Option<&EvaluationRecord> {
        self.records.get(booth_id)
    }

    pub fn state(&self, booth_id: &str) -> Option<EvaluationState> {
        self.get(booth_id).map(EvaluationRecord::state)
    }

    pub fn is_deleted(&self, booth_id: &str) -> bool {
        self.state(booth_id) == Some(EvaluationState::Deleted)
    }

    /// Non-deleted with at least one rating recorded
    pub fn is_evaluated(&self, booth_id: &str) -> bool {
        self.state(booth_id) == Some(EvaluationState::Rated)
    }

    pub fn deleted_ids(&self) -> HashSet<String> {
        self.records
            .values()
            .filter(|r| r.deleted)
            .map(|r| r.booth_id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
