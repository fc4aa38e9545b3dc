use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

use crate::{
    error::AppError,
    models::{EvaluationSnapshot, RankedRecommendation},
};

/// Number of recommendations visible at once
pub const DISPLAY_COUNT: usize = 10;

/// Rejected list transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListError {
    #[error("Booth {0} is not in the displayed recommendations")]
    NotDisplayed(String),
    #[error("Booth {0} has already been evaluated and cannot be deleted")]
    AlreadyEvaluated(String),
    #[error("Booth {0} has already been deleted")]
    AlreadyDeleted(String),
    #[error("No deletions remain for this recommendation list")]
    DeletionsExhausted,
}

impl From<ListError> for AppError {
    fn from(err: ListError) -> Self {
        AppError::InvalidTransition(err.to_string())
    }
}

/// Evaluation gate over the displayed recommendations
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct EvaluationProgress {
    pub evaluated_count: usize,
    /// Current display size; shrinks once the overflow queue runs dry
    pub required: usize,
    pub is_complete: bool,
}

/// Visible recommendation window backed by an overflow queue
///
/// Deleting a displayed entry backfills from the overflow head. Once the
/// overflow queue is empty one more deletion is honored, shrinking the
/// display for the rest of the session, after which the list is exhausted
/// and every deletion is rejected. Failed transitions leave state untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationList {
    display: Vec<RankedRecommendation>,
    overflow: VecDeque<RankedRecommendation>,
    deleted: HashSet<String>,
    exhausted: bool,
}

impl RecommendationList {
    /// Builds the list from a ranked answer and the user's stored evaluations
    pub fn load(ranked: Vec<RankedRecommendation>, snapshot: &EvaluationSnapshot) -> Self {
        Self::with_capacity(ranked, snapshot, DISPLAY_COUNT)
    }

    pub fn with_capacity(
        ranked: Vec<RankedRecommendation>,
        snapshot: &EvaluationSnapshot,
        capacity: usize,
    ) -> Self {
        // Keep the first occurrence of each booth so rank order survives
        let mut seen = HashSet::new();
        let deduped: Vec<RankedRecommendation> = ranked
            .into_iter()
            .filter(|r| !r.booth_id.trim().is_empty())
            .filter(|r| seen.insert(r.booth_id.clone()))
            .collect();
        let deduped_len = deduped.len();

        let mut deleted = HashSet::new();
        let mut remaining = Vec::with_capacity(deduped_len);
        for recommendation in deduped {
            if snapshot.is_deleted(&recommendation.booth_id) {
                deleted.insert(recommendation.booth_id);
            } else {
                remaining.push(recommendation);
            }
        }

        let overflow: VecDeque<RankedRecommendation> = if remaining.len() > capacity {
            remaining.split_off(capacity).into()
        } else {
            VecDeque::new()
        };
        let display = remaining;

        // A restored list that already spent its final deletion stays exhausted
        let exhausted = overflow.is_empty()
            && !deleted.is_empty()
            && display.len() < capacity.min(deduped_len);

        Self {
            display,
            overflow,
            deleted,
            exhausted,
        }
    }

    pub fn display(&self) -> &[RankedRecommendation] {
        &self.display
    }

    pub fn overflow(&self) -> impl Iterator<Item = &RankedRecommendation> {
        self.overflow.iter()
    }

    pub fn is_displayed(&self, booth_id: &str) -> bool {
        self.display.iter().any(|r| r.booth_id == booth_id)
    }

    pub fn deleted_ids(&self) -> &HashSet<String> {
        &self.deleted
    }

    /// Replacements left in reserve; callers treat 0 as "delete disabled"
    pub fn remaining_deletions(&self) -> usize {
        self.overflow.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Whether `delete` could currently succeed for some displayed entry
    pub fn can_delete(&self) -> bool {
        !self.exhausted && !self.display.is_empty()
    }

    /// Validates a deletion without mutating anything
    pub fn check_delete(
        &self,
        booth_id: &str,
        snapshot: &EvaluationSnapshot,
    ) -> Result<(), ListError> {
        if self.deleted.contains(booth_id) || snapshot.is_deleted(booth_id) {
            return Err(ListError::AlreadyDeleted(booth_id.to_string()));
        }
        if self.exhausted {
            return Err(ListError::DeletionsExhausted);
        }
        if !self.is_displayed(booth_id) {
            return Err(ListError::NotDisplayed(booth_id.to_string()));
        }
        if snapshot.is_evaluated(booth_id) {
            return Err(ListError::AlreadyEvaluated(booth_id.to_string()));
        }
        Ok(())
    }

    /// Removes a displayed entry, returning the overflow entry that replaced it
    pub fn delete(
        &mut self,
        booth_id: &str,
        snapshot: &EvaluationSnapshot,
    ) -> Result<Option<RankedRecommendation>, ListError> {
        self.check_delete(booth_id, snapshot)?;

        self.display.retain(|r| r.booth_id != booth_id);
        self.deleted.insert(booth_id.to_string());

        let replacement = self.overflow.pop_front();
        match &replacement {
            Some(next) => self.display.push(next.clone()),
            None => self.exhausted = true,
        }

        tracing::debug!(
            booth_id = %booth_id,
            replacement = ?replacement.as_ref().map(|r| r.booth_id.as_str()),
            display = self.display.len(),
            remaining = self.overflow.len(),
            "Recommendation deleted"
        );

        Ok(replacement)
    }

    pub fn evaluation_progress(&self, snapshot: &EvaluationSnapshot) -> EvaluationProgress {
        let evaluated_count = self
            .display
            .iter()
            .filter(|r| snapshot.is_evaluated(&r.booth_id))
            .count();
        let required = self.display.len();

        EvaluationProgress {
            evaluated_count,
            required,
            is_complete: required > 0 && evaluated_count == required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EvaluationRecord;
    use chrono::Utc;

    fn ranked(ids: &[&str]) -> Vec<RankedRecommendation> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| RankedRecommendation::new(*id, format!("{} 추천 이유", id), i + 1))
            .collect()
    }

    fn ids(recommendations: &[RankedRecommendation]) -> Vec<&str> {
        recommendations.iter().map(|r| r.booth_id.as_str()).collect()
    }

    fn overflow_ids(list: &RecommendationList) -> Vec<&str> {
        list.overflow().map(|r| r.booth_id.as_str()).collect()
    }

    fn rated(ids: &[&str]) -> EvaluationSnapshot {
        EvaluationSnapshot::new(
            ids.iter()
                .map(|id| EvaluationRecord::rated(*id, Some(4), None))
                .collect(),
        )
    }

    const TWELVE: [&str; 12] = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L"];

    #[test]
    fn test_load_dedups_keeping_first_occurrence() {
        let input = ranked(&["A", "B", "A", "C", "D", "E", "F", "G", "H", "I", "J", "K"]);
        let list = RecommendationList::load(input, &EvaluationSnapshot::default());

        assert_eq!(
            ids(list.display()),
            vec!["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"]
        );
        assert_eq!(overflow_ids(&list), vec!["K"]);
        assert_eq!(list.display()[0].rank, 1);
    }

    #[test]
    fn test_load_display_size_is_bounded_by_input() {
        let snapshot = EvaluationSnapshot::default();
        for n in [0, 3, 10, 12] {
            let list = RecommendationList::load(ranked(&TWELVE[..n]), &snapshot);
            assert_eq!(list.display().len(), n.min(DISPLAY_COUNT));
            assert_eq!(list.remaining_deletions(), n.saturating_sub(DISPLAY_COUNT));
        }
    }

    #[test]
    fn test_with_capacity_sizes_display_window() {
        let list =
            RecommendationList::with_capacity(ranked(&TWELVE[..5]), &EvaluationSnapshot::default(), 3);

        assert_eq!(ids(list.display()), vec!["A", "B", "C"]);
        assert_eq!(overflow_ids(&list), vec!["D", "E"]);
        assert_eq!(list.remaining_deletions(), 2);
    }

    #[test]
    fn test_load_filters_tombstoned_booths() {
        let snapshot = EvaluationSnapshot::new(vec![EvaluationRecord::tombstone("B", Utc::now())]);
        let list = RecommendationList::load(ranked(&TWELVE), &snapshot);

        assert!(!list.is_displayed("B"));
        assert_eq!(
            ids(list.display()),
            vec!["A", "C", "D", "E", "F", "G", "H", "I", "J", "K"]
        );
        assert_eq!(overflow_ids(&list), vec!["L"]);
        assert!(!list.is_exhausted());
    }

    #[test]
    fn test_load_skips_blank_ids() {
        let mut input = ranked(&["A", "B"]);
        input.insert(1, RankedRecommendation::new("  ", "", 2));
        let list = RecommendationList::load(input, &EvaluationSnapshot::default());
        assert_eq!(ids(list.display()), vec!["A", "B"]);
    }

    #[test]
    fn test_load_is_idempotent() {
        let snapshot = rated(&["C"]);
        let first = RecommendationList::load(ranked(&TWELVE), &snapshot);
        let second = RecommendationList::load(ranked(&TWELVE), &snapshot);
        assert_eq!(first, second);
    }

    #[test]
    fn test_delete_backfills_from_overflow() {
        let snapshot = EvaluationSnapshot::default();
        let mut list = RecommendationList::load(ranked(&TWELVE), &snapshot);

        let replacement = list.delete("C", &snapshot).unwrap();

        assert_eq!(replacement.map(|r| r.booth_id), Some("K".to_string()));
        assert_eq!(list.display().len(), DISPLAY_COUNT);
        assert_eq!(list.display().last().unwrap().booth_id, "K");
        assert_eq!(overflow_ids(&list), vec!["L"]);
        assert!(list.deleted_ids().contains("C"));
    }

    #[test]
    fn test_delete_evaluated_entry_is_rejected() {
        let snapshot = rated(&["B"]);
        let mut list = RecommendationList::load(ranked(&TWELVE), &snapshot);
        let before = list.clone();

        let err = list.delete("B", &snapshot).unwrap_err();

        assert_eq!(err, ListError::AlreadyEvaluated("B".to_string()));
        assert_eq!(list, before);
    }

    #[test]
    fn test_delete_only_rating_recommendation_counts_as_evaluated() {
        let snapshot = EvaluationSnapshot::new(vec![EvaluationRecord::rated("B", None, Some(2))]);
        let mut list = RecommendationList::load(ranked(&TWELVE), &snapshot);
        assert!(list.delete("B", &snapshot).is_err());
    }

    #[test]
    fn test_delete_not_displayed_is_rejected() {
        let snapshot = EvaluationSnapshot::default();
        let mut list = RecommendationList::load(ranked(&TWELVE), &snapshot);
        let before = list.clone();

        assert_eq!(
            list.delete("L", &snapshot).unwrap_err(),
            ListError::NotDisplayed("L".to_string())
        );
        assert_eq!(
            list.delete("Z", &snapshot).unwrap_err(),
            ListError::NotDisplayed("Z".to_string())
        );
        assert_eq!(list, before);
    }

    #[test]
    fn test_double_delete_is_rejected() {
        let snapshot = EvaluationSnapshot::default();
        let mut list = RecommendationList::load(ranked(&TWELVE), &snapshot);
        list.delete("A", &snapshot).unwrap();
        let before = list.clone();

        assert_eq!(
            list.delete("A", &snapshot).unwrap_err(),
            ListError::AlreadyDeleted("A".to_string())
        );
        assert_eq!(list, before);
    }

    #[test]
    fn test_delete_with_empty_overflow_shrinks_once() {
        let snapshot = EvaluationSnapshot::default();
        let mut list = RecommendationList::load(ranked(&TWELVE[..10]), &snapshot);
        assert_eq!(list.remaining_deletions(), 0);
        assert!(list.can_delete());

        let replacement = list.delete("D", &snapshot).unwrap();

        assert!(replacement.is_none());
        assert_eq!(list.display().len(), 9);
        assert_eq!(list.remaining_deletions(), 0);
        assert!(list.is_exhausted());
        assert!(!list.can_delete());

        let before = list.clone();
        assert_eq!(
            list.delete("E", &snapshot).unwrap_err(),
            ListError::DeletionsExhausted
        );
        assert_eq!(list, before);
    }

    #[test]
    fn test_deletions_drain_overflow_then_exhaust() {
        let snapshot = EvaluationSnapshot::default();
        let mut list = RecommendationList::load(ranked(&TWELVE), &snapshot);

        list.delete("A", &snapshot).unwrap();
        list.delete("B", &snapshot).unwrap();
        assert_eq!(list.display().len(), DISPLAY_COUNT);
        assert_eq!(list.remaining_deletions(), 0);

        list.delete("C", &snapshot).unwrap();
        assert_eq!(list.display().len(), 9);
        assert!(list.delete("D", &snapshot).is_err());
    }

    #[test]
    fn test_restore_keeps_exhausted_state() {
        let snapshot = EvaluationSnapshot::new(vec![EvaluationRecord::tombstone("D", Utc::now())]);
        let list = RecommendationList::load(ranked(&TWELVE[..10]), &snapshot);

        assert_eq!(list.display().len(), 9);
        assert!(list.is_exhausted());
    }

    #[test]
    fn test_restore_with_replacement_is_not_exhausted() {
        let snapshot = EvaluationSnapshot::new(vec![EvaluationRecord::tombstone("D", Utc::now())]);
        let list = RecommendationList::load(ranked(&TWELVE[..11]), &snapshot);

        assert_eq!(list.display().len(), DISPLAY_COUNT);
        assert_eq!(list.remaining_deletions(), 0);
        assert!(!list.is_exhausted());
    }

    #[test]
    fn test_progress_complete_at_ten_of_ten() {
        let list = RecommendationList::load(ranked(&TWELVE), &EvaluationSnapshot::default());

        let all = rated(&TWELVE[..10]);
        let progress = list.evaluation_progress(&all);
        assert_eq!(progress.evaluated_count, 10);
        assert_eq!(progress.required, 10);
        assert!(progress.is_complete);

        let nine = rated(&TWELVE[..9]);
        let progress = list.evaluation_progress(&nine);
        assert_eq!(progress.evaluated_count, 9);
        assert!(!progress.is_complete);
    }

    #[test]
    fn test_progress_ignores_overflow_and_pending_rows() {
        let list = RecommendationList::load(ranked(&TWELVE), &EvaluationSnapshot::default());
        let mut records: Vec<EvaluationRecord> = TWELVE[..9]
            .iter()
            .map(|id| EvaluationRecord::rated(*id, Some(5), Some(5)))
            .collect();
        records.push(EvaluationRecord::rated("J", None, None));
        records.push(EvaluationRecord::rated("K", Some(3), None));

        let progress = list.evaluation_progress(&EvaluationSnapshot::new(records));
        assert_eq!(progress.evaluated_count, 9);
        assert!(!progress.is_complete);
    }

    #[test]
    fn test_progress_measured_against_shrunk_display() {
        let empty = EvaluationSnapshot::default();
        let mut list = RecommendationList::load(ranked(&TWELVE[..10]), &empty);
        list.delete("J", &empty).unwrap();

        let progress = list.evaluation_progress(&rated(&TWELVE[..9]));
        assert_eq!(progress.required, 9);
        assert!(progress.is_complete);
    }

    #[test]
    fn test_progress_empty_display_is_never_complete() {
        let list = RecommendationList::load(vec![], &EvaluationSnapshot::default());
        let progress = list.evaluation_progress(&EvaluationSnapshot::default());
        assert_eq!(progress.required, 0);
        assert!(!progress.is_complete);
    }

    #[test]
    fn test_list_error_maps_to_invalid_transition() {
        let err: AppError = ListError::DeletionsExhausted.into();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }
}
