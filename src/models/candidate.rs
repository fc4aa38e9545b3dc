use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use super::Booth;

/// A booth surfaced by one or more sector similarity queries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub booth_id: String,
    /// Similarity reported by the sector query that scored it highest
    pub similarity_score: f64,
    /// Sectors whose query surfaced this booth; empty for fallback queries
    pub source_sectors: BTreeSet<String>,
    /// Booth metadata carried along for the ranking service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booth: Option<Booth>,
}

impl Candidate {
    pub fn new(booth_id: impl Into<String>, similarity_score: f64) -> Self {
        Self {
            booth_id: booth_id.into(),
            similarity_score,
            source_sectors: BTreeSet::new(),
            booth: None,
        }
    }

    /// Tags the candidate with the sector that surfaced it
    pub fn from_sector(mut self, sector: impl Into<String>) -> Self {
        self.source_sectors.insert(sector.into());
        self
    }

    pub fn with_booth(mut self, booth: Booth) -> Self {
        self.booth = Some(booth);
        self
    }
}

/// Deduplicated candidates keyed by booth id
///
/// Merging unions source sectors and keeps the maximum score, so the
/// merged contents do not depend on the order sector results arrive in.
/// Insertion order is kept as the tie-breaker for equal scores.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one candidate into the pool
    pub fn merge(&mut self, candidate: Candidate) {
        // Update if exists, otherwise add
        if let Some(&position) = self.index.get(&candidate.booth_id) {
            let existing = &mut self.candidates[position];
            existing
                .source_sectors
                .extend(candidate.source_sectors);
            // Ties keep the earlier-recorded score
            if candidate.similarity_score > existing.similarity_score {
                existing.similarity_score = candidate.similarity_score;
                if candidate.booth.is_some() {
                    existing.booth = candidate.booth;
                }
            } else if existing.booth.is_none() {
                existing.booth = candidate.booth;
            }
        } else {
            self.index
                .insert(candidate.booth_id.clone(), self.candidates.len());
            self.candidates.push(candidate);
        }
    }

    /// Merges a whole sector result list, tagging each entry with the sector
    pub fn merge_sector(&mut self, sector: &str, results: Vec<Candidate>) {
        for candidate in results {
            self.merge(candidate.from_sector(sector));
        }
    }

    /// Orders candidates by descending similarity; equal scores keep first-seen order
    pub fn sort_by_score(&mut self) {
        // sort_by is stable, which preserves first-seen order for ties
        self.candidates.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(Ordering::Equal)
        });
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (c.booth_id.clone(), i))
            .collect();
    }

    pub fn get(&self, booth_id: &str) -> Option<&Candidate> {
        self.index.get(booth_id).map(|&i| &self.candidates[i])
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Attaches booth metadata to candidates that have none; ids and order
    /// are left untouched
    pub fn fill_missing_booths<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<Booth>,
    {
        for candidate in self.candidates.iter_mut().filter(|c| c.booth.is_none()) {
            candidate.booth = lookup(&candidate.booth_id);
        }
    }

    pub fn booth_ids(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.booth_id.clone()).collect()
    }

    /// Number of pool entries each sector contributed to
    pub fn sector_distribution(&self) -> HashMap<String, usize> {
        let mut distribution = HashMap::new();
        for candidate in &self.candidates {
            for sector in &candidate.source_sectors {
                *distribution.entry(sector.clone()).or_insert(0) += 1;
            }
        }
        distribution
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl FromIterator<Candidate> for CandidatePool {
    fn from_iter<T: IntoIterator<Item = Candidate>>(iter: T) -> Self {
        let mut pool = CandidatePool::new();
        for candidate in iter {
            pool.merge(candidate);
        }
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sectors(pool: &CandidatePool, booth_id: &str) -> Vec<String> {
        pool.get(booth_id)
            .unwrap()
            .source_sectors
            .iter()
            .cloned()
            .collect()
    }

    #[test]
    fn test_merge_unions_sectors_and_keeps_max_score() {
        let mut pool = CandidatePool::new();
        pool.merge_sector("a", vec![Candidate::new("X", 0.4)]);
        pool.merge_sector("b", vec![Candidate::new("X", 0.7)]);

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get("X").unwrap().similarity_score, 0.7);
        assert_eq!(sectors(&pool, "X"), vec!["a", "b"]);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let mut forward = CandidatePool::new();
        forward.merge_sector("a", vec![Candidate::new("X", 0.4), Candidate::new("Y", 0.5)]);
        forward.merge_sector("b", vec![Candidate::new("X", 0.7)]);

        let mut reverse = CandidatePool::new();
        reverse.merge_sector("b", vec![Candidate::new("X", 0.7)]);
        reverse.merge_sector("a", vec![Candidate::new("X", 0.4), Candidate::new("Y", 0.5)]);

        for id in ["X", "Y"] {
            assert_eq!(forward.get(id), reverse.get(id));
        }
    }

    #[test]
    fn test_lower_score_keeps_existing_metadata() {
        let booth = Booth {
            id: "X".to_string(),
            company_name_kor: "첫번째".to_string(),
            category: None,
            company_description: String::new(),
            products: String::new(),
            products_description: String::new(),
        };
        let mut pool = CandidatePool::new();
        pool.merge(Candidate::new("X", 0.9).with_booth(booth.clone()));
        pool.merge(Candidate::new("X", 0.2));

        assert_eq!(pool.get("X").unwrap().booth, Some(booth));
        assert_eq!(pool.get("X").unwrap().similarity_score, 0.9);
    }

    #[test]
    fn test_sort_by_score_descending_with_stable_ties() {
        let mut pool = CandidatePool::new();
        pool.merge_sector("a", vec![Candidate::new("P", 0.5), Candidate::new("Q", 0.9)]);
        pool.merge_sector("b", vec![Candidate::new("R", 0.5), Candidate::new("S", 0.6)]);
        pool.sort_by_score();

        assert_eq!(pool.booth_ids(), vec!["Q", "S", "P", "R"]);
        // Index is rebuilt after sorting
        assert_eq!(pool.get("R").unwrap().booth_id, "R");
    }

    #[test]
    fn test_sector_distribution_counts_shared_booths_per_sector() {
        let mut pool = CandidatePool::new();
        pool.merge_sector("a", vec![Candidate::new("X", 0.4), Candidate::new("Y", 0.3)]);
        pool.merge_sector("b", vec![Candidate::new("X", 0.7)]);

        let distribution = pool.sector_distribution();
        assert_eq!(distribution.get("a"), Some(&2));
        assert_eq!(distribution.get("b"), Some(&1));
    }

    #[test]
    fn test_from_iterator_deduplicates() {
        let pool: CandidatePool = vec![
            Candidate::new("X", 0.1),
            Candidate::new("X", 0.3),
            Candidate::new("Y", 0.2),
        ]
        .into_iter()
        .collect();

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get("X").unwrap().similarity_score, 0.3);
    }

    #[test]
    fn test_fill_missing_booths_keeps_existing_metadata_and_index() {
        let booth = |id: &str, name: &str| Booth {
            id: id.to_string(),
            company_name_kor: name.to_string(),
            category: None,
            company_description: String::new(),
            products: String::new(),
            products_description: String::new(),
        };
        let known = booth("X", "기존");
        let mut pool = CandidatePool::new();
        pool.merge(Candidate::new("X", 0.9).with_booth(known.clone()));
        pool.merge(Candidate::new("Y", 0.5));
        pool.merge(Candidate::new("Z", 0.4));

        pool.fill_missing_booths(|id| (id == "Y").then(|| booth(id, "새 부스")));

        assert_eq!(pool.get("X").unwrap().booth, Some(known));
        assert_eq!(
            pool.get("Y").unwrap().booth.as_ref().unwrap().company_name_kor,
            "새 부스"
        );
        assert!(pool.get("Z").unwrap().booth.is_none());
        assert_eq!(pool.booth_ids(), vec!["X", "Y", "Z"]);
    }
}
