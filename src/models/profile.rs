use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A follow-up question and the visitor's answer to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowUpAnswer {
    pub question: String,
    pub answer: String,
}

/// Interest profile submitted by a visitor for one recommendation cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InterestProfile {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub visit_purpose: Option<String>,
    /// Category name → selected interest tags
    #[serde(default, deserialize_with = "non_blank_interests")]
    pub interests: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub specific_goal: Option<String>,
    #[serde(default)]
    pub has_companion: Option<bool>,
    #[serde(default)]
    pub companion_count: Option<u32>,
    #[serde(default)]
    pub has_children: Option<bool>,
    #[serde(default)]
    pub child_interests: Vec<String>,
    #[serde(default)]
    pub has_pets: Option<bool>,
    #[serde(default)]
    pub pet_types: Vec<String>,
    #[serde(default)]
    pub has_allergies: Option<bool>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub followups: Vec<FollowUpAnswer>,
}

impl InterestProfile {
    /// Total number of selected interest tags across all categories
    pub fn interest_count(&self) -> usize {
        self.interests.values().map(Vec::len).sum()
    }

    /// Free-text goal, if present and not blank
    pub fn goal(&self) -> Option<&str> {
        self.specific_goal
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    /// Adds an interest tag under a category; blank tags are ignored
    pub fn add_interest(&mut self, category: impl Into<String>, tag: impl Into<String>) {
        let tag = tag.into().trim().to_string();
        if tag.is_empty() {
            return;
        }
        let tags = self.interests.entry(category.into()).or_default();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
}

/// Drops blank tags, and categories left without any tag
fn non_blank_interests<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(category, tags)| {
            let tags: Vec<String> = tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            (!tags.is_empty()).then_some((category, tags))
        })
        .collect())
}
