use crate::{
    error::AppResult,
    models::InterestProfile,
    services::sectors::{Sector, SectorCatalog},
};

/// Renders interest profiles into similarity-query seeds
///
/// A sector projection keeps only the parts of a profile relevant to that
/// sector: the free-text goal, the interest tags overlapping the sector's
/// keywords, and the contextual flags that apply to every query. A sector
/// with neither goal nor matching interests projects to an empty string
/// and must not be queried.
pub struct ProfileProjector<'a> {
    catalog: &'a SectorCatalog,
}

impl<'a> ProfileProjector<'a> {
    pub fn new(catalog: &'a SectorCatalog) -> Self {
        Self { catalog }
    }

    /// Projects the profile onto a sector looked up by name
    pub fn project_by_name(&self, profile: &InterestProfile, sector: &str) -> AppResult<String> {
        let sector = self.catalog.sector(sector)?;
        Ok(self.project(profile, sector))
    }

    pub fn project(&self, profile: &InterestProfile, sector: &Sector) -> String {
        let mut parts = Vec::new();

        if let Some(goal) = profile.goal() {
            parts.push(format!("구체적 목표: {}", goal));
        }

        let relevant: Vec<String> = profile
            .interests
            .iter()
            .filter_map(|(category, tags)| {
                let matching: Vec<&str> = tags
                    .iter()
                    .filter(|tag| sector.matches_tag(tag))
                    .map(String::as_str)
                    .collect();
                (!matching.is_empty()).then(|| format!("{}: {}", category, matching.join(", ")))
            })
            .collect();
        if !relevant.is_empty() {
            parts.push(format!("관심사: {}", relevant.join("; ")));
        }

        if parts.is_empty() {
            return String::new();
        }

        parts.push(context_line(profile));
        parts.join(" ")
    }

    /// Sectors with a non-empty projection, in catalog order, paired with their seed text
    pub fn active_sectors(&self, profile: &InterestProfile) -> Vec<(&'a Sector, String)> {
        self.catalog
            .all_sectors()
            .iter()
            .filter_map(|sector| {
                let seed = self.project(profile, sector);
                (!seed.trim().is_empty()).then_some((sector, seed))
            })
            .collect()
    }
}

/// Sector-agnostic seed covering every selected interest
///
/// Empty when the profile has neither a goal nor any interest tag.
pub fn project_whole(profile: &InterestProfile) -> String {
    let mut parts = Vec::new();

    if let Some(goal) = profile.goal() {
        parts.push(format!("구체적 목표: {}", goal));
    }

    let interests: Vec<String> = profile
        .interests
        .iter()
        .filter(|(_, tags)| !tags.is_empty())
        .map(|(category, tags)| format!("{}: {}", category, tags.join(", ")))
        .collect();
    if !interests.is_empty() {
        parts.push(format!("관심사: {}", interests.join("; ")));
    }

    if parts.is_empty() {
        return String::new();
    }

    parts.push(context_line(profile));
    parts.join(" ")
}

/// Multi-line visitor description handed to the ranking service
pub fn visitor_info(profile: &InterestProfile) -> String {
    let mut info = String::new();

    if let Some(age) = profile.age {
        info.push_str(&format!("나이: {}세\n", age));
    }
    if let Some(gender) = profile.gender.as_deref().filter(|g| !g.is_empty()) {
        info.push_str(&format!("성별: {}\n", gender));
    }
    if let Some(purpose) = profile.visit_purpose.as_deref().filter(|p| !p.is_empty()) {
        info.push_str(&format!("방문 목적: {}\n", purpose));
    }
    if let Some(goal) = profile.goal() {
        info.push_str(&format!("구체적 목표: {}\n", goal));
    }

    let interests: Vec<_> = profile
        .interests
        .iter()
        .filter(|(_, tags)| !tags.is_empty())
        .collect();
    if !interests.is_empty() {
        info.push_str("\n선택한 관심사:\n");
        for (category, tags) in interests {
            info.push_str(&format!("  {}: {}\n", category, tags.join(", ")));
        }
    }

    info.push_str(&format!("\n{}\n", context_line(profile)));

    if !profile.followups.is_empty() {
        info.push_str("\n추가 질문 및 답변:\n");
        for (i, pair) in profile.followups.iter().enumerate() {
            info.push_str(&format!("\nQ{}. {}\n", i + 1, pair.question));
            info.push_str(&format!("A{}. {}\n", i + 1, pair.answer));
        }
    }

    info
}

/// Contextual flags appended to every non-empty projection
fn context_line(profile: &InterestProfile) -> String {
    let mut items: Vec<String> = Vec::new();

    if profile.has_children == Some(true) {
        items.push("자녀가 있어요".to_string());
        if !profile.child_interests.is_empty() {
            items.push(format!("자녀 관심사: {}", profile.child_interests.join(", ")));
        }
    } else {
        items.push("자녀 없음".to_string());
    }

    if profile.has_pets == Some(true) {
        items.push("반려동물이 있어요".to_string());
        if !profile.pet_types.is_empty() {
            items.push(format!("반려동물 종류: {}", profile.pet_types.join(", ")));
        }
    } else {
        items.push("반려동물 없음".to_string());
    }

    if profile.has_allergies == Some(true) {
        items.push("알러지가 있어요".to_string());
        if let Some(allergies) = profile.allergies.as_deref().filter(|a| !a.is_empty()) {
            items.push(format!("알러지 정보: {}", allergies));
        }
    } else {
        items.push("알러지 없음".to_string());
    }

    // Companion flag is only rendered when the visitor answered it
    match profile.has_companion {
        Some(true) => {
            items.push("동행자가 있어요".to_string());
            if let Some(count) = profile.companion_count.filter(|c| *c > 0) {
                items.push(format!("동행 인원: {}명", count));
            }
        }
        Some(false) => items.push("혼자 방문".to_string()),
        None => {}
    }

    format!("선택 항목: {}", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FollowUpAnswer;

    fn dairy_catalog() -> SectorCatalog {
        SectorCatalog::new(vec![
            Sector::new("fresh", &["과일", "채소"]),
            Sector::new("dairy", &["우유", "치즈"]),
        ])
    }

    fn dairy_profile() -> InterestProfile {
        let mut profile = InterestProfile::default();
        profile.add_interest("음료", "우유");
        profile.add_interest("유제품", "치즈");
        profile
    }

    #[test]
    fn test_project_keeps_only_sector_relevant_tags() {
        let catalog = dairy_catalog();
        let projector = ProfileProjector::new(&catalog);
        let mut profile = dairy_profile();
        profile.add_interest("유제품", "과일");

        let seed = projector.project_by_name(&profile, "dairy").unwrap();
        assert!(seed.starts_with("관심사: 유제품: 치즈; 음료: 우유"));
        assert!(!seed.contains("과일"));
    }

    #[test]
    fn test_project_without_signal_is_empty() {
        let catalog = dairy_catalog();
        let projector = ProfileProjector::new(&catalog);
        let profile = InterestProfile {
            has_children: Some(true),
            has_pets: Some(true),
            ..dairy_profile()
        };

        assert_eq!(projector.project_by_name(&profile, "fresh").unwrap(), "");
    }

    #[test]
    fn test_goal_activates_every_sector() {
        let catalog = dairy_catalog();
        let projector = ProfileProjector::new(&catalog);
        let profile = InterestProfile {
            specific_goal: Some("카페 창업 준비".to_string()),
            ..Default::default()
        };

        let seed = projector.project_by_name(&profile, "fresh").unwrap();
        assert!(seed.starts_with("구체적 목표: 카페 창업 준비"));
        assert_eq!(projector.active_sectors(&profile).len(), 2);
    }

    #[test]
    fn test_context_flags_appended_to_non_empty_projection() {
        let catalog = dairy_catalog();
        let projector = ProfileProjector::new(&catalog);
        let profile = InterestProfile {
            has_children: Some(true),
            child_interests: vec!["간식".to_string()],
            has_allergies: Some(true),
            allergies: Some("땅콩".to_string()),
            has_companion: Some(true),
            companion_count: Some(2),
            ..dairy_profile()
        };

        let seed = projector.project_by_name(&profile, "dairy").unwrap();
        assert!(seed.ends_with(
            "선택 항목: 자녀가 있어요, 자녀 관심사: 간식, 반려동물 없음, 알러지가 있어요, \
             알러지 정보: 땅콩, 동행자가 있어요, 동행 인원: 2명"
        ));
    }

    #[test]
    fn test_active_sectors_in_catalog_order() {
        let catalog = dairy_catalog();
        let projector = ProfileProjector::new(&catalog);
        let mut profile = dairy_profile();
        profile.add_interest("신선", "채소");

        let names: Vec<&str> = projector
            .active_sectors(&profile)
            .iter()
            .map(|(s, _)| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["fresh", "dairy"]);
    }

    #[test]
    fn test_project_unknown_sector_fails() {
        let catalog = dairy_catalog();
        let projector = ProfileProjector::new(&catalog);
        assert!(projector.project_by_name(&dairy_profile(), "bakery").is_err());
    }

    #[test]
    fn test_project_whole_includes_all_interests() {
        let mut profile = dairy_profile();
        profile.add_interest("신선", "채소");

        let text = project_whole(&profile);
        assert!(text.contains("신선: 채소"));
        assert!(text.contains("유제품: 치즈"));
    }

    #[test]
    fn test_project_whole_empty_without_goal_or_interests() {
        let profile = InterestProfile {
            age: Some(30),
            has_pets: Some(true),
            ..Default::default()
        };
        assert_eq!(project_whole(&profile), "");
    }

    #[test]
    fn test_visitor_info_lists_demographics_and_followups() {
        let profile = InterestProfile {
            age: Some(41),
            gender: Some("남성".to_string()),
            visit_purpose: Some("납품처 발굴".to_string()),
            followups: vec![FollowUpAnswer {
                question: "선호하는 가격대는?".to_string(),
                answer: "중저가".to_string(),
            }],
            ..dairy_profile()
        };

        let info = visitor_info(&profile);
        assert!(info.starts_with("나이: 41세\n성별: 남성\n방문 목적: 납품처 발굴\n"));
        assert!(info.contains("  유제품: 치즈\n"));
        assert!(info.contains("Q1. 선호하는 가격대는?\nA1. 중저가\n"));
    }
}
