use std::sync::OnceLock;

use crate::error::{AppError, AppResult};

/// A named thematic grouping of interest keywords
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sector {
    pub name: String,
    pub keywords: Vec<String>,
}

impl Sector {
    pub fn new(name: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Whether a tag overlaps any keyword (substring either direction, case-sensitive)
    ///
    /// A blank tag matches nothing.
    pub fn matches_tag(&self, tag: &str) -> bool {
        if tag.trim().is_empty() {
            return false;
        }
        self.keywords
            .iter()
            .any(|keyword| tag.contains(keyword.as_str()) || keyword.contains(tag))
    }
}

/// Fixed mapping from sector names to keyword vocabularies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorCatalog {
    sectors: Vec<Sector>,
}

impl SectorCatalog {
    pub fn new(sectors: Vec<Sector>) -> Self {
        Self { sectors }
    }

    /// Process-wide catalog of exhibition sectors, built on first use
    pub fn standard() -> &'static SectorCatalog {
        static CATALOG: OnceLock<SectorCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            SectorCatalog::new(vec![
                Sector::new(
                    "신선식품",
                    &["과일", "채소", "쌀/잡곡", "견과류", "소", "돼지", "닭", "해산물", "수산가공품"],
                ),
                Sector::new(
                    "가공식품",
                    &[
                        "냉동/냉장식품", "밀키트", "도시락", "레토르트", "통조림", "인스턴트",
                        "면류", "장류/소스",
                    ],
                ),
                Sector::new(
                    "베이커리 & 디저트",
                    &[
                        "식빵", "페이스트리", "베이글", "제과제빵 재료", "케이크", "아이스크림",
                        "푸딩", "젤리", "초콜릿", "과자", "쿠키",
                    ],
                ),
                Sector::new(
                    "유제품 & 음료 & 주류",
                    &[
                        "우유", "치즈", "요거트", "버터", "크림", "원두", "인스턴트 커피", "차",
                        "주스", "탄산음료", "기능성 음료", "맥주", "와인", "전통주", "위스키",
                    ],
                ),
                Sector::new(
                    "건강 & 웰빙",
                    &[
                        "비타민", "영양제", "프로틴", "건강즙", "홍삼", "고령친화식품",
                        "영양보충식", "저작용이식품", "유기농 인증", "친환경 인증",
                    ],
                ),
                Sector::new(
                    "식이 스타일",
                    &[
                        "매운맛", "짠맛", "단맛", "신맛", "담백한맛", "감칠맛", "구이/로스팅",
                        "찜/삶기", "튀김", "조림", "채식/비건", "저탄수", "저염식", "저당식",
                        "고단백",
                    ],
                ),
            ])
        })
    }

    /// All sectors in catalog order
    pub fn all_sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn sector(&self, name: &str) -> AppResult<&Sector> {
        self.sectors
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| AppError::NotFound(format!("Unknown sector: {}", name)))
    }

    pub fn keywords_for(&self, name: &str) -> AppResult<&[String]> {
        self.sector(name).map(|s| s.keywords.as_slice())
    }
}
