use sqlx::PgPool;

use crate::{
    error::AppResult,
    models::{Booth, BoothMatch},
    services::providers::SimilaritySearch,
};

/// Similarity search backed by the `search_similar_booths` pgvector function
#[derive(Clone)]
pub struct PgSimilaritySearch {
    db_pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct BoothSearchRow {
    id: String,
    company_name_kor: String,
    category: Option<String>,
    company_description: Option<String>,
    products: Option<String>,
    products_description: Option<String>,
    similarity: f64,
}

impl From<BoothSearchRow> for BoothMatch {
    fn from(row: BoothSearchRow) -> Self {
        BoothMatch {
            booth: Booth {
                id: row.id,
                company_name_kor: row.company_name_kor,
                category: row.category,
                company_description: row.company_description.unwrap_or_default(),
                products: row.products.unwrap_or_default(),
                products_description: row.products_description.unwrap_or_default(),
            },
            similarity: row.similarity,
        }
    }
}

impl PgSimilaritySearch {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

/// Renders a vector as a pgvector text literal, e.g. `[0.1,0.2]`
fn vector_literal(values: &[f32]) -> String {
    let joined: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", joined.join(","))
}

#[async_trait::async_trait]
impl SimilaritySearch for PgSimilaritySearch {
    async fn search(
        &self,
        query: &[f32],
        match_threshold: f64,
        match_count: usize,
    ) -> AppResult<Vec<BoothMatch>> {
        let rows: Vec<BoothSearchRow> = sqlx::query_as(
            r#"
            SELECT id, company_name_kor, category, company_description,
                   products, products_description, similarity::float8 AS similarity
            FROM search_similar_booths($1::text::vector, $2, $3)
            "#,
        )
        .bind(vector_literal(query))
        .bind(match_threshold)
        .bind(match_count as i32)
        .fetch_all(&self.db_pool)
        .await?;

        tracing::debug!(
            results = rows.len(),
            match_threshold,
            match_count,
            "Similarity search completed"
        );

        Ok(rows.into_iter().map(BoothMatch::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_literal() {
        assert_eq!(vector_literal(&[0.5, -1.0, 0.25]), "[0.5,-1,0.25]");
    }

    #[test]
    fn test_vector_literal_empty() {
        assert_eq!(vector_literal(&[]), "[]");
    }

    #[test]
    fn test_search_row_into_match_fills_missing_text() {
        let row = BoothSearchRow {
            id: "B2404".to_string(),
            company_name_kor: "치즈공방".to_string(),
            category: Some("유제품".to_string()),
            company_description: None,
            products: Some("모짜렐라".to_string()),
            products_description: None,
            similarity: 0.82,
        };

        let matched = BoothMatch::from(row);
        assert_eq!(matched.booth.id, "B2404");
        assert_eq!(matched.booth.company_description, "");
        assert_eq!(matched.booth.products, "모짜렐라");
        assert_eq!(matched.similarity, 0.82);
    }
}
