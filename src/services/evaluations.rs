use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{EvaluationRecord, EvaluationRow, EvaluationSnapshot},
};

/// Per-(user, booth) evaluation storage
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Every stored record for the user, tombstones included
    async fn get_all(&self, user_id: i64) -> AppResult<Vec<EvaluationRecord>>;

    /// Marks the recommendation as deleted, creating the row if needed
    async fn upsert_tombstone(&self, user_id: i64, booth_id: &str) -> AppResult<()>;

    /// Records ratings, keeping any rating not supplied this time
    async fn upsert_rating(
        &self,
        user_id: i64,
        booth_id: &str,
        booth_rating: Option<u8>,
        recommendation_rating: Option<u8>,
    ) -> AppResult<()>;
}

/// Loads the user's records into a read-only snapshot
pub async fn snapshot(store: &dyn EvaluationStore, user_id: i64) -> AppResult<EvaluationSnapshot> {
    let records = store.get_all(user_id).await?;
    Ok(EvaluationSnapshot::new(records))
}

/// Rejects ratings outside 1..=5 and requests that rate nothing
pub fn validate_ratings(booth_rating: Option<u8>, recommendation_rating: Option<u8>) -> AppResult<()> {
    if booth_rating.is_none() && recommendation_rating.is_none() {
        return Err(AppError::InvalidInput(
            "At least one rating must be provided".to_string(),
        ));
    }
    for rating in [booth_rating, recommendation_rating].into_iter().flatten() {
        if !(1..=5).contains(&rating) {
            return Err(AppError::InvalidInput(format!(
                "Rating must be between 1 and 5, got {}",
                rating
            )));
        }
    }
    Ok(())
}

/// Evaluation store backed by the `evaluation` table
#[derive(Clone)]
pub struct PgEvaluationStore {
    db_pool: PgPool,
}

impl PgEvaluationStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait::async_trait]
impl EvaluationStore for PgEvaluationStore {
    async fn get_all(&self, user_id: i64) -> AppResult<Vec<EvaluationRecord>> {
        let rows: Vec<EvaluationRow> = sqlx::query_as(
            r#"
            SELECT booth_id, booth_rating, rec_rating, is_deleted, deleted_at
            FROM evaluation
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        tracing::debug!(user_id, rows = rows.len(), "Loaded evaluation rows");

        rows.into_iter().map(EvaluationRecord::try_from).collect()
    }

    async fn upsert_tombstone(&self, user_id: i64, booth_id: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO evaluation (user_id, booth_id, is_deleted, deleted_at)
            VALUES ($1, $2, TRUE, NOW())
            ON CONFLICT (user_id, booth_id)
            DO UPDATE SET is_deleted = TRUE, deleted_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(booth_id)
        .execute(&self.db_pool)
        .await?;

        tracing::info!(user_id, booth_id = %booth_id, "Recommendation tombstone stored");

        Ok(())
    }

    async fn upsert_rating(
        &self,
        user_id: i64,
        booth_id: &str,
        booth_rating: Option<u8>,
        recommendation_rating: Option<u8>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO evaluation (user_id, booth_id, booth_rating, rec_rating, started_at, ended_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            ON CONFLICT (user_id, booth_id)
            DO UPDATE SET
                booth_rating = COALESCE(EXCLUDED.booth_rating, evaluation.booth_rating),
                rec_rating = COALESCE(EXCLUDED.rec_rating, evaluation.rec_rating),
                ended_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(booth_id)
        .bind(booth_rating.map(i32::from))
        .bind(recommendation_rating.map(i32::from))
        .execute(&self.db_pool)
        .await?;

        tracing::info!(user_id, booth_id = %booth_id, "Evaluation stored");

        Ok(())
    }
}
