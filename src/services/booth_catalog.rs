use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::Booth,
};

/// Where booth metadata is loaded from
#[async_trait::async_trait]
pub trait BoothSource: Send + Sync {
    async fn load(&self) -> AppResult<Vec<Booth>>;
}

/// Booth list stored as JSON Lines, one booth object per line
pub struct JsonlBoothSource {
    path: PathBuf,
}

impl JsonlBoothSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Parses JSON Lines content, skipping blank and malformed lines
pub fn parse_jsonl(content: &str) -> Vec<Booth> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(number, line)| match serde_json::from_str::<Booth>(line) {
            Ok(booth) => Some(booth),
            Err(e) => {
                tracing::warn!(line = number + 1, error = %e, "Skipping malformed booth line");
                None
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl BoothSource for JsonlBoothSource {
    async fn load(&self) -> AppResult<Vec<Booth>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to read booth data from {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let booths = parse_jsonl(&content);
        tracing::info!(
            path = %self.path.display(),
            booths = booths.len(),
            "Booth data loaded"
        );
        Ok(booths)
    }
}

/// Read-through cache over a [`BoothSource`]
///
/// The first read loads the whole source; later reads share that list
/// until [`BoothCatalog::invalidate`] is called.
pub struct BoothCatalog {
    source: Arc<dyn BoothSource>,
    cached: RwLock<Option<Arc<Vec<Booth>>>>,
}

impl BoothCatalog {
    pub fn new(source: Arc<dyn BoothSource>) -> Self {
        Self {
            source,
            cached: RwLock::new(None),
        }
    }

    pub async fn all(&self) -> AppResult<Arc<Vec<Booth>>> {
        if let Some(booths) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(booths));
        }

        let mut cached = self.cached.write().await;
        // Another reader may have loaded while we waited for the lock
        if let Some(booths) = cached.as_ref() {
            return Ok(Arc::clone(booths));
        }

        let booths = Arc::new(self.source.load().await?);
        *cached = Some(Arc::clone(&booths));
        Ok(booths)
    }

    /// Drops the cached list; the next read reloads from the source
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
        tracing::info!("Booth catalog cache invalidated");
    }

    /// Drops the cached list and loads it again, returning the booth count
    pub async fn reload(&self) -> AppResult<usize> {
        self.invalidate().await;
        Ok(self.all().await?.len())
    }

    pub async fn get(&self, booth_id: &str) -> AppResult<Option<Booth>> {
        let booths = self.all().await?;
        Ok(booths.iter().find(|b| b.id == booth_id).cloned())
    }

    /// Case-insensitive keyword search over name, category and products
    ///
    /// Name matches come first; otherwise catalog order is kept.
    pub async fn search(&self, term: &str) -> AppResult<Vec<Booth>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let booths = self.all().await?;
        let mut by_name = Vec::new();
        let mut by_other = Vec::new();
        for booth in booths.iter() {
            if booth.company_name_kor.to_lowercase().contains(&term) {
                by_name.push(booth.clone());
            } else if booth
                .category
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&term))
                || booth.products.to_lowercase().contains(&term)
            {
                by_other.push(booth.clone());
            }
        }

        by_name.extend(by_other);
        Ok(by_name)
    }
}
