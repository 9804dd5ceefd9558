use crate::models::WatchlistItem;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Durable backing for the watchlist. `save` replaces the whole list.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn load(&self) -> Result<Vec<WatchlistItem>>;
    async fn save(&self, items: &[WatchlistItem]) -> Result<()>;
}

/// JSON array on disk. Writes land in a sibling temp file and are renamed over the target.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "watchlist.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl WatchlistStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<WatchlistItem>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read watchlist {}", self.path.display()))
            }
        };
        match serde_json::from_str(&text) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!(
                    "Watchlist file {} is unreadable, starting empty: {}",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, items: &[WatchlistItem]) -> Result<()> {
        let json = serde_json::to_string_pretty(items).context("Failed to serialize watchlist")?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

/// Process-local store, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: std::sync::Mutex<Vec<WatchlistItem>>,
}

#[async_trait]
impl WatchlistStore for MemoryStore {
    async fn load(&self) -> Result<Vec<WatchlistItem>> {
        Ok(self
            .items
            .lock()
            .map_err(|_| anyhow::anyhow!("watchlist store poisoned"))?
            .clone())
    }

    async fn save(&self, items: &[WatchlistItem]) -> Result<()> {
        *self
            .items
            .lock()
            .map_err(|_| anyhow::anyhow!("watchlist store poisoned"))? = items.to_vec();
        Ok(())
    }
}

/// The user's saved titles, at most one entry per id.
///
/// Each mutation is written through to the store before it becomes visible; a failed
/// save leaves the in-memory list untouched.
pub struct Watchlist {
    store: Box<dyn WatchlistStore>,
    items: Mutex<Vec<WatchlistItem>>,
}

impl Watchlist {
    pub async fn open(store: Box<dyn WatchlistStore>) -> Result<Self> {
        let items = store.load().await?;
        info!("Watchlist loaded with {} titles", items.len());
        Ok(Self {
            store,
            items: Mutex::new(items),
        })
    }

    /// Adds `movie_id`, or refreshes its timestamp when already present.
    pub async fn add(&self, movie_id: &str) -> Result<WatchlistItem> {
        let mut items = self.items.lock().await;
        let item = WatchlistItem {
            movie_id: movie_id.to_string(),
            added_at: Utc::now(),
        };
        let mut next: Vec<WatchlistItem> = items
            .iter()
            .filter(|i| i.movie_id != movie_id)
            .cloned()
            .collect();
        next.push(item.clone());
        self.store.save(&next).await?;
        *items = next;
        Ok(item)
    }

    /// Returns whether anything was removed.
    pub async fn remove(&self, movie_id: &str) -> Result<bool> {
        let mut items = self.items.lock().await;
        if !items.iter().any(|i| i.movie_id == movie_id) {
            return Ok(false);
        }
        let next: Vec<WatchlistItem> = items
            .iter()
            .filter(|i| i.movie_id != movie_id)
            .cloned()
            .collect();
        self.store.save(&next).await?;
        *items = next;
        Ok(true)
    }

    pub async fn contains(&self, movie_id: &str) -> bool {
        self.items.lock().await.iter().any(|i| i.movie_id == movie_id)
    }

    pub async fn items(&self) -> Vec<WatchlistItem> {
        self.items.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.items.lock().await.len()
    }
}
