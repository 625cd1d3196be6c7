//! Page-view counter.
//!
//! The counter is informational. [`record_view`] turns every failure into
//! [`ViewCount::Unavailable`] so that it never blocks analysis.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{read_document, write_document};
use crate::error::{CalorieError, CalorieResult};

/// A shared, monotonically increasing counter.
#[async_trait]
pub trait ViewCounter: Send + Sync {
    /// Current count. A counter that does not exist yet is created at 0.
    async fn read(&self) -> CalorieResult<u64>;

    /// Adds one and returns the new count.
    async fn increment(&self) -> CalorieResult<u64>;
}

#[derive(Serialize)]
struct CounterDocument {
    count: u64,
}

/// Counter stored as `{"count": n}` in a JSON file.
///
/// Increments from one process are serialized by a mutex; each write
/// replaces the file atomically.
pub struct FileViewCounter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileViewCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the document does not exist. A `count` that is not a
    /// non-negative integer reads as 0.
    async fn load(&self) -> CalorieResult<Option<u64>> {
        let document: Option<serde_json::Value> = read_document(&self.path)
            .await
            .map_err(|reason| CalorieError::storage("view counter", reason))?;
        Ok(document.map(|doc| doc.get("count").and_then(|c| c.as_u64()).unwrap_or(0)))
    }

    async fn store(&self, count: u64) -> CalorieResult<()> {
        write_document(&self.path, &CounterDocument { count })
            .await
            .map_err(|reason| CalorieError::storage("view counter", reason))
    }
}

#[async_trait]
impl ViewCounter for FileViewCounter {
    async fn read(&self) -> CalorieResult<u64> {
        let _guard = self.lock.lock().await;
        match self.load().await? {
            Some(count) => Ok(count),
            None => {
                debug!(path = %self.path.display(), "creating view counter");
                self.store(0).await?;
                Ok(0)
            }
        }
    }

    async fn increment(&self) -> CalorieResult<u64> {
        let _guard = self.lock.lock().await;
        let count = self.load().await?.unwrap_or(0).saturating_add(1);
        self.store(count).await?;
        Ok(count)
    }
}

/// Outcome of recording a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCount {
    Count(u64),
    /// The counter could not be updated; carries the warning to show.
    Unavailable(String),
}

impl fmt::Display for ViewCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewCount::Count(count) => write!(f, "Visitors: {}", count),
            ViewCount::Unavailable(reason) => write!(f, "View counter unavailable: {}", reason),
        }
    }
}

/// Increments the counter, degrading failures to a warning.
pub async fn record_view(counter: &dyn ViewCounter) -> ViewCount {
    match counter.increment().await {
        Ok(count) => ViewCount::Count(count),
        Err(e) => {
            warn!(error = %e, "view counter update failed");
            ViewCount::Unavailable(e.to_string())
        }
    }
}
