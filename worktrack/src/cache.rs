//! Local offline cache.
//!
//! A degraded-mode fallback only: each key is a JSON file that is read once
//! and overwritten wholesale after every successful mutation or fetch. It is
//! never consulted while the service is reachable.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{Card, HistoryBucket, HistoryWindow};

/// Key holding the last-known card list.
pub const CARDS_KEY: &str = "cards";

/// Directory-backed key/value store of JSON documents.
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read the document under `key`, if there is one.
    ///
    /// A corrupt document is treated as absent rather than an error.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unreadable cache entry");
                Ok(None)
            }
        }
    }

    /// Replace the document under `key`.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        std::fs::rename(&tmp, &path)?;

        debug!(path = %path.display(), "cache written");
        Ok(())
    }

    pub fn load_cards(&self) -> Result<Option<Vec<Card>>> {
        self.read(CARDS_KEY)
    }

    pub fn store_cards(&self, cards: &[Card]) -> Result<()> {
        self.write(CARDS_KEY, &cards)
    }

    /// The last bucket fetched for `window`, if it was this exact window.
    pub fn load_history(&self, window: &HistoryWindow) -> Result<Option<HistoryBucket>> {
        let bucket: Option<HistoryBucket> = self.read(&history_key(window))?;
        Ok(bucket.filter(|b| b.window == *window))
    }

    pub fn store_history(&self, bucket: &HistoryBucket) -> Result<()> {
        self.write(&history_key(&bucket.window), bucket)
    }
}

fn history_key(window: &HistoryWindow) -> String {
    format!("history-{}", window.label())
}
