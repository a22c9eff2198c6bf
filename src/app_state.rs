// Application state management

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::book::{BookSnapshot, MarketBook};
use crate::config::ServerConfig;

/// Handlers share the state without an outer lock: the book serializes per
/// market on its own.
pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub book: MarketBook,
    pub config: ServerConfig,
}

impl AppState {
    /// Empty book, nothing read from disk.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            book: MarketBook::new(&config.collateral_symbol),
            config,
        }
    }

    /// Restore the snapshot at `config.snapshot_path` if there is one.
    pub fn load(config: ServerConfig) -> Self {
        match Self::load_from_disk(&config.snapshot_path) {
            Ok(book) => {
                info!(path = %config.snapshot_path.display(), markets = book.list_markets().len(), "loaded snapshot");
                Self { book, config }
            }
            Err(e) => {
                info!("starting with an empty book ({})", e);
                Self::new(config)
            }
        }
    }

    pub fn save_to_disk(&self) -> Result<(), String> {
        let path = &self.config.snapshot_path;
        let json = serde_json::to_string_pretty(&self.book.snapshot())
            .map_err(|e| format!("Failed to serialize snapshot: {}", e))?;

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
        }
        fs::write(path, json).map_err(|e| format!("Failed to write snapshot file: {}", e))?;

        info!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    fn load_from_disk(path: &Path) -> Result<MarketBook, String> {
        let json = fs::read_to_string(path).map_err(|_| format!("no snapshot at {}", path.display()))?;
        let snapshot: BookSnapshot = serde_json::from_str(&json).map_err(|e| {
            warn!(path = %path.display(), error = %e, "unreadable snapshot");
            format!("Failed to deserialize snapshot: {}", e)
        })?;
        Ok(MarketBook::restore(snapshot))
    }
}
