// src/history.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Last observed price, the only state kept across runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistory {
    pub last_price: Option<f64>,
    pub last_update: Option<DateTime<Utc>>,
}

impl PriceHistory {
    pub fn record(&mut self, price: f64, at: DateTime<Utc>) {
        self.last_price = Some(price);
        self.last_update = Some(at);
    }

    /// Drop a `last_price` that is not a finite, non-negative number.
    fn sanitized(mut self) -> Self {
        if self.last_price.is_some_and(|p| !p.is_finite() || p < 0.0) {
            warn!("ignoring invalid stored price {:?}", self.last_price);
            self.last_price = None;
        }
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum HistoryError {
    #[error("io on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}

/// JSON file holding a [`PriceHistory`], rewritten whole on every save.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Missing or unreadable files start an empty history.
    pub fn load(&self) -> PriceHistory {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return PriceHistory::default(),
            Err(e) => {
                warn!("failed to read {}: {e}", self.path.display());
                return PriceHistory::default();
            }
        };
        match serde_json::from_str::<PriceHistory>(&raw) {
            Ok(h) => h.sanitized(),
            Err(e) => {
                warn!("failed to parse {}: {e}", self.path.display());
                PriceHistory::default()
            }
        }
    }

    /// Write to a sibling temp file, then rename over the target.
    pub fn save(&self, history: &PriceHistory) -> Result<(), HistoryError> {
        let body = serde_json::to_string_pretty(history)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let io_err = |source| HistoryError::Io { path: self.path.clone(), source };
        std::fs::write(&tmp, body).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}
