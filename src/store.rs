//! Persisted high-score scalar.
//!
//! The engine never touches storage directly; it is handed a
//! [`HighScoreStore`] capability at construction, reads it once, and writes
//! it at most once per session end. Store failures are downgraded by the
//! controller: a failed read means "no high score recorded yet", a failed
//! write is logged and dropped.

use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub trait HighScoreStore: Send + Sync {
    fn load(&self) -> Result<u64, EngineError>;
    fn save(&self, value: u64) -> Result<(), EngineError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct HighScoreFile {
    high_score: u64,
}

/// File-backed store: a single pretty-printed JSON object next to the rest
/// of the host's app data.
pub struct JsonHighScoreStore {
    path: PathBuf,
}

impl JsonHighScoreStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl HighScoreStore for JsonHighScoreStore {
    fn load(&self) -> Result<u64, EngineError> {
        if !self.path.exists() {
            return Ok(0);
        }
        let contents = fs::read_to_string(&self.path)
            .map_err(|err| EngineError::Store(format!("read {}: {err}", self.path.display())))?;
        // A corrupt file is treated the same as a missing one.
        let data: HighScoreFile = serde_json::from_str(&contents).unwrap_or_default();
        Ok(data.high_score)
    }

    fn save(&self, value: u64) -> Result<(), EngineError> {
        let data = HighScoreFile { high_score: value };
        let serialized = serde_json::to_string_pretty(&data)
            .map_err(|err| EngineError::Store(err.to_string()))?;
        fs::write(&self.path, serialized)
            .map_err(|err| EngineError::Store(format!("write {}: {err}", self.path.display())))
    }
}

/// In-memory store for tests and hosts without a filesystem.
#[derive(Default)]
pub struct MemoryHighScoreStore {
    value: RwLock<u64>,
}

impl MemoryHighScoreStore {
    pub fn new(initial: u64) -> Self {
        Self {
            value: RwLock::new(initial),
        }
    }
}

impl HighScoreStore for MemoryHighScoreStore {
    fn load(&self) -> Result<u64, EngineError> {
        Ok(*self.value.read().unwrap())
    }

    fn save(&self, value: u64) -> Result<(), EngineError> {
        *self.value.write().unwrap() = value;
        Ok(())
    }
}
