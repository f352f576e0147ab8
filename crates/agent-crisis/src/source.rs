//! Crisis sources: read-only providers of stage-scoped records
//!
//! A source hands back loose JSON records for a stage. A backing store that
//! cannot be read is [`CrisisError::SourceUnavailable`]; an empty one is an
//! empty `Vec`. Decoding into typed records happens in the stage processors
//! so one bad record never poisons a whole batch.

use crate::error::{CrisisError, Result};
use crate::topic::Stage;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Read-only provider of crisis records per stage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CrisisSource: Send + Sync {
    /// Fetch every record currently held for `stage`, in store order
    async fn fetch(&self, stage: Stage) -> Result<Vec<Value>>;

    /// Short description used in logs
    fn describe(&self) -> String {
        "crisis source".to_string()
    }
}

/// Fixture file name for a stage
pub fn fixture_file(stage: Stage) -> &'static str {
    match stage {
        Stage::Raw => "mock_raw_crises.json",
        Stage::Verified => "mock_verified_crises.json",
        Stage::Actionable => "mock_actionable_crises.json",
        Stage::Updates => "mock_crisis_updates.json",
    }
}

/// Top-level key holding the record list in a fixture file
pub fn fixture_key(stage: Stage) -> &'static str {
    match stage {
        Stage::Updates => "updates",
        _ => "crises",
    }
}

/// Source backed by one JSON fixture file per stage
///
/// Files look like `{"crises": [...]}` (or `{"updates": [...]}` for the
/// updates stage). Every fetch re-reads the file, so each call sees a fresh
/// snapshot.
#[derive(Debug, Clone)]
pub struct FileCrisisSource {
    data_dir: PathBuf,
}

impl FileCrisisSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the fixture backing `stage`
    pub fn path_for(&self, stage: Stage) -> PathBuf {
        self.data_dir.join(fixture_file(stage))
    }

    fn parse_document(stage: Stage, contents: &str) -> Result<Vec<Value>> {
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let document: Value = serde_json::from_str(contents)
            .map_err(|e| CrisisError::unavailable(stage, format!("invalid JSON: {e}")))?;

        let key = fixture_key(stage);
        match document {
            Value::Object(mut fields) => match fields.remove(key) {
                None | Some(Value::Null) => Ok(Vec::new()),
                Some(Value::Array(records)) => Ok(records),
                Some(other) => Err(CrisisError::unavailable(
                    stage,
                    format!("expected `{key}` to be an array, found {}", json_kind(&other)),
                )),
            },
            other => Err(CrisisError::unavailable(
                stage,
                format!("expected a JSON object, found {}", json_kind(&other)),
            )),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl CrisisSource for FileCrisisSource {
    async fn fetch(&self, stage: Stage) -> Result<Vec<Value>> {
        let path = self.path_for(stage);
        tracing::debug!("Loading {} crises from {}", stage, path.display());

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("File not found: {}", path.display());
                return Err(CrisisError::unavailable(
                    stage,
                    format!("file not found: {}", path.display()),
                ));
            }
            Err(e) => {
                tracing::error!("Failed to read {}: {}", path.display(), e);
                return Err(CrisisError::unavailable(
                    stage,
                    format!("failed to read {}: {e}", path.display()),
                ));
            }
        };

        let records = Self::parse_document(stage, &contents)?;
        tracing::info!("Loaded {} {} records", records.len(), stage);
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("fixture files in {}", self.data_dir.display())
    }
}

/// Source holding fixtures in memory
///
/// Stages that were never populated, or were explicitly marked unavailable,
/// fail with `SourceUnavailable`.
#[derive(Debug, Default)]
pub struct InMemoryCrisisSource {
    stages: RwLock<HashMap<Stage, Option<Vec<Value>>>>,
}

impl InMemoryCrisisSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`set_records`](Self::set_records)
    pub fn with_records(self, stage: Stage, records: Vec<Value>) -> Self {
        self.set_records(stage, records);
        self
    }

    /// Replace the snapshot held for a stage
    pub fn set_records(&self, stage: Stage, records: Vec<Value>) {
        self.write().insert(stage, Some(records));
    }

    /// Make subsequent fetches for a stage fail
    pub fn set_unavailable(&self, stage: Stage) {
        self.write().insert(stage, None);
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Stage, Option<Vec<Value>>>> {
        self.stages.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CrisisSource for InMemoryCrisisSource {
    async fn fetch(&self, stage: Stage) -> Result<Vec<Value>> {
        let stages = self.stages.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        match stages.get(&stage) {
            Some(Some(records)) => Ok(records.clone()),
            Some(None) => Err(CrisisError::unavailable(stage, "marked unavailable")),
            None => Err(CrisisError::unavailable(stage, "no fixture loaded")),
        }
    }

    fn describe(&self) -> String {
        "in-memory fixtures".to_string()
    }
}
