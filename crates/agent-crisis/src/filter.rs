//! Stage filter: select the records relevant to a request

use crate::model::CrisisRecord;
use serde::{Deserialize, Serialize};

/// Request-level selection over stage records
///
/// All predicates are optional and combine with AND. `source` only applies to
/// stages whose records carry a feed source (the raw stage); other stages
/// ignore it. `limit` keeps the first N survivors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crisis_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl StageFilter {
    /// Filter that keeps everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_crisis_id(crisis_id: impl Into<String>) -> Self {
        Self::default().crisis_id(crisis_id)
    }

    pub fn by_source(source: impl Into<String>) -> Self {
        Self::default().source(source)
    }

    pub fn crisis_id(mut self, crisis_id: impl Into<String>) -> Self {
        self.crisis_id = Some(crisis_id.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a single record passes the predicates (limit aside)
    pub fn matches<R: CrisisRecord>(&self, record: &R) -> bool {
        if let Some(id) = &self.crisis_id {
            if record.crisis_id() != id.as_str() {
                return false;
            }
        }
        if let (Some(wanted), Some(actual)) = (&self.source, record.source()) {
            if actual != wanted.as_str() {
                return false;
            }
        }
        true
    }

    /// Apply the filter, preserving input order
    pub fn apply<R: CrisisRecord>(&self, records: Vec<R>) -> Vec<R> {
        let matching = records.into_iter().filter(|r| self.matches(r));
        match self.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }
}
