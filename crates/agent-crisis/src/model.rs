//! Crisis records as they appear at each pipeline stage
//!
//! Records are read from a [`CrisisSource`](crate::source::CrisisSource) as
//! loose JSON and decoded here. Only the fields a stage needs are required;
//! everything else is carried through untouched in `extra`.

use crate::error::{CrisisError, Result};
use crate::topic::Stage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Monitored feed a raw detection came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Gdacs,
    Usgs,
    Noaa,
    News,
    Twitter,
    #[serde(untagged)]
    Other(String),
}

impl FeedSource {
    pub fn as_str(&self) -> &str {
        match self {
            FeedSource::Gdacs => "gdacs",
            FeedSource::Usgs => "usgs",
            FeedSource::Noaa => "noaa",
            FeedSource::News => "news",
            FeedSource::Twitter => "twitter",
            FeedSource::Other(name) => name,
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a crisis
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrisisStatus {
    Detected,
    Verified,
    Actionable,
    Active,
    Monitoring,
    Escalating,
    Resolved,
    #[serde(untagged)]
    Other(String),
}

/// Where a crisis is happening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    /// Coordinates with optional descriptive fields
    Point {
        lat: f64,
        lon: f64,
        #[serde(flatten)]
        details: Map<String, Value>,
    },
    /// Free-form place description
    Descriptor(String),
    /// Any other shape, kept verbatim
    Unstructured(Value),
}

/// A status transition reported by an update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusChange {
    Transition { from: CrisisStatus, to: CrisisStatus },
    To(CrisisStatus),
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Display band for a severity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 9.0 {
            Self::Critical
        } else if score >= 7.0 {
            Self::High
        } else if score >= 5.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

/// Common view over stage records used by filtering
pub trait CrisisRecord: DeserializeOwned {
    /// Stage the record belongs to
    const STAGE: Stage;

    fn crisis_id(&self) -> &str;

    /// Feed the record came from, when the stage carries one
    fn source(&self) -> Option<&str> {
        None
    }
}

/// Raw-stage detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCrisis {
    pub crisis_id: String,
    pub source: FeedSource,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub crisis_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Feed-specific: ISO-8601 text or epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CrisisRecord for RawCrisis {
    const STAGE: Stage = Stage::Raw;

    fn crisis_id(&self) -> &str {
        &self.crisis_id
    }

    fn source(&self) -> Option<&str> {
        Some(self.source.as_str())
    }
}

/// Verified and scored crisis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedCrisis {
    pub crisis_id: String,
    pub severity_score: f64,
    pub confidence: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub verified_sources: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CrisisStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CrisisRecord for VerifiedCrisis {
    const STAGE: Stage = Stage::Verified;

    fn crisis_id(&self) -> &str {
        &self.crisis_id
    }
}

/// Crisis matched to NGO campaigns
///
/// Any stored `ngo_campaigns_count` lands in `extra` and is ignored; use
/// [`ActionableCrisis::ngo_campaigns_count`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionableCrisis {
    pub crisis_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_score: Option<f64>,
    /// Campaign objects as the matcher stored them; only their number is used
    #[serde(default, deserialize_with = "null_as_default")]
    pub ngo_campaigns: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CrisisStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActionableCrisis {
    pub fn ngo_campaigns_count(&self) -> usize {
        self.ngo_campaigns.len()
    }

    /// Severity used for ranking; a missing score ranks as 0
    pub fn severity_or_zero(&self) -> f64 {
        self.severity_score.unwrap_or(0.0)
    }

    pub fn severity_level(&self) -> SeverityLevel {
        SeverityLevel::from_score(self.severity_or_zero())
    }
}

impl CrisisRecord for ActionableCrisis {
    const STAGE: Stage = Stage::Actionable;

    fn crisis_id(&self) -> &str {
        &self.crisis_id
    }
}

/// Append-only update entry for a crisis, keyed by `(crisis_id, update_sequence)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisUpdate {
    pub crisis_id: String,
    pub update_sequence: u64,
    /// Feed-specific: ISO-8601 text or epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub changes: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_change: Option<StatusChange>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CrisisUpdate {
    /// True iff `changes` carries at least one delta
    pub fn has_changes(&self) -> bool {
        match &self.changes {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(fields) => !fields.is_empty(),
        }
    }
}

impl CrisisRecord for CrisisUpdate {
    const STAGE: Stage = Stage::Updates;

    fn crisis_id(&self) -> &str {
        &self.crisis_id
    }
}

/// Decode one stage record, rejecting ids that would break topic addressing
pub fn decode_record<R: CrisisRecord>(value: Value) -> Result<R> {
    let record: R =
        serde_json::from_value(value).map_err(|e| CrisisError::malformed(R::STAGE, e.to_string()))?;

    let id = record.crisis_id();
    if id.is_empty() {
        return Err(CrisisError::malformed(R::STAGE, "empty crisis_id"));
    }
    if id.contains('/') {
        return Err(CrisisError::malformed(
            R::STAGE,
            format!("crisis_id contains '/': {id}"),
        ));
    }
    if let Some(source) = record.source() {
        if source.is_empty() || source.contains('/') {
            return Err(CrisisError::malformed(
                R::STAGE,
                format!("invalid source for {id}: {source:?}"),
            ));
        }
    }

    Ok(record)
}
