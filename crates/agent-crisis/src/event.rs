//! Published events and their stage-specific payloads
//!
//! Payloads are thin projections of a record: subscribers of a topic get the
//! fields they need, never the whole record.

use crate::model::{
    ActionableCrisis, CrisisStatus, CrisisUpdate, FeedSource, Location, RawCrisis, StatusChange,
    VerifiedCrisis,
};
use crate::topic::{Stage, Topic};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload published on `crisis/raw/<source>/<crisis_id>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionPayload {
    pub crisis_id: String,
    pub source: FeedSource,
    #[serde(rename = "type")]
    pub crisis_type: Option<String>,
    pub location: Option<Location>,
    pub timestamp: Option<Value>,
}

impl From<&RawCrisis> for DetectionPayload {
    fn from(crisis: &RawCrisis) -> Self {
        Self {
            crisis_id: crisis.crisis_id.clone(),
            source: crisis.source.clone(),
            crisis_type: crisis.crisis_type.clone(),
            location: crisis.location.clone(),
            timestamp: crisis.timestamp.clone(),
        }
    }
}

/// Payload published on `crisis/verified/<crisis_id>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationPayload {
    pub crisis_id: String,
    pub severity_score: f64,
    pub confidence: f64,
    pub verified_sources: Vec<Value>,
    pub status: Option<CrisisStatus>,
}

impl From<&VerifiedCrisis> for VerificationPayload {
    fn from(crisis: &VerifiedCrisis) -> Self {
        Self {
            crisis_id: crisis.crisis_id.clone(),
            severity_score: crisis.severity_score,
            confidence: crisis.confidence,
            verified_sources: crisis.verified_sources.clone(),
            status: crisis.status.clone(),
        }
    }
}

/// Payload published on `crisis/actionable/<crisis_id>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPayload {
    pub crisis_id: String,
    pub severity_score: Option<f64>,
    pub ngo_campaigns_count: usize,
    pub status: Option<CrisisStatus>,
}

impl From<&ActionableCrisis> for MatchPayload {
    fn from(crisis: &ActionableCrisis) -> Self {
        Self {
            crisis_id: crisis.crisis_id.clone(),
            severity_score: crisis.severity_score,
            ngo_campaigns_count: crisis.ngo_campaigns_count(),
            status: crisis.status.clone(),
        }
    }
}

/// Payload published on `crisis/updates/<crisis_id>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePayload {
    pub crisis_id: String,
    pub update_sequence: u64,
    pub timestamp: Option<Value>,
    pub has_changes: bool,
    pub status_change: Option<StatusChange>,
}

impl From<&CrisisUpdate> for UpdatePayload {
    fn from(update: &CrisisUpdate) -> Self {
        Self {
            crisis_id: update.crisis_id.clone(),
            update_sequence: update.update_sequence,
            timestamp: update.timestamp.clone(),
            has_changes: update.has_changes(),
            status_change: update.status_change.clone(),
        }
    }
}

/// Stage-specific event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    Detection(DetectionPayload),
    Verification(VerificationPayload),
    Match(MatchPayload),
    Update(UpdatePayload),
}

impl EventPayload {
    pub fn crisis_id(&self) -> &str {
        match self {
            EventPayload::Detection(p) => &p.crisis_id,
            EventPayload::Verification(p) => &p.crisis_id,
            EventPayload::Match(p) => &p.crisis_id,
            EventPayload::Update(p) => &p.crisis_id,
        }
    }
}

/// Ephemeral, topic-addressed event emitted by a stage
///
/// Serializes flat, payload fields next to `topic`:
/// `{"topic": "crisis/verified/C1", "crisis_id": "C1", "severity_score": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedEvent {
    pub topic: Topic,
    #[serde(skip)]
    pub stage: Stage,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl PublishedEvent {
    pub fn detection(crisis: &RawCrisis) -> Self {
        Self {
            topic: Topic::raw(crisis.source.as_str(), &crisis.crisis_id),
            stage: Stage::Raw,
            payload: EventPayload::Detection(crisis.into()),
        }
    }

    pub fn verification(crisis: &VerifiedCrisis) -> Self {
        Self {
            topic: Topic::verified(&crisis.crisis_id),
            stage: Stage::Verified,
            payload: EventPayload::Verification(crisis.into()),
        }
    }

    pub fn matched(crisis: &ActionableCrisis) -> Self {
        Self {
            topic: Topic::actionable(&crisis.crisis_id),
            stage: Stage::Actionable,
            payload: EventPayload::Match(crisis.into()),
        }
    }

    pub fn update(update: &CrisisUpdate) -> Self {
        Self {
            topic: Topic::updates(&update.crisis_id),
            stage: Stage::Updates,
            payload: EventPayload::Update(update.into()),
        }
    }

    pub fn crisis_id(&self) -> &str {
        self.payload.crisis_id()
    }

    /// Payload as a JSON value, for transports that want one
    pub fn payload_json(&self) -> Value {
        serde_json::to_value(&self.payload).unwrap_or(Value::Null)
    }
}
