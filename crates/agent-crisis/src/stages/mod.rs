//! Stage processors
//!
//! Each processor reads its stage from a [`CrisisSource`], decodes and filters
//! the records, projects every survivor into a [`PublishedEvent`] on the
//! stage's topic, hands the event to the [`EventSink`], and reports back.
//!
//! Processors hold no mutable state. Running one twice over the same snapshot
//! yields the same events, and any number may run concurrently.

pub mod detector;
pub mod matcher;
pub mod monitor;
pub mod verifier;

pub use detector::Detector;
pub use matcher::Matcher;
pub use monitor::UpdateMonitor;
pub use verifier::Verifier;

use crate::error::CrisisError;
use crate::event::PublishedEvent;
use crate::filter::StageFilter;
use crate::model::{CrisisRecord, decode_record};
use crate::sink::EventSink;
use crate::source::CrisisSource;
use crate::topic::Stage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Outcome of a stage call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Success,
    Error,
}

/// Structured result of one stage invocation
///
/// A missing backing store is `status: error`; a filter that matched nothing
/// is `status: success` with `count: 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    pub count: usize,
    pub events: Vec<PublishedEvent>,
    /// Records dropped as malformed
    pub skipped: usize,
    pub message: String,
}

impl StageReport {
    pub fn success(stage: Stage, events: Vec<PublishedEvent>, skipped: usize, message: String) -> Self {
        Self {
            stage,
            status: StageStatus::Success,
            count: events.len(),
            events,
            skipped,
            message,
        }
    }

    pub fn failure(stage: Stage, error: &CrisisError) -> Self {
        Self {
            stage,
            status: StageStatus::Error,
            count: 0,
            events: Vec::new(),
            skipped: 0,
            message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Success
    }

    /// Key under which the events are listed in the JSON form
    pub fn records_key(&self) -> &'static str {
        match self.stage {
            Stage::Updates => "updates",
            _ => "crises",
        }
    }

    /// `{status, count, crises|updates, skipped, message}` for tool callers
    pub fn to_json(&self) -> Value {
        match self.status {
            StageStatus::Success => {
                let mut out = json!({
                    "status": self.status,
                    "count": self.count,
                    "skipped": self.skipped,
                    "message": self.message,
                });
                out[self.records_key()] = serde_json::to_value(&self.events).unwrap_or_default();
                out
            }
            StageStatus::Error => json!({
                "status": self.status,
                "message": self.message,
            }),
        }
    }
}

/// A pipeline stage that can be invoked on its own
#[async_trait]
pub trait StageProcessor: Send + Sync {
    fn stage(&self) -> Stage;

    /// Run the stage over the current snapshot of its source
    async fn process(&self, filter: &StageFilter) -> StageReport;
}

/// Fetch and decode a stage, skipping malformed records
///
/// Returns the decoded records and the number skipped.
pub(crate) async fn load_records<R: CrisisRecord>(
    source: &dyn CrisisSource,
) -> Result<(Vec<R>, usize), CrisisError> {
    let values = source.fetch(R::STAGE).await?;
    let mut records = Vec::with_capacity(values.len());
    let mut skipped = 0;

    for (index, value) in values.into_iter().enumerate() {
        match decode_record::<R>(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                tracing::warn!("Skipping {} record #{}: {}", R::STAGE, index, e);
            }
        }
    }

    Ok((records, skipped))
}

/// Shared body of every stage: load, filter, project, publish, report
pub(crate) async fn run_stage<R, F, M>(
    source: &dyn CrisisSource,
    sink: &dyn EventSink,
    filter: &StageFilter,
    project: F,
    message: M,
) -> StageReport
where
    R: CrisisRecord,
    F: Fn(&R) -> PublishedEvent,
    M: FnOnce(usize) -> String,
{
    let stage = R::STAGE;
    tracing::debug!("Starting {} stage with {:?}", stage, filter);

    let (records, skipped) = match load_records::<R>(source).await {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::warn!("{} stage unavailable: {}", stage, e);
            return StageReport::failure(stage, &e);
        }
    };

    let events: Vec<PublishedEvent> = filter.apply(records).iter().map(project).collect();
    for event in &events {
        sink.publish(event);
    }

    tracing::info!("{} stage published {} events ({} skipped)", stage, events.len(), skipped);
    let message = message(events.len());
    StageReport::success(stage, events, skipped, message)
}
