//! Pipeline orchestrator
//!
//! Composes the four stage processors in their fixed order
//! (raw → verified → actionable → updates). Every stage can still be invoked
//! on its own through the accessors; the orchestrator adds whole-pipeline
//! runs, per-crisis queries, and a lineage check across stages.

use crate::config::CrisisConfig;
use crate::error::Result;
use crate::filter::StageFilter;
use crate::model::{ActionableCrisis, CrisisUpdate, RawCrisis, VerifiedCrisis};
use crate::reader::ActionableCrisisReader;
use crate::sink::{BroadcastSink, EventSink, FanoutSink, HttpEventSink, NoopSink, Subscription};
use crate::source::{CrisisSource, FileCrisisSource};
use crate::stages::{
    Detector, Matcher, StageProcessor, StageReport, UpdateMonitor, Verifier, load_records,
};
use crate::topic::{Stage, TopicPattern};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

/// Default capacity of the in-process event bus
const DEFAULT_BUS_CAPACITY: usize = 1024;

/// The four stage processors plus the actionable reader, wired to one source
pub struct CrisisPipeline {
    source: Arc<dyn CrisisSource>,
    sink: Arc<dyn EventSink>,
    bus: BroadcastSink,
    detector: Detector,
    verifier: Verifier,
    matcher: Matcher,
    monitor: UpdateMonitor,
    reader: ActionableCrisisReader,
}

impl CrisisPipeline {
    /// Wire a pipeline; events go to `sink` and to the in-process bus
    pub fn new(source: Arc<dyn CrisisSource>, sink: Arc<dyn EventSink>) -> Self {
        Self::with_bus_capacity(source, sink, DEFAULT_BUS_CAPACITY)
    }

    pub fn with_bus_capacity(
        source: Arc<dyn CrisisSource>,
        sink: Arc<dyn EventSink>,
        capacity: usize,
    ) -> Self {
        let bus = BroadcastSink::new(capacity);
        let sink: Arc<dyn EventSink> = Arc::new(FanoutSink::new().with(Arc::new(bus.clone())).with(sink));

        Self {
            detector: Detector::new(source.clone(), sink.clone()),
            verifier: Verifier::new(source.clone(), sink.clone()),
            matcher: Matcher::new(source.clone(), sink.clone()),
            monitor: UpdateMonitor::new(source.clone(), sink.clone()),
            reader: ActionableCrisisReader::new(source.clone()),
            source,
            sink,
            bus,
        }
    }

    /// File-backed pipeline, with the HTTP sink when the config enables it
    pub fn from_config(config: &CrisisConfig) -> Result<Self> {
        config.validate()?;

        let source: Arc<dyn CrisisSource> = Arc::new(FileCrisisSource::new(&config.data_dir));
        let sink: Arc<dyn EventSink> = if config.sink_enabled {
            let http = HttpEventSink::new(&config.sink_api_base, config.sink_timeout)?;
            tracing::info!("Forwarding events to {}", http.endpoint());
            Arc::new(http)
        } else {
            Arc::new(NoopSink)
        };

        tracing::info!("Crisis pipeline reading {}", source.describe());
        Ok(Self::with_bus_capacity(source, sink, config.broadcast_capacity))
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn monitor(&self) -> &UpdateMonitor {
        &self.monitor
    }

    pub fn reader(&self) -> &ActionableCrisisReader {
        &self.reader
    }

    /// Processor for a stage
    pub fn processor(&self, stage: Stage) -> &dyn StageProcessor {
        match stage {
            Stage::Raw => &self.detector,
            Stage::Verified => &self.verifier,
            Stage::Actionable => &self.matcher,
            Stage::Updates => &self.monitor,
        }
    }

    /// Listen to events published by any stage of this pipeline
    pub fn subscribe(&self, pattern: TopicPattern) -> Subscription {
        self.bus.subscribe(pattern)
    }

    /// Wait a bounded time for sinks that deliver in the background
    pub async fn flush(&self) {
        self.sink.flush().await;
    }

    /// Run every stage in pipeline order with the same filter
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, filter: &StageFilter) -> PipelineReport {
        let mut stages = Vec::with_capacity(Stage::ALL.len());
        for stage in Stage::ALL {
            stages.push(self.processor(stage).process(filter).await);
        }

        let report = PipelineReport { stages };
        tracing::info!(
            "Pipeline run published {} events, {} stage(s) failed",
            report.total_events(),
            report.failed_stages().len()
        );
        report
    }

    /// Re-process one crisis through every stage concurrently
    ///
    /// Safe to repeat; nothing downstream is mutated.
    #[tracing::instrument(skip(self))]
    pub async fn query(&self, crisis_id: &str) -> PipelineReport {
        let filter = StageFilter::by_crisis_id(crisis_id);
        let (raw, verified, actionable, updates) = futures::join!(
            self.detector.process(&filter),
            self.verifier.process(&filter),
            self.matcher.process(&filter),
            self.monitor.process(&filter),
        );

        PipelineReport {
            stages: vec![raw, verified, actionable, updates],
        }
    }

    /// Check that later-stage records refine, and never contradict, raw detections
    #[tracing::instrument(skip(self))]
    pub async fn check_lineage(&self) -> Result<LineageReport> {
        let (raw, _) = load_records::<RawCrisis>(self.source.as_ref()).await?;
        let origins: HashMap<&str, &RawCrisis> =
            raw.iter().map(|r| (r.crisis_id.as_str(), r)).collect();

        let mut report = LineageReport::default();

        // Later stages may be legitimately absent; only the raw stage is required.
        match load_records::<VerifiedCrisis>(self.source.as_ref()).await {
            Ok((records, _)) => {
                for r in &records {
                    report.inspect(Stage::Verified, &r.crisis_id, &r.extra, &origins);
                }
            }
            Err(e) => report.unavailable.push((Stage::Verified, e.to_string())),
        }
        match load_records::<ActionableCrisis>(self.source.as_ref()).await {
            Ok((records, _)) => {
                for r in &records {
                    report.inspect(Stage::Actionable, &r.crisis_id, &r.extra, &origins);
                }
            }
            Err(e) => report.unavailable.push((Stage::Actionable, e.to_string())),
        }
        match load_records::<CrisisUpdate>(self.source.as_ref()).await {
            Ok((records, _)) => {
                for r in &records {
                    report.inspect(Stage::Updates, &r.crisis_id, &r.extra, &origins);
                }
            }
            Err(e) => report.unavailable.push((Stage::Updates, e.to_string())),
        }

        for conflict in &report.conflicts {
            tracing::warn!(
                "{} record {} contradicts raw {}: expected {}, found {}",
                conflict.stage,
                conflict.crisis_id,
                conflict.field,
                conflict.expected,
                conflict.found
            );
        }

        Ok(report)
    }
}

/// Reports of one pipeline run, in stage order
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    pub fn total_events(&self) -> usize {
        self.stages.iter().map(|r| r.count).sum()
    }

    pub fn failed_stages(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.stage)
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.stages.iter().all(StageReport::is_success)
    }

    pub fn to_json(&self) -> Value {
        let mut stages = Map::new();
        for report in &self.stages {
            stages.insert(report.stage.to_string(), report.to_json());
        }
        json!({
            "status": if self.all_succeeded() { "success" } else { "partial" },
            "total_events": self.total_events(),
            "stages": stages,
        })
    }
}

/// A later-stage record contradicting an immutable raw field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineageConflict {
    pub crisis_id: String,
    pub stage: Stage,
    pub field: &'static str,
    pub expected: String,
    pub found: String,
}

/// Outcome of [`CrisisPipeline::check_lineage`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct LineageReport {
    /// Later-stage records whose crisis was never detected
    pub orphans: Vec<(Stage, String)>,
    pub conflicts: Vec<LineageConflict>,
    /// Later stages that could not be read
    pub unavailable: Vec<(Stage, String)>,
}

impl LineageReport {
    pub fn is_consistent(&self) -> bool {
        self.orphans.is_empty() && self.conflicts.is_empty()
    }

    fn inspect(
        &mut self,
        stage: Stage,
        crisis_id: &str,
        extra: &Map<String, Value>,
        origins: &HashMap<&str, &RawCrisis>,
    ) {
        let Some(origin) = origins.get(crisis_id) else {
            if !self.orphans.iter().any(|(s, id)| *s == stage && id == crisis_id) {
                self.orphans.push((stage, crisis_id.to_string()));
            }
            return;
        };

        let immutable = [
            ("source", Some(origin.source.as_str())),
            ("type", origin.crisis_type.as_deref()),
        ];
        for (field, expected) in immutable {
            let (Some(expected), Some(found)) = (expected, extra.get(field).and_then(Value::as_str))
            else {
                continue;
            };
            if expected != found {
                self.conflicts.push(LineageConflict {
                    crisis_id: crisis_id.to_string(),
                    stage,
                    field,
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }
    }
}
