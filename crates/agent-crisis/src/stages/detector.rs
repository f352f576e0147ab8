//! Detector: publishes raw detections on `crisis/raw/<source>/<crisis_id>`

use super::{StageProcessor, StageReport, run_stage};
use crate::event::PublishedEvent;
use crate::filter::StageFilter;
use crate::model::RawCrisis;
use crate::sink::EventSink;
use crate::source::CrisisSource;
use crate::topic::Stage;
use async_trait::async_trait;
use std::sync::Arc;

/// Raw-stage processor covering the monitored feeds (GDACS, USGS, NOAA, news, social)
pub struct Detector {
    source: Arc<dyn CrisisSource>,
    sink: Arc<dyn EventSink>,
}

impl Detector {
    pub fn new(source: Arc<dyn CrisisSource>, sink: Arc<dyn EventSink>) -> Self {
        Self { source, sink }
    }

    /// Publish every raw detection, optionally only those from one feed
    #[tracing::instrument(skip(self))]
    pub async fn detect(&self, source: Option<&str>) -> StageReport {
        let filter = match source {
            Some(source) => StageFilter::by_source(source),
            None => StageFilter::all(),
        };
        self.process(&filter).await
    }
}

#[async_trait]
impl StageProcessor for Detector {
    fn stage(&self) -> Stage {
        Stage::Raw
    }

    async fn process(&self, filter: &StageFilter) -> StageReport {
        run_stage::<RawCrisis, _, _>(
            self.source.as_ref(),
            self.sink.as_ref(),
            filter,
            PublishedEvent::detection,
            |n| format!("Published {n} raw crisis detections to crisis/raw topics"),
        )
        .await
    }
}
