//! Matcher: publishes NGO-matched crises on `crisis/actionable/<crisis_id>`

use super::{StageProcessor, StageReport, run_stage};
use crate::event::PublishedEvent;
use crate::filter::StageFilter;
use crate::model::ActionableCrisis;
use crate::sink::EventSink;
use crate::source::CrisisSource;
use crate::topic::Stage;
use async_trait::async_trait;
use std::sync::Arc;

/// Actionable-stage processor
///
/// `ngo_campaigns_count` in the payload is always the length of the record's
/// campaign list; a count stored in the record is never read.
pub struct Matcher {
    source: Arc<dyn CrisisSource>,
    sink: Arc<dyn EventSink>,
}

impl Matcher {
    pub fn new(source: Arc<dyn CrisisSource>, sink: Arc<dyn EventSink>) -> Self {
        Self { source, sink }
    }

    #[tracing::instrument(skip(self))]
    pub async fn match_campaigns(&self, crisis_id: Option<&str>) -> StageReport {
        let filter = crisis_id.map_or_else(StageFilter::all, StageFilter::by_crisis_id);
        self.process(&filter).await
    }
}

#[async_trait]
impl StageProcessor for Matcher {
    fn stage(&self) -> Stage {
        Stage::Actionable
    }

    async fn process(&self, filter: &StageFilter) -> StageReport {
        run_stage::<ActionableCrisis, _, _>(
            self.source.as_ref(),
            self.sink.as_ref(),
            filter,
            PublishedEvent::matched,
            |n| format!("Matched {n} crises with NGO campaigns"),
        )
        .await
    }
}
