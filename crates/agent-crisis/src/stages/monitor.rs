//! Update monitor: publishes crisis updates on `crisis/updates/<crisis_id>`
//!
//! Every update gets its own event, in the order the source lists them. The
//! monitor does not re-sort by `update_sequence`.

use super::{StageProcessor, StageReport, run_stage};
use crate::event::PublishedEvent;
use crate::filter::StageFilter;
use crate::model::CrisisUpdate;
use crate::sink::EventSink;
use crate::source::CrisisSource;
use crate::topic::Stage;
use async_trait::async_trait;
use std::sync::Arc;

pub struct UpdateMonitor {
    source: Arc<dyn CrisisSource>,
    sink: Arc<dyn EventSink>,
}

impl UpdateMonitor {
    pub fn new(source: Arc<dyn CrisisSource>, sink: Arc<dyn EventSink>) -> Self {
        Self { source, sink }
    }

    #[tracing::instrument(skip(self))]
    pub async fn monitor(&self, crisis_id: Option<&str>) -> StageReport {
        let filter = crisis_id.map_or_else(StageFilter::all, StageFilter::by_crisis_id);
        self.process(&filter).await
    }
}

#[async_trait]
impl StageProcessor for UpdateMonitor {
    fn stage(&self) -> Stage {
        Stage::Updates
    }

    async fn process(&self, filter: &StageFilter) -> StageReport {
        run_stage::<CrisisUpdate, _, _>(
            self.source.as_ref(),
            self.sink.as_ref(),
            filter,
            PublishedEvent::update,
            |n| format!("Monitored {n} crisis updates"),
        )
        .await
    }
}
