//! Verifier/Scorer: republishes scored crises on `crisis/verified/<crisis_id>`
//!
//! Severity and confidence are computed upstream; this stage checks they are
//! present and republishes them.

use super::{StageProcessor, StageReport, run_stage};
use crate::event::PublishedEvent;
use crate::filter::StageFilter;
use crate::model::VerifiedCrisis;
use crate::sink::EventSink;
use crate::source::CrisisSource;
use crate::topic::Stage;
use async_trait::async_trait;
use std::sync::Arc;

pub struct Verifier {
    source: Arc<dyn CrisisSource>,
    sink: Arc<dyn EventSink>,
}

impl Verifier {
    pub fn new(source: Arc<dyn CrisisSource>, sink: Arc<dyn EventSink>) -> Self {
        Self { source, sink }
    }

    #[tracing::instrument(skip(self))]
    pub async fn verify_and_score(&self, crisis_id: Option<&str>) -> StageReport {
        let filter = crisis_id.map_or_else(StageFilter::all, StageFilter::by_crisis_id);
        self.process(&filter).await
    }
}

#[async_trait]
impl StageProcessor for Verifier {
    fn stage(&self) -> Stage {
        Stage::Verified
    }

    async fn process(&self, filter: &StageFilter) -> StageReport {
        run_stage::<VerifiedCrisis, _, _>(
            self.source.as_ref(),
            self.sink.as_ref(),
            filter,
            PublishedEvent::verification,
            |n| format!("Verified and scored {n} crises"),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPayload;
    use crate::sink::{FilteredSink, MemorySink};
    use crate::source::{FileCrisisSource, InMemoryCrisisSource};
    use crate::stages::StageStatus;
    use crate::topic::TopicPattern;
    use serde_json::json;

    fn verified_source() -> Arc<InMemoryCrisisSource> {
        Arc::new(InMemoryCrisisSource::new().with_records(
            Stage::Verified,
            vec![
                json!({
                    "crisis_id": "C1", "severity_score": 8.7, "confidence": 0.92,
                    "verified_sources": ["gdacs", "reuters"], "status": "verified"
                }),
                json!({"crisis_id": "C2", "severity_score": 4.1, "confidence": 0.6}),
                json!({"crisis_id": "C3", "confidence": 0.8}),
            ],
        ))
    }

    #[tokio::test]
    async fn test_verify_single_crisis() {
        let verifier = Verifier::new(verified_source(), Arc::new(MemorySink::new()));

        let report = verifier.verify_and_score(Some("C1")).await;
        assert_eq!(report.count, 1);
        assert_eq!(report.events[0].topic.to_string(), "crisis/verified/C1");
        match &report.events[0].payload {
            EventPayload::Verification(p) => {
                assert_eq!(p.verified_sources, vec!["gdacs", "reuters"]);
                assert!((p.confidence - 0.92).abs() < f64::EPSILON);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_skips_unscored_records() {
        let verifier = Verifier::new(verified_source(), Arc::new(MemorySink::new()));

        let report = verifier.verify_and_score(None).await;
        assert_eq!(report.count, 2);
        assert_eq!(report.skipped, 1);

        let report = verifier.verify_and_score(Some("C3")).await;
        assert!(report.is_success());
        assert_eq!(report.count, 0);
    }

    #[tokio::test]
    async fn test_verify_missing_store_is_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(MemorySink::new());
        let verifier = Verifier::new(Arc::new(FileCrisisSource::new(dir.path())), sink.clone());

        let report = verifier.verify_and_score(Some("C1")).await;
        assert_eq!(report.status, StageStatus::Error);
        assert!(report.message.contains("not found"));
        assert_eq!(report.to_json()["status"], "error");
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_sink_that_drops_everything_leaves_report_unchanged() {
        let recorded = Verifier::new(verified_source(), Arc::new(MemorySink::new()));
        let dropping = Verifier::new(
            verified_source(),
            Arc::new(FilteredSink::new(
                TopicPattern::parse("crisis/raw/*/*").unwrap(),
                Arc::new(MemorySink::new()),
            )),
        );

        assert_eq!(
            dropping.verify_and_score(None).await,
            recorded.verify_and_score(None).await
        );
    }
}
