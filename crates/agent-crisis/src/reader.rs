//! Read-only view of actionable crises, most severe first

use crate::error::Result;
use crate::model::{ActionableCrisis, decode_record};
use crate::source::CrisisSource;
use crate::topic::Stage;
use serde_json::{Value, json};
use std::sync::Arc;

/// An actionable crisis as listed by the reader
///
/// `record` is the stored JSON exactly as the source returned it; `crisis`
/// is its decoded view, used for ranking and display.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCrisis {
    pub crisis: ActionableCrisis,
    pub record: Value,
}

impl RankedCrisis {
    pub fn severity(&self) -> f64 {
        self.crisis.severity_or_zero()
    }
}

/// Query surface over the actionable stage
///
/// Returns full records (unknown fields included) ranked by `severity_score`
/// descending. The sort is stable, so equal scores keep the order the source
/// listed them in, and a missing score ranks as 0. Records are never changed:
/// decoding only validates them and extracts the sort key.
pub struct ActionableCrisisReader {
    source: Arc<dyn CrisisSource>,
}

impl ActionableCrisisReader {
    pub fn new(source: Arc<dyn CrisisSource>) -> Self {
        Self { source }
    }

    /// Ranked actionable crises, truncated to `limit` when given
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, limit: Option<usize>) -> Result<Vec<RankedCrisis>> {
        let values = self.source.fetch(Stage::Actionable).await?;

        let mut crises = Vec::with_capacity(values.len());
        for (index, record) in values.into_iter().enumerate() {
            match decode_record::<ActionableCrisis>(record.clone()) {
                Ok(crisis) => crises.push(RankedCrisis { crisis, record }),
                Err(e) => tracing::warn!("Ignoring actionable record #{}: {}", index, e),
            }
        }

        rank_by_severity(&mut crises);
        if let Some(limit) = limit {
            crises.truncate(limit);
        }

        tracing::info!("Returning {} actionable crises", crises.len());
        Ok(crises)
    }

    /// `{status, count, crises}` or `{status: "error", message}`
    pub async fn list_json(&self, limit: Option<usize>) -> Value {
        match self.list(limit).await {
            Ok(crises) => {
                let records: Vec<Value> = crises.into_iter().map(|c| c.record).collect();
                json!({
                    "status": "success",
                    "count": records.len(),
                    "crises": records,
                })
            }
            Err(e) => json!({
                "status": "error",
                "message": e.to_string(),
            }),
        }
    }
}

/// Stable sort, highest severity first
pub fn rank_by_severity(crises: &mut [RankedCrisis]) {
    crises.sort_by(|a, b| b.severity().total_cmp(&a.severity()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryCrisisSource;

    fn reader(records: Vec<Value>) -> ActionableCrisisReader {
        let source = InMemoryCrisisSource::new().with_records(Stage::Actionable, records);
        ActionableCrisisReader::new(Arc::new(source))
    }

    fn sample() -> Vec<Value> {
        vec![
            json!({"crisis_id": "A", "severity_score": 6.0}),
            json!({"crisis_id": "B", "severity_score": 9.5, "region": "South Asia"}),
            json!({"crisis_id": "C"}),
            json!({"crisis_id": "D", "severity_score": 6.0}),
            json!({"crisis_id": "E", "severity_score": 7.2}),
        ]
    }

    #[tokio::test]
    async fn test_sorted_by_severity_descending() {
        let crises = reader(sample()).list(None).await.unwrap();
        let scores: Vec<f64> = crises.iter().map(RankedCrisis::severity).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_ties_keep_arrival_order() {
        let crises = reader(sample()).list(None).await.unwrap();
        let ids: Vec<&str> = crises.iter().map(|c| c.crisis.crisis_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "E", "A", "D", "C"]);
    }

    #[tokio::test]
    async fn test_limit_returns_prefix() {
        let full = reader(sample()).list(None).await.unwrap();
        for n in [0, 1, 3, 5, 10] {
            let limited = reader(sample()).list(Some(n)).await.unwrap();
            assert_eq!(limited.len(), n.min(full.len()));
            assert_eq!(limited[..], full[..limited.len()]);
        }
    }

    #[test]
    fn test_list_blocking() {
        let crises = tokio_test::block_on(reader(sample()).list(Some(2))).unwrap();
        assert_eq!(crises[0].crisis.crisis_id, "B");
        assert_eq!(crises[1].crisis.severity_level(), crate::model::SeverityLevel::High);
    }

    #[tokio::test]
    async fn test_full_records_are_returned_unchanged() {
        let value = reader(sample()).list_json(Some(1)).await;
        assert_eq!(value["status"], "success");
        assert_eq!(value["count"], 1);
        assert_eq!(value["crises"][0]["crisis_id"], "B");
        assert_eq!(value["crises"][0]["region"], "South Asia");
        assert!((value["crises"][0]["severity_score"].as_f64().unwrap() - 9.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_records_come_back_byte_for_byte() {
        let stored = json!({
            "crisis_id": "EQ",
            "severity_score": 9,
            "status": null,
            "ngo_campaigns": [{"campaign_id": "ifrc", "ngo_name": "IFRC", "goal_usd": 5}]
        });
        let value = reader(vec![stored.clone()]).list_json(None).await;
        assert_eq!(value["crises"][0], stored);
    }

    #[tokio::test]
    async fn test_loose_campaigns_are_listed() {
        let crises = reader(vec![
            json!({"crisis_id": "N", "severity_score": 4.0, "ngo_campaigns": [{"campaign_id": 101}]}),
            json!({"crisis_id": "D", "severity_score": 6.0, "ngo_campaigns": [{"id": "a", "campaign_id": "wfp-1"}]}),
        ])
        .list(None)
        .await
        .unwrap();
        assert_eq!(crises.len(), 2);
        assert_eq!(crises[0].crisis.crisis_id, "D");
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let source = InMemoryCrisisSource::new();
        source.set_unavailable(Stage::Actionable);
        let reader = ActionableCrisisReader::new(Arc::new(source));

        assert!(reader.list(None).await.is_err());
        assert_eq!(reader.list_json(None).await["status"], "error");
    }
}
