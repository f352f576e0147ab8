//! Stage operations exposed as agent tools
//!
//! | Tool | Stage |
//! |---|---|
//! | `detect_crises` | raw |
//! | `verify_and_score_crisis` | verified |
//! | `match_ngo_campaigns` | actionable |
//! | `monitor_crisis_updates` | updates |
//! | `get_actionable_crises` | actionable (read-only, ranked) |

pub mod actionable;
pub mod stages;

pub use actionable::ActionableCrisesTool;
pub use stages::{DetectCrisesTool, MatchNgoCampaignsTool, MonitorUpdatesTool, VerifyCrisisTool};

use crate::pipeline::CrisisPipeline;
use agent_tools::ToolRegistry;
use std::sync::Arc;

/// Register every crisis tool against a shared pipeline
pub fn register_crisis_tools(registry: &ToolRegistry, pipeline: Arc<CrisisPipeline>) {
    registry.register(Arc::new(DetectCrisesTool::new(pipeline.clone())));
    registry.register(Arc::new(VerifyCrisisTool::new(pipeline.clone())));
    registry.register(Arc::new(MatchNgoCampaignsTool::new(pipeline.clone())));
    registry.register(Arc::new(MonitorUpdatesTool::new(pipeline.clone())));
    registry.register(Arc::new(ActionableCrisesTool::new(pipeline)));
}

/// Registry pre-populated with the crisis tools
pub fn crisis_tool_registry(pipeline: Arc<CrisisPipeline>) -> ToolRegistry {
    let registry = ToolRegistry::new();
    register_crisis_tools(&registry, pipeline);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NoopSink;
    use crate::source::InMemoryCrisisSource;
    use crate::topic::Stage;
    use serde_json::json;

    #[tokio::test]
    async fn test_registry_exposes_all_operations() {
        let source = InMemoryCrisisSource::new()
            .with_records(Stage::Raw, vec![json!({"crisis_id": "C1", "source": "gdacs"})]);
        let pipeline = Arc::new(CrisisPipeline::new(Arc::new(source), Arc::new(NoopSink)));
        let registry = crisis_tool_registry(pipeline);

        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "detect_crises",
                "get_actionable_crises",
                "match_ngo_campaigns",
                "monitor_crisis_updates",
                "verify_and_score_crisis",
            ]
        );

        let out = registry.execute("detect_crises", json!({})).await.unwrap();
        assert_eq!(out["count"], 1);

        // Missing store is reported in the output, not as a tool failure
        let out = registry.execute("monitor_crisis_updates", json!({})).await.unwrap();
        assert_eq!(out["status"], "error");
    }
}
