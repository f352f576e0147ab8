//! `get_actionable_crises`: ranked, read-only listing for dashboards

use super::stages::parse_params;
use crate::pipeline::CrisisPipeline;
use agent_core::Result as AgentResult;
use agent_tools::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ActionableParams {
    #[serde(default)]
    limit: Option<usize>,
}

pub struct ActionableCrisesTool {
    pipeline: Arc<CrisisPipeline>,
}

impl ActionableCrisesTool {
    pub fn new(pipeline: Arc<CrisisPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Tool for ActionableCrisesTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: ActionableParams = parse_params(params)?;
        Ok(self.pipeline.reader().list_json(params.limit).await)
    }

    fn name(&self) -> &str {
        "get_actionable_crises"
    }

    fn description(&self) -> &str {
        "List actionable crises with their full NGO campaign data, most severe first."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Maximum number of crises to return"
                }
            },
            "additionalProperties": false
        })
    }
}
