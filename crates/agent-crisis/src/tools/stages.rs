//! Tools wrapping the four stage processors

use crate::error::CrisisError;
use crate::pipeline::CrisisPipeline;
use agent_core::Result as AgentResult;
use agent_tools::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DetectParams {
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CrisisIdParams {
    #[serde(default)]
    crisis_id: Option<String>,
}

/// Decode tool parameters; `null` counts as "no parameters"
pub(crate) fn parse_params<P: DeserializeOwned + Default>(params: Value) -> AgentResult<P> {
    if params.is_null() {
        return Ok(P::default());
    }
    serde_json::from_value(params)
        .map_err(|e| CrisisError::InvalidParameters(e.to_string()).into())
}

/// Treat empty strings as absent, as agents often send `""` for "any"
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn crisis_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "crisis_id": {
                "type": "string",
                "description": "Restrict to a single crisis id; omit for all"
            }
        },
        "additionalProperties": false
    })
}

/// `detect_crises`: publish raw detections
pub struct DetectCrisesTool {
    pipeline: Arc<CrisisPipeline>,
}

impl DetectCrisesTool {
    pub fn new(pipeline: Arc<CrisisPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Tool for DetectCrisesTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: DetectParams = parse_params(params)?;
        let report = self
            .pipeline
            .detector()
            .detect(non_empty(params.source.as_deref()))
            .await;
        Ok(report.to_json())
    }

    fn name(&self) -> &str {
        "detect_crises"
    }

    fn description(&self) -> &str {
        "Load raw crisis detections from the monitored feeds (GDACS, USGS, NOAA, news, social) \
         and publish each on crisis/raw/<source>/<crisis_id>."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "source": {
                    "type": "string",
                    "description": "Only detections from this feed, e.g. \"usgs\""
                }
            },
            "additionalProperties": false
        })
    }
}

/// `verify_and_score_crisis`: republish verified, scored crises
pub struct VerifyCrisisTool {
    pipeline: Arc<CrisisPipeline>,
}

impl VerifyCrisisTool {
    pub fn new(pipeline: Arc<CrisisPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Tool for VerifyCrisisTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: CrisisIdParams = parse_params(params)?;
        let report = self
            .pipeline
            .verifier()
            .verify_and_score(non_empty(params.crisis_id.as_deref()))
            .await;
        Ok(report.to_json())
    }

    fn name(&self) -> &str {
        "verify_and_score_crisis"
    }

    fn description(&self) -> &str {
        "Return verified crises with severity score, confidence and corroborating sources, \
         published on crisis/verified/<crisis_id>."
    }

    fn input_schema(&self) -> Value {
        crisis_id_schema()
    }
}

/// `match_ngo_campaigns`: publish crises matched to NGO campaigns
pub struct MatchNgoCampaignsTool {
    pipeline: Arc<CrisisPipeline>,
}

impl MatchNgoCampaignsTool {
    pub fn new(pipeline: Arc<CrisisPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Tool for MatchNgoCampaignsTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: CrisisIdParams = parse_params(params)?;
        let report = self
            .pipeline
            .matcher()
            .match_campaigns(non_empty(params.crisis_id.as_deref()))
            .await;
        Ok(report.to_json())
    }

    fn name(&self) -> &str {
        "match_ngo_campaigns"
    }

    fn description(&self) -> &str {
        "Return crises matched to NGO donation campaigns with their campaign count, \
         published on crisis/actionable/<crisis_id>."
    }

    fn input_schema(&self) -> Value {
        crisis_id_schema()
    }
}

/// `monitor_crisis_updates`: publish follow-up updates
pub struct MonitorUpdatesTool {
    pipeline: Arc<CrisisPipeline>,
}

impl MonitorUpdatesTool {
    pub fn new(pipeline: Arc<CrisisPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Tool for MonitorUpdatesTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: CrisisIdParams = parse_params(params)?;
        let report = self
            .pipeline
            .monitor()
            .monitor(non_empty(params.crisis_id.as_deref()))
            .await;
        Ok(report.to_json())
    }

    fn name(&self) -> &str {
        "monitor_crisis_updates"
    }

    fn description(&self) -> &str {
        "Return updates on ongoing crises in arrival order, one event per update, \
         published on crisis/updates/<crisis_id>."
    }

    fn input_schema(&self) -> Value {
        crisis_id_schema()
    }
}
