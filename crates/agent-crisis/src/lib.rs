//! Crisis event pipeline
//!
//! A staged publish/subscribe pipeline for crisis response agents:
//!
//! - **Detection** (`crisis/raw/<source>/<crisis_id>`): raw reports from the
//!   monitored feeds
//! - **Verification & scoring** (`crisis/verified/<crisis_id>`): severity and
//!   confidence
//! - **NGO matching** (`crisis/actionable/<crisis_id>`): donation campaigns
//! - **Update monitoring** (`crisis/updates/<crisis_id>`): follow-ups on
//!   ongoing crises
//!
//! Records come from a [`CrisisSource`]; each stage filters them, projects
//! them into thin [`PublishedEvent`]s on a derived [`Topic`], and hands those
//! to an [`EventSink`]. Sinks are best-effort: delivery never affects a stage
//! result. Stages share no state and can be re-run or run concurrently.
//!
//! # Example
//!
//! ```rust,no_run
//! use agent_crisis::{CrisisConfig, CrisisPipeline, StageFilter};
//!
//! # async fn demo() -> agent_crisis::Result<()> {
//! let config = CrisisConfig::builder().data_dir("data/crises").build()?;
//! let pipeline = CrisisPipeline::from_config(&config)?;
//!
//! let report = pipeline.detector().detect(Some("usgs")).await;
//! println!("{}", report.to_json());
//!
//! let all = pipeline.run(&StageFilter::all()).await;
//! println!("published {} events", all.total_events());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod model;
pub mod pipeline;
pub mod reader;
pub mod sink;
pub mod source;
pub mod stages;
pub mod tools;
pub mod topic;

pub use config::CrisisConfig;
pub use error::{CrisisError, Result};
pub use event::{EventPayload, PublishedEvent};
pub use filter::StageFilter;
pub use model::{
    ActionableCrisis, CrisisStatus, CrisisUpdate, FeedSource, RawCrisis, SeverityLevel,
    VerifiedCrisis,
};
pub use pipeline::{CrisisPipeline, LineageReport, PipelineReport};
pub use reader::{ActionableCrisisReader, RankedCrisis};
pub use sink::{BroadcastSink, EventSink, HttpEventSink, MemorySink, NoopSink};
pub use source::{CrisisSource, FileCrisisSource, InMemoryCrisisSource};
pub use stages::{StageProcessor, StageReport, StageStatus};
pub use tools::{crisis_tool_registry, register_crisis_tools};
pub use topic::{Stage, Topic, TopicPattern};
