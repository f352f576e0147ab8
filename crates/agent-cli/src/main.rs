//! Command-line interface for the crisis pipeline
//!
//! # Usage
//!
//! ```bash
//! # Publish raw detections from one feed
//! crisis-cli --data-dir data/crises detect --source usgs
//!
//! # Run every stage and forward events to the visualization frontend
//! crisis-cli --sink-url http://localhost:3000/api run
//!
//! # Call a tool the way an agent would
//! crisis-cli call verify_and_score_crisis '{"crisis_id": "C1"}'
//! ```

mod render;

use agent_crisis::{
    CrisisConfig, CrisisPipeline, StageFilter, TopicPattern, crisis_tool_registry,
};
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "crisis-cli")]
#[command(about = "Drive the crisis event pipeline from the command line", long_about = None)]
struct Args {
    /// Directory holding the per-stage fixture files
    #[arg(long, env = "CRISIS_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Visualization API base; events are POSTed to <url>/events/broadcast
    #[arg(long, env = "FRONTEND_API_URL", global = true)]
    sink_url: Option<String>,

    /// Never forward events to the visualization endpoint
    #[arg(long, global = true)]
    no_sink: bool,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish raw detections (crisis/raw/<source>/<id>)
    Detect {
        /// Only this feed, e.g. usgs
        #[arg(long)]
        source: Option<String>,
    },
    /// Republish verified, scored crises (crisis/verified/<id>)
    Verify {
        #[arg(long)]
        crisis_id: Option<String>,
    },
    /// Publish NGO-matched crises (crisis/actionable/<id>)
    Match {
        #[arg(long)]
        crisis_id: Option<String>,
    },
    /// Publish crisis updates (crisis/updates/<id>)
    Monitor {
        #[arg(long)]
        crisis_id: Option<String>,
    },
    /// List actionable crises, most severe first
    Actionable {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run every stage in order
    Run {
        /// Only events whose topic matches this pattern are printed, e.g. 'crisis/raw/*/*'
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        crisis_id: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },
    /// Re-process one crisis through every stage
    Query { crisis_id: String },
    /// Check later stages against the raw detections
    Lineage,
    /// List the registered agent tools
    Tools,
    /// Invoke a registered tool with JSON parameters
    Call {
        name: String,
        #[arg(default_value = "{}")]
        params: String,
    },
}

fn build_config(args: &Args) -> anyhow::Result<CrisisConfig> {
    let mut builder = CrisisConfig::builder();
    if let Some(dir) = &args.data_dir {
        builder = builder.data_dir(dir);
    }
    if let Some(url) = &args.sink_url {
        builder = builder.sink_api_base(url);
    }
    if args.no_sink {
        builder = builder.sink_enabled(false);
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = agent_utils::Config::from_env();
    agent_utils::init_tracing_with(app_config.log_format, "warn,agent_crisis=info");

    let args = Args::parse();
    let config = build_config(&args)?;
    info!("Starting {} ({})", app_config.app_name, app_config.environment);

    let pipeline = Arc::new(CrisisPipeline::from_config(&config)?);

    match args.command {
        Command::Detect { source } => {
            let report = pipeline.detector().detect(source.as_deref()).await;
            render::stage(&report, args.json);
        }
        Command::Verify { crisis_id } => {
            let report = pipeline.verifier().verify_and_score(crisis_id.as_deref()).await;
            render::stage(&report, args.json);
        }
        Command::Match { crisis_id } => {
            let report = pipeline.matcher().match_campaigns(crisis_id.as_deref()).await;
            render::stage(&report, args.json);
        }
        Command::Monitor { crisis_id } => {
            let report = pipeline.monitor().monitor(crisis_id.as_deref()).await;
            render::stage(&report, args.json);
        }
        Command::Actionable { limit } => {
            if args.json {
                render::json(&pipeline.reader().list_json(limit).await);
            } else {
                let crises = pipeline.reader().list(limit).await?;
                render::actionable(&crises);
            }
        }
        Command::Run {
            topic,
            crisis_id,
            source,
        } => {
            let pattern = topic
                .as_deref()
                .map(TopicPattern::parse)
                .transpose()?
                .unwrap_or_else(TopicPattern::all);

            let mut filter = StageFilter::all();
            filter.crisis_id = crisis_id;
            filter.source = source;

            let report = pipeline.run(&filter).await;
            render::pipeline(&report, &pattern, args.json);
        }
        Command::Query { crisis_id } => {
            let report = pipeline.query(&crisis_id).await;
            render::pipeline(&report, &TopicPattern::all(), args.json);
        }
        Command::Lineage => {
            let report = pipeline.check_lineage().await?;
            render::lineage(&report, args.json)?;
        }
        Command::Tools => {
            let registry = crisis_tool_registry(pipeline.clone());
            render::tools(&registry.definitions(), args.json)?;
        }
        Command::Call { name, params } => {
            let params: serde_json::Value =
                serde_json::from_str(&params).context("tool parameters must be valid JSON")?;
            let registry = crisis_tool_registry(pipeline.clone());
            let output = registry.execute(&name, params).await;
            pipeline.flush().await;
            render::json(&output?);
        }
    }

    pipeline.flush().await;
    Ok(())
}
