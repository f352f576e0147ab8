//! Terminal output for pipeline results

use agent_crisis::pipeline::{LineageReport, PipelineReport};
use agent_crisis::{RankedCrisis, StageReport, TopicPattern};
use agent_tools::ToolDefinition;
use comfy_table::{Table, presets::UTF8_FULL};
use serde_json::Value;

pub fn json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    table
}

/// Header line plus the skipped-record count, if any
fn stage_summary(report: &StageReport) -> Vec<String> {
    let mut lines = vec![format!("[{}] {}", report.stage, report.message)];
    if report.skipped > 0 {
        lines.push(format!("{} malformed record(s) skipped", report.skipped));
    }
    lines
}

pub fn stage(report: &StageReport, as_json: bool) {
    if as_json {
        json(&report.to_json());
        return;
    }

    for line in stage_summary(report) {
        println!("{line}");
    }
    if !report.is_success() || report.events.is_empty() {
        return;
    }

    let mut out = table(vec!["Topic", "Payload"]);
    for event in &report.events {
        out.add_row(vec![event.topic.to_string(), event.payload_json().to_string()]);
    }
    println!("{out}");
}

pub fn pipeline(report: &PipelineReport, pattern: &TopicPattern, as_json: bool) {
    if as_json {
        json(&report.to_json());
        return;
    }

    let mut summary = table(vec!["Stage", "Status", "Events", "Skipped", "Message"]);
    for stage in &report.stages {
        summary.add_row(vec![
            stage.stage.to_string(),
            format!("{:?}", stage.status).to_lowercase(),
            stage.count.to_string(),
            stage.skipped.to_string(),
            stage.message.clone(),
        ]);
    }
    println!("{summary}");

    let mut events = table(vec!["Topic", "Payload"]);
    let mut shown = 0;
    for event in report.stages.iter().flat_map(|s| &s.events) {
        if pattern.matches(&event.topic) {
            events.add_row(vec![event.topic.to_string(), event.payload_json().to_string()]);
            shown += 1;
        }
    }
    if shown > 0 {
        println!("{events}");
    }
}

pub fn actionable(ranked: &[RankedCrisis]) {
    let mut out = table(vec!["Crisis", "Severity", "Level", "Campaigns", "Status"]);
    for crisis in ranked.iter().map(|r| &r.crisis) {
        out.add_row(vec![
            crisis.crisis_id.clone(),
            crisis
                .severity_score
                .map_or_else(|| "-".to_string(), |s| format!("{s:.1}")),
            crisis.severity_level().label().to_string(),
            crisis.ngo_campaigns_count().to_string(),
            crisis
                .status
                .as_ref()
                .and_then(|s| serde_json::to_value(s).ok())
                .and_then(|v| v.as_str().map(ToString::to_string))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!("{out}");
}

pub fn lineage(report: &LineageReport, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        json(&serde_json::to_value(report)?);
        return Ok(());
    }

    if report.is_consistent() {
        println!("All later-stage records refine a raw detection");
    }
    for (stage, id) in &report.orphans {
        println!("orphan: {stage} record {id} has no raw detection");
    }
    for c in &report.conflicts {
        println!(
            "conflict: {} record {} has {} = {:?}, raw says {:?}",
            c.stage, c.crisis_id, c.field, c.found, c.expected
        );
    }
    for (stage, reason) in &report.unavailable {
        println!("unavailable: {stage}: {reason}");
    }
    Ok(())
}

pub fn tools(definitions: &[ToolDefinition], as_json: bool) -> anyhow::Result<()> {
    if as_json {
        json(&serde_json::to_value(definitions)?);
        return Ok(());
    }

    let mut out = table(vec!["Tool", "Description"]);
    for def in definitions {
        out.add_row(vec![def.name.clone(), def.description.clone()]);
    }
    println!("{out}");
    Ok(())
}
