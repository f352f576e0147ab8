//! Topic naming for the crisis pipeline
//!
//! Every published event carries a hierarchical topic:
//!
//! - raw: `crisis/raw/<source>/<crisis_id>`
//! - verified: `crisis/verified/<crisis_id>`
//! - actionable: `crisis/actionable/<crisis_id>`
//! - updates: `crisis/updates/<crisis_id>`
//!
//! Identifiers never contain `/` (records that do are rejected as malformed
//! before a topic is built), which keeps the mapping injective.

use crate::error::{CrisisError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Root level shared by every crisis topic
pub const TOPIC_ROOT: &str = "crisis";

/// One phase of the crisis pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Detections straight from the monitored feeds
    Raw,
    /// Cross-checked and scored crises
    Verified,
    /// Crises matched to NGO campaigns
    Actionable,
    /// Follow-up updates on ongoing crises
    Updates,
}

impl Stage {
    /// All stages in pipeline order
    pub const ALL: [Stage; 4] = [Stage::Raw, Stage::Verified, Stage::Actionable, Stage::Updates];

    /// Topic level name of this stage
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Raw => "raw",
            Stage::Verified => "verified",
            Stage::Actionable => "actionable",
            Stage::Updates => "updates",
        }
    }

    /// The stage consuming this stage's output, if any
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Raw => Some(Stage::Verified),
            Stage::Verified => Some(Stage::Actionable),
            Stage::Actionable => Some(Stage::Updates),
            Stage::Updates => None,
        }
    }

    /// The stage feeding this one, if any
    pub fn previous(self) -> Option<Stage> {
        match self {
            Stage::Raw => None,
            Stage::Verified => Some(Stage::Raw),
            Stage::Actionable => Some(Stage::Verified),
            Stage::Updates => Some(Stage::Actionable),
        }
    }

    /// Pattern covering every topic this stage publishes on
    pub fn topic_space(self) -> TopicPattern {
        let levels = match self {
            Stage::Raw => vec![
                PatternLevel::literal(TOPIC_ROOT),
                PatternLevel::literal("raw"),
                PatternLevel::One,
                PatternLevel::One,
            ],
            other => vec![
                PatternLevel::literal(TOPIC_ROOT),
                PatternLevel::literal(other.as_str()),
                PatternLevel::One,
            ],
        };
        TopicPattern { levels }
    }

    /// Pattern of the upstream topics this stage consumes, if any
    pub fn subscription(self) -> Option<TopicPattern> {
        self.previous().map(Stage::topic_space)
    }

    /// Name of the agent that owns this stage
    pub fn agent_name(self) -> &'static str {
        match self {
            Stage::Raw => "CrisisDetector",
            Stage::Verified => "VerificationScorer",
            Stage::Actionable => "NGOMatcher",
            Stage::Updates => "UpdateMonitor",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = CrisisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(Stage::Raw),
            "verified" => Ok(Stage::Verified),
            "actionable" => Ok(Stage::Actionable),
            "updates" => Ok(Stage::Updates),
            other => Err(CrisisError::InvalidParameters(format!("unknown stage: {other}"))),
        }
    }
}

/// Canonical address of a published event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(Address);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Address {
    Raw { source: String, crisis_id: String },
    /// Verified, actionable and updates topics
    Keyed { stage: Stage, crisis_id: String },
}

impl Topic {
    /// `crisis/raw/<source>/<crisis_id>`
    pub fn raw(source: impl Into<String>, crisis_id: impl Into<String>) -> Self {
        Self(Address::Raw {
            source: source.into(),
            crisis_id: crisis_id.into(),
        })
    }

    /// `crisis/verified/<crisis_id>`
    pub fn verified(crisis_id: impl Into<String>) -> Self {
        Self::keyed(Stage::Verified, crisis_id)
    }

    /// `crisis/actionable/<crisis_id>`
    pub fn actionable(crisis_id: impl Into<String>) -> Self {
        Self::keyed(Stage::Actionable, crisis_id)
    }

    /// `crisis/updates/<crisis_id>`
    pub fn updates(crisis_id: impl Into<String>) -> Self {
        Self::keyed(Stage::Updates, crisis_id)
    }

    // Never called with Stage::Raw
    fn keyed(stage: Stage, crisis_id: impl Into<String>) -> Self {
        Self(Address::Keyed {
            stage,
            crisis_id: crisis_id.into(),
        })
    }

    /// Stage the topic belongs to
    pub fn stage(&self) -> Stage {
        match &self.0 {
            Address::Raw { .. } => Stage::Raw,
            Address::Keyed { stage, .. } => *stage,
        }
    }

    /// Feed segment (raw topics only)
    pub fn source(&self) -> Option<&str> {
        match &self.0 {
            Address::Raw { source, .. } => Some(source.as_str()),
            Address::Keyed { .. } => None,
        }
    }

    /// Crisis the topic pertains to
    pub fn crisis_id(&self) -> &str {
        match &self.0 {
            Address::Raw { crisis_id, .. } | Address::Keyed { crisis_id, .. } => crisis_id,
        }
    }

    /// Parse a canonical topic string
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || CrisisError::InvalidParameters(format!("not a crisis topic: {s}"));
        let levels: Vec<&str> = s.split('/').collect();
        if levels.iter().any(|l| l.is_empty()) || levels.first() != Some(&TOPIC_ROOT) {
            return Err(invalid());
        }

        match levels.as_slice() {
            [_, "raw", source, id] => Ok(Self::raw(*source, *id)),
            [_, stage, id] => {
                let stage: Stage = stage.parse().map_err(|_| invalid())?;
                if stage == Stage::Raw {
                    return Err(invalid());
                }
                Ok(Self::keyed(stage, *id))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Address::Raw { source, crisis_id } => write!(f, "{TOPIC_ROOT}/raw/{source}/{crisis_id}"),
            Address::Keyed { stage, crisis_id } => write!(f, "{TOPIC_ROOT}/{stage}/{crisis_id}"),
        }
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Topic::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// One level of a topic pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternLevel {
    /// Matches exactly this level
    Literal(String),
    /// `*`: matches any single level
    One,
    /// `>`: matches one or more trailing levels
    Rest,
}

impl PatternLevel {
    fn literal(s: &str) -> Self {
        Self::Literal(s.to_string())
    }
}

/// Wildcard subscription pattern over topics, e.g. `crisis/raw/*/*` or `crisis/>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
    levels: Vec<PatternLevel>,
}

impl TopicPattern {
    /// Parse a pattern; `>` is only allowed as the final level
    pub fn parse(pattern: &str) -> Result<Self> {
        let parts: Vec<&str> = pattern.split('/').collect();
        let mut levels = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            let level = match *part {
                "" => {
                    return Err(CrisisError::InvalidParameters(format!(
                        "empty level in topic pattern: {pattern}"
                    )));
                }
                "*" => PatternLevel::One,
                ">" if i + 1 == parts.len() => PatternLevel::Rest,
                ">" => {
                    return Err(CrisisError::InvalidParameters(format!(
                        "'>' must be the last level: {pattern}"
                    )));
                }
                literal => PatternLevel::Literal(literal.to_string()),
            };
            levels.push(level);
        }

        Ok(Self { levels })
    }

    /// Pattern matching every crisis topic
    pub fn all() -> Self {
        Self {
            levels: vec![PatternLevel::literal(TOPIC_ROOT), PatternLevel::Rest],
        }
    }

    /// Test a topic string against this pattern
    pub fn matches_str(&self, topic: &str) -> bool {
        let parts: Vec<&str> = topic.split('/').collect();
        let mut i = 0;

        for level in &self.levels {
            match level {
                PatternLevel::Rest => return i < parts.len(),
                PatternLevel::One => {
                    if i >= parts.len() {
                        return false;
                    }
                }
                PatternLevel::Literal(lit) => {
                    if parts.get(i) != Some(&lit.as_str()) {
                        return false;
                    }
                }
            }
            i += 1;
        }

        i == parts.len()
    }

    /// Test a topic against this pattern
    pub fn matches(&self, topic: &Topic) -> bool {
        self.matches_str(&topic.to_string())
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<&str> = self
            .levels
            .iter()
            .map(|l| match l {
                PatternLevel::Literal(s) => s.as_str(),
                PatternLevel::One => "*",
                PatternLevel::Rest => ">",
            })
            .collect();
        f.write_str(&rendered.join("/"))
    }
}

impl FromStr for TopicPattern {
    type Err = CrisisError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_canonical_forms() {
        assert_eq!(Topic::raw("usgs", "C2").to_string(), "crisis/raw/usgs/C2");
        assert_eq!(Topic::verified("C1").to_string(), "crisis/verified/C1");
        assert_eq!(Topic::actionable("C1").to_string(), "crisis/actionable/C1");
        assert_eq!(Topic::updates("C9").to_string(), "crisis/updates/C9");
    }

    #[test]
    fn test_topics_are_deterministic() {
        assert_eq!(
            Topic::raw("gdacs", "C1").to_string(),
            Topic::raw("gdacs", "C1").to_string()
        );
        assert_eq!(Topic::verified("C1"), Topic::verified("C1"));
    }

    #[test]
    fn test_topics_are_injective() {
        let ids = ["C1", "C2", "raw", "verified"];
        let mut seen = HashSet::new();
        let mut total = 0;

        for id in ids {
            for topic in [
                Topic::raw("gdacs", id),
                Topic::raw("usgs", id),
                Topic::verified(id),
                Topic::actionable(id),
                Topic::updates(id),
            ] {
                seen.insert(topic.to_string());
                total += 1;
            }
        }

        assert_eq!(seen.len(), total);
    }

    #[test]
    fn test_parse_inverts_display() {
        for topic in [
            Topic::raw("noaa", "C3"),
            Topic::verified("C3"),
            Topic::actionable("C3"),
            Topic::updates("C3"),
        ] {
            assert_eq!(Topic::parse(&topic.to_string()).unwrap(), topic);
        }
    }

    #[test]
    fn test_accessors() {
        let raw = Topic::raw("usgs", "C2");
        assert_eq!(raw.stage(), Stage::Raw);
        assert_eq!(raw.source(), Some("usgs"));
        assert_eq!(raw.crisis_id(), "C2");

        let verified = Topic::verified("C2");
        assert_eq!(verified.stage(), Stage::Verified);
        assert_eq!(verified.source(), None);
    }

    #[test]
    fn test_parse_rejects_non_topics() {
        assert!(Topic::parse("crisis/raw/C1").is_err());
        assert!(Topic::parse("alert/verified/C1").is_err());
        assert!(Topic::parse("crisis/verified/").is_err());
        assert!(Topic::parse("crisis/bogus/C1").is_err());
    }

    #[test]
    fn test_pattern_single_level_wildcard() {
        let pattern = TopicPattern::parse("crisis/raw/*/*").unwrap();
        assert!(pattern.matches(&Topic::raw("usgs", "C2")));
        assert!(!pattern.matches(&Topic::verified("C2")));
        assert!(!pattern.matches_str("crisis/raw/usgs"));
        assert!(!pattern.matches_str("crisis/raw/usgs/C2/extra"));
    }

    #[test]
    fn test_pattern_rest_wildcard() {
        let pattern = TopicPattern::parse("crisis/>").unwrap();
        assert!(pattern.matches(&Topic::raw("usgs", "C2")));
        assert!(pattern.matches(&Topic::updates("C9")));
        assert!(!pattern.matches_str("crisis"));
        assert_eq!(pattern, TopicPattern::all());
    }

    #[test]
    fn test_pattern_literal() {
        let pattern: TopicPattern = "crisis/updates/C9".parse().unwrap();
        assert!(pattern.matches(&Topic::updates("C9")));
        assert!(!pattern.matches(&Topic::updates("C8")));
    }

    #[test]
    fn test_pattern_rejects_misplaced_rest() {
        assert!(TopicPattern::parse("crisis/>/C1").is_err());
        assert!(TopicPattern::parse("crisis//C1").is_err());
    }

    #[test]
    fn test_stage_subscriptions() {
        assert!(Stage::Raw.subscription().is_none());
        assert_eq!(
            Stage::Verified.subscription().unwrap().to_string(),
            "crisis/raw/*/*"
        );
        assert_eq!(
            Stage::Actionable.subscription().unwrap().to_string(),
            "crisis/verified/*"
        );
        assert_eq!(
            Stage::Updates.subscription().unwrap().to_string(),
            "crisis/actionable/*"
        );
    }

    #[test]
    fn test_stage_order() {
        let mut stage = Stage::Raw;
        let mut order = vec![stage];
        while let Some(next) = stage.next() {
            order.push(next);
            stage = next;
        }
        assert_eq!(order, Stage::ALL);
    }
}
