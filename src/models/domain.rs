use serde::de::Error as DeError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::requests::RouteRequest;

/// One availability window as half-open minutes since local midnight.
///
/// The wire and storage form is `{"start": "HH:MM", "end": "HH:MM"}`.
/// Parsing happens here so a malformed clock string is rejected at the
/// record boundary and never reaches the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityBlock {
    pub start_min: u16,
    pub end_min: u16,
}

impl AvailabilityBlock {
    pub fn duration_min(&self) -> u16 {
        self.end_min.saturating_sub(self.start_min)
    }
}

impl<'de> Deserialize<'de> for AvailabilityBlock {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            start: String,
            end: String,
        }

        let raw = Raw::deserialize(deserializer)?;
        let start_min = parse_clock(&raw.start)
            .ok_or_else(|| D::Error::custom(format!("invalid clock string '{}'", raw.start)))?;
        let end_min = parse_clock(&raw.end)
            .ok_or_else(|| D::Error::custom(format!("invalid clock string '{}'", raw.end)))?;
        if start_min >= end_min {
            return Err(D::Error::custom(format!(
                "empty availability window {}-{}",
                raw.start, raw.end
            )));
        }
        Ok(AvailabilityBlock { start_min, end_min })
    }
}

impl Serialize for AvailabilityBlock {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("AvailabilityBlock", 2)?;
        state.serialize_field("start", &format_clock(self.start_min))?;
        state.serialize_field("end", &format_clock(self.end_min))?;
        state.end()
    }
}

/// Parses "HH:MM" into minutes since midnight. "24:00" is a valid end of day.
fn parse_clock(s: &str) -> Option<u16> {
    let (hours, minutes) = s.split_once(':')?;
    let hours: u16 = hours.parse().ok()?;
    let minutes: u16 = minutes.parse().ok()?;
    if hours > 24 || minutes > 59 {
        return None;
    }
    let total = hours * 60 + minutes;
    if total > 24 * 60 {
        return None;
    }
    Some(total)
}

fn format_clock(minute: u16) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// Requester reference record loaded from the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requester {
    #[serde(rename = "requesterId")]
    pub requester_id: i64,
    pub name: String,
    pub timezone: String,
    pub languages: Vec<String>,
    #[serde(rename = "domainTags")]
    pub domain_tags: Vec<String>,
    pub availability: Vec<AvailabilityBlock>,
    #[serde(rename = "avgSessionMin")]
    pub avg_session_min: i32,
    #[serde(rename = "avgSessionCost")]
    pub avg_session_cost: f64,
    #[serde(rename = "avgSatisfaction")]
    pub avg_satisfaction: f64,
    #[serde(rename = "completionRate")]
    pub completion_rate: f64,
    #[serde(rename = "pastSessionCount")]
    pub past_session_count: i32,
}

/// Worker reference record loaded from the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    #[serde(rename = "workerId")]
    pub worker_id: i64,
    pub name: String,
    pub timezone: String,
    pub languages: Vec<String>,
    #[serde(rename = "expertiseTags")]
    pub expertise_tags: Vec<String>,
    pub rate: f64,
    #[serde(rename = "avgSessionMin")]
    pub avg_session_min: i32,
    #[serde(rename = "empathyScore")]
    pub empathy_score: f64,
    pub reliability: f64,
    #[serde(rename = "maxConcurrent", default)]
    pub max_concurrent: Option<i64>,
    pub availability: Vec<AvailabilityBlock>,
}

impl Worker {
    /// Helper for the language eligibility gate
    pub fn speaks(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }
}

/// In-memory snapshot of the loaded reference records
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub requesters: Vec<Requester>,
    pub workers: Vec<Worker>,
}

impl Roster {
    pub fn requester(&self, requester_id: i64) -> Option<&Requester> {
        self.requesters.iter().find(|r| r.requester_id == requester_id)
    }

    pub fn worker(&self, worker_id: i64) -> Option<&Worker> {
        self.workers.iter().find(|w| w.worker_id == worker_id)
    }
}

/// Outcome of one routing attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Assigned {
        requester_id: i64,
        worker_id: i64,
        score: f64,
        current_sessions: i64,
    },
    NoMatch {
        reason: NoMatchReason,
    },
}

impl Decision {
    pub fn no_match(reason: NoMatchReason) -> Self {
        Decision::NoMatch { reason }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchReason {
    RequesterNotFound,
    NoRequestersLoaded,
    NoCandidates,
    AllCandidatesAtCapacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Assigned,
    NoMatch,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Assigned => "assigned",
            DecisionStatus::NoMatch => "no_match",
        }
    }
}

/// Append-only record of one routing decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub requester_id: i64,
    pub worker_id: Option<i64>,
    pub topics: Vec<String>,
    pub language: String,
    pub budget: f64,
    pub sla_min: i64,
    pub sensitivity: bool,
    pub score: Option<f64>,
    pub status: DecisionStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl DecisionRecord {
    pub fn assigned(requester_id: i64, request: &RouteRequest, worker_id: i64, score: f64) -> Self {
        Self {
            requester_id,
            worker_id: Some(worker_id),
            topics: request.topics.clone(),
            language: request.language.clone(),
            budget: request.budget,
            sla_min: request.sla_min,
            sensitivity: request.sensitivity,
            score: Some(score),
            status: DecisionStatus::Assigned,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn no_match(requester_id: i64, request: &RouteRequest) -> Self {
        Self {
            requester_id,
            worker_id: None,
            topics: request.topics.clone(),
            language: request.language.clone(),
            budget: request.budget,
            sla_min: request.sla_min,
            sensitivity: request.sensitivity,
            score: None,
            status: DecisionStatus::NoMatch,
            created_at: chrono::Utc::now(),
        }
    }
}
