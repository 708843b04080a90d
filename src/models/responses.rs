use serde::{Deserialize, Serialize};

use crate::models::domain::{Decision, DecisionStatus, NoMatchReason, Worker};

/// Response for the route endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub status: DecisionStatus,
    #[serde(rename = "requesterId")]
    pub requester_id: Option<i64>,
    #[serde(rename = "workerId")]
    pub worker_id: Option<i64>,
    pub score: Option<f64>,
    #[serde(rename = "currentSessions")]
    pub current_sessions: Option<i64>,
    pub reason: Option<NoMatchReason>,
}

impl From<Decision> for RouteResponse {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Assigned {
                requester_id,
                worker_id,
                score,
                current_sessions,
            } => Self {
                status: DecisionStatus::Assigned,
                requester_id: Some(requester_id),
                worker_id: Some(worker_id),
                score: Some(score),
                current_sessions: Some(current_sessions),
                reason: None,
            },
            Decision::NoMatch { reason } => Self {
                status: DecisionStatus::NoMatch,
                requester_id: None,
                worker_id: None,
                score: None,
                current_sessions: None,
                reason: Some(reason),
            },
        }
    }
}

/// Response for the complete endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub status: String,
    #[serde(rename = "workerId")]
    pub worker_id: i64,
    #[serde(rename = "currentSessions")]
    pub current_sessions: i64,
}

/// Live view of one worker's load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerState {
    #[serde(rename = "workerId")]
    pub worker_id: i64,
    pub name: String,
    pub languages: Vec<String>,
    #[serde(rename = "expertiseTags")]
    pub expertise_tags: Vec<String>,
    pub rate: f64,
    #[serde(rename = "avgSessionMin")]
    pub avg_session_min: i32,
    #[serde(rename = "empathyScore")]
    pub empathy_score: f64,
    pub reliability: f64,
    #[serde(rename = "maxConcurrent")]
    pub max_concurrent: Option<i64>,
    #[serde(rename = "currentSessions")]
    pub current_sessions: i64,
}

impl WorkerState {
    pub fn from_worker(worker: &Worker, current_sessions: i64) -> Self {
        Self {
            worker_id: worker.worker_id,
            name: worker.name.clone(),
            languages: worker.languages.clone(),
            expertise_tags: worker.expertise_tags.clone(),
            rate: worker.rate,
            avg_session_min: worker.avg_session_min,
            empathy_score: worker.empathy_score,
            reliability: worker.reliability,
            max_concurrent: worker.max_concurrent,
            current_sessions,
        }
    }
}

/// Response for the pool state endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    pub workers: Vec<WorkerState>,
}

/// Response for the single-worker state endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSessionsResponse {
    #[serde(rename = "workerId")]
    pub worker_id: i64,
    #[serde(rename = "currentSessions")]
    pub current_sessions: i64,
    #[serde(rename = "maxConcurrent")]
    pub max_concurrent: Option<i64>,
}

/// Response for the roster reload endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub status: String,
    pub requesters: usize,
    pub workers: usize,
}

/// Response for the session counter reset endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    pub status: String,
    pub reset: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub error: Option<String>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
