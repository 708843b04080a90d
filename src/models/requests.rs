use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to route a session to the best-fit worker
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RouteRequest {
    pub topics: Vec<String>,
    #[validate(length(min = 1))]
    pub language: String,
    pub budget: f64,
    #[serde(default)]
    pub sensitivity: bool,
    #[serde(default = "default_sla_min")]
    #[serde(alias = "sla_min", rename = "slaMin")]
    pub sla_min: i64,
    #[serde(default)]
    #[serde(alias = "requester_id", rename = "requesterId")]
    pub requester_id: Option<i64>,
}

fn default_sla_min() -> i64 {
    30
}

/// Request to release one unit of a worker's capacity
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "worker_id", rename = "workerId")]
    pub worker_id: i64,
}
