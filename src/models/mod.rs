// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{AvailabilityBlock, Decision, DecisionRecord, DecisionStatus, NoMatchReason, Requester, Roster, Worker};
pub use requests::{CompleteRequest, RouteRequest};
pub use responses::{CompleteResponse, ErrorResponse, HealthResponse, ReloadResponse, ResetResponse, RouteResponse, StateResponse, WorkerSessionsResponse, WorkerState};
