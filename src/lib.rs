//! Sesh Router - capacity-guarded session routing service
//!
//! This library provides the matching engine used by the Sesh platform. It
//! scores and ranks candidate workers for an incoming session request, then
//! reserves one unit of the chosen worker's capacity through an atomic
//! shared counter store.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    availability_overlap_hours, jaccard, rank_candidates, score_worker,
    RandomRequesterSelection, RequesterSelector, Router, ScoredCandidate,
};
pub use crate::models::{
    AvailabilityBlock, CompleteRequest, Decision, DecisionRecord, DecisionStatus, NoMatchReason,
    Requester, Roster, RouteRequest, Worker,
};
pub use crate::services::{
    CounterError, CounterKey, CounterStore, DecisionLog, DecisionLogError, MemoryCounterStore,
    MemoryDecisionLog, PostgresDecisionLog, RedisCounterStore, RegistryClient, RegistryError,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let score = jaccard(&["rust".to_string()], &["rust".to_string()]);
        assert_eq!(score, 1.0);
    }
}
