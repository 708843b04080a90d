use std::sync::Arc;

use crate::core::ranker::rank_candidates;
use crate::core::selector::RequesterSelector;
use crate::models::{Decision, DecisionRecord, NoMatchReason, Roster, RouteRequest};
use crate::services::counters::{CounterError, CounterKey, CounterStore};
use crate::services::decisions::DecisionLog;

/// Main routing orchestrator - ranks candidates and reserves capacity
///
/// # Admission protocol
/// Candidates are walked best-first. For each one:
/// 1. The worker's live session counter is incremented unconditionally and
///    the post-increment value is read back.
/// 2. If that value exceeds the worker's concurrency ceiling, a compensating
///    floor-at-zero decrement is issued and the walk moves on. Other clients
///    may briefly observe the counter above the ceiling; it never stays there.
/// 3. Otherwise the reservation stands and the decision is final.
///
/// A failure while reserving one candidate rejects that candidate only: the
/// compensating decrement is attempted, the error is logged, and the walk
/// continues with the next candidate.
pub struct Router {
    counters: Arc<dyn CounterStore>,
    decisions: Arc<dyn DecisionLog>,
    selector: Arc<dyn RequesterSelector>,
}

impl Router {
    pub fn new(
        counters: Arc<dyn CounterStore>,
        decisions: Arc<dyn DecisionLog>,
        selector: Arc<dyn RequesterSelector>,
    ) -> Self {
        Self {
            counters,
            decisions,
            selector,
        }
    }

    /// Match one session request against the worker pool
    ///
    /// Always produces a decision: input problems and capacity exhaustion
    /// surface as no-match reasons, never as errors.
    pub async fn route(&self, roster: &Roster, request: &RouteRequest) -> Decision {
        let requester = match request.requester_id {
            Some(requester_id) => match roster.requester(requester_id) {
                Some(requester) => requester,
                None => return Decision::no_match(NoMatchReason::RequesterNotFound),
            },
            None => match self.selector.select(&roster.requesters) {
                Some(requester) => requester,
                None => return Decision::no_match(NoMatchReason::NoRequestersLoaded),
            },
        };

        let candidates =
            rank_candidates(requester, request, &roster.workers, self.counters.as_ref()).await;

        if candidates.is_empty() {
            self.log_decision(DecisionRecord::no_match(requester.requester_id, request))
                .await;
            return Decision::no_match(NoMatchReason::NoCandidates);
        }

        for candidate in &candidates {
            let worker = candidate.worker;
            let key = CounterKey::sessions(worker.worker_id);

            let reserved = match self.counters.increment(&key).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!(
                        "Reservation failed for worker {}, trying next candidate: {}",
                        worker.worker_id,
                        e
                    );
                    self.rollback(&key, worker.worker_id).await;
                    continue;
                }
            };

            if let Some(max_concurrent) = worker.max_concurrent {
                if reserved > max_concurrent {
                    tracing::debug!(
                        "Worker {} at capacity ({}/{}), trying next candidate",
                        worker.worker_id,
                        reserved - 1,
                        max_concurrent
                    );
                    self.rollback(&key, worker.worker_id).await;
                    continue;
                }
            }

            let score = round_score(candidate.score);
            self.log_decision(DecisionRecord::assigned(
                requester.requester_id,
                request,
                worker.worker_id,
                score,
            ))
            .await;

            return Decision::Assigned {
                requester_id: requester.requester_id,
                worker_id: worker.worker_id,
                score,
                current_sessions: reserved,
            };
        }

        self.log_decision(DecisionRecord::no_match(requester.requester_id, request))
            .await;
        Decision::no_match(NoMatchReason::AllCandidatesAtCapacity)
    }

    /// Release one unit of a worker's capacity after a session finishes
    ///
    /// The decrement floors at zero, so completing a session that was never
    /// reserved (or reporting the same completion twice) leaves the counter
    /// at zero instead of driving it negative.
    pub async fn complete(&self, worker_id: i64) -> Result<i64, CounterError> {
        let current = self
            .counters
            .decrement_floor_zero(&CounterKey::sessions(worker_id))
            .await?;
        tracing::debug!("Session completed for worker {}, now at {}", worker_id, current);
        Ok(current)
    }

    /// Compensating decrement for a reservation that will not be kept
    ///
    /// Failures are swallowed: rejecting a candidate must never abort the
    /// candidate walk.
    async fn rollback(&self, key: &str, worker_id: i64) {
        if let Err(e) = self.counters.decrement_floor_zero(key).await {
            tracing::warn!(
                "Compensating decrement failed for worker {}: {}",
                worker_id,
                e
            );
        }
    }

    /// Best-effort append to the decision log
    ///
    /// A failed append costs observability, not the request.
    async fn log_decision(&self, record: DecisionRecord) {
        if let Err(e) = self.decisions.append(&record).await {
            tracing::warn!("Failed to append decision record: {}", e);
        }
    }
}

/// Committed scores are reported rounded to three decimal places
#[inline]
fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}
