use crate::core::scoring::score_worker;
use crate::models::{Requester, RouteRequest, Worker};
use crate::services::counters::{CounterKey, CounterStore};

/// One eligible worker with its affinity score
#[derive(Debug, Clone)]
pub struct ScoredCandidate<'a> {
    pub worker: &'a Worker,
    pub score: f64,
}

/// Score and rank the worker pool for one session request
///
/// Ineligible workers are dropped, the rest are ordered by score descending.
/// The sort is stable, so equal scores keep their pool order and a repeat
/// call over the same pool and counts yields the same order.
///
/// Live session counts are read per worker from the counter store; a failed
/// read scores that worker as if idle rather than failing the request.
pub async fn rank_candidates<'a>(
    requester: &Requester,
    request: &RouteRequest,
    workers: &'a [Worker],
    counters: &dyn CounterStore,
) -> Vec<ScoredCandidate<'a>> {
    let mut candidates = Vec::with_capacity(workers.len());

    for worker in workers {
        let live_sessions = match counters.get(&CounterKey::sessions(worker.worker_id)).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(
                    "Failed to read session count for worker {}, scoring as idle: {}",
                    worker.worker_id,
                    e
                );
                0
            }
        };

        if let Some(score) = score_worker(requester, request, worker, live_sessions) {
            candidates.push(ScoredCandidate { worker, score });
        }
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    candidates
}
