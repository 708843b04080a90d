// Integration tests for Sesh Router

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sesh_router::core::{rank_candidates, RequesterSelector, Router};
use sesh_router::models::{
    AvailabilityBlock, Decision, DecisionRecord, DecisionStatus, NoMatchReason, Requester, Roster,
    RouteRequest, Worker,
};
use sesh_router::services::{
    CounterError, CounterKey, CounterStore, DecisionLog, DecisionLogError, MemoryCounterStore,
    MemoryDecisionLog,
};

fn create_test_requester(requester_id: i64) -> Requester {
    Requester {
        requester_id,
        name: format!("Requester {}", requester_id),
        timezone: "UTC".to_string(),
        languages: vec!["en".to_string()],
        domain_tags: vec!["backend".to_string()],
        availability: vec![AvailabilityBlock {
            start_min: 540,
            end_min: 1020,
        }],
        avg_session_min: 40,
        avg_session_cost: 85.0,
        avg_satisfaction: 4.4,
        completion_rate: 0.97,
        past_session_count: 12,
    }
}

fn create_test_worker(worker_id: i64, expertise: &[&str], max_concurrent: Option<i64>) -> Worker {
    Worker {
        worker_id,
        name: format!("Worker {}", worker_id),
        timezone: "UTC".to_string(),
        languages: vec!["en".to_string()],
        expertise_tags: expertise.iter().map(|t| t.to_string()).collect(),
        rate: 80.0,
        avg_session_min: 25,
        empathy_score: 0.7,
        reliability: 0.9,
        max_concurrent,
        availability: vec![AvailabilityBlock {
            start_min: 540,
            end_min: 1020,
        }],
    }
}

fn create_test_request(requester_id: Option<i64>) -> RouteRequest {
    RouteRequest {
        topics: vec!["backend".to_string(), "systems".to_string()],
        language: "en".to_string(),
        budget: 100.0,
        sensitivity: false,
        sla_min: 30,
        requester_id,
    }
}

struct FirstRequesterSelection;

impl RequesterSelector for FirstRequesterSelection {
    fn select<'a>(&self, requesters: &'a [Requester]) -> Option<&'a Requester> {
        requesters.first()
    }
}

fn create_test_router(counters: Arc<dyn CounterStore>, decisions: Arc<dyn DecisionLog>) -> Router {
    Router::new(counters, decisions, Arc::new(FirstRequesterSelection))
}

/// Counter store that tallies every increment and decrement per key
struct RecordingCounterStore {
    inner: MemoryCounterStore,
    increments: tokio::sync::Mutex<HashMap<String, u32>>,
    decrements: tokio::sync::Mutex<HashMap<String, u32>>,
}

impl RecordingCounterStore {
    fn new() -> Self {
        Self {
            inner: MemoryCounterStore::new(),
            increments: tokio::sync::Mutex::new(HashMap::new()),
            decrements: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    async fn increments_for(&self, key: &str) -> u32 {
        self.increments.lock().await.get(key).copied().unwrap_or(0)
    }

    async fn decrements_for(&self, key: &str) -> u32 {
        self.decrements.lock().await.get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CounterStore for RecordingCounterStore {
    async fn increment(&self, key: &str) -> Result<i64, CounterError> {
        *self
            .increments
            .lock()
            .await
            .entry(key.to_string())
            .or_insert(0) += 1;
        self.inner.increment(key).await
    }

    async fn decrement_floor_zero(&self, key: &str) -> Result<i64, CounterError> {
        *self
            .decrements
            .lock()
            .await
            .entry(key.to_string())
            .or_insert(0) += 1;
        self.inner.decrement_floor_zero(key).await
    }

    async fn get(&self, key: &str) -> Result<i64, CounterError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), CounterError> {
        self.inner.set(key, value).await
    }

    async fn set_if_absent(&self, key: &str, value: i64) -> Result<bool, CounterError> {
        self.inner.set_if_absent(key, value).await
    }
}

/// Counter store that fails increments for one poisoned key
struct FailingIncrementStore {
    inner: MemoryCounterStore,
    failing_key: String,
}

impl FailingIncrementStore {
    fn new(failing_key: String) -> Self {
        Self {
            inner: MemoryCounterStore::new(),
            failing_key,
        }
    }
}

#[async_trait]
impl CounterStore for FailingIncrementStore {
    async fn increment(&self, key: &str) -> Result<i64, CounterError> {
        if key == self.failing_key {
            return Err(CounterError::Unavailable("injected failure".to_string()));
        }
        self.inner.increment(key).await
    }

    async fn decrement_floor_zero(&self, key: &str) -> Result<i64, CounterError> {
        self.inner.decrement_floor_zero(key).await
    }

    async fn get(&self, key: &str) -> Result<i64, CounterError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), CounterError> {
        self.inner.set(key, value).await
    }

    async fn set_if_absent(&self, key: &str, value: i64) -> Result<bool, CounterError> {
        self.inner.set_if_absent(key, value).await
    }
}

/// Decision log that rejects every append
struct FailingDecisionLog;

#[async_trait]
impl DecisionLog for FailingDecisionLog {
    async fn append(&self, _record: &DecisionRecord) -> Result<(), DecisionLogError> {
        Err(DecisionLogError::Unavailable("injected failure".to_string()))
    }
}

#[tokio::test]
async fn test_end_to_end_route_reserve_and_log() {
    let counters = Arc::new(MemoryCounterStore::new());
    let decisions = Arc::new(MemoryDecisionLog::new());
    let router = create_test_router(counters.clone(), decisions.clone());

    let roster = Roster {
        requesters: vec![create_test_requester(1), create_test_requester(2)],
        workers: vec![
            create_test_worker(10, &["frontend"], Some(4)),
            create_test_worker(11, &["backend", "systems"], Some(4)),
            create_test_worker(12, &["backend"], Some(4)),
        ],
    };
    let request = create_test_request(Some(1));

    let decision = router.route(&roster, &request).await;

    let (worker_id, score, current_sessions) = match decision {
        Decision::Assigned {
            requester_id,
            worker_id,
            score,
            current_sessions,
        } => {
            assert_eq!(requester_id, 1);
            (worker_id, score, current_sessions)
        }
        other => panic!("Expected an assignment, got {:?}", other),
    };

    // Worker 11 covers both requested topics and wins
    assert_eq!(worker_id, 11);
    assert_eq!(current_sessions, 1);

    // The reservation landed on the assigned worker only
    assert_eq!(counters.get(&CounterKey::sessions(11)).await.unwrap(), 1);
    assert_eq!(counters.get(&CounterKey::sessions(10)).await.unwrap(), 0);
    assert_eq!(counters.get(&CounterKey::sessions(12)).await.unwrap(), 0);

    // The decision was recorded with the request context
    let records = decisions.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, DecisionStatus::Assigned);
    assert_eq!(records[0].requester_id, 1);
    assert_eq!(records[0].worker_id, Some(11));
    assert_eq!(records[0].topics, request.topics);
    assert_eq!(records[0].language, request.language);
    assert_eq!(records[0].score, Some(score));
    assert_eq!(score, (score * 1000.0).round() / 1000.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_capacity_race_grants_a_single_slot_once() {
    let counters = Arc::new(MemoryCounterStore::new());
    let decisions = Arc::new(MemoryDecisionLog::new());
    let router = Arc::new(create_test_router(counters.clone(), decisions.clone()));

    let roster = Arc::new(Roster {
        requesters: vec![create_test_requester(1)],
        workers: vec![create_test_worker(10, &["backend"], Some(1))],
    });

    let mut handles = Vec::new();
    for _ in 0..2 {
        let router = router.clone();
        let roster = roster.clone();
        handles.push(tokio::spawn(async move {
            router.route(&roster, &create_test_request(Some(1))).await
        }));
    }

    let mut assigned = 0;
    let mut at_capacity = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Decision::Assigned { worker_id, .. } => {
                assert_eq!(worker_id, 10);
                assigned += 1;
            }
            Decision::NoMatch { reason } => {
                assert_eq!(reason, NoMatchReason::AllCandidatesAtCapacity);
                at_capacity += 1;
            }
        }
    }

    assert_eq!(assigned, 1, "Exactly one request may take the single slot");
    assert_eq!(at_capacity, 1);
    assert_eq!(counters.get(&CounterKey::sessions(10)).await.unwrap(), 1);

    // Completing the session frees the slot for the next request
    assert_eq!(router.complete(10).await.unwrap(), 0);
    let retry = router.route(&roster, &create_test_request(Some(1))).await;
    assert!(
        matches!(
            retry,
            Decision::Assigned {
                worker_id: 10,
                current_sessions: 1,
                ..
            }
        ),
        "Freed slot should be grantable again, got {:?}",
        retry
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_load_never_exceeds_ceiling() {
    let counters = Arc::new(MemoryCounterStore::new());
    let decisions = Arc::new(MemoryDecisionLog::new());
    let router = Arc::new(create_test_router(counters.clone(), decisions.clone()));

    let roster = Arc::new(Roster {
        requesters: vec![create_test_requester(1)],
        workers: vec![create_test_worker(10, &["backend"], Some(3))],
    });

    let mut handles = Vec::new();
    for _ in 0..10 {
        let router = router.clone();
        let roster = roster.clone();
        handles.push(tokio::spawn(async move {
            router.route(&roster, &create_test_request(Some(1))).await
        }));
    }

    let mut assigned = 0;
    for handle in handles {
        if let Decision::Assigned { .. } = handle.await.unwrap() {
            assigned += 1;
        }
    }

    assert_eq!(assigned, 3, "Assignments must not exceed the ceiling of 3");
    assert_eq!(counters.get(&CounterKey::sessions(10)).await.unwrap(), 3);

    // Every request produced exactly one decision record
    let records = decisions.records().await;
    assert_eq!(records.len(), 10);
    let assigned_records = records
        .iter()
        .filter(|r| r.status == DecisionStatus::Assigned)
        .count();
    assert_eq!(assigned_records, 3);
}

#[tokio::test]
async fn test_fallback_rolls_back_the_rejected_probe() {
    let counters = Arc::new(RecordingCounterStore::new());
    let decisions = Arc::new(MemoryDecisionLog::new());
    let router = create_test_router(counters.clone(), decisions);

    let roster = Roster {
        requesters: vec![create_test_requester(1)],
        workers: vec![
            create_test_worker(10, &["backend", "systems"], Some(1)),
            create_test_worker(11, &["backend"], Some(4)),
        ],
    };
    let request = create_test_request(Some(1));

    let first = router.route(&roster, &request).await;
    let second = router.route(&roster, &request).await;

    assert!(matches!(first, Decision::Assigned { worker_id: 10, .. }));
    assert!(matches!(second, Decision::Assigned { worker_id: 11, .. }));

    let best_key = CounterKey::sessions(10);
    let fallback_key = CounterKey::sessions(11);

    // The second request probed worker 10, bounced, and compensated
    assert_eq!(counters.increments_for(&best_key).await, 2);
    assert_eq!(counters.decrements_for(&best_key).await, 1);
    assert_eq!(counters.increments_for(&fallback_key).await, 1);
    assert_eq!(counters.decrements_for(&fallback_key).await, 0);

    assert_eq!(counters.get(&best_key).await.unwrap(), 1);
    assert_eq!(counters.get(&fallback_key).await.unwrap(), 1);
}

#[tokio::test]
async fn test_exhausted_pool_leaves_no_residue() {
    let counters = Arc::new(RecordingCounterStore::new());
    let decisions = Arc::new(MemoryDecisionLog::new());
    let router = create_test_router(counters.clone(), decisions);

    let roster = Roster {
        requesters: vec![create_test_requester(1)],
        workers: vec![
            create_test_worker(10, &["backend"], Some(0)),
            create_test_worker(11, &["backend"], Some(0)),
        ],
    };

    let decision = router.route(&roster, &create_test_request(Some(1))).await;
    assert_eq!(
        decision,
        Decision::no_match(NoMatchReason::AllCandidatesAtCapacity)
    );

    // Every probe was compensated and both counters read zero again
    for worker_id in [10, 11] {
        let key = CounterKey::sessions(worker_id);
        assert_eq!(
            counters.increments_for(&key).await,
            counters.decrements_for(&key).await,
            "Unbalanced reservations for worker {}",
            worker_id
        );
        assert_eq!(counters.get(&key).await.unwrap(), 0);
    }
}

#[tokio::test]
async fn test_counter_failure_rejects_only_that_candidate() {
    let counters = Arc::new(FailingIncrementStore::new(CounterKey::sessions(10)));
    let decisions = Arc::new(MemoryDecisionLog::new());
    let router = create_test_router(counters.clone(), decisions);

    let roster = Roster {
        requesters: vec![create_test_requester(1)],
        workers: vec![
            create_test_worker(10, &["backend", "systems"], Some(4)),
            create_test_worker(11, &["backend"], Some(4)),
        ],
    };

    let decision = router.route(&roster, &create_test_request(Some(1))).await;
    assert!(
        matches!(decision, Decision::Assigned { worker_id: 11, .. }),
        "A failed reservation should fall through to the next candidate, got {:?}",
        decision
    );

    assert_eq!(counters.get(&CounterKey::sessions(10)).await.unwrap(), 0);
    assert_eq!(counters.get(&CounterKey::sessions(11)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_decision_log_failure_does_not_fail_routing() {
    let counters = Arc::new(MemoryCounterStore::new());
    let router = create_test_router(counters.clone(), Arc::new(FailingDecisionLog));

    let roster = Roster {
        requesters: vec![create_test_requester(1)],
        workers: vec![create_test_worker(10, &["backend"], Some(4))],
    };

    let decision = router.route(&roster, &create_test_request(Some(1))).await;
    assert!(matches!(decision, Decision::Assigned { worker_id: 10, .. }));

    // The reservation still happened even though nothing could be logged
    assert_eq!(counters.get(&CounterKey::sessions(10)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_completion_floors_at_zero() {
    let counters = Arc::new(MemoryCounterStore::new());
    let decisions = Arc::new(MemoryDecisionLog::new());
    let router = create_test_router(counters.clone(), decisions);

    // Completion for a worker that never held a session reports zero
    assert_eq!(router.complete(99).await.unwrap(), 0);
    assert_eq!(router.complete(99).await.unwrap(), 0);
    assert_eq!(counters.get(&CounterKey::sessions(99)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_no_match_reasons_surface() {
    let counters = Arc::new(MemoryCounterStore::new());
    let decisions = Arc::new(MemoryDecisionLog::new());
    let router = create_test_router(counters, decisions);

    let roster = Roster {
        requesters: vec![create_test_requester(1)],
        workers: vec![create_test_worker(10, &["backend"], Some(4))],
    };

    // Unknown requester id
    let decision = router.route(&roster, &create_test_request(Some(42))).await;
    assert_eq!(
        decision,
        Decision::no_match(NoMatchReason::RequesterNotFound)
    );

    // Nobody in the pool speaks the requested language
    let mut request = create_test_request(Some(1));
    request.language = "fi".to_string();
    let decision = router.route(&roster, &request).await;
    assert_eq!(decision, Decision::no_match(NoMatchReason::NoCandidates));

    // Empty requester pool with no explicit requester
    let empty = Roster {
        requesters: vec![],
        workers: roster.workers.clone(),
    };
    let decision = router.route(&empty, &create_test_request(None)).await;
    assert_eq!(
        decision,
        Decision::no_match(NoMatchReason::NoRequestersLoaded)
    );
}

#[tokio::test]
async fn test_reliability_orders_otherwise_equal_workers() {
    let counters = MemoryCounterStore::new();
    let requester = create_test_requester(1);
    let request = create_test_request(Some(1));

    let mut flaky = create_test_worker(10, &["backend"], Some(4));
    flaky.reliability = 0.1;
    let mut dependable = create_test_worker(11, &["backend"], Some(4));
    dependable.reliability = 0.9;

    // Pool order favors the flaky worker so reliability has to win on score
    let workers = vec![flaky, dependable];
    let ranked = rank_candidates(&requester, &request, &workers, &counters).await;

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].worker.worker_id, 11);
    assert_eq!(ranked[1].worker.worker_id, 10);
    assert!((ranked[0].score - ranked[1].score - 0.4).abs() < 1e-9);
}

#[tokio::test]
async fn test_sensitive_requests_prefer_empathetic_workers() {
    let counters = Arc::new(MemoryCounterStore::new());
    let decisions = Arc::new(MemoryDecisionLog::new());
    let router = create_test_router(counters, decisions);

    let mut warm = create_test_worker(10, &["backend"], Some(4));
    warm.empathy_score = 0.95;
    let mut brisk = create_test_worker(11, &["backend"], Some(4));
    brisk.empathy_score = 0.2;

    let roster = Roster {
        requesters: vec![create_test_requester(1)],
        // Pool order favors the brisk worker so the preference has to win on score
        workers: vec![brisk, warm],
    };

    let mut request = create_test_request(Some(1));
    request.sensitivity = true;

    let decision = router.route(&roster, &request).await;
    assert!(
        matches!(decision, Decision::Assigned { worker_id: 10, .. }),
        "Sensitive session should go to the empathetic worker, got {:?}",
        decision
    );
}

#[tokio::test]
async fn test_load_spreads_across_equal_workers() {
    let counters = Arc::new(MemoryCounterStore::new());
    let decisions = Arc::new(MemoryDecisionLog::new());
    let router = create_test_router(counters.clone(), decisions);

    let roster = Roster {
        requesters: vec![create_test_requester(1)],
        workers: vec![
            create_test_worker(10, &["backend"], None),
            create_test_worker(11, &["backend"], None),
        ],
    };
    let request = create_test_request(Some(1));

    let mut order = Vec::new();
    for _ in 0..3 {
        match router.route(&roster, &request).await {
            Decision::Assigned { worker_id, .. } => order.push(worker_id),
            other => panic!("Expected an assignment, got {:?}", other),
        }
    }

    // Ties go to pool order, then the load penalty alternates the pick
    assert_eq!(order, vec![10, 11, 10]);
    assert_eq!(counters.get(&CounterKey::sessions(10)).await.unwrap(), 2);
    assert_eq!(counters.get(&CounterKey::sessions(11)).await.unwrap(), 1);
}
