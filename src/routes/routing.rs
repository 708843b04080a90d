use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use tokio::sync::RwLock;
use validator::Validate;

use crate::core::Router;
use crate::models::{
    CompleteRequest, CompleteResponse, Decision, ErrorResponse, HealthResponse, ReloadResponse,
    ResetResponse, Roster, RouteRequest, RouteResponse, StateResponse, WorkerSessionsResponse,
    WorkerState,
};
use crate::services::{CounterKey, CounterStore, RegistryClient};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub counters: Arc<dyn CounterStore>,
    pub registry: Arc<RegistryClient>,
    pub roster: Arc<RwLock<Roster>>,
}

/// Configure all routing endpoints
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/route", web::post().to(route_session))
        .route("/complete", web::post().to(complete_session))
        .route("/state", web::get().to(pool_state))
        .route("/state/{worker_id}", web::get().to(worker_sessions))
        .route("/admin/reload", web::post().to(reload_roster))
        .route("/admin/reset_sessions", web::post().to(reset_sessions));
}

/// Health check endpoint
///
/// GET /healthz
///
/// Always answers 200; a degraded dependency shows up in the body.
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let registry_healthy = state.registry.health_check().await.unwrap_or(false);
    // A plain read doubles as a counter-store ping
    let counters_result = state.counters.get("health:probe").await;

    let mut problems = Vec::new();
    if !registry_healthy {
        problems.push("registry unreachable".to_string());
    }
    if let Err(e) = counters_result {
        problems.push(format!("counter store: {}", e));
    }

    HttpResponse::Ok().json(HealthResponse {
        ok: problems.is_empty(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        error: if problems.is_empty() {
            None
        } else {
            Some(problems.join("; "))
        },
    })
}

/// Route a session request to the best available worker
///
/// POST /v1/route
///
/// Request body:
/// ```json
/// {
///   "topics": ["string"],
///   "language": "string",
///   "budget": 100.0,
///   "sensitivity": false,
///   "slaMin": 30,
///   "requesterId": 42
/// }
/// ```
async fn route_session(
    state: web::Data<AppState>,
    req: web::Json<RouteRequest>,
) -> impl Responder {
    // Validate request
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let route_id = uuid::Uuid::new_v4();
    tracing::info!(
        "[{}] Routing request: language={}, topics={:?}, budget={}, sensitivity={}",
        route_id,
        req.language,
        req.topics,
        req.budget,
        req.sensitivity
    );

    let roster = state.roster.read().await;
    let decision = state.router.route(&roster, &req).await;

    match &decision {
        Decision::Assigned {
            worker_id,
            score,
            current_sessions,
            ..
        } => {
            tracing::info!(
                "[{}] Assigned worker {} (score {}, sessions {})",
                route_id,
                worker_id,
                score,
                current_sessions
            );
        }
        Decision::NoMatch { reason } => {
            tracing::info!("[{}] No match: {:?}", route_id, reason);
        }
    }

    HttpResponse::Ok().json(RouteResponse::from(decision))
}

/// Mark a session finished and release the worker's slot
///
/// POST /v1/complete
///
/// Request body:
/// ```json
/// {
///   "workerId": 42
/// }
/// ```
async fn complete_session(
    state: web::Data<AppState>,
    req: web::Json<CompleteRequest>,
) -> impl Responder {
    // Validate request
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    match state.router.complete(req.worker_id).await {
        Ok(current_sessions) => HttpResponse::Ok().json(CompleteResponse {
            status: "ok".to_string(),
            worker_id: req.worker_id,
            current_sessions,
        }),
        Err(e) => {
            // Without the release the slot would leak, so this one is an error
            tracing::error!("Failed to release session for worker {}: {}", req.worker_id, e);
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: "Counter store unavailable".to_string(),
                message: e.to_string(),
                status_code: 503,
            })
        }
    }
}

/// Live load across the whole worker pool
///
/// GET /v1/state
async fn pool_state(state: web::Data<AppState>) -> impl Responder {
    let roster = state.roster.read().await;

    let mut workers = Vec::with_capacity(roster.workers.len());
    for worker in &roster.workers {
        let current_sessions = match state
            .counters
            .get(&CounterKey::sessions(worker.worker_id))
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(
                    "Failed to read session count for worker {}: {}",
                    worker.worker_id,
                    e
                );
                0
            }
        };
        workers.push(WorkerState::from_worker(worker, current_sessions));
    }

    HttpResponse::Ok().json(StateResponse { workers })
}

/// Live load for a single worker
///
/// GET /v1/state/{worker_id}
async fn worker_sessions(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let worker_id = path.into_inner();
    let roster = state.roster.read().await;

    let worker = match roster.worker(worker_id) {
        Some(worker) => worker,
        None => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "Worker not found".to_string(),
                message: format!("No worker with id {}", worker_id),
                status_code: 404,
            });
        }
    };

    let current_sessions = match state.counters.get(&CounterKey::sessions(worker_id)).await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!("Failed to read session count for worker {}: {}", worker_id, e);
            0
        }
    };

    HttpResponse::Ok().json(WorkerSessionsResponse {
        worker_id,
        current_sessions,
        max_concurrent: worker.max_concurrent,
    })
}

/// Reload the requester and worker pools from the registry
///
/// POST /v1/admin/reload
async fn reload_roster(state: web::Data<AppState>) -> impl Responder {
    let new_roster = match state.registry.load_roster().await {
        Ok(roster) => roster,
        Err(e) => {
            tracing::error!("Roster reload failed: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Reload failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    // Every worker needs a counter before it can take traffic; existing
    // counts are left untouched
    for worker in &new_roster.workers {
        if let Err(e) = state
            .counters
            .set_if_absent(&CounterKey::sessions(worker.worker_id), 0)
            .await
        {
            tracing::warn!(
                "Failed to initialize session counter for worker {}: {}",
                worker.worker_id,
                e
            );
        }
    }

    let requesters = new_roster.requesters.len();
    let workers = new_roster.workers.len();
    *state.roster.write().await = new_roster;

    tracing::info!("Roster reloaded: {} requesters, {} workers", requesters, workers);

    HttpResponse::Ok().json(ReloadResponse {
        status: "ok".to_string(),
        requesters,
        workers,
    })
}

/// Zero out every worker's session counter
///
/// POST /v1/admin/reset_sessions
async fn reset_sessions(state: web::Data<AppState>) -> impl Responder {
    let roster = state.roster.read().await;

    let mut reset = 0;
    for worker in &roster.workers {
        match state
            .counters
            .set(&CounterKey::sessions(worker.worker_id), 0)
            .await
        {
            Ok(()) => reset += 1,
            Err(e) => tracing::warn!(
                "Failed to reset session counter for worker {}: {}",
                worker.worker_id,
                e
            ),
        }
    }

    tracing::info!("Reset session counters for {} workers", reset);

    HttpResponse::Ok().json(ResetResponse {
        status: "ok".to_string(),
        reset,
    })
}
