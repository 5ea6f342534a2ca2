use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use tracing::Instrument;
use validator::Validate;

use crate::core::{MatchError, Matcher};
use crate::models::{
    ErrorResponse, HealthResponse, MatchHostsRequest, MatchQuery, MatchResponse, RecommendEventsRequest,
};
use crate::services::{CandidateQuery, CandidateStore, EventFilter, HostFilter};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CandidateStore>,
    pub matcher: Matcher,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/match/hosts", web::post().to(match_hosts))
        .route("/match/events", web::post().to(recommend_events));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        oracle_configured: state.matcher.oracle_configured(),
        timestamp: chrono::Utc::now(),
    })
}

/// Match a visitor with available hosts
///
/// POST /api/v1/match/hosts
///
/// Request body:
/// ```json
/// {
///   "visitor_query": "I need a quiet place, early bedtime",
///   "date_needed": "2025-11-08",
///   "min_capacity": 1,
///   "max_results": 10
/// }
/// ```
async fn match_hosts(
    state: web::Data<AppState>,
    req: web::Json<MatchHostsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for match_hosts request: {:?}", errors);
        return validation_failed(errors.to_string());
    }

    let filter = HostFilter {
        date: Some(req.date_needed.clone()),
        min_capacity: req.min_capacity,
    };
    let mut query = MatchQuery::hosts(req.visitor_query.clone(), req.date_needed.clone());
    query.max_results = req.max_results;

    run_match(&state, CandidateQuery::Hosts(filter), query).await
}

/// Recommend campus events for a student's interests
///
/// POST /api/v1/match/events
///
/// Request body:
/// ```json
/// {
///   "user_interests": "free tech talks and music",
///   "category": "academic",
///   "date_from": "2025-11-10",
///   "date_to": "2025-11-20",
///   "free_only": false,
///   "tags": "ai,music",
///   "max_results": 5
/// }
/// ```
async fn recommend_events(
    state: web::Data<AppState>,
    req: web::Json<RecommendEventsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for recommend_events request: {:?}", errors);
        return validation_failed(errors.to_string());
    }

    let req = req.into_inner();
    let filter = EventFilter {
        category: req.category,
        date_from: req.date_from,
        date_to: req.date_to,
        free_only: req.free_only,
        tags: req.tags,
    };
    let mut query = MatchQuery::events(req.user_interests);
    query.max_results = req.max_results;

    run_match(&state, CandidateQuery::Events(filter), query).await
}

async fn run_match(state: &AppState, candidates: CandidateQuery, query: MatchQuery) -> HttpResponse {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("rank", %request_id, kind = %query.kind);

    async move {
        let pool = match state.store.get_candidates(&candidates).await {
            Ok(pool) => pool,
            Err(e) => {
                tracing::error!("Failed to load {} candidates: {}", query.kind, e);
                return HttpResponse::InternalServerError().json(ErrorResponse {
                    error: "Failed to load candidates".to_string(),
                    message: e.to_string(),
                    status_code: 500,
                });
            }
        };

        tracing::debug!("Ranking {} {} candidates", pool.len(), query.kind);

        match state.matcher.rank(&query, pool).await {
            Ok(result) => HttpResponse::Ok().json(MatchResponse::from(result)),
            Err(e @ MatchError::InvalidQuery(_)) => validation_failed(e.to_string()),
            Err(e) => {
                tracing::error!("Ranking failed: {}", e);
                HttpResponse::InternalServerError().json(ErrorResponse {
                    error: "Ranking failed".to_string(),
                    message: e.to_string(),
                    status_code: 500,
                })
            }
        }
    }
    .instrument(span)
    .await
}

fn validation_failed(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message,
        status_code: 400,
    })
}

