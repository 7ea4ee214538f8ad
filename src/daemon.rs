use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cooldown::{RateLimiter, SpecificDecision};
use crate::error::{QuotebookError, Result};
use crate::store::QuoteStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<QuoteStore>,
    pub limiter: Arc<RateLimiter>,
    pub quotes_dir: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Deserialize)]
struct RandomQuoteQuery {
    personality: Option<String>,
    user_id: Option<String>,
}

#[derive(Deserialize)]
struct SpecificQuoteQuery {
    user_id: Option<String>,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
    personality: Option<String>,
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct VoteRequest {
    user_id: String,
    vote: i32,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/quotes/random", get(random_quote))
        .route("/api/quotes/top", get(top_quotes))
        .route("/api/quotes/recent", get(recent_quotes))
        .route("/api/quotes/search", get(search_quotes))
        .route("/api/quotes/{id}/vote", post(vote_quote))
        .route(
            "/api/personalities/{key}/quotes/{number}",
            get(specific_quote),
        )
        .route("/api/commands/top", get(top_commands))
        .route("/api/stats", get(stats))
        .route("/api/reload", post(reload))
        .with_state(state)
}

pub async fn run(host: &str, port: u16, state: AppState) -> Result<()> {
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| QuotebookError::Store(e.to_string()))?;
    tracing::info!(%addr, "quotebookd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|e| QuotebookError::Store(e.to_string()))?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("QUOTEBOOK_GIT_SHA").to_string(),
    })
}

async fn random_quote(
    State(state): State<AppState>,
    Query(query): Query<RandomQuoteQuery>,
) -> Response {
    if let Some(user_id) = query.user_id.as_deref() {
        if !state.limiter.allow_command(user_id, "random") {
            return rate_limited(None);
        }
    }

    match state.store.random_quote(query.personality.as_deref()).await {
        Ok(Some(quote)) => {
            log_command(&state, query.user_id.as_deref(), "random", Some(quote.id)).await;
            (StatusCode::OK, Json(quote)).into_response()
        }
        Ok(None) => not_found("no quotes found"),
        Err(err) => store_failure(err),
    }
}

async fn specific_quote(
    State(state): State<AppState>,
    Path((key, number)): Path<(String, i32)>,
    Query(query): Query<SpecificQuoteQuery>,
) -> Response {
    if let Some(user_id) = query.user_id.as_deref() {
        match state.limiter.allow_specific(user_id, &key, number) {
            SpecificDecision::Allowed => {}
            SpecificDecision::Limited { minutes_left } => {
                return rate_limited(Some(minutes_left));
            }
        }
    }

    match state.store.specific_quote(&key, number).await {
        Ok(Some(quote)) => {
            log_command(&state, query.user_id.as_deref(), &key, Some(quote.id)).await;
            (StatusCode::OK, Json(quote)).into_response()
        }
        Ok(None) => not_found("quote not found"),
        Err(err) => store_failure(err),
    }
}

async fn vote_quote(
    State(state): State<AppState>,
    Path(quote_id): Path<i32>,
    Json(request): Json<VoteRequest>,
) -> Response {
    if request.user_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "user_id is required"})),
        )
            .into_response();
    }

    match state
        .store
        .record_vote(&request.user_id, quote_id, request.vote)
        .await
    {
        Ok(Some(outcome)) => (StatusCode::OK, Json(outcome)).into_response(),
        Ok(None) => not_found("quote not found"),
        Err(QuotebookError::Validation(message)) => {
            (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
        }
        Err(err) => store_failure(err),
    }
}

async fn top_quotes(State(state): State<AppState>, Query(query): Query<LimitQuery>) -> Response {
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    match state.store.top_quotes(limit).await {
        Ok(quotes) => (StatusCode::OK, Json(quotes)).into_response(),
        Err(err) => store_failure(err),
    }
}

async fn recent_quotes(State(state): State<AppState>, Query(query): Query<LimitQuery>) -> Response {
    let limit = query.limit.unwrap_or(5).clamp(1, 100);
    match state.store.recent_quotes(limit).await {
        Ok(quotes) => (StatusCode::OK, Json(quotes)).into_response(),
        Err(err) => store_failure(err),
    }
}

async fn search_quotes(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Response {
    let needle = match query.q.as_deref().map(str::trim) {
        Some(needle) if !needle.is_empty() => needle.to_string(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "query parameter q is required"})),
            )
                .into_response();
        }
    };

    match state
        .store
        .search_quotes(&needle, query.personality.as_deref())
        .await
    {
        Ok(quotes) => (StatusCode::OK, Json(quotes)).into_response(),
        Err(err) => store_failure(err),
    }
}

async fn top_commands(State(state): State<AppState>, Query(query): Query<LimitQuery>) -> Response {
    let limit = query.limit.unwrap_or(5).clamp(1, 100);
    match state.store.top_commands(limit).await {
        Ok(usage) => (StatusCode::OK, Json(usage)).into_response(),
        Err(err) => store_failure(err),
    }
}

async fn stats(State(state): State<AppState>) -> Response {
    match state.store.statistics().await {
        Ok(statistics) => (StatusCode::OK, Json(statistics)).into_response(),
        Err(err) => store_failure(err),
    }
}

async fn reload(State(state): State<AppState>) -> Response {
    match state.store.reload_all(&state.quotes_dir).await {
        Ok(()) => (StatusCode::OK, Json(json!({"reloaded": true}))).into_response(),
        Err(err) => store_failure(err),
    }
}

// A failed usage-log write must never fail the quote that was just served.
async fn log_command(state: &AppState, user_id: Option<&str>, command: &str, quote_id: Option<i32>) {
    let Some(user_id) = user_id else {
        return;
    };
    if let Err(err) = state.store.record_command(user_id, command, quote_id).await {
        tracing::warn!(user_id, command, %err, "Failed to record command usage");
    }
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": message}))).into_response()
}

fn rate_limited(minutes_left: Option<i64>) -> Response {
    let body = match minutes_left {
        Some(minutes_left) => json!({"error": "cooldown active", "minutes_left": minutes_left}),
        None => json!({"error": "cooldown active"}),
    };
    (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
}

fn store_failure(err: QuotebookError) -> Response {
    tracing::error!(%err, "Store operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal error"})),
    )
        .into_response()
}
