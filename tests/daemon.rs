use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

use quotebook::config::PersonalityConfig;
use quotebook::cooldown::RateLimiter;
use quotebook::daemon::{build_router, AppState};
use quotebook::store::QuoteStore;

struct Fixture {
    _dir: TempDir,
    state: AppState,
}

async fn make_state(files: &[(&str, &str)]) -> Fixture {
    let dir = tempdir().expect("temp dir");
    let quotes_dir = dir.path().join("quotes");
    std::fs::create_dir_all(&quotes_dir).expect("quotes dir");
    let mut configured = Vec::new();
    for (key, contents) in files {
        std::fs::write(quotes_dir.join(format!("{key}.txt")), contents).expect("quote file");
        configured.push(PersonalityConfig {
            key: key.to_string(),
            name: key.to_uppercase(),
        });
    }

    let db_path = dir.path().join("quotebook.db");
    let store = QuoteStore::new(db_path.to_string_lossy().as_ref())
        .await
        .expect("store");
    store
        .ensure_seeded(&configured, quotes_dir.to_string_lossy().as_ref())
        .await
        .expect("seed");

    let state = AppState {
        store: Arc::new(store),
        limiter: Arc::new(RateLimiter::new(6, 15)),
        quotes_dir: quotes_dir.to_string_lossy().to_string(),
    };
    Fixture { _dir: dir, state }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("encode")))
        .expect("request")
}

#[tokio::test]
async fn health_reports_ok() {
    let fixture = make_state(&[("wgg", "a\n")]).await;
    let app = build_router(fixture.state);

    let response = app.oneshot(get("/health")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn random_quote_returns_404_when_store_is_empty() {
    let fixture = make_state(&[("wgg", "# nothing but comments\n")]).await;
    let app = build_router(fixture.state);

    let response = app
        .oneshot(get("/api/quotes/random"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn random_quote_serves_and_logs_command_usage() {
    let fixture = make_state(&[("wgg", "only quote\n")]).await;
    let store = fixture.state.store.clone();
    let app = build_router(fixture.state);

    let response = app
        .oneshot(get("/api/quotes/random?user_id=u1"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["content"], "only quote");
    assert_eq!(body["personality"], "WGG");

    let stats = store.statistics().await.expect("stats");
    assert_eq!(stats.total_commands, 1);
}

#[tokio::test]
async fn random_quote_applies_general_cooldown_per_user() {
    let fixture = make_state(&[("wgg", "a\nb\n")]).await;
    let app = build_router(fixture.state);

    let first = app
        .clone()
        .oneshot(get("/api/quotes/random?user_id=u1"))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(get("/api/quotes/random?user_id=u1"))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    // Anonymous and other users are unaffected.
    let anonymous = app
        .clone()
        .oneshot(get("/api/quotes/random"))
        .await
        .expect("response");
    assert_eq!(anonymous.status(), StatusCode::OK);
    let other = app
        .oneshot(get("/api/quotes/random?user_id=u2"))
        .await
        .expect("response");
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn specific_quote_cooldown_reports_minutes_left() {
    let fixture = make_state(&[("wgg", "first\nsecond\n")]).await;
    let app = build_router(fixture.state);

    let first = app
        .clone()
        .oneshot(get("/api/personalities/wgg/quotes/2?user_id=u1"))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::OK);
    let body = body_json(first).await;
    assert_eq!(body["number"], 2);
    assert_eq!(body["content"], "second");

    let second = app
        .oneshot(get("/api/personalities/wgg/quotes/2?user_id=u1"))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(second).await;
    // A second or less has elapsed, so nearly the whole 15-minute window
    // remains; the rounded-up report is 15 or 16 depending on the clock tick.
    let minutes_left = body["minutes_left"].as_i64().expect("minutes_left");
    assert!((15..=16).contains(&minutes_left));
}

#[tokio::test]
async fn specific_quote_miss_is_404() {
    let fixture = make_state(&[("wgg", "first\n")]).await;
    let app = build_router(fixture.state);

    let response = app
        .clone()
        .oneshot(get("/api/personalities/wgg/quotes/42"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(get("/api/personalities/nobody/quotes/1"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn vote_endpoint_validates_and_reports_fresh_tallies() {
    let fixture = make_state(&[("wgg", "a\n")]).await;
    let store = fixture.state.store.clone();
    let app = build_router(fixture.state);

    let quote = store
        .quote_by_id(1)
        .await
        .expect("fetch")
        .expect("seeded quote");

    let bad_value = app
        .clone()
        .oneshot(post_json(
            &format!("/api/quotes/{}/vote", quote.id),
            json!({"user_id": "u1", "vote": 5}),
        ))
        .await
        .expect("response");
    assert_eq!(bad_value.status(), StatusCode::BAD_REQUEST);

    let missing_user = app
        .clone()
        .oneshot(post_json(
            &format!("/api/quotes/{}/vote", quote.id),
            json!({"user_id": "", "vote": 1}),
        ))
        .await
        .expect("response");
    assert_eq!(missing_user.status(), StatusCode::BAD_REQUEST);

    let unknown_quote = app
        .clone()
        .oneshot(post_json(
            "/api/quotes/9999/vote",
            json!({"user_id": "u1", "vote": 1}),
        ))
        .await
        .expect("response");
    assert_eq!(unknown_quote.status(), StatusCode::NOT_FOUND);

    let upvote = app
        .clone()
        .oneshot(post_json(
            &format!("/api/quotes/{}/vote", quote.id),
            json!({"user_id": "u1", "vote": 1}),
        ))
        .await
        .expect("response");
    assert_eq!(upvote.status(), StatusCode::OK);
    let body = body_json(upvote).await;
    assert_eq!(body["upvotes"], 1);
    assert_eq!(body["downvotes"], 0);
    assert_eq!(body["score"], 1);

    let flip = app
        .oneshot(post_json(
            &format!("/api/quotes/{}/vote", quote.id),
            json!({"user_id": "u1", "vote": -1}),
        ))
        .await
        .expect("response");
    assert_eq!(flip.status(), StatusCode::OK);
    let body = body_json(flip).await;
    assert_eq!(body["upvotes"], 0);
    assert_eq!(body["downvotes"], 1);
    assert_eq!(body["score"], -1);
}

#[tokio::test]
async fn search_requires_a_query() {
    let fixture = make_state(&[("wgg", "Hello world\n")]).await;
    let app = build_router(fixture.state);

    let missing = app
        .clone()
        .oneshot(get("/api/quotes/search"))
        .await
        .expect("response");
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let found = app
        .oneshot(get("/api/quotes/search?q=hello"))
        .await
        .expect("response");
    assert_eq!(found.status(), StatusCode::OK);
    let body = body_json(found).await;
    assert_eq!(body.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn top_quotes_endpoint_honors_limit() {
    let fixture = make_state(&[("wgg", "a\nb\nc\n")]).await;
    let app = build_router(fixture.state);

    let response = app
        .oneshot(get("/api/quotes/top?limit=2"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().expect("array").len(), 2);
}

#[tokio::test]
async fn stats_endpoint_reports_totals_and_personalities() {
    let fixture = make_state(&[("wgg", "a\nb\n"), ("wriu", "c\n")]).await;
    let app = build_router(fixture.state);

    let response = app.oneshot(get("/api/stats")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_quotes"], 3);
    assert_eq!(body["total_votes"], 0);
    let personalities = body["personalities"].as_array().expect("array");
    assert_eq!(personalities.len(), 2);
    assert_eq!(personalities[0]["name"], "WGG");
    assert_eq!(personalities[0]["quotes_count"], 2);
}

#[tokio::test]
async fn reload_endpoint_reloads_from_files() {
    let fixture = make_state(&[("wgg", "a\n")]).await;
    let quotes_dir = fixture.state.quotes_dir.clone();
    let store = fixture.state.store.clone();
    let app = build_router(fixture.state);

    std::fs::write(
        std::path::Path::new(&quotes_dir).join("wgg.txt"),
        "a\nb\nc\n",
    )
    .expect("rewrite");

    let response = app.oneshot(post_json("/api/reload", json!({}))).await;
    let response = response.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["reloaded"], true);

    let stats = store.statistics().await.expect("stats");
    assert_eq!(stats.total_quotes, 3);
}
