//! GitHub webhooks and the OAuth callbacks over HTTP.

mod support;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::Query,
    http::{header, HeaderMap, Request, StatusCode},
    routing::{get as get_route, post},
    Json, Router,
};
use hmac::{Hmac, Mac};
use preview_api::{validate_token, GatewayConfig};
use preview_storage::CatalogStore;
use preview_test_utils::{fixtures, FailingCatalog};
use secrecy::SecretString;
use serde_json::{json, Value};
use sha2::Sha256;
use tokio::net::TcpListener;

use support::{body_json, get, test_config, TestGateway};

const HOOK_SECRET: &str = "hook-secret";
/// Nothing listens here; connections are refused.
const DEAD_ENDPOINT: &str = "http://127.0.0.1:9/login/oauth/access_token";

fn event(name: &str, body: &str, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/github/event")
        .header("x-github-event", name)
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-hub-signature-256", signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn sign(body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(HOOK_SECRET.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn signed_gateway() -> TestGateway {
    let mut config = test_config();
    config.github.webhook_secret = Some(SecretString::from(HOOK_SECRET.to_string()));
    TestGateway::with_config(fixtures::catalog(), config)
}

/// Code the fake provider accepts.
const GOOD_CODE: &str = "good-code";

/// Local stand-in for the GitHub and Slack OAuth endpoints.
async fn fake_provider() -> SocketAddr {
    async fn github_token(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        if params.get("code").map(String::as_str) == Some(GOOD_CODE) {
            Json(json!({ "access_token": "gho_1", "token_type": "bearer" }))
        } else {
            Json(json!({ "error": "bad_verification_code" }))
        }
    }

    async fn github_user(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
        match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            Some("token gho_1") => Ok(Json(json!({
                "login": "octocat",
                "avatar_url": "https://avatars.example/octocat.png",
                "html_url": "https://github.com/octocat"
            }))),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }

    async fn slack_token(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        if params.get("code").map(String::as_str) == Some(GOOD_CODE) {
            Json(json!({
                "ok": true,
                "team_id": "T1",
                "access_token": "xoxp-1",
                "scope": "bot",
                "bot": { "bot_user_id": "U1", "bot_access_token": "xoxb-1" }
            }))
        } else {
            Json(json!({ "ok": false, "error": "invalid_code" }))
        }
    }

    let router = Router::new()
        .route("/login/oauth/access_token", post(github_token))
        .route("/user", get_route(github_user))
        .route("/api/oauth.access", post(slack_token));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn provider_config() -> GatewayConfig {
    let addr = fake_provider().await;
    let mut config = test_config();
    config.github.token_url = format!("http://{}/login/oauth/access_token", addr);
    config.github.api_url = format!("http://{}", addr);
    config.slack.token_url = format!("http://{}/api/oauth.access", addr);
    config
}

fn branch_event(branch: &str) -> String {
    format!(
        r#"{{"ref":"{}","ref_type":"branch","sender":{{"login":"octocat"}}}}"#,
        branch
    )
}

// ============================================================================
// WEBHOOKS
// ============================================================================

#[tokio::test]
async fn test_ping_and_status() {
    let gateway = TestGateway::new(fixtures::catalog());

    assert_eq!(gateway.send(event("ping", "{}", None)).await.status(), StatusCode::OK);
    assert_eq!(gateway.send(event("status", "{}", None)).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_branch_lifecycle() {
    let gateway = TestGateway::new(fixtures::catalog());

    // Cache a miss first; the webhook must clear it.
    assert_eq!(
        gateway.send(get("/app/feature-x/current/")).await.status(),
        StatusCode::NOT_FOUND
    );

    let created = gateway.send(event("create", &branch_event("feature-x"), None)).await;
    assert_eq!(created.status(), StatusCode::OK);

    let app = gateway.catalog.query_app("feature-x").await.unwrap().unwrap();
    assert!(app.autoupdate);
    assert_eq!(app.owner, "octocat");
    assert!(gateway
        .state
        .cache
        .get_application("feature-x")
        .await
        .unwrap()
        .is_some());

    let deleted = gateway.send(event("delete", &branch_event("feature-x"), None)).await;
    assert_eq!(deleted.status(), StatusCode::OK);
    assert!(gateway.catalog.query_app("feature-x").await.unwrap().is_none());
}

#[tokio::test]
async fn test_tag_events_are_ignored() {
    let gateway = TestGateway::new(fixtures::catalog());
    let body = r#"{"ref":"v1.0.0","ref_type":"tag","sender":{"login":"octocat"}}"#;

    let response = gateway.send(event("create", body, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(gateway.catalog.query_apps().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_existing_branch_app_is_500() {
    let store = fixtures::catalog_with_app("main", false, &[], None).await.unwrap();
    let gateway = TestGateway::new(store);

    let response = gateway.send(event("create", &branch_event("main"), None)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_pull_request_is_acknowledged() {
    let gateway = TestGateway::new(fixtures::catalog());
    let body = r#"{"action":"opened","pull_request":{"number":42,
        "user":{"login":"octocat"},
        "head":{"label":"octocat:feature-x","ref":"feature-x"},
        "base":{"label":"octocat:main","ref":"main"}}}"#;

    let response = gateway.send(event("pull_request", body, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_event_is_501() {
    let gateway = TestGateway::new(fixtures::catalog());

    let response = gateway.send(event("issues", "{}", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let gateway = signed_gateway();

    let response = gateway.send(event("ping", "{}", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Missing GitHub signature");
}

#[tokio::test]
async fn test_wrong_signature_is_rejected() {
    let gateway = signed_gateway();
    let signature = sign("{\"tampered\":true}");

    let response = gateway.send(event("ping", "{}", Some(signature))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Wrong GitHub signature");
}

#[tokio::test]
async fn test_signed_event_is_accepted() {
    let gateway = signed_gateway();
    let body = branch_event("feature-y");

    let response = gateway.send(event("create", &body, Some(sign(&body)))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(gateway.catalog.query_app("feature-y").await.unwrap().is_some());
}

// ============================================================================
// OAUTH
// ============================================================================

#[tokio::test]
async fn test_github_exchange_failure_is_403() {
    let mut config = test_config();
    config.github.token_url = DEAD_ENDPOINT.to_string();
    let gateway = TestGateway::with_config(fixtures::catalog(), config);

    let response = gateway.send(get("/github/oauth?code=abc")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_slack_exchange_failure_is_403() {
    let mut config = test_config();
    config.slack.token_url = DEAD_ENDPOINT.to_string();
    let gateway = TestGateway::with_config(fixtures::catalog(), config);

    let response = gateway.send(get("/slack/oauth?code=abc")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_github_login_sets_session_cookie() {
    let gateway = TestGateway::with_config(fixtures::catalog(), provider_config().await);

    let response = gateway
        .send(get(&format!("/github/oauth?code={}", GOOD_CODE)))
        .await;
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/ui/");

    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    let session = cookie
        .strip_prefix("token=")
        .and_then(|rest| rest.split(';').next())
        .unwrap();

    let claims = validate_token(&gateway.state.auth, session).unwrap();
    assert_eq!(claims.sub, "octocat");
    assert_eq!(claims.avatar.as_deref(), Some("https://avatars.example/octocat.png"));
    assert_eq!(claims.home.as_deref(), Some("https://github.com/octocat"));
}

#[tokio::test]
async fn test_github_refused_code_is_403() {
    let gateway = TestGateway::with_config(fixtures::catalog(), provider_config().await);

    let response = gateway.send(get("/github/oauth?code=stale")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_slack_install_stores_workspace_token() {
    let gateway = TestGateway::with_config(fixtures::catalog(), provider_config().await);

    let response = gateway
        .send(get(&format!("/slack/oauth?code={}", GOOD_CODE)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let token = gateway.catalog.inner().third_party_token("T1").await.unwrap();
    assert_eq!(token.access_token, "xoxp-1");
    assert_eq!(token.scope, "bot");
    assert_eq!(token.bot_user_id.as_deref(), Some("U1"));
}

#[tokio::test]
async fn test_slack_refused_code_is_403() {
    let gateway = TestGateway::with_config(fixtures::catalog(), provider_config().await);

    let response = gateway.send(get("/slack/oauth?code=stale")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(gateway.catalog.inner().third_party_token("T1").await.is_none());
}

#[tokio::test]
async fn test_slack_store_failure_hides_detail() {
    let store = Arc::new(FailingCatalog::backend("relation \"tokens\" does not exist"));
    let gateway = TestGateway::with_store_and_config(store, provider_config().await);

    let response = gateway
        .send(get(&format!("/slack/oauth?code={}", GOOD_CODE)))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Database operation failed");
}

#[tokio::test]
async fn test_unavailable_store_on_webhook_is_503() {
    let store = Arc::new(FailingCatalog::unavailable());
    let gateway = TestGateway::with_store(store);

    let response = gateway.send(event("create", &branch_event("feature-z"), None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
