//! Shared harness for the gateway HTTP tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use preview_api::{
    auth::{issue_token, AuthConfig, JwtSecret},
    create_router, AppState, GatewayConfig,
};
use preview_core::User;
use preview_storage::{CatalogStore, InMemoryCatalog, InMemoryObjects, ObjectMetadata, StoredObject};
use preview_test_utils::CountingCatalog;
use tower::ServiceExt;

pub const BUCKET: &str = "previews";
pub const JWT_SECRET: &str = "gateway-integration-secret";

/// A gateway wired to in-memory stores.
pub struct TestGateway {
    pub state: AppState,
    pub catalog: Arc<CountingCatalog>,
    pub objects: Arc<InMemoryObjects>,
}

impl TestGateway {
    pub fn new(store: InMemoryCatalog) -> Self {
        Self::with_config(store, test_config())
    }

    pub fn with_config(store: InMemoryCatalog, config: GatewayConfig) -> Self {
        let catalog = Arc::new(CountingCatalog::new(store));
        let objects = Arc::new(InMemoryObjects::new());
        let state = AppState::new(
            catalog.clone() as Arc<dyn CatalogStore>,
            objects.clone(),
            test_auth(),
            config,
        );
        Self {
            state,
            catalog,
            objects,
        }
    }

    /// Gateway over an arbitrary store; the counting handle is unused.
    pub fn with_store(store: Arc<dyn CatalogStore>) -> Self {
        Self::with_store_and_config(store, test_config())
    }

    pub fn with_store_and_config(store: Arc<dyn CatalogStore>, config: GatewayConfig) -> Self {
        let objects = Arc::new(InMemoryObjects::new());
        let state = AppState::new(store, objects.clone(), test_auth(), config);
        Self {
            state,
            catalog: Arc::new(CountingCatalog::default()),
            objects,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn token_for(&self, login: &str) -> String {
        issue_token(&self.state.auth, &User::new(login)).unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router().oneshot(request).await.unwrap()
    }

    /// Send an authenticated request as `login`.
    pub async fn send_as(&self, login: &str, method: Method, uri: &str, body: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", self.token_for(login)));
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn put_object(&self, key: &str, etag: &str, content_type: &str, body: &str) {
        self.objects
            .put(
                BUCKET,
                key,
                StoredObject {
                    metadata: ObjectMetadata {
                        etag: Some(etag.to_string()),
                        content_type: Some(content_type.to_string()),
                        cache_control: Some("max-age=60".to_string()),
                        ..Default::default()
                    },
                    body: body.as_bytes().to_vec(),
                },
            )
            .await;
    }
}

pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        bucket: BUCKET.to_string(),
        ..GatewayConfig::default()
    }
}

pub fn test_auth() -> AuthConfig {
    AuthConfig {
        jwt_secret: JwtSecret::new(JWT_SECRET.to_string()).unwrap(),
        ..AuthConfig::default()
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
