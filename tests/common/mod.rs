//! Shared fixtures for the HTTP-level tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Algorithm, Argon2, Params, Version,
};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use dbforge::auth::AuthGatekeeper;
use dbforge::http_server::{build_router, AppState, GatewayConfig};
use dbforge::instance::{InMemoryRuntime, LifecycleManager, ResourceLocator, WorkerSettings};
use dbforge::observability::GatewayMetrics;
use dbforge::query::QueryEngine;

pub const TEST_API_KEY: &str = "test-admin-key";
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Argon2id hash with minimum cost parameters so tests stay fast.
pub fn cheap_hash(key: &str) -> String {
    let params = Params::new(Params::MIN_M_COST, 1, 1, None).unwrap();
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);
    argon2.hash_password(key.as_bytes(), &salt).unwrap().to_string()
}

/// A full router over an in-memory runtime and a temporary data root.
pub struct TestGateway {
    _tmp: TempDir,
    pub data_root: PathBuf,
    pub runtime: Arc<InMemoryRuntime>,
    pub router: Router,
}

impl TestGateway {
    pub fn new() -> Self {
        Self::with_gatekeeper(AuthGatekeeper::new(API_KEY_HEADER, cheap_hash(TEST_API_KEY)))
    }

    pub fn unconfigured() -> Self {
        Self::with_gatekeeper(AuthGatekeeper::unconfigured(API_KEY_HEADER))
    }

    pub fn with_gatekeeper(gatekeeper: AuthGatekeeper) -> Self {
        let tmp = TempDir::new().unwrap();
        let data_root = tmp.path().join("databases");
        let runtime = Arc::new(InMemoryRuntime::new());
        let locator = ResourceLocator::new(data_root.clone());

        let config = GatewayConfig {
            data_root: data_root.clone(),
            ..GatewayConfig::default()
        };
        let lifecycle = LifecycleManager::new(
            runtime.clone(),
            locator.clone(),
            WorkerSettings {
                image: config.worker_image.clone(),
                network: config.network.clone(),
            },
        );
        let state = AppState::new(
            lifecycle,
            QueryEngine::new(locator),
            gatekeeper,
            Arc::new(GatewayMetrics::new()),
        );

        Self {
            _tmp: tmp,
            data_root,
            runtime,
            router: build_router(&config, state),
        }
    }

    /// Request carrying the valid test key
    pub async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        json_request(&self.router, method, uri, body, Some((API_KEY_HEADER, TEST_API_KEY))).await
    }

    /// Request with no key at all
    pub async fn call_anonymous(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        json_request(&self.router, method, uri, body, None).await
    }

    /// Spawn `name` and assert success
    pub async fn spawn(&self, name: &str) -> Value {
        let (status, body) = self
            .call("POST", &format!("/admin/databases/spawn/{}", name), None)
            .await;
        assert!(status.is_success(), "spawn {} failed: {} {}", name, status, body);
        body
    }
}

pub async fn json_request(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    header: Option<(&str, &str)>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some((name, value)) = header {
        builder = builder.header(name, value);
    }

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}
