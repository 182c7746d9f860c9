//! API key middleware.
//!
//! Extracts `X-api-key` (header names are case-insensitive), hands it to
//! the [`KeyValidator`] and either passes the request on or answers
//! `403 Forbidden` with `{"success": false, "message": ...}`. Exactly one of
//! the two happens per request.
//!
//! # Logging Policy
//!
//! Only data-layer failures are logged at `error`, once per request, with the
//! route and the error detail. Missing and wrong keys are expected traffic
//! and are logged at `debug`.
//!
//! # Bypassed Endpoints
//!
//! Paths in the bypass list (default `/health`, `/ready`) are matched exactly
//! against `request.uri().path()` and skip validation so probes work without
//! credentials.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::{debug, error};

use crate::validator::KeyValidator;

/// Header carrying the presented key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Default paths that bypass authentication.
const DEFAULT_BYPASS_PATHS: [&str; 2] = ["/health", "/ready"];

/// API key authentication layer.
#[derive(Clone)]
pub struct ApiKeyAuth {
    validator: KeyValidator,
    bypass_paths: Arc<Vec<String>>,
}

impl ApiKeyAuth {
    pub fn new(validator: KeyValidator, bypass_paths: Vec<String>) -> Self {
        Self {
            validator,
            bypass_paths: Arc::new(bypass_paths),
        }
    }

    /// Create with default bypass paths ("/health", "/ready").
    pub fn with_defaults(validator: KeyValidator) -> Self {
        Self::new(
            validator,
            DEFAULT_BYPASS_PATHS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        )
    }
}

impl<S> Layer<S> for ApiKeyAuth {
    type Service = ApiKeyAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyAuthService {
            inner,
            validator: self.validator.clone(),
            bypass_paths: self.bypass_paths.clone(),
        }
    }
}

/// API key authentication service wrapper.
#[derive(Clone)]
pub struct ApiKeyAuthService<S> {
    inner: S,
    validator: KeyValidator,
    bypass_paths: Arc<Vec<String>>,
}

impl<S> Service<Request<Body>> for ApiKeyAuthService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let validator = self.validator.clone();
        let bypass_paths = self.bypass_paths.clone();
        // Take the service that was driven to readiness, leave a clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let path = req.uri().path();
            if bypass_paths.iter().any(|p| p == path) {
                debug!(path, "Bypassing API key check");
                return inner.call(req).await;
            }

            let presented = extract_api_key(&req).map(<[u8]>::to_vec);
            match validator.validate_raw(presented.as_deref()).await {
                Ok(source) => {
                    debug!(source = source.as_str(), "API key accepted");
                    req.extensions_mut().insert(source);
                    inner.call(req).await
                }
                Err(rejection) => {
                    let route = route_of(&req);
                    if rejection.is_internal() {
                        error!(
                            route = %route,
                            method = %req.method(),
                            error = %rejection,
                            "API key validation failed on data layer"
                        );
                    } else {
                        debug!(
                            route = %route,
                            outcome = rejection.outcome(),
                            "API key rejected"
                        );
                    }
                    Ok(rejection.into_response())
                }
            }
        })
    }
}

/// Read the presented key from the request, byte for byte.
///
/// Only an empty value counts as absent; any other bytes go to the
/// comparison unchanged.
fn extract_api_key<B>(req: &Request<B>) -> Option<&[u8]> {
    req.headers()
        .get(API_KEY_HEADER)
        .map(|value| value.as_bytes())
        .filter(|value| !value.is_empty())
}

/// Route template if the router matched one, else the raw path.
fn route_of<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use axum::Router;
    use axum::http::{HeaderValue, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::cache::{KeyCache, MemoryCache};
    use crate::models::KeySource;
    use crate::repository::MemoryKeyRepository;

    fn validator(cache: &MemoryCache, keys: &[&str]) -> KeyValidator {
        KeyValidator::new(
            Arc::new(cache.clone()),
            Arc::new(MemoryKeyRepository::new(keys.iter().copied())),
        )
    }

    /// Inner service that reports which key source the auth layer attached.
    fn echo_source() -> Router {
        Router::new().fallback(|req: Request<Body>| async move {
            req.extensions()
                .get::<KeySource>()
                .map(|s| s.as_str())
                .unwrap_or("none")
                .to_string()
        })
    }

    async fn body_string(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_extract_api_key_from_header() {
        let req = Request::builder()
            .header("X-api-key", "my-secret-key")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_api_key(&req), Some(&b"my-secret-key"[..]));
    }

    #[test]
    fn test_extract_api_key_header_name_case_insensitive() {
        for name in ["x-api-key", "X-API-KEY", "X-Api-Key"] {
            let req = Request::builder()
                .header(name, "k")
                .body(Body::empty())
                .unwrap();
            assert_eq!(extract_api_key(&req), Some(&b"k"[..]), "{name}");
        }
    }

    #[test]
    fn test_extract_api_key_none() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert!(extract_api_key(&req).is_none());
    }

    #[test]
    fn test_extract_api_key_empty_is_absent() {
        let req = Request::builder()
            .header("x-api-key", "")
            .body(Body::empty())
            .unwrap();
        assert!(extract_api_key(&req).is_none());
    }

    #[test]
    fn test_extract_api_key_keeps_non_ascii_bytes() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        req.headers_mut().insert(
            API_KEY_HEADER,
            HeaderValue::from_bytes(b"caf\xe9").unwrap(),
        );
        assert_eq!(extract_api_key(&req), Some(&b"caf\xe9"[..]));
    }

    #[test]
    fn test_route_of_falls_back_to_path() {
        let req = Request::builder()
            .uri("/members/42?x=1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(route_of(&req), "/members/42");
    }

    #[tokio::test]
    async fn test_admitted_request_carries_key_source() {
        let cache = MemoryCache::new();
        let svc = ApiKeyAuth::with_defaults(validator(&cache, &["ABC123"])).layer(echo_source());

        let req = Request::builder()
            .uri("/")
            .header("x-api-key", "ABC123")
            .body(Body::empty())
            .unwrap();
        let response = svc.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "repository");
    }

    #[tokio::test]
    async fn test_rejected_request_never_reaches_inner() {
        let cache = MemoryCache::new();
        cache
            .set("api_key", "ABC123", Duration::from_secs(60))
            .await
            .unwrap();
        let svc = ApiKeyAuth::with_defaults(validator(&cache, &[])).layer(echo_source());

        let req = Request::builder()
            .uri("/")
            .header("x-api-key", "WRONG")
            .body(Body::empty())
            .unwrap();
        let response = svc.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "You need to pass a valid API key.");
    }

    #[tokio::test]
    async fn test_utf8_key_outside_visible_ascii_is_admitted() {
        let cache = MemoryCache::new();
        cache
            .set("api_key", "café", Duration::from_secs(60))
            .await
            .unwrap();
        let svc = ApiKeyAuth::with_defaults(validator(&cache, &[])).layer(echo_source());

        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        req.headers_mut().insert(
            API_KEY_HEADER,
            HeaderValue::from_bytes("café".as_bytes()).unwrap(),
        );
        let response = svc.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "cache_current");
    }

    #[tokio::test]
    async fn test_opaque_header_bytes_are_a_mismatch_not_missing() {
        let cache = MemoryCache::new();
        cache
            .set("api_key", "ABC123", Duration::from_secs(60))
            .await
            .unwrap();
        let svc = ApiKeyAuth::with_defaults(validator(&cache, &[])).layer(echo_source());

        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        req.headers_mut().insert(
            API_KEY_HEADER,
            HeaderValue::from_bytes(b"caf\xe9").unwrap(),
        );
        let response = svc.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["message"], "You need to pass a valid API key.");
    }

    #[tokio::test]
    async fn test_bypass_path_skips_validation() {
        let cache = MemoryCache::new();
        let svc = ApiKeyAuth::with_defaults(validator(&cache, &[])).layer(echo_source());

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = svc.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "none");
    }

    #[tokio::test]
    async fn test_bypass_is_exact_match() {
        let cache = MemoryCache::new();
        let svc = ApiKeyAuth::with_defaults(validator(&cache, &[])).layer(echo_source());

        let req = Request::builder()
            .uri("/health/")
            .body(Body::empty())
            .unwrap();
        let response = svc.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
