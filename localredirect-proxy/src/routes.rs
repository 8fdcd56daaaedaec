//! Route configuration.

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use crate::handlers::{self, HEALTH_PATH};
use crate::middleware::local_redirect;
use crate::state::AppState;
use crate::upstream;

/// Creates the proxy router.
///
/// Every request except `GET` on the health endpoint goes through the
/// local-redirect middleware and, if not redirected, on to the upstream.
pub fn create_router(state: Arc<AppState>) -> Router {
    let proxied = Router::new()
        .fallback(upstream::forward)
        .layer(middleware::from_fn_with_state(state.clone(), local_redirect))
        .with_state(state.clone());

    Router::new()
        // Health check; other methods on this path are proxied
        .route(
            HEALTH_PATH,
            get(handlers::health_check).fallback_service(proxied.clone()),
        )
        .with_state(state)
        .fallback_service(proxied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use ipnet::IpNet;
    use tower::ServiceExt;
    use wiremock::matchers::{header as header_is, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use localredirect_core::error::{RedirectError, Result};
    use localredirect_core::traits::AddressSource;

    use crate::state::ProxyConfig;

    /// Router stand-in with a fixed IPv4 answer, or a transport failure.
    struct FixedSource {
        v4: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(v4: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                v4,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AddressSource for FixedSource {
        async fn external_ipv4(&self) -> Result<IpAddr> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.v4 {
                Some(ip) => Ok(ip.parse().unwrap()),
                None => Err(RedirectError::Transport("router unreachable".into())),
            }
        }

        async fn external_ipv6(&self) -> Result<Option<IpAddr>> {
            Ok(None)
        }

        async fn ipv6_prefix(&self) -> Result<Option<IpNet>> {
            Ok(None)
        }
    }

    fn app(source: Arc<FixedSource>, upstream_url: String) -> Router {
        let config = ProxyConfig {
            upstream_url,
            local_target: "internal.svc:8080".parse().unwrap(),
            ..ProxyConfig::default()
        };
        let state = AppState::with_source(config, source).unwrap();
        create_router(Arc::new(state))
    }

    fn get_from(uri: &str, client: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", client)
            .body(Body::empty())
            .unwrap()
    }

    async fn upstream() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app"))
            .and(query_param("x", "1"))
            .and(header_is("x-forwarded-for", "198.51.100.9"))
            .respond_with(ResponseTemplate::new(200).set_body_string("from upstream"))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_local_client_is_redirected() {
        let source = FixedSource::new(Some("203.0.113.5"));
        let app = app(source, "http://127.0.0.1:1".into());

        let response = app.oneshot(get_from("/app?x=1", "203.0.113.5")).await.unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://internal.svc:8080/app?x=1"
        );
    }

    #[tokio::test]
    async fn test_remote_client_reaches_upstream() {
        let server = upstream().await;
        let source = FixedSource::new(Some("203.0.113.5"));
        let app = app(source, server.uri());

        let response = app.oneshot(get_from("/app?x=1", "198.51.100.9")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"from upstream");
    }

    #[tokio::test]
    async fn test_router_down_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("from upstream"))
            .mount(&server)
            .await;
        let source = FixedSource::new(None);
        let app = app(source.clone(), server.uri());

        let response = app.oneshot(get_from("/app?x=1", "203.0.113.5")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upstream_down_is_bad_gateway() {
        let source = FixedSource::new(Some("203.0.113.5"));
        let app = app(source, "http://127.0.0.1:1".into());

        let response = app.oneshot(get_from("/", "198.51.100.9")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_health_does_not_contact_router() {
        let source = FixedSource::new(Some("203.0.113.5"));
        let app = app(source.clone(), "http://127.0.0.1:1".into());

        let response = app
            .oneshot(Request::builder().uri(HEALTH_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cache"], "no_data");
        assert!(json["addresses"].is_null());
    }

    #[tokio::test]
    async fn test_other_methods_on_health_path_are_proxied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(HEALTH_PATH))
            .respond_with(ResponseTemplate::new(201).set_body_string("upstream health"))
            .mount(&server)
            .await;
        let source = FixedSource::new(Some("203.0.113.5"));
        let app = app(source, server.uri());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(HEALTH_PATH)
                    .header("x-forwarded-for", "198.51.100.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"upstream health");
    }

    #[tokio::test]
    async fn test_other_methods_on_health_path_redirect_local_clients() {
        let source = FixedSource::new(Some("203.0.113.5"));
        let app = app(source, "http://127.0.0.1:1".into());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(HEALTH_PATH)
                    .header("x-forwarded-for", "203.0.113.5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://internal.svc:8080/_localredirect/health"
        );
    }

    #[tokio::test]
    async fn test_health_reports_cached_addresses() {
        let source = FixedSource::new(Some("203.0.113.5"));
        let config = ProxyConfig::default();
        let state = Arc::new(AppState::with_source(config, source).unwrap());
        state.scheduler.refresh_now().await.unwrap();

        let response = create_router(state)
            .oneshot(Request::builder().uri(HEALTH_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["cache"], "fresh");
        assert_eq!(json["addresses"]["v4"], "203.0.113.5");
        assert_eq!(json["installs"], 1);
        assert_eq!(json["refresh_interval_seconds"], 30);
    }
}
