//! HTTP endpoints.
//!
//! - `GET /.well-known/lad/agents`: discovery document
//! - `GET /.well-known/agent.json`: AgentCard, content negotiated
//! - `GET /health`: liveness and feature flags

use crate::card::CardGenerator;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use lad_types::card_signing::CardSigner;
use lad_types::{AGENT_CARD_PATH, DISCOVERY_PATH, JOSE_MEDIA_TYPE};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Cache policy of the discovery document.
pub const DISCOVERY_CACHE_CONTROL: &str = "max-age=300, must-revalidate";

/// Shared state of the HTTP handlers.
#[derive(Debug)]
pub struct AppState {
    pub generator: CardGenerator,
    /// Present only when signing is enabled and the key loaded.
    pub signer: Option<CardSigner>,
    pub mdns_enabled: bool,
    pub tls_enabled: bool,
}

/// Build the LAD router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route(DISCOVERY_PATH, get(discovery))
        .route(AGENT_CARD_PATH, get(agent_card))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn discovery(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(
            header::CACHE_CONTROL,
            HeaderValue::from_static(DISCOVERY_CACHE_CONTROL),
        )],
        Json(state.generator.discovery_response()),
    )
}

async fn agent_card(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if wants_signed(&headers) {
        if let Some(token) = state
            .signer
            .as_ref()
            .and_then(|s| state.generator.signed_agent_card(s))
        {
            debug!("Serving signed AgentCard");
            return (
                [(header::CONTENT_TYPE, HeaderValue::from_static(JOSE_MEDIA_TYPE))],
                token,
            )
                .into_response();
        }
    }
    Json(state.generator.agent_card()).into_response()
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "agent": state.generator.agent().name,
        "mdns_enabled": state.mdns_enabled,
        "tls_enabled": state.tls_enabled,
        "signing_enabled": state.signer.is_some(),
    }))
}

/// Whether the request's Accept header asks for a compact JWS.
fn wants_signed(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| {
            let v = v.to_ascii_lowercase();
            v.contains(JOSE_MEDIA_TYPE) || v.contains("text/plain")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use lad_types::card::AgentConfig;
    use lad_types::card_signing::{generate_signing_keys, verify_agent_card, SigningConfig};
    use tower::ServiceExt;

    fn state(signer: Option<CardSigner>) -> Arc<AppState> {
        Arc::new(AppState {
            generator: CardGenerator::new(
                AgentConfig {
                    name: "Grand Azure Hotel".to_string(),
                    ..Default::default()
                },
                "http://127.0.0.1:8080",
                None,
                "grandhotel.com",
            ),
            signer,
            mdns_enabled: false,
            tls_enabled: false,
        })
    }

    async fn get_with_accept(app: Router, path: &str, accept: Option<&str>) -> Response {
        let mut req = Request::builder().uri(path);
        if let Some(accept) = accept {
            req = req.header(header::ACCEPT, accept);
        }
        app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
    }

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_discovery_endpoint() {
        let resp = get_with_accept(build_router(state(None)), DISCOVERY_PATH, None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CACHE_CONTROL],
            "max-age=300, must-revalidate"
        );
        let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["agents"][0]["name"], "Grand Azure Hotel");
    }

    #[tokio::test]
    async fn test_agent_card_plain_without_signer() {
        let resp = get_with_accept(
            build_router(state(None)),
            AGENT_CARD_PATH,
            Some("application/jose, application/json"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json"));
        let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["provider"]["organization"], "grandhotel.com");
    }

    #[tokio::test]
    async fn test_agent_card_content_negotiation() {
        let dir = tempfile::tempdir().unwrap();
        let (private, public) = generate_signing_keys(dir.path()).unwrap();
        let signer = CardSigner::from_config(&SigningConfig {
            enabled: true,
            private_key_path: Some(private),
            ..Default::default()
        })
        .unwrap();
        let app = build_router(state(Some(signer)));

        let resp = get_with_accept(app.clone(), AGENT_CARD_PATH, Some("application/jose")).await;
        assert_eq!(resp.headers()[header::CONTENT_TYPE], JOSE_MEDIA_TYPE);
        let token = body_string(resp).await;
        let public = std::fs::read(public).unwrap();
        let result = verify_agent_card(&token, Some(&public), &[]);
        assert!(result.valid);
        assert_eq!(result.agent_card.unwrap()["name"], "Grand Azure Hotel");

        let resp = get_with_accept(app.clone(), AGENT_CARD_PATH, Some("text/plain")).await;
        assert_eq!(resp.headers()[header::CONTENT_TYPE], JOSE_MEDIA_TYPE);

        let resp = get_with_accept(app, AGENT_CARD_PATH, Some("application/json")).await;
        assert!(resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json"));
    }

    #[tokio::test]
    async fn test_health() {
        let resp = get_with_accept(build_router(state(None)), "/health", None).await;
        let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["agent"], "Grand Azure Hotel");
        assert_eq!(json["signing_enabled"], false);
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let resp = get_with_accept(build_router(state(None)), "/health", None).await;
        // No Origin header, so no CORS response headers are required.
        assert_eq!(resp.status(), StatusCode::OK);

        let req = Request::builder()
            .uri(DISCOVERY_PATH)
            .header(header::ORIGIN, "http://guest.example")
            .body(Body::empty())
            .unwrap();
        let resp = build_router(state(None)).oneshot(req).await.unwrap();
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[test]
    fn test_wants_signed() {
        let mut headers = HeaderMap::new();
        assert!(!wants_signed(&headers));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!wants_signed(&headers));
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/jose, application/json"),
        );
        assert!(wants_signed(&headers));
    }
}
