//! Streamable HTTP transport for MCP.
//!
//! One endpoint, `/mcp`, carries the whole protocol:
//!
//! - `POST` delivers a JSON-RPC message. An `initialize` request without a
//!   session header opens a session and returns its id in `mcp-session-id`.
//! - `GET` opens a server-sent-events stream for an active session. It
//!   carries keep-alives only and ends when the session is closed.
//! - `DELETE` closes the session.
//!
//! Every other request must name an active session or it is rejected before
//! reaching the tool registry.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use std::any::Any;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mcp::protocol::*;
use crate::mcp::server::McpServer;
use crate::mcp::session::SessionRegistry;

/// HTTP server state.
#[derive(Clone)]
pub struct HttpState {
    server: Arc<McpServer>,
    sessions: Arc<SessionRegistry>,
    metrics: Option<PrometheusHandle>,
}

impl HttpState {
    /// Create transport state around a server and its session registry.
    pub fn new(server: Arc<McpServer>, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            server,
            sessions,
            metrics: None,
        }
    }

    /// Serve `/metrics` from the given recorder handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// The session registry.
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }
}

/// Build the application router.
pub fn router(state: HttpState) -> Router {
    let mut app = Router::new()
        .route("/mcp", get(open_stream).post(handle_post).delete(close_session))
        .route("/health", get(health_check));

    if state.metrics.is_some() {
        app = app.route("/metrics", get(render_metrics));
    }

    app.layer(CatchPanicLayer::custom(handle_panic))
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods(cors::Any)
                .allow_headers(cors::Any)
                .expose_headers([HeaderName::from_static(SESSION_HEADER)]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn start_server(config: &Config, state: HttpState) -> Result<()> {
    let sessions = state.sessions.clone();
    let app = router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("MCP server listening on http://{}/mcp", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped with {} open sessions", sessions.len());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Prometheus scrape endpoint.
async fn render_metrics(State(state): State<HttpState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn error_response(status: StatusCode, id: Option<RequestId>, err: &Error) -> Response {
    (
        status,
        Json(JsonRpcResponse::failure(id, JsonRpcError::from_error(err))),
    )
        .into_response()
}

fn invalid_session() -> Response {
    error_response(StatusCode::BAD_REQUEST, None, &Error::InvalidSession)
}

fn reply(response: Option<JsonRpcResponse>) -> Response {
    match response {
        Some(r) => (StatusCode::OK, Json(r)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// `POST /mcp`: deliver one JSON-RPC message.
async fn handle_post(State(state): State<HttpState>, headers: HeaderMap, body: Bytes) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            debug!("Rejecting unparsable body: {}", e);
            let error = JsonRpcError {
                code: error_codes::PARSE_ERROR,
                message: "Parse error".to_string(),
                data: None,
            };
            return (
                StatusCode::BAD_REQUEST,
                Json(JsonRpcResponse::failure(None, error)),
            )
                .into_response();
        }
    };

    let message = match Message::parse(value) {
        Ok(m) => m,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, None, &e),
    };

    match session_id(&headers) {
        None if message.is_initialize() => initialize_session(&state, message).await,
        None => {
            debug!("Rejecting {} without a session", message.method());
            invalid_session()
        }
        Some(id) if message.is_initialize() => {
            if state.sessions.get(id).is_none() {
                return invalid_session();
            }
            warn!("Repeated initialize on session {}", id);
            error_response(
                StatusCode::BAD_REQUEST,
                message.id().cloned(),
                &Error::InvalidRequest("Server already initialized".to_string()),
            )
        }
        Some(id) => {
            let Some(lease) = state.sessions.acquire(id).await else {
                debug!("Rejecting {} on unknown session {}", message.method(), id);
                return invalid_session();
            };
            let response = state.server.handle(message).await;
            drop(lease);
            reply(response)
        }
    }
}

/// Run the handshake, then register the session it opens. Nothing is
/// registered unless the initialize reply was built successfully.
async fn initialize_session(state: &HttpState, message: Message) -> Response {
    let response = state.server.handle(message).await;
    let handshake_ok = response.as_ref().is_some_and(|r| r.error.is_none());
    if !handshake_ok {
        return reply(response);
    }

    let session = state.sessions.create();
    if let Err(e) = state.sessions.activate(&session.id) {
        error!("Failed to activate session {}: {}", session.id, e);
        state.sessions.close(&session.id);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, None, &e);
    }

    let mut response = reply(response);
    match session.id.parse::<HeaderValue>() {
        Ok(value) => {
            response.headers_mut().insert(SESSION_HEADER, value);
            response
        }
        Err(e) => {
            error!("Session id is not a valid header value: {}", e);
            state.sessions.close(&session.id);
            internal_error_response()
        }
    }
}

/// `GET /mcp`: keep-alive event stream that ends when the session closes.
async fn open_stream(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(id) = session_id(&headers) else {
        return invalid_session();
    };
    if !state.sessions.is_active(id) {
        return invalid_session();
    }
    let Some(closed) = state.sessions.closed_signal(id) else {
        return invalid_session();
    };

    debug!("Opening event stream for session {}", id);
    Sse::new(session_events(closed))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// No events are ever pushed; the stream only tracks session liveness.
fn session_events(
    closed: tokio::sync::watch::Receiver<bool>,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    WatchStream::new(closed)
        .take_while(|closed| !*closed)
        .filter_map(|_| None::<std::result::Result<Event, Infallible>>)
}

/// `DELETE /mcp`: close the session.
async fn close_session(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(id) = session_id(&headers) else {
        return invalid_session();
    };

    match state.sessions.close(id) {
        Some(_) => StatusCode::OK.into_response(),
        None => invalid_session(),
    }
}

fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(JsonRpcResponse::failure(None, JsonRpcError::internal())),
    )
        .into_response()
}

/// Replace a panicking request with the generic internal-error envelope.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!("Request handler panicked: {}", detail);
    internal_error_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::handler::ToolRegistry;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<SessionRegistry>) {
        let server = Arc::new(McpServer::new(ToolRegistry::new(), "test-server"));
        let sessions = Arc::new(SessionRegistry::new());
        (router(HttpState::new(server, sessions.clone())), sessions)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(body: &str, session: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/mcp").header("content-type", "application/json");
        if let Some(id) = session {
            builder = builder.header(SESSION_HEADER, id);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_parse_error() {
        let (app, _) = app();
        let response = app.oneshot(post("{not json", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], error_codes::PARSE_ERROR);
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn test_bad_envelope() {
        let (app, _) = app();
        let response = app
            .oneshot(post(r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"]["code"],
            error_codes::INVALID_REQUEST
        );
    }

    #[tokio::test]
    async fn test_handshake_sets_header() {
        let (app, sessions) = app();
        let response = app
            .oneshot(post(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-06-18"}}"#,
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers()[SESSION_HEADER].to_str().unwrap().to_string();
        assert!(sessions.is_active(&id));
    }

    #[tokio::test]
    async fn test_failed_handshake_leaves_no_session() {
        let (app, sessions) = app();
        let response = app
            .oneshot(post(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":5}}"#,
                None,
            ))
            .await
            .unwrap();

        assert!(response.headers().get(SESSION_HEADER).is_none());
        assert!(body_json(response).await["error"].is_object());
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_missing_session_rejected() {
        let (app, _) = app();
        let response = app
            .oneshot(post(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body,
            serde_json::json!({
                "jsonrpc": "2.0",
                "error": {"code": -32000, "message": "Invalid session"},
                "id": null
            })
        );
    }

    #[tokio::test]
    async fn test_delete_unknown_session() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::delete("/mcp")
                    .header(SESSION_HEADER, "nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_route_absent_by_default() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_panic_envelope() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_dropping_stream_keeps_session() {
        let sessions = SessionRegistry::new();
        let session = sessions.create();
        sessions.activate(&session.id).unwrap();

        let events = session_events(sessions.closed_signal(&session.id).unwrap());
        drop(events);
        assert!(sessions.is_active(&session.id));
    }

    #[tokio::test]
    async fn test_session_events_end_on_close() {
        let (tx, rx) = tokio::sync::watch::channel(false);
        let mut events = Box::pin(session_events(rx));

        tx.send_replace(true);
        assert!(events.next().await.is_none());
    }
}
