//! MCP server implementation.
//!
//! [`McpServer`] turns one validated JSON-RPC message into at most one reply.
//! It knows nothing about sessions or HTTP; the transport decides which
//! messages reach it.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::mcp::handler::ToolRegistry;
use crate::mcp::protocol::*;
use crate::metrics::{self, Timer};
use crate::VERSION;

/// MCP server.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    name: String,
    version: String,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(registry: ToolRegistry, name: impl Into<String>) -> Self {
        Self {
            registry: Arc::new(registry),
            name: name.into(),
            version: VERSION.to_string(),
        }
    }

    /// Server name reported during the handshake.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tool registry.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one message. Notifications produce no reply.
    pub async fn handle(&self, message: Message) -> Option<JsonRpcResponse> {
        metrics::record_request(message.method());
        match message {
            Message::Request(req) => Some(self.handle_request(req).await),
            Message::Notification(notif) => {
                self.handle_notification(notif);
                None
            }
        }
    }

    /// Handle a JSON-RPC request.
    async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Handling request: {} (id: {:?})", req.method, req.id);

        let result = match req.method.as_str() {
            "initialize" => self.handle_initialize(req.params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(req.params).await,
            _ => Err(Error::MethodNotFound(req.method.clone())),
        };

        match result {
            Ok(value) => JsonRpcResponse::success(req.id, value),
            Err(e) => {
                log_failure(&req.method, &e);
                JsonRpcResponse::failure(Some(req.id), JsonRpcError::from_error(&e))
            }
        }
    }

    /// Handle a notification.
    fn handle_notification(&self, notif: JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => info!("Client initialized"),
            "notifications/cancelled" => debug!("Cancellation requested; tool calls run to completion"),
            _ => debug!("Unknown notification: {}", notif.method),
        }
    }

    /// Handle initialize request.
    fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        let params: InitializeParams = match params {
            Some(p) => serde_json::from_value(p)
                .map_err(|e| Error::InvalidRequest(format!("invalid initialize params: {}", e)))?,
            None => InitializeParams::default(),
        };

        if let Some(client) = &params.client_info {
            info!("Client connected: {} {}", client.name, client.version);
        }

        let result = InitializeResult {
            protocol_version: params.negotiated_version().to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: self.version.clone(),
            },
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle list tools request.
    fn handle_list_tools(&self) -> Result<Value> {
        let result = ListToolsResult {
            tools: self.registry.list_tools(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request.
    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = params
            .ok_or_else(|| Error::InvalidParams("tools/call requires params".to_string()))
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| Error::InvalidParams(format!("invalid tools/call params: {}", e)))
            })?;

        let label = if self.registry.has_tool(&params.name) {
            params.name.as_str()
        } else {
            metrics::UNKNOWN_TOOL
        };
        metrics::record_tool_call(label);
        let timer = Timer::start();

        let outcome = self.registry.dispatch(&params.name, params.arguments).await;
        debug!("Tool {} finished in {}ms", params.name, timer.elapsed_ms());
        timer.observe_tool(label);

        match outcome {
            Ok(result) => Ok(serde_json::to_value(result)?),
            Err(e) => {
                metrics::record_tool_failure(label, e.kind());
                Err(e)
            }
        }
    }
}

/// Log a failed request. Client errors are routine; upstream and internal
/// failures are logged with their full cause chain.
fn log_failure(method: &str, err: &Error) {
    match err.kind() {
        ErrorKind::UpstreamFailure | ErrorKind::InternalUnexpected => {
            let mut cause = String::new();
            let mut source = std::error::Error::source(err);
            while let Some(s) = source {
                cause.push_str(": ");
                cause.push_str(&s.to_string());
                source = s.source();
            }
            error!("{} failed ({}): {}{}", method, err.kind().as_str(), err, cause);
        }
        ErrorKind::InvalidInput | ErrorKind::NotFound => {
            warn!("{} rejected ({}): {}", method, err.kind().as_str(), err);
        }
        ErrorKind::Protocol => debug!("{} rejected: {}", method, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::handler::{structured_result, ToolHandler};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;

    struct FailingTool(fn() -> Error);

    #[async_trait]
    impl ToolHandler for FailingTool {
        fn definition(&self) -> Tool {
            Tool {
                name: "fail".to_string(),
                title: None,
                description: "Always fails".to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
                output_schema: None,
            }
        }

        async fn execute(&self, _args: HashMap<String, Value>) -> Result<ToolResult> {
            Err((self.0)())
        }
    }

    struct UpperTool;

    #[async_trait]
    impl ToolHandler for UpperTool {
        fn definition(&self) -> Tool {
            Tool {
                name: "upper".to_string(),
                title: None,
                description: "Uppercases text".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }),
                output_schema: None,
            }
        }

        async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
            let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
            structured_result(&json!({ "text": text.to_uppercase() }))
        }
    }

    fn server() -> McpServer {
        let mut registry = ToolRegistry::new();
        registry.register(UpperTool).unwrap();
        registry
            .register(FailingTool(|| {
                Error::upstream("permission denied for table stores", "boom")
            }))
            .unwrap();
        McpServer::new(registry, "test-server")
    }

    fn request(id: i64, method: &str, params: Value) -> Message {
        Message::parse(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_initialize_negotiates_version() {
        let server = server();
        let reply = server
            .handle(request(
                1,
                "initialize",
                json!({"protocolVersion": "2025-03-26", "capabilities": {}}),
            ))
            .await
            .unwrap();

        let result = reply.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], "test-server");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(reply.id, Some(RequestId::Number(1)));
    }

    #[tokio::test]
    async fn test_initialize_unknown_version_uses_latest() {
        let reply = server()
            .handle(request(1, "initialize", json!({"protocolVersion": "1999-01-01"})))
            .await
            .unwrap();
        assert_eq!(reply.result.unwrap()["protocolVersion"], MCP_VERSION);
    }

    #[tokio::test]
    async fn test_ping_and_list() {
        let server = server();

        let pong = server.handle(request(2, "ping", Value::Null)).await.unwrap();
        assert_eq!(pong.result.unwrap(), json!({}));

        let list = server
            .handle(request(3, "tools/list", Value::Null))
            .await
            .unwrap();
        let tools = list.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["name"], "upper");
        assert!(tools[0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_call_tool_preserves_id() {
        let reply = server()
            .handle(request(
                42,
                "tools/call",
                json!({"name": "upper", "arguments": {"text": "hi"}}),
            ))
            .await
            .unwrap();

        assert_eq!(reply.id, Some(RequestId::Number(42)));
        assert!(reply.error.is_none());
        assert_eq!(reply.result.unwrap()["structuredContent"]["text"], "HI");
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let reply = server()
            .handle(request(4, "resources/list", Value::Null))
            .await
            .unwrap();
        assert_eq!(reply.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let reply = server()
            .handle(request(5, "tools/call", json!({"name": "nope"})))
            .await
            .unwrap();
        assert_eq!(reply.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_malformed_call_params_are_invalid_params() {
        let server = server();

        let wrong_name = server
            .handle(request(8, "tools/call", json!({"name": 5})))
            .await
            .unwrap();
        assert_eq!(wrong_name.error.unwrap().code, error_codes::INVALID_PARAMS);

        let missing = server
            .handle(request(9, "tools/call", Value::Null))
            .await
            .unwrap();
        assert_eq!(missing.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[test]
    fn test_unknown_method_and_tool_do_not_add_labels() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let server = server();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        ::metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                server.handle(request(1, "upper", Value::Null)).await;
                server.handle(request(2, "x-made-up/method", Value::Null)).await;
                server
                    .handle(request(3, "tools/call", json!({"name": "tool-9f2e"})))
                    .await;
                server
                    .handle(request(4, "tools/call", json!({"name": "upper", "arguments": {"text": "a"}})))
                    .await;
            })
        });

        let rendered = handle.render();
        assert!(!rendered.contains("x-made-up/method"));
        assert!(!rendered.contains("tool-9f2e"));
        assert!(rendered.contains(r#"method="other""#));
        assert!(rendered.contains(r#"tool="unknown""#));
        assert!(rendered.contains(r#"tool="upper""#));
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_request_errors() {
        let reply = server()
            .handle(request(
                6,
                "tools/call",
                json!({"name": "upper", "arguments": {"text": "  "}}),
            ))
            .await
            .unwrap();
        let error = reply.error.unwrap();
        assert_eq!(error.code, error_codes::INVALID_REQUEST);
        assert!(error.message.contains("upper"));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_generic() {
        let reply = server()
            .handle(request(7, "tools/call", json!({"name": "fail", "arguments": {}})))
            .await
            .unwrap();
        let error = reply.error.unwrap();
        assert_eq!(error.code, error_codes::INTERNAL_ERROR);
        assert!(!error.message.contains("permission denied"));
    }

    #[tokio::test]
    async fn test_notifications_have_no_reply() {
        let notif = Message::parse(json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        }))
        .unwrap();
        assert!(server().handle(notif).await.is_none());
    }
}
