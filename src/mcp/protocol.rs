//! MCP protocol types and message definitions.
//!
//! Based on the Model Context Protocol specification (streamable HTTP).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// JSON-RPC version.
pub const JSONRPC_VERSION: &str = "2.0";

/// Latest MCP protocol version spoken by this server.
pub const MCP_VERSION: &str = "2025-06-18";

/// Protocol versions a client may negotiate.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// Header carrying the session correlator.
pub const SESSION_HEADER: &str = "mcp-session-id";

// ===== JSON-RPC Base Types =====

/// A JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC response. `id` is `null` when the request could not be
/// correlated (parse errors, rejected sessions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful reply to `id`.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Error reply, correlated when an id is known.
    pub fn failure(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A JSON-RPC notification (no id, no response expected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Build the wire error for a crate error. Wrapped causes are dropped.
    pub fn from_error(err: &Error) -> Self {
        Self {
            code: err.code(),
            message: err.client_message(),
            data: None,
        }
    }

    /// The generic envelope used when nothing more specific can be said.
    pub fn internal() -> Self {
        Self {
            code: error_codes::INTERNAL_ERROR,
            message: "Internal error".to_string(),
            data: None,
        }
    }
}

/// Request ID (can be string or number).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

/// An inbound message, after envelope validation.
#[derive(Debug, Clone)]
pub enum Message {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

impl Message {
    /// Parse and validate an inbound JSON-RPC envelope.
    pub fn parse(value: Value) -> Result<Self> {
        let Some(obj) = value.as_object() else {
            return Err(Error::InvalidRequest(
                "expected a JSON-RPC object".to_string(),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(Error::InvalidRequest(
                "jsonrpc must be \"2.0\"".to_string(),
            ));
        }

        let has_id = obj.get("id").is_some_and(|id| !id.is_null());
        if has_id {
            serde_json::from_value(value)
                .map(Message::Request)
                .map_err(|e| Error::InvalidRequest(e.to_string()))
        } else {
            serde_json::from_value(value)
                .map(Message::Notification)
                .map_err(|e| Error::InvalidRequest(e.to_string()))
        }
    }

    /// The method name carried by the message.
    pub fn method(&self) -> &str {
        match self {
            Message::Request(req) => &req.method,
            Message::Notification(notif) => &notif.method,
        }
    }

    /// Whether this is the session handshake.
    pub fn is_initialize(&self) -> bool {
        matches!(self, Message::Request(req) if req.method == "initialize")
    }

    /// The correlation id, if any.
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Message::Request(req) => Some(&req.id),
            Message::Notification(_) => None,
        }
    }
}

// ===== MCP-Specific Types =====

/// Server capabilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// Tools capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(default)]
    pub list_changed: bool,
}

/// Server info.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Initialize params, as far as this server cares.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub client_info: Option<ServerInfo>,
}

impl InitializeParams {
    /// The version to answer with: the client's if supported, else the latest.
    pub fn negotiated_version(&self) -> &'static str {
        self.protocol_version
            .as_deref()
            .and_then(|requested| {
                SUPPORTED_PROTOCOL_VERSIONS
                    .iter()
                    .copied()
                    .find(|v| *v == requested)
            })
            .unwrap_or(MCP_VERSION)
    }
}

/// Initialize result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// Tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    pub input_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

/// Tool call result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Content block in a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// List tools result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

/// Call tool params. `arguments` stays raw until the registry validates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

// ===== Error Codes =====

/// Standard JSON-RPC error codes, plus the server-defined session error.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const INVALID_SESSION: i32 = -32000;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_jsonrpc_request_serialization() {
        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Number(1),
            method: "tools/call".to_string(),
            params: Some(json!({"name": "greet_store"})),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"tools/call\""));

        let parsed: JsonRpcRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.method, "tools/call");
    }

    #[test]
    fn test_jsonrpc_response_success() {
        let response = JsonRpcResponse::success(RequestId::Number(1), json!({"ok": true}));

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_jsonrpc_response_uncorrelated_error() {
        let response =
            JsonRpcResponse::failure(None, JsonRpcError::from_error(&Error::InvalidSession));

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": { "code": -32000, "message": "Invalid session" }
            })
        );
    }

    #[test]
    fn test_request_id_variants() {
        let id_num = RequestId::Number(42);
        let id_str = RequestId::String("request-1".to_string());

        assert_eq!(serde_json::to_string(&id_num).unwrap(), "42");
        assert_eq!(serde_json::to_string(&id_str).unwrap(), "\"request-1\"");
    }

    #[test]
    fn test_message_parse_request_and_notification() {
        let req = Message::parse(json!({
            "jsonrpc": "2.0", "id": 7, "method": "initialize", "params": {}
        }))
        .unwrap();
        assert!(req.is_initialize());
        assert_eq!(req.id(), Some(&RequestId::Number(7)));

        let notif = Message::parse(json!({
            "jsonrpc": "2.0", "method": "notifications/initialized"
        }))
        .unwrap();
        assert!(!notif.is_initialize());
        assert!(notif.id().is_none());
        assert_eq!(notif.method(), "notifications/initialized");
    }

    #[test]
    fn test_message_parse_rejects_bad_envelopes() {
        assert!(matches!(
            Message::parse(json!([1, 2, 3])),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            Message::parse(json!({"jsonrpc": "1.0", "id": 1, "method": "ping"})),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            Message::parse(json!({"jsonrpc": "2.0", "id": 1})),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_negotiated_version() {
        let old = InitializeParams {
            protocol_version: Some("2024-11-05".to_string()),
            client_info: None,
        };
        assert_eq!(old.negotiated_version(), "2024-11-05");

        let unknown = InitializeParams {
            protocol_version: Some("1999-01-01".to_string()),
            client_info: None,
        };
        assert_eq!(unknown.negotiated_version(), MCP_VERSION);
        assert_eq!(InitializeParams::default().negotiated_version(), MCP_VERSION);
    }

    #[test]
    fn test_tool_definition() {
        let tool = Tool {
            name: "greet_store".to_string(),
            title: None,
            description: "Greets a store".to_string(),
            input_schema: json!({"type": "object"}),
            output_schema: Some(json!({"type": "object"})),
        };

        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("\"name\":\"greet_store\""));
        assert!(json.contains("\"inputSchema\""));
        assert!(json.contains("\"outputSchema\""));
        assert!(!json.contains("\"title\""));
    }

    #[test]
    fn test_tool_result_wire_shape() {
        let result = ToolResult {
            content: vec![ContentBlock::Text {
                text: "{}".to_string(),
            }],
            structured_content: Some(json!({"greeting": "hi"})),
            is_error: false,
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "content": [{"type": "text", "text": "{}"}],
                "structuredContent": {"greeting": "hi"}
            })
        );
    }

    #[test]
    fn test_initialize_result() {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: "travel-store-server".to_string(),
                version: "1.0.0".to_string(),
            },
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"protocolVersion\""));
        assert!(json.contains("\"serverInfo\""));
        assert!(json.contains("\"listChanged\":false"));
    }
}
