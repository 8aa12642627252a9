//! The `greet_store` tool.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mcp::handler::{parse_args, structured_result, ToolHandler};
use crate::mcp::protocol::{Tool, ToolResult};
use crate::mcp::schema::SchemaError;
use crate::service::store::INVALID_STORE_NAME;
use crate::service::GreetingService;

/// Tool name as exposed to clients.
pub const GREET_STORE: &str = "greet_store";

/// Typed input for `greet_store`.
#[derive(Debug, Deserialize)]
struct GreetStoreInput {
    store_name: String,
}

/// Greets a store found by fuzzy name, with its current weather.
pub struct GreetStoreTool {
    service: Arc<GreetingService>,
}

impl GreetStoreTool {
    pub fn new(service: Arc<GreetingService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for GreetStoreTool {
    fn definition(&self) -> Tool {
        Tool {
            name: GREET_STORE.to_string(),
            title: Some("업체 환영 인사 및 날씨 정보".to_string()),
            description: "업체명을 입력받아 환영 인사와 날씨 정보를 반환합니다.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "store_name": {
                        "type": "string",
                        "description": "조회할 업체명"
                    }
                },
                "required": ["store_name"]
            }),
            output_schema: Some(serde_json::json!({
                "type": "object",
                "properties": {
                    "greeting": {
                        "type": "string",
                        "description": "업체의 환영 인사 문구"
                    },
                    "weather_summary": {
                        "type": "string",
                        "description": "업체 위치 기준 현재 날씨 요약"
                    },
                    "matched_name": {
                        "type": "string",
                        "description": "매칭된 실제 업체명"
                    },
                    "similarity_score": {
                        "type": "number",
                        "description": "유사도 점수 (0.0 ~ 1.0)"
                    }
                },
                "required": ["greeting", "weather_summary", "matched_name", "similarity_score"]
            })),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let input: GreetStoreInput = parse_args(args)?;
        let result = self.service.greet(&input.store_name).await?;
        structured_result(&result)
    }

    fn reject_arguments(&self, err: &SchemaError) -> Option<Error> {
        match err {
            SchemaError::MissingRequired(name) | SchemaError::BlankRequired(name)
                if name == "store_name" =>
            {
                Some(Error::InvalidInput(INVALID_STORE_NAME.to_string()))
            }
            _ => None,
        }
    }
}
