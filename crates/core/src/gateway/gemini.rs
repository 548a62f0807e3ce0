//! Google Gemini `generateContent` gateway.
//!
//! Returns the raw `candidates -> content -> parts` document untouched; the
//! normalizer knows how to read it.

use super::{LanguageModelGateway, UI_EVENT_PREFIX};
use crate::conversation::{ConversationTurn, Role};
use crate::error::GatewayError;
use crate::normalizer::RawResponse;
use crate::registry::CommandRegistry;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Schema keywords the function-declaration dialect accepts.
const ALLOWED_SCHEMA_KEYS: &[&str] = &[
    "type",
    "format",
    "description",
    "nullable",
    "enum",
    "properties",
    "required",
    "items",
    "anyOf",
    "minimum",
    "maximum",
];

pub struct GeminiGateway {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    system_prompt: String,
    function_declarations: Vec<Value>,
}

impl GeminiGateway {
    pub fn new(
        api_key: String,
        model: String,
        system_prompt: String,
        registry: &CommandRegistry,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        let function_declarations = registry
            .function_declarations()
            .into_iter()
            .map(|declaration| {
                json!({
                    "name": declaration.name,
                    "description": declaration.description,
                    "parameters": to_gemini_schema(&declaration.parameters),
                })
            })
            .collect();

        Ok(Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            system_prompt,
            function_declarations,
        })
    }

    /// Points the gateway at a different API root, e.g. a proxy or a test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(&self, history: &[ConversationTurn]) -> Value {
        let contents: Vec<Value> = history
            .iter()
            .map(|turn| {
                let (role, text) = match turn.role {
                    Role::User => ("user", turn.content.clone()),
                    Role::Assistant => ("model", turn.content.clone()),
                    Role::System => ("user", format!("{} {}", UI_EVENT_PREFIX, turn.content)),
                };
                json!({"role": role, "parts": [{"text": text}]})
            })
            .collect();

        json!({
            "systemInstruction": {"parts": [{"text": self.system_prompt}]},
            "contents": contents,
            "tools": [{"functionDeclarations": self.function_declarations}],
        })
    }
}

#[async_trait]
impl LanguageModelGateway for GeminiGateway {
    async fn get_response(
        &self,
        history: &[ConversationTurn],
    ) -> Result<RawResponse, GatewayError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(history))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status.as_u16(), body));
        }

        let body: Value = response.json().await?;
        debug!(model = %self.model, "Received generateContent response");
        Ok(RawResponse::from_json(body))
    }
}

/// Reduces a JSON schema to the subset function declarations accept.
/// `"type": ["string", "null"]` becomes `"type": "string", "nullable": true`.
fn to_gemini_schema(schema: &Value) -> Value {
    let Some(object) = schema.as_object() else {
        return schema.clone();
    };

    let mut out = Map::new();
    for (key, value) in object {
        if !ALLOWED_SCHEMA_KEYS.contains(&key.as_str()) {
            continue;
        }
        let converted = match key.as_str() {
            "type" => match value {
                Value::Array(types) => {
                    let concrete = types.iter().find(|t| t.as_str() != Some("null"));
                    if types.iter().any(|t| t.as_str() == Some("null")) {
                        out.insert("nullable".to_string(), Value::Bool(true));
                    }
                    concrete.cloned().unwrap_or(Value::String("string".to_string()))
                }
                other => other.clone(),
            },
            "properties" => Value::Object(
                value
                    .as_object()
                    .map(|props| {
                        props
                            .iter()
                            .map(|(name, prop)| (name.clone(), to_gemini_schema(prop)))
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
            "items" => to_gemini_schema(value),
            "anyOf" => Value::Array(
                value
                    .as_array()
                    .map(|variants| variants.iter().map(to_gemini_schema).collect())
                    .unwrap_or_default(),
            ),
            _ => value.clone(),
        };
        out.insert(key.clone(), converted);
    }
    Value::Object(out)
}
