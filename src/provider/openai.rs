//! OpenAI Chat Completions API provider.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::ToolmeshError;
use crate::tools::ToolDescriptor;
use crate::types::{
    ConversationTurn, FinishReason, GenerationSettings, ResponseFormat, Role, ToolCallRequest,
};

use super::http::{bearer_headers, build_client, status_to_error};
use super::{ModelProvider, ProviderRequest, ProviderResponse};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    model: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: Option<String>,
    ) -> Result<Self, ToolmeshError> {
        Ok(Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client: build_client()?,
        })
    }

    /// Build a provider from resolved credentials.
    pub fn from_config(
        model: impl Into<String>,
        config: &ProviderConfig,
    ) -> Result<Self, ToolmeshError> {
        let api_key = config.require_api_key()?.to_string();
        Self::new(model, api_key, config.base_url.clone())
    }

    fn build_request_body(&self, request: &ProviderRequest) -> Value {
        let mut obj = Map::new();
        obj.insert("model".into(), self.model.clone().into());
        obj.insert(
            "messages".into(),
            request.messages.iter().map(turn_to_openai).collect(),
        );

        insert_settings(&mut obj, &request.settings);

        if !request.tools.is_empty() {
            obj.insert(
                "tools".into(),
                request.tools.iter().map(tool_to_openai).collect(),
            );
        }

        Value::Object(obj)
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ToolmeshError> {
        let body = self.build_request_body(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "OpenAI generate_text"
        );

        let resp = self
            .client
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: OpenAiChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ToolmeshError::Completion {
                provider: "openai".into(),
                message: "No choices in response".into(),
            })?;

        let mut tool_calls: Vec<ToolCallRequest> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCallRequest::new(tc.id, tc.function.name, parse_arguments(tc.function.arguments)))
            .collect();

        if let Some(function) = choice.message.function_call {
            tool_calls.push(ToolCallRequest::new(
                format!("call_{}", function.name),
                function.name,
                parse_arguments(function.arguments),
            ));
        }

        let finish_reason = choice
            .finish_reason
            .as_deref()
            .and_then(|reason| reason.parse::<FinishReason>().ok());

        Ok(ProviderResponse {
            text: choice.message.content,
            tool_calls,
            finish_reason,
        })
    }
}

fn insert_settings(obj: &mut Map<String, Value>, settings: &GenerationSettings) {
    if let Some(max) = settings.max_tokens {
        obj.insert("max_tokens".into(), max.into());
    }
    if let Some(temp) = settings.temperature {
        obj.insert("temperature".into(), temp.into());
    }
    if let Some(top_p) = settings.top_p {
        obj.insert("top_p".into(), top_p.into());
    }
    if let Some(ref stops) = settings.stop_sequences {
        obj.insert("stop".into(), json!(stops));
    }
    if let Some(pp) = settings.presence_penalty {
        obj.insert("presence_penalty".into(), pp.into());
    }
    if let Some(fp) = settings.frequency_penalty {
        obj.insert("frequency_penalty".into(), fp.into());
    }
    if let Some(seed) = settings.seed {
        obj.insert("seed".into(), seed.into());
    }
    if let Some(ref user) = settings.user {
        obj.insert("user".into(), user.clone().into());
    }

    match settings.response_format {
        Some(ResponseFormat::JsonObject) => {
            obj.insert("response_format".into(), json!({"type": "json_object"}));
        }
        Some(ResponseFormat::JsonSchema {
            ref schema,
            ref name,
        }) => {
            obj.insert(
                "response_format".into(),
                json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": name,
                        "schema": schema,
                        "strict": true,
                    }
                }),
            );
        }
        Some(ResponseFormat::Text) | None => {}
    }
}

fn tool_to_openai(tool: &ToolDescriptor) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn turn_to_openai(turn: &ConversationTurn) -> Value {
    match turn.role {
        Role::System => json!({"role": "system", "content": turn.text()}),
        Role::User => json!({"role": "user", "content": turn.text()}),
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": turn.tool_call_id,
            "content": turn.text(),
        }),
        Role::Assistant => {
            let mut obj = Map::new();
            obj.insert("role".into(), "assistant".into());
            obj.insert(
                "content".into(),
                turn.content.clone().map(Value::String).unwrap_or(Value::Null),
            );
            if turn.has_tool_calls() {
                let calls = turn
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                "arguments": arguments_to_wire(&tc.arguments),
                            }
                        })
                    })
                    .collect();
                obj.insert("tool_calls".into(), Value::Array(calls));
            }
            Value::Object(obj)
        }
    }
}

/// The wire format carries arguments as a JSON-encoded string.
fn arguments_to_wire(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

/// Keep unparseable argument text as a raw string for later validation.
fn parse_arguments(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

// OpenAI API response types (internal)

#[derive(Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
    function_call: Option<OpenAiFunction>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}
