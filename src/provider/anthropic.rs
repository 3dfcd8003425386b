use super::http::{parse_failure, ApiEndpoint};
use super::types::{
    ChatBackend, ChatCompletion, ChatRequest, ContentBlock, ProviderError, ProviderKind,
    StopReason, ToolChoice,
};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    endpoint: ApiEndpoint,
}

impl AnthropicClient {
    pub fn new(endpoint: ApiEndpoint) -> Self {
        Self { endpoint }
    }
}

impl ChatBackend for AnthropicClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ProviderError> {
        let body = build_messages_body(request)?;
        let response = self.endpoint.post_json("messages", &body)?;
        parse_messages_response(&response)
    }
}

pub fn build_messages_body(request: &ChatRequest) -> Result<Value, ProviderError> {
    let (system, messages) = request.split_system();

    let mut encoded = Vec::with_capacity(messages.len());
    for message in messages {
        let blocks = serde_json::to_value(&message.blocks)
            .map_err(|err| parse_failure(ProviderKind::Anthropic, err.to_string()))?;
        encoded.push(json!({
            "role": message.role.as_str(),
            "content": blocks,
        }));
    }

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(request.model.clone()));
    body.insert("max_tokens".to_string(), json!(request.max_tokens));
    body.insert("temperature".to_string(), json!(request.temperature));
    if let Some(system) = system {
        body.insert("system".to_string(), Value::String(system));
    }
    body.insert("messages".to_string(), Value::Array(encoded));

    if !request.tools.is_empty() {
        let tools = serde_json::to_value(&request.tools)
            .map_err(|err| parse_failure(ProviderKind::Anthropic, err.to_string()))?;
        body.insert("tools".to_string(), tools);
        match request.tool_choice.as_ref() {
            Some(ToolChoice::Tool(name)) => {
                body.insert(
                    "tool_choice".to_string(),
                    json!({"type": "tool", "name": name}),
                );
            }
            Some(ToolChoice::Auto) => {
                body.insert("tool_choice".to_string(), json!({"type": "auto"}));
            }
            None => {}
        }
    }

    // The messages API rejects json response_format; the instruction goes in the system prompt.
    if request.json_mode {
        let system = body
            .get("system")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        body.insert(
            "system".to_string(),
            Value::String(
                format!("{system}\n\nRespond with a single JSON object only.")
                    .trim()
                    .to_string(),
            ),
        );
    }

    Ok(Value::Object(body))
}

pub fn parse_messages_response(response: &Value) -> Result<ChatCompletion, ProviderError> {
    let content = response
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| parse_failure(ProviderKind::Anthropic, "response has no content array"))?;

    let mut blocks = Vec::with_capacity(content.len());
    for raw in content {
        match raw.get("type").and_then(Value::as_str) {
            Some("text") | Some("tool_use") => {
                let block: ContentBlock = serde_json::from_value(raw.clone()).map_err(|err| {
                    parse_failure(
                        ProviderKind::Anthropic,
                        format!("invalid content block: {err}"),
                    )
                })?;
                blocks.push(block);
            }
            _ => continue,
        }
    }

    let stop_reason = response
        .get("stop_reason")
        .and_then(Value::as_str)
        .map(StopReason::parse)
        .unwrap_or(StopReason::EndTurn);

    Ok(ChatCompletion {
        blocks,
        stop_reason,
    })
}
