use super::http::{parse_failure, ApiEndpoint};
use super::types::{
    ChatBackend, ChatCompletion, ChatRequest, ContentBlock, ProviderError, ProviderKind,
    StopReason,
};
use serde_json::{json, Map, Value};

/// Client for the OpenAI chat-completions wire format. Groq serves the same
/// format under a different base URL.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    endpoint: ApiEndpoint,
}

impl OpenAiClient {
    pub fn new(endpoint: ApiEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &ApiEndpoint {
        &self.endpoint
    }

    /// Returns the URL of the first generated image.
    pub fn generate_image(
        &self,
        prompt: &str,
        model: &str,
        size: &str,
    ) -> Result<String, ProviderError> {
        self.require_openai("image generation")?;
        let body = json!({
            "model": model,
            "prompt": prompt,
            "n": 1,
            "size": size,
            "response_format": "url",
        });
        let response = self.endpoint.post_json("images/generations", &body)?;
        parse_image_response(&response)
    }

    /// Returns mp3 bytes for `text`.
    pub fn synthesize_speech(
        &self,
        text: &str,
        model: &str,
        voice: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        self.require_openai("text to speech")?;
        let body = json!({
            "model": model,
            "voice": voice,
            "input": text,
            "response_format": "mp3",
        });
        let bytes = self.endpoint.post_json_for_bytes("audio/speech", &body)?;
        if bytes.is_empty() {
            return Err(parse_failure(ProviderKind::OpenAi, "speech response was empty"));
        }
        Ok(bytes)
    }

    pub fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.endpoint.download(url)
    }

    fn require_openai(&self, feature: &str) -> Result<(), ProviderError> {
        if self.endpoint.provider() == ProviderKind::OpenAi {
            return Ok(());
        }
        Err(ProviderError::Unsupported {
            provider: self.endpoint.provider(),
            feature: feature.to_string(),
        })
    }
}

impl ChatBackend for OpenAiClient {
    fn kind(&self) -> ProviderKind {
        self.endpoint.provider()
    }

    fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ProviderError> {
        let body = build_chat_body(request);
        let response = self.endpoint.post_json("chat/completions", &body)?;
        parse_chat_response(self.endpoint.provider(), &response)
    }
}

pub fn build_chat_body(request: &ChatRequest) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = request.system.as_ref().filter(|s| !s.trim().is_empty()) {
        messages.push(json!({"role": "system", "content": system}));
    }
    for message in &request.messages {
        messages.push(json!({
            "role": message.role.as_str(),
            "content": flatten_blocks(&message.blocks),
        }));
    }

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(request.model.clone()));
    body.insert("messages".to_string(), Value::Array(messages));
    body.insert("temperature".to_string(), json!(request.temperature));
    body.insert("max_tokens".to_string(), json!(request.max_tokens));
    if request.json_mode {
        body.insert(
            "response_format".to_string(),
            json!({"type": "json_object"}),
        );
    }
    Value::Object(body)
}

// Tool blocks have no chat-completions counterpart here; they are rendered as text.
fn flatten_blocks(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .map(|block| match block {
            ContentBlock::Text { text } => text.clone(),
            ContentBlock::ToolUse { name, input, .. } => format!("[tool {name}: {input}]"),
            ContentBlock::ToolResult { content, .. } => content.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn parse_chat_response(
    provider: ProviderKind,
    response: &Value,
) -> Result<ChatCompletion, ProviderError> {
    let choice = response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| parse_failure(provider, "response has no choices"))?;
    let content = choice
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| parse_failure(provider, "first choice has no message content"))?;
    let stop_reason = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .map(StopReason::parse)
        .unwrap_or(StopReason::EndTurn);
    Ok(ChatCompletion {
        blocks: vec![ContentBlock::Text {
            text: content.trim().to_string(),
        }],
        stop_reason,
    })
}

pub fn parse_image_response(response: &Value) -> Result<String, ProviderError> {
    response
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first())
        .and_then(|item| item.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| parse_failure(ProviderKind::OpenAi, "image response has no url"))
}
