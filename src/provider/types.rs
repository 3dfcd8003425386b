use crate::shared::serde_ext::parse_via_string;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("unknown provider `{0}`")]
    UnknownProvider(String),
    #[error("missing api key for {provider}: environment variable `{env}` is not set")]
    MissingApiKey { provider: ProviderKind, env: String },
    #[error("{provider} request failed: {reason}")]
    Transport {
        provider: ProviderKind,
        reason: String,
    },
    #[error("{provider} api returned status {status}: {body}")]
    Status {
        provider: ProviderKind,
        status: u16,
        body: String,
    },
    #[error("{provider} response parse failure: {reason}")]
    ParseFailure {
        provider: ProviderKind,
        reason: String,
    },
    #[error("{provider} does not support {feature}")]
    Unsupported {
        provider: ProviderKind,
        feature: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    OpenAi,
    Groq,
    Anthropic,
    Cohere,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Groq,
        ProviderKind::Anthropic,
        ProviderKind::Cohere,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::Anthropic => "anthropic",
            Self::Cohere => "cohere",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "groq" => Ok(Self::Groq),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "cohere" => Ok(Self::Cohere),
            _ => Err("provider must be one of: openai, groq, anthropic, cohere".to_string()),
        }
    }

    pub fn default_api_base(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Cohere => "https://api.cohere.ai/v1",
        }
    }

    pub fn default_api_key_env(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Cohere => "COHERE_API_KEY",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderKind {
    type Error = ProviderError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value).map_err(|_| ProviderError::UnknownProvider(value.trim().to_string()))
    }
}

impl Serialize for ProviderKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        parse_via_string(deserializer, "provider", Self::parse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub blocks: Vec<ContentBlock>,
}

impl ChatMessage {
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            blocks: vec![ContentBlock::Text {
                text: content.into(),
            }],
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Concatenated text blocks; tool blocks are skipped.
    pub fn content(&self) -> String {
        collect_text(&self.blocks)
    }
}

pub fn collect_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    Tool(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub json_mode: bool,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: Option<ToolChoice>,
    pub documents: Vec<String>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            system: None,
            messages,
            temperature: 1.0,
            max_tokens: 1024,
            json_mode: false,
            tools: Vec::new(),
            tool_choice: None,
            documents: Vec::new(),
        }
    }

    /// Splits leading system messages into a single system prompt for
    /// APIs that take the system prompt out of band.
    pub fn split_system(&self) -> (Option<String>, Vec<&ChatMessage>) {
        let mut system_parts = Vec::new();
        if let Some(system) = self.system.as_ref().filter(|s| !s.trim().is_empty()) {
            system_parts.push(system.clone());
        }
        let mut rest = Vec::new();
        for message in &self.messages {
            if message.role == Role::System {
                system_parts.push(message.content());
            } else {
                rest.push(message);
            }
        }
        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system, rest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Other(String),
}

impl StopReason {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "end_turn" | "stop" | "COMPLETE" | "stop_sequence" => Self::EndTurn,
            "tool_use" | "tool_calls" => Self::ToolUse,
            "max_tokens" | "length" | "MAX_TOKENS" => Self::MaxTokens,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub blocks: Vec<ContentBlock>,
    pub stop_reason: StopReason,
}

impl ChatCompletion {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            blocks: vec![ContentBlock::Text { text: text.into() }],
            stop_reason: StopReason::EndTurn,
        }
    }

    pub fn text(&self) -> String {
        collect_text(&self.blocks).trim().to_string()
    }

    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.blocks.iter().filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => {
                Some((id.as_str(), name.as_str(), input))
            }
            _ => None,
        })
    }
}

/// One chat-completion capable backend.
pub trait ChatBackend {
    fn kind(&self) -> ProviderKind;
    fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ProviderError>;
}

impl<T: ChatBackend + ?Sized> ChatBackend for Box<T> {
    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }

    fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ProviderError> {
        (**self).complete(request)
    }
}

impl<T: ChatBackend + ?Sized> ChatBackend for std::rc::Rc<T> {
    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }

    fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ProviderError> {
        (**self).complete(request)
    }
}
