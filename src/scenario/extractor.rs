use crate::provider::{ChatBackend, ChatMessage, ChatRequest};
use crate::shared::logging::EventLog;
use serde_json::{Map, Value};

pub const EXTRACTOR_SYSTEM_PROMPT: &str = "You are an AI assistant that extracts requested information from a conversation and provides it in JSON format.";
pub const EXTRACTOR_MAX_TOKENS: u32 = 150;

/// Pulls a node's required fields out of its chat history with a JSON-mode call.
#[derive(Debug, Clone)]
pub struct Extractor {
    model: String,
    log: EventLog,
}

impl Extractor {
    pub fn new(model: impl Into<String>, log: EventLog) -> Self {
        Self {
            model: model.into(),
            log,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the extracted object, or an empty map when the model call or
    /// its output is unusable. Nothing is requested when `required_info` is empty.
    pub fn extract(
        &self,
        backend: &dyn ChatBackend,
        user_message: &str,
        required_info: &[String],
        history: &[ChatMessage],
    ) -> Map<String, Value> {
        if required_info.is_empty() {
            return Map::new();
        }

        let prompt = build_extraction_prompt(user_message, required_info, history);
        let mut request = ChatRequest::new(self.model.clone(), vec![ChatMessage::user(prompt)]);
        request.system = Some(EXTRACTOR_SYSTEM_PROMPT.to_string());
        request.temperature = 0.0;
        request.max_tokens = EXTRACTOR_MAX_TOKENS;
        request.json_mode = true;

        let completion = match backend.complete(&request) {
            Ok(completion) => completion,
            Err(err) => {
                self.log.warn(
                    "scenario.extract_failed",
                    &[("reason", Value::String(err.to_string()))],
                );
                return Map::new();
            }
        };

        let raw = completion.text();
        match parse_extraction(&raw) {
            Ok(map) => map,
            Err(reason) => {
                self.log.warn(
                    "scenario.extract_invalid",
                    &[
                        ("reason", Value::String(reason)),
                        ("output", Value::String(raw)),
                    ],
                );
                Map::new()
            }
        }
    }
}

pub fn build_extraction_prompt(
    user_message: &str,
    required_info: &[String],
    history: &[ChatMessage],
) -> String {
    let mut history_text = String::new();
    for message in history {
        let role = capitalize(message.role.as_str());
        history_text.push_str(&format!("{role} message: \"{}\"\n", message.content()));
    }
    let already_listed = history
        .last()
        .is_some_and(|last| last.content() == user_message);
    if !already_listed {
        history_text.push_str(&format!("User message: \"{user_message}\"\n"));
    }

    let mut prompt = format!(
        "Given the following chat history, extract the requested information and provide it in JSON format. Be conservative and provide information only when sure:\n\n{history_text}\nRequested information:\n"
    );
    for field in required_info {
        prompt.push_str(&format!("- {field}: The expected value for {field}.\n"));
    }
    prompt.push_str("Provide the extracted information in the following JSON format:\n{\n");
    for field in required_info {
        prompt.push_str(&format!("  \"{field}\": <value>,\n"));
    }
    prompt.push_str("}\n");
    prompt
}

/// Parses model output as a JSON object, tolerating a surrounding code fence.
pub fn parse_extraction(raw: &str) -> Result<Map<String, Value>, String> {
    let body = strip_code_fence(raw.trim());
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a json object, got {}", kind_name(&other))),
        Err(err) => Err(format!("invalid json: {err}")),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatCompletion, ProviderError, ProviderKind};
    use std::cell::RefCell;

    struct Scripted {
        output: Result<String, ()>,
        seen: RefCell<Vec<ChatRequest>>,
    }

    impl ChatBackend for Scripted {
        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }

        fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ProviderError> {
            self.seen.borrow_mut().push(request.clone());
            match &self.output {
                Ok(text) => Ok(ChatCompletion::from_text(text.clone())),
                Err(()) => Err(ProviderError::Transport {
                    provider: ProviderKind::OpenAi,
                    reason: "offline".to_string(),
                }),
            }
        }
    }

    fn scripted(output: Result<&str, ()>) -> Scripted {
        Scripted {
            output: output.map(str::to_string),
            seen: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn prompt_lists_history_fields_and_shape() {
        let history = vec![
            ChatMessage::assistant("What is your name?"),
            ChatMessage::user("I'm Ada"),
        ];
        let prompt = build_extraction_prompt("I'm Ada", &["name".to_string()], &history);
        assert!(prompt.contains("Assistant message: \"What is your name?\"\n"));
        assert!(prompt.contains("User message: \"I'm Ada\"\n"));
        assert_eq!(prompt.matches("I'm Ada").count(), 1);
        assert!(prompt.contains("- name: The expected value for name."));
        assert!(prompt.contains("  \"name\": <value>,"));
    }

    #[test]
    fn extraction_uses_json_mode_at_zero_temperature() {
        let backend = scripted(Ok("```json\n{\"name\": \"Ada\"}\n```"));
        let extractor = Extractor::new("gpt-4o", EventLog::disabled());
        let out = extractor.extract(&backend, "Ada", &["name".to_string()], &[]);
        assert_eq!(out["name"], "Ada");

        let seen = backend.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].json_mode);
        assert_eq!(seen[0].temperature, 0.0);
        assert_eq!(seen[0].max_tokens, EXTRACTOR_MAX_TOKENS);
        assert_eq!(seen[0].system.as_deref(), Some(EXTRACTOR_SYSTEM_PROMPT));
    }

    #[test]
    fn invalid_output_and_failures_yield_empty_map() {
        let extractor = Extractor::new("gpt-4o", EventLog::disabled());
        let fields = ["age".to_string()];
        assert!(extractor
            .extract(&scripted(Ok("not json")), "x", &fields, &[])
            .is_empty());
        assert!(extractor
            .extract(&scripted(Ok("[1,2]")), "x", &fields, &[])
            .is_empty());
        assert!(extractor.extract(&scripted(Err(())), "x", &fields, &[]).is_empty());
    }

    #[test]
    fn empty_required_info_skips_the_call() {
        let backend = scripted(Ok("{}"));
        let extractor = Extractor::new("gpt-4o", EventLog::disabled());
        assert!(extractor.extract(&backend, "hello", &[], &[]).is_empty());
        assert!(backend.seen.borrow().is_empty());
    }
}
