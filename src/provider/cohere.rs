use super::http::{parse_failure, ApiEndpoint};
use super::types::{
    ChatBackend, ChatCompletion, ChatRequest, ProviderError, ProviderKind, Role, StopReason,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedInputType {
    SearchDocument,
    SearchQuery,
}

impl EmbedInputType {
    fn as_str(self) -> &'static str {
        match self {
            Self::SearchDocument => "search_document",
            Self::SearchQuery => "search_query",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RerankHit {
    pub index: usize,
    pub relevance_score: f64,
}

/// Text embedding capability, used by the knowledge store.
pub trait Embedder {
    fn embed(&self, texts: &[String], input_type: EmbedInputType)
        -> Result<Vec<Vec<f32>>, ProviderError>;
}

/// Relevance reranking capability, used by knowledge search.
pub trait Reranker {
    fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct CohereClient {
    endpoint: ApiEndpoint,
    embed_model: String,
    rerank_model: String,
}

impl CohereClient {
    pub fn new(endpoint: ApiEndpoint, embed_model: &str, rerank_model: &str) -> Self {
        Self {
            endpoint,
            embed_model: embed_model.to_string(),
            rerank_model: rerank_model.to_string(),
        }
    }
}

impl ChatBackend for CohereClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Cohere
    }

    fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ProviderError> {
        let body = build_chat_body(request)?;
        let response = self.endpoint.post_json("chat", &body)?;
        parse_chat_response(&response)
    }
}

impl Embedder for CohereClient {
    fn embed(
        &self,
        texts: &[String],
        input_type: EmbedInputType,
    ) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({
            "texts": texts,
            "model": self.embed_model,
            "input_type": input_type.as_str(),
        });
        let response = self.endpoint.post_json("embed", &body)?;
        let embeddings = parse_embed_response(&response)?;
        if embeddings.len() != texts.len() {
            return Err(parse_failure(
                ProviderKind::Cohere,
                format!(
                    "embed returned {} vectors for {} texts",
                    embeddings.len(),
                    texts.len()
                ),
            ));
        }
        Ok(embeddings)
    }
}

impl Reranker for CohereClient {
    fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, ProviderError> {
        if documents.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }
        let body = json!({
            "model": self.rerank_model,
            "query": query,
            "documents": documents,
            "top_n": top_n,
            "return_documents": false,
        });
        let response = self.endpoint.post_json("rerank", &body)?;
        parse_rerank_response(&response, documents.len())
    }
}

/// The last user message becomes `message`; everything before it is `chat_history`.
pub fn build_chat_body(request: &ChatRequest) -> Result<Value, ProviderError> {
    let (preamble, messages) = request.split_system();
    let Some((last, history)) = messages.split_last() else {
        return Err(parse_failure(
            ProviderKind::Cohere,
            "chat request has no messages",
        ));
    };
    if last.role != Role::User {
        return Err(parse_failure(
            ProviderKind::Cohere,
            "last chat message must come from the user",
        ));
    }

    let chat_history = history
        .iter()
        .map(|message| {
            let role = match message.role {
                Role::User => "USER",
                Role::Assistant => "CHATBOT",
                Role::System => "SYSTEM",
            };
            json!({"role": role, "message": message.content()})
        })
        .collect::<Vec<_>>();

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(request.model.clone()));
    body.insert("message".to_string(), Value::String(last.content()));
    body.insert("chat_history".to_string(), Value::Array(chat_history));
    body.insert("temperature".to_string(), json!(request.temperature));
    body.insert("max_tokens".to_string(), json!(request.max_tokens));
    if let Some(preamble) = preamble {
        body.insert("preamble".to_string(), Value::String(preamble));
    }
    if !request.documents.is_empty() {
        body.insert(
            "documents".to_string(),
            Value::Array(
                request
                    .documents
                    .iter()
                    .map(|text| json!({"text": text}))
                    .collect(),
            ),
        );
    }
    if request.json_mode {
        body.insert("response_format".to_string(), json!({"type": "json_object"}));
    }
    Ok(Value::Object(body))
}

pub fn parse_chat_response(response: &Value) -> Result<ChatCompletion, ProviderError> {
    let text = response
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| parse_failure(ProviderKind::Cohere, "chat response has no text"))?;
    let mut completion = ChatCompletion::from_text(text.trim());
    if let Some(reason) = response.get("finish_reason").and_then(Value::as_str) {
        completion.stop_reason = StopReason::parse(reason);
    }
    Ok(completion)
}

pub fn parse_embed_response(response: &Value) -> Result<Vec<Vec<f32>>, ProviderError> {
    // v1 returns a bare list unless embedding_types was requested.
    let raw = match response.get("embeddings") {
        Some(Value::Array(list)) => list,
        Some(Value::Object(by_type)) => by_type
            .get("float")
            .and_then(Value::as_array)
            .ok_or_else(|| parse_failure(ProviderKind::Cohere, "embeddings has no float list"))?,
        _ => {
            return Err(parse_failure(
                ProviderKind::Cohere,
                "embed response has no embeddings",
            ))
        }
    };

    raw.iter()
        .map(|vector| -> Result<Vec<f32>, ProviderError> {
            vector
                .as_array()
                .ok_or_else(|| parse_failure(ProviderKind::Cohere, "embedding is not an array"))?
                .iter()
                .map(|value| {
                    value
                        .as_f64()
                        .map(|v| v as f32)
                        .ok_or_else(|| parse_failure(ProviderKind::Cohere, "non-numeric embedding"))
                })
                .collect()
        })
        .collect()
}

pub fn parse_rerank_response(
    response: &Value,
    document_count: usize,
) -> Result<Vec<RerankHit>, ProviderError> {
    let results = response
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| parse_failure(ProviderKind::Cohere, "rerank response has no results"))?;
    let mut hits = Vec::with_capacity(results.len());
    for result in results {
        let Ok(hit) = serde_json::from_value::<RerankHit>(result.clone()) else {
            continue;
        };
        if hit.index < document_count {
            hits.push(hit);
        }
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::types::ChatMessage;

    #[test]
    fn chat_body_splits_history_and_message() {
        let mut request = ChatRequest::new(
            "command-r-plus",
            vec![
                ChatMessage::system("be sarcastic"),
                ChatMessage::user("hi"),
                ChatMessage::assistant("oh, hi."),
                ChatMessage::user("how are you"),
            ],
        );
        request.documents = vec!["doc one".to_string()];
        let body = build_chat_body(&request).expect("body");
        assert_eq!(body["message"], "how are you");
        assert_eq!(body["preamble"], "be sarcastic");
        assert_eq!(body["chat_history"][0]["role"], "USER");
        assert_eq!(body["chat_history"][1]["role"], "CHATBOT");
        assert_eq!(body["documents"][0]["text"], "doc one");
    }

    #[test]
    fn chat_body_requires_trailing_user_message() {
        let request = ChatRequest::new("m", vec![ChatMessage::assistant("hello")]);
        assert!(build_chat_body(&request).is_err());
        let empty = ChatRequest::new("m", Vec::new());
        assert!(build_chat_body(&empty).is_err());
    }

    #[test]
    fn embed_response_accepts_list_and_typed_forms() {
        let list = json!({"embeddings": [[0.5, 1.0], [0.0, -1.0]]});
        assert_eq!(
            parse_embed_response(&list).expect("list"),
            vec![vec![0.5, 1.0], vec![0.0, -1.0]]
        );
        let typed = json!({"embeddings": {"float": [[2.0]]}});
        assert_eq!(parse_embed_response(&typed).expect("typed"), vec![vec![2.0]]);
        assert!(parse_embed_response(&json!({})).is_err());
    }

    #[test]
    fn rerank_response_drops_out_of_range_and_malformed_results() {
        let response = json!({"results": [
            {"index": 1, "relevance_score": 0.9},
            {"index": 7, "relevance_score": 0.8},
            {"relevance_score": 0.1},
            null
        ]});
        let hits = parse_rerank_response(&response, 2).expect("hits");
        assert_eq!(
            hits,
            vec![RerankHit {
                index: 1,
                relevance_score: 0.9
            }]
        );
    }
}
