pub mod anthropic;
pub mod cohere;
pub mod http;
pub mod openai;
pub mod types;

pub use anthropic::AnthropicClient;
pub use cohere::{CohereClient, EmbedInputType, Embedder, RerankHit, Reranker};
pub use http::ApiEndpoint;
pub use openai::OpenAiClient;
pub use types::{
    collect_text, ChatBackend, ChatCompletion, ChatMessage, ChatRequest, ContentBlock,
    ProviderError, ProviderKind, Role, StopReason, ToolChoice, ToolSpec,
};

/// Builds the chat client for `endpoint`'s provider.
pub fn build_chat_backend(endpoint: ApiEndpoint) -> Box<dyn ChatBackend> {
    match endpoint.provider() {
        ProviderKind::OpenAi | ProviderKind::Groq => Box::new(OpenAiClient::new(endpoint)),
        ProviderKind::Anthropic => Box::new(AnthropicClient::new(endpoint)),
        ProviderKind::Cohere => Box::new(CohereClient::new(endpoint, "", "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_parses_aliases_case_insensitively() {
        assert_eq!(ProviderKind::parse(" OpenAI ").expect("openai"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::parse("claude").expect("alias"), ProviderKind::Anthropic);
        assert!(ProviderKind::try_from("mistral").is_err());
    }

    #[test]
    fn factory_selects_client_by_provider() {
        for kind in ProviderKind::ALL {
            let backend = build_chat_backend(ApiEndpoint::new(kind, "http://127.0.0.1:9", "k"));
            assert_eq!(backend.kind(), kind);
        }
    }
}
