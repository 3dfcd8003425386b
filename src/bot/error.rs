use crate::config::ConfigError;
use crate::knowledge::KnowledgeError;
use crate::persona::PersonaError;
use crate::provider::ProviderError;
use crate::scenario::ScenarioError;
use crate::tools::ToolError;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("tool loop did not finish within {rounds} rounds")]
    ToolRoundsExceeded { rounds: u32 },
    #[error("bot `{bot}` does not use personas")]
    PersonasUnsupported { bot: String },
    #[error("bot `{bot}` is misconfigured: {reason}")]
    Misconfigured { bot: String, reason: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Persona(#[from] PersonaError),
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error(transparent)]
    Tool(#[from] ToolError),
}
