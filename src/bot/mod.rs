//! Chat bot variants and the factory that builds them from settings.

pub mod agent;
pub mod error;
pub mod factory;
pub mod persona;
pub mod scenario;

pub use agent::AgentBot;
pub use error::BotError;
pub use factory::{build_bot, open_knowledge_base};
pub use persona::PersonaBot;
pub use scenario::ScenarioBot;

use crate::config::BotConfig;
use crate::persona::PersonaCatalog;

/// One bot answer. `attachments` are local paths or URLs produced by tools.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BotReply {
    pub text: String,
    pub attachments: Vec<String>,
}

impl BotReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }
}

/// Per-turn overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplyParams {
    /// Persona slug to switch to before answering.
    pub persona: Option<String>,
    /// Overrides the bot's `speak_replies` setting for this turn.
    pub speak: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 1.0,
            max_tokens: 1024,
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

pub trait ChatBot {
    fn name(&self) -> &str;

    fn reply(&mut self, message: &str, params: &ReplyParams) -> Result<BotReply, BotError>;

    /// Clears the conversation; persona selection is kept.
    fn reset(&mut self);

    fn personas(&self) -> Option<&PersonaCatalog> {
        None
    }

    /// Switches persona and returns its display label.
    fn select_persona(&mut self, slug: &str) -> Result<String, BotError> {
        let _ = slug;
        Err(BotError::PersonasUnsupported {
            bot: self.name().to_string(),
        })
    }
}

pub(crate) fn ensure_message(message: &str) -> Result<&str, BotError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(BotError::EmptyMessage);
    }
    Ok(trimmed)
}
