use super::paths::{PERSONAS_FILE_NAME, UPLOADS_DIR_NAME};
use super::ConfigError;
use crate::knowledge::KnowledgeConfig;
use crate::provider::{ApiEndpoint, ProviderError, ProviderKind};
use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::ids::BotId;
use crate::shared::logging::EventLog;
use crate::tools::ToolKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BOT_NAME: &str = "chatbot";

pub const DEFAULT_GLOBAL_INSTRUCTIONS: &str = "Each answer needs to be up to 2 sentences long.
Keep your responses short and snappy, one sentence only each time.
We're in the middle of a chat, so brevity is key.
Aim for concise quips and clever comebacks rather than long-winded responses.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BotKind {
    /// Persona prompt plus plain history.
    #[default]
    Persona,
    /// Tool-using bot over the Anthropic messages API.
    Agent,
    /// Scenario graph driven by slot extraction.
    Scenario,
}

impl BotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Persona => "persona",
            Self::Agent => "agent",
            Self::Scenario => "scenario",
        }
    }
}

impl std::fmt::Display for BotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    #[serde(default)]
    pub kind: BotKind,
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub initial_persona: Option<String>,
    #[serde(default)]
    pub tools: Vec<ToolKind>,
    #[serde(default)]
    pub force_knowledge: bool,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    #[serde(default)]
    pub use_knowledge: bool,
    #[serde(default)]
    pub speak_replies: bool,
    #[serde(default)]
    pub scenario_file: Option<PathBuf>,
    #[serde(default)]
    pub scenario: Option<String>,
    #[serde(default)]
    pub extractor_model: Option<String>,
}

impl BotConfig {
    pub fn new(kind: BotKind, provider: ProviderKind, model: &str) -> Self {
        Self {
            kind,
            provider,
            model: model.to_string(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            initial_persona: None,
            tools: Vec::new(),
            force_knowledge: false,
            max_tool_rounds: default_max_tool_rounds(),
            use_knowledge: false,
            speak_replies: false,
            scenario_file: None,
            scenario: None,
            extractor_model: None,
        }
    }

    pub fn extractor_model(&self) -> &str {
        self.extractor_model.as_deref().unwrap_or(&self.model)
    }

    pub fn needs_knowledge(&self) -> bool {
        self.use_knowledge || self.tools.contains(&ToolKind::GetKnowledge)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    #[serde(default = "default_image_model")]
    pub model: String,
    #[serde(default = "default_image_size")]
    pub size: String,
    #[serde(default = "default_true")]
    pub download: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: default_image_model(),
            size: default_image_size(),
            download: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_model")]
    pub model: String,
    #[serde(default = "default_speech_voice")]
    pub voice: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            model: default_speech_model(),
            voice: default_speech_voice(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub state_root: PathBuf,
    #[serde(default = "default_bot_name")]
    pub default_bot: String,
    #[serde(default)]
    pub global_instructions: Option<String>,
    #[serde(default)]
    pub bots: BTreeMap<String, BotConfig>,
    #[serde(default)]
    pub providers: BTreeMap<ProviderKind, ProviderSettings>,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
}

fn default_bot_name() -> String {
    DEFAULT_BOT_NAME.to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_max_tool_rounds() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_speech_model() -> String {
    "tts-1".to_string()
}

fn default_speech_voice() -> String {
    "alloy".to_string()
}

impl Settings {
    /// A starter configuration with one OpenAI persona bot.
    pub fn starter(state_root: &Path) -> Self {
        let mut bots = BTreeMap::new();
        let mut chatbot = BotConfig::new(BotKind::Persona, ProviderKind::OpenAi, "gpt-4o");
        chatbot.max_tokens = 256;
        bots.insert(DEFAULT_BOT_NAME.to_string(), chatbot);
        Self {
            state_root: state_root.to_path_buf(),
            default_bot: default_bot_name(),
            global_instructions: None,
            bots,
            providers: BTreeMap::new(),
            knowledge: KnowledgeConfig::default(),
            images: ImageConfig::default(),
            speech: SpeechConfig::default(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let encoded = serde_yaml::to_string(self).map_err(|source| ConfigError::Encode {
            path: path.display().to_string(),
            source,
        })?;
        atomic_write_file(path, encoded.as_bytes()).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.state_root.is_absolute() {
            return Err(ConfigError::Settings(
                "`state_root` must be an absolute path".to_string(),
            ));
        }
        if self.bots.is_empty() {
            return Err(ConfigError::Settings(
                "`bots` must configure at least one bot".to_string(),
            ));
        }
        if !self.bots.contains_key(&self.default_bot) {
            return Err(ConfigError::Settings(format!(
                "`default_bot` references unknown bot `{}`",
                self.default_bot
            )));
        }

        for (name, bot) in &self.bots {
            BotId::parse(name).map_err(ConfigError::Settings)?;
            if bot.model.trim().is_empty() {
                return Err(ConfigError::Settings(format!(
                    "bot `{name}` requires a non-empty `model`"
                )));
            }
            if !(0.0..=2.0).contains(&bot.temperature) {
                return Err(ConfigError::Settings(format!(
                    "bot `{name}` temperature must be within 0.0..=2.0"
                )));
            }
            if bot.max_tokens == 0 {
                return Err(ConfigError::Settings(format!(
                    "bot `{name}` max_tokens must be > 0"
                )));
            }
            match bot.kind {
                BotKind::Scenario => {
                    if bot.scenario_file.is_none() {
                        return Err(ConfigError::Settings(format!(
                            "scenario bot `{name}` requires `scenario_file`"
                        )));
                    }
                }
                BotKind::Agent => {
                    if bot.provider != ProviderKind::Anthropic {
                        return Err(ConfigError::Settings(format!(
                            "agent bot `{name}` must use the anthropic provider"
                        )));
                    }
                    if bot.tools.is_empty() {
                        return Err(ConfigError::Settings(format!(
                            "agent bot `{name}` requires at least one tool"
                        )));
                    }
                    if bot.max_tool_rounds == 0 {
                        return Err(ConfigError::Settings(format!(
                            "agent bot `{name}` max_tool_rounds must be > 0"
                        )));
                    }
                    if bot.force_knowledge && !bot.tools.contains(&ToolKind::GetKnowledge) {
                        return Err(ConfigError::Settings(format!(
                            "agent bot `{name}` sets force_knowledge without the get_knowledge tool"
                        )));
                    }
                }
                BotKind::Persona => {
                    if !bot.tools.is_empty() {
                        return Err(ConfigError::Settings(format!(
                            "persona bot `{name}` cannot declare tools; use kind `agent`"
                        )));
                    }
                }
            }
        }

        self.knowledge.validate().map_err(ConfigError::Settings)?;
        Ok(())
    }

    /// Returns the named bot, falling back to `default_bot` when the name is unknown.
    pub fn resolve_bot<'a>(
        &'a self,
        requested: Option<&'a str>,
        log: &EventLog,
    ) -> Result<(&'a str, &'a BotConfig), ConfigError> {
        let name = requested.unwrap_or(self.default_bot.as_str());
        if let Some((key, bot)) = self.bots.get_key_value(name) {
            return Ok((key.as_str(), bot));
        }
        log.warn(
            "bot.fallback",
            &[
                ("requested", Value::String(name.to_string())),
                ("fallback", Value::String(self.default_bot.clone())),
            ],
        );
        self.bots
            .get_key_value(self.default_bot.as_str())
            .map(|(key, bot)| (key.as_str(), bot))
            .ok_or_else(|| ConfigError::UnknownBot {
                name: name.to_string(),
            })
    }

    pub fn global_instructions(&self) -> &str {
        self.global_instructions
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_GLOBAL_INSTRUCTIONS)
    }

    pub fn bot_dir(&self, bot: &str) -> PathBuf {
        self.state_root.join("bots").join(bot)
    }

    pub fn uploads_dir(&self, bot: &str) -> PathBuf {
        self.bot_dir(bot).join(UPLOADS_DIR_NAME)
    }

    pub fn personas_path(&self, bot: &str) -> PathBuf {
        self.bot_dir(bot).join(PERSONAS_FILE_NAME)
    }

    pub fn knowledge_db_path(&self, bot: &str) -> PathBuf {
        self.state_root
            .join("knowledge")
            .join(format!("{bot}.sqlite3"))
    }

    /// Relative scenario paths resolve against the bot directory.
    pub fn scenario_path(&self, bot: &str, config: &BotConfig) -> Option<PathBuf> {
        let file = config.scenario_file.as_ref()?;
        if file.is_absolute() {
            Some(file.clone())
        } else {
            Some(self.bot_dir(bot).join(file))
        }
    }

    pub fn endpoint(&self, provider: ProviderKind) -> Result<ApiEndpoint, ProviderError> {
        let configured = self.providers.get(&provider);
        let api_base = configured.and_then(|p| p.api_base.as_deref());
        let key_env = configured
            .and_then(|p| p.api_key_env.as_deref())
            .unwrap_or_else(|| provider.default_api_key_env());
        ApiEndpoint::from_env(provider, api_base, key_env)
    }
}
