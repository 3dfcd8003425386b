pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use crate::knowledge::KnowledgeConfig;
pub use error::ConfigError;
pub use load::{load_global_settings, load_settings_from};
pub use paths::{
    default_global_config_path, CONFIG_PATH_ENV, GLOBAL_SETTINGS_FILE_NAME, GLOBAL_STATE_DIR,
    PERSONAS_FILE_NAME, UPLOADS_DIR_NAME,
};
pub use settings::{
    BotConfig, BotKind, ImageConfig, ProviderSettings, Settings, SpeechConfig,
    DEFAULT_BOT_NAME, DEFAULT_GLOBAL_INSTRUCTIONS,
};
