use super::condition::ConditionError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read scenario file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario json{}: {source}", location(.path))]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },
    #[error("scenario file contains no scenarios")]
    NoScenarios,
    #[error("scenario `{name}` not found (available: {available})")]
    UnknownScenario { name: String, available: String },
    #[error("scenario `{scenario}` is invalid: {reason}")]
    Invalid { scenario: String, reason: String },
    #[error("scenario `{scenario}` condition `{condition}`: {source}")]
    Condition {
        scenario: String,
        condition: String,
        #[source]
        source: ConditionError,
    },
}

fn location(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" {}", path.display()))
        .unwrap_or_default()
}
