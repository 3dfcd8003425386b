use crate::shared::time::now_secs;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn event_log_path(state_root: &Path) -> PathBuf {
    state_root.join("logs/botkit.log")
}

/// Appends one JSON object per line: `timestamp`, `event`, then `fields`.
pub fn append_event(path: &Path, event: &str, fields: &[(&str, Value)]) -> std::io::Result<()> {
    let mut payload = Map::new();
    payload.insert("timestamp".to_string(), Value::from(now_secs()));
    payload.insert("event".to_string(), Value::String(event.to_string()));
    for (key, value) in fields {
        payload.insert((*key).to_string(), value.clone());
    }

    let line = serde_json::to_string(&payload)
        .map_err(|source| std::io::Error::other(source.to_string()))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{line}")
}

/// Event sink handed to bots and stores. A disabled logger drops everything.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    pub fn for_state_root(state_root: &Path) -> Self {
        Self {
            path: Some(event_log_path(state_root)),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, event: &str, fields: &[(&str, Value)]) {
        self.write("info", event, fields);
    }

    pub fn warn(&self, event: &str, fields: &[(&str, Value)]) {
        self.write("warn", event, fields);
    }

    pub fn error(&self, event: &str, fields: &[(&str, Value)]) {
        self.write("error", event, fields);
    }

    fn write(&self, level: &str, event: &str, fields: &[(&str, Value)]) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        let mut with_level = Vec::with_capacity(fields.len() + 1);
        with_level.push(("level", Value::String(level.to_string())));
        with_level.extend(fields.iter().cloned());
        let _ = append_event(path, event, &with_level);
    }
}
