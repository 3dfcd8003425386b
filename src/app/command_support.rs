use crate::config::{default_global_config_path, load_settings_from, ConfigError, Settings};
use crate::shared::logging::EventLog;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn map_config_err(err: ConfigError) -> String {
    err.to_string()
}

pub fn config_path() -> Result<PathBuf, String> {
    default_global_config_path().map_err(map_config_err)
}

pub fn load_settings(config_path: &Path) -> Result<Settings, String> {
    if !config_path.exists() {
        return Err(format!(
            "no config at {}; run `botkit init` first",
            config_path.display()
        ));
    }
    load_settings_from(config_path).map_err(map_config_err)
}

pub fn event_log(settings: &Settings) -> EventLog {
    EventLog::for_state_root(&settings.state_root)
}

/// Admin commands name bots exactly; only chat falls back to the default.
pub fn require_bot<'a>(settings: &'a Settings, name: &str) -> Result<&'a str, String> {
    settings
        .bots
        .get_key_value(name)
        .map(|(key, _)| key.as_str())
        .ok_or_else(|| {
            let known = settings.bots.keys().cloned().collect::<Vec<_>>().join(", ");
            format!("unknown bot `{name}` (configured: {known})")
        })
}

/// Positional arguments plus `--flag value` pairs. Bare `--flag` at the end
/// or before another flag is recorded as `"true"`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    pub flags: BTreeMap<String, String>,
}

impl ParsedArgs {
    pub fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }
}

pub fn parse_args(args: &[String], known_flags: &[&str]) -> Result<ParsedArgs, String> {
    let mut parsed = ParsedArgs::default();
    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        let Some(name) = arg.strip_prefix("--") else {
            parsed.positional.push(arg.clone());
            continue;
        };
        if !known_flags.contains(&name) {
            return Err(format!("unknown flag `--{name}`"));
        }
        let value = match iter.peek() {
            Some(next) if !next.starts_with("--") => iter.next().cloned().unwrap_or_default(),
            _ => "true".to_string(),
        };
        parsed.flags.insert(name.to_string(), value);
    }
    Ok(parsed)
}
