use crate::app::command_support::{map_config_err, parse_args};
use crate::config::Settings;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes a starter config. The state root defaults to the config's directory.
pub fn cmd_init(config: &Path, args: &[String]) -> Result<String, String> {
    let parsed = parse_args(args, &["state-root", "force"])?;
    if !parsed.positional.is_empty() {
        return Err("usage: init [--state-root <path>] [--force]".to_string());
    }
    if config.exists() && !parsed.has("force") {
        return Err(format!(
            "config already exists at {}; pass --force to overwrite",
            config.display()
        ));
    }

    let state_root = match parsed.flag("state-root") {
        Some(raw) => PathBuf::from(raw),
        None => config
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| format!("config path {} has no parent", config.display()))?,
    };
    if !state_root.is_absolute() {
        return Err("--state-root must be an absolute path".to_string());
    }

    let settings = Settings::starter(&state_root);
    settings.validate().map_err(map_config_err)?;
    settings.save(config).map_err(map_config_err)?;
    for bot in settings.bots.keys() {
        fs::create_dir_all(settings.bot_dir(bot))
            .map_err(|e| format!("failed to create {}: {e}", settings.bot_dir(bot).display()))?;
    }

    Ok(format!(
        "initialized\nconfig={}\nstate_root={}\ndefault_bot={}",
        config.display(),
        settings.state_root.display(),
        settings.default_bot
    ))
}
