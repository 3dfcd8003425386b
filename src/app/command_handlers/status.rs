use crate::app::command_support::load_settings;
use crate::provider::ProviderKind;
use std::collections::BTreeSet;
use std::path::Path;

pub fn cmd_status(config: &Path, args: &[String]) -> Result<String, String> {
    if !args.is_empty() {
        return Err("usage: status".to_string());
    }
    let settings = load_settings(config)?;

    let mut lines = vec![
        format!("config={}", config.display()),
        format!("state_root={}", settings.state_root.display()),
        format!("default_bot={}", settings.default_bot),
        format!("bots={}", settings.bots.len()),
    ];
    let mut providers = BTreeSet::new();
    for (name, bot) in &settings.bots {
        let tools = bot
            .tools
            .iter()
            .map(|tool| tool.as_str())
            .collect::<Vec<_>>()
            .join(",");
        lines.push(format!(
            "bot={name} kind={} provider={} model={} tools={}",
            bot.kind.as_str(),
            bot.provider,
            bot.model,
            if tools.is_empty() { "-" } else { tools.as_str() }
        ));
        providers.insert(bot.provider);
        if bot.needs_knowledge() {
            providers.insert(ProviderKind::Cohere);
        }
    }

    for provider in providers {
        let env = settings
            .providers
            .get(&provider)
            .and_then(|p| p.api_key_env.clone())
            .unwrap_or_else(|| provider.default_api_key_env().to_string());
        let set = std::env::var(&env)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);
        lines.push(format!("provider={provider} api_key_env={env} api_key_set={set}"));
    }
    Ok(lines.join("\n"))
}
