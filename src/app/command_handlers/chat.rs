use crate::app::command_support::{event_log, load_settings, parse_args};
use crate::bot::{build_bot, ReplyParams};
use crate::channels::chat::run_local_chat_session_stdio;
use std::path::Path;

pub fn cmd_chat(config: &Path, args: &[String]) -> Result<String, String> {
    if args.len() > 1 {
        return Err("usage: chat [bot]".to_string());
    }
    let settings = load_settings(config)?;
    let log = event_log(&settings);
    let mut bot = build_bot(&settings, args.first().map(String::as_str), &log)
        .map_err(|e| e.to_string())?;
    run_local_chat_session_stdio(bot.as_mut())
}

/// One-shot question: `ask <bot> [--persona <slug>] [--speak] <message...>`.
pub fn cmd_ask(config: &Path, args: &[String]) -> Result<String, String> {
    let parsed = parse_args(args, &["persona", "speak"])?;
    if parsed.positional.len() < 2 {
        return Err("usage: ask <bot> [--persona <slug>] [--speak] <message...>".to_string());
    }
    let settings = load_settings(config)?;
    let log = event_log(&settings);
    let mut bot =
        build_bot(&settings, Some(&parsed.positional[0]), &log).map_err(|e| e.to_string())?;

    let message = parsed.positional[1..].join(" ");
    let params = ReplyParams {
        persona: parsed.flag("persona").map(str::to_string),
        speak: parsed.has("speak").then_some(true),
    };
    let reply = bot.reply(&message, &params).map_err(|e| e.to_string())?;

    let mut lines = vec![reply.text];
    lines.extend(
        reply
            .attachments
            .into_iter()
            .map(|attachment| format!("attachment={attachment}")),
    );
    Ok(lines.join("\n"))
}
