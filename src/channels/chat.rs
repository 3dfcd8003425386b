use crate::bot::{ChatBot, ReplyParams};
use std::io::{self, BufRead, Write};

const CHAT_EXIT_COMMANDS: &[&str] = &["/exit", "exit", "quit"];

pub fn run_local_chat_session_stdio(bot: &mut dyn ChatBot) -> Result<String, String> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut output = stdout.lock();
    run_local_chat_session(bot, &mut input, &mut output)
}

/// Reads lines until EOF or an exit command. Slash commands are handled
/// locally; everything else goes to the bot.
pub fn run_local_chat_session<R: BufRead, W: Write>(
    bot: &mut dyn ChatBot,
    input: &mut R,
    output: &mut W,
) -> Result<String, String> {
    writeln!(output, "chat bot={}", bot.name())
        .map_err(|e| format!("failed to write chat output: {e}"))?;
    writeln!(
        output,
        "type `/exit` to quit, `/reset` to start over, `/personas` to list personas"
    )
    .map_err(|e| format!("failed to write chat output: {e}"))?;

    let mut turns = 0_usize;
    loop {
        write!(output, "you> ").map_err(|e| format!("failed to write chat prompt: {e}"))?;
        output
            .flush()
            .map_err(|e| format!("failed to flush chat prompt: {e}"))?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|e| format!("failed to read chat input: {e}"))?;
        if read == 0 {
            break;
        }

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if is_chat_exit_command(message) {
            break;
        }

        let response = match ChatCommand::parse(message) {
            Some(command) => run_chat_command(bot, command),
            None => {
                turns += 1;
                match bot.reply(message, &ReplyParams::default()) {
                    Ok(reply) => {
                        let mut rendered = format!("assistant> {}", reply.text);
                        for attachment in &reply.attachments {
                            rendered.push_str(&format!("\n[attachment] {attachment}"));
                        }
                        rendered
                    }
                    Err(err) => format!("error> {err}"),
                }
            }
        };
        writeln!(output, "{response}").map_err(|e| format!("failed to write chat output: {e}"))?;
        output
            .flush()
            .map_err(|e| format!("failed to flush chat output: {e}"))?;
    }

    Ok(format!("chat ended\nbot={}\nturns={turns}", bot.name()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatCommand<'a> {
    Reset,
    Personas,
    Persona(&'a str),
    Unknown(&'a str),
}

impl<'a> ChatCommand<'a> {
    fn parse(message: &'a str) -> Option<Self> {
        let rest = message.strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        Some(match name {
            "reset" => Self::Reset,
            "personas" => Self::Personas,
            "persona" if !arg.is_empty() => Self::Persona(arg),
            _ => Self::Unknown(message),
        })
    }
}

fn run_chat_command(bot: &mut dyn ChatBot, command: ChatCommand<'_>) -> String {
    match command {
        ChatCommand::Reset => {
            bot.reset();
            "system> conversation reset".to_string()
        }
        ChatCommand::Personas => match bot.personas() {
            Some(catalog) if !catalog.is_empty() => {
                let current = catalog.current().map(|p| p.slug.as_str());
                let mut lines = vec!["system> personas:".to_string()];
                for persona in catalog.all() {
                    let marker = if Some(persona.slug.as_str()) == current {
                        "*"
                    } else {
                        " "
                    };
                    lines.push(format!(
                        "{marker} {} {} {}",
                        persona.slug,
                        persona.emojicon,
                        persona.display_label()
                    ));
                }
                lines.join("\n")
            }
            Some(_) => "system> no personas configured".to_string(),
            None => format!("system> bot `{}` does not use personas", bot.name()),
        },
        ChatCommand::Persona(slug) => match bot.select_persona(slug) {
            Ok(label) => format!("system> persona set to {label}"),
            Err(err) => format!("error> {err}"),
        },
        ChatCommand::Unknown(raw) => {
            format!("error> unknown command `{raw}` (try /reset, /personas, /persona <slug>, /exit)")
        }
    }
}

fn is_chat_exit_command(message: &str) -> bool {
    CHAT_EXIT_COMMANDS
        .iter()
        .any(|command| message.eq_ignore_ascii_case(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_commands_parse() {
        assert_eq!(ChatCommand::parse("/reset"), Some(ChatCommand::Reset));
        assert_eq!(
            ChatCommand::parse("/persona  pirate "),
            Some(ChatCommand::Persona("pirate"))
        );
        assert_eq!(
            ChatCommand::parse("/persona"),
            Some(ChatCommand::Unknown("/persona"))
        );
        assert_eq!(ChatCommand::parse("hello /reset"), None);
        assert!(is_chat_exit_command("EXIT"));
    }
}
