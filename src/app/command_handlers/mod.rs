use super::cli::{help_text, parse_cli_verb, CliVerb};
use super::command_support::config_path;
use std::path::Path;

pub mod chat;
pub mod init;
pub mod knowledge;
pub mod persona;
pub mod scenario;
pub mod status;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let path = config_path()?;
    run_cli_with_config(args, &path)
}

/// Runs one CLI invocation against an explicit config file.
pub fn run_cli_with_config(args: Vec<String>, config: &Path) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    let rest = &args[1..];
    match parse_cli_verb(&args[0]) {
        CliVerb::Init => init::cmd_init(config, rest),
        CliVerb::Status => status::cmd_status(config, rest),
        CliVerb::Chat => chat::cmd_chat(config, rest),
        CliVerb::Ask => chat::cmd_ask(config, rest),
        CliVerb::Persona => persona::cmd_persona(config, rest),
        CliVerb::Knowledge => knowledge::cmd_knowledge(config, rest),
        CliVerb::Scenario => scenario::cmd_scenario(rest),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`\n{}", args[0], help_text())),
    }
}
