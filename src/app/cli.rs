#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Init,
    Chat,
    Ask,
    Persona,
    Knowledge,
    Scenario,
    Status,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "init" => CliVerb::Init,
        "chat" => CliVerb::Chat,
        "ask" => CliVerb::Ask,
        "persona" => CliVerb::Persona,
        "knowledge" => CliVerb::Knowledge,
        "scenario" => CliVerb::Scenario,
        "status" => CliVerb::Status,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  init [--state-root <path>] [--force]      Write a starter config".to_string(),
        "  status                                    Show settings and configured bots"
            .to_string(),
        "  chat [bot]                                Interactive chat (/reset, /personas, /persona <slug>, /exit)"
            .to_string(),
        "  ask <bot> <message...>                    Send one message and print the reply"
            .to_string(),
        "  persona list <bot>                        List a bot's personas".to_string(),
        "  persona create <bot> <slug> --prompt <text> [--name <n>] [--emoji <e>]".to_string(),
        "  persona update <bot> <slug> [--prompt <text>] [--name <n>] [--emoji <e>]"
            .to_string(),
        "  persona delete <bot> <slug>               Remove a persona".to_string(),
        "  knowledge add <bot> <path|url>...         Index documents for retrieval".to_string(),
        "  knowledge search <bot> <query...>         Show the best matching chunks".to_string(),
        "  knowledge list <bot>                      List indexed documents".to_string(),
        "  knowledge remove <bot> <doc_id>           Drop a document and its chunks".to_string(),
        "  scenario check <file> [--scenario <name>] Validate a scenario graph".to_string(),
        "  scenario list <file>                      List scenario names in a file".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_parse_and_unknown_falls_through() {
        assert_eq!(parse_cli_verb("ask"), CliVerb::Ask);
        assert_eq!(parse_cli_verb("-h"), CliVerb::Help);
        assert_eq!(parse_cli_verb("serve"), CliVerb::Unknown);
    }
}
