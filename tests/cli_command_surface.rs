use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output};
use std::thread;
use tempfile::tempdir;

const KEY_ENVS: [&str; 4] = [
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "COHERE_API_KEY",
    "GROQ_API_KEY",
];

fn run_with_env(home: &Path, args: &[&str], envs: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_botkit"));
    cmd.args(args).env("HOME", home).env_remove("BOTKIT_CONFIG");
    for key in KEY_ENVS {
        cmd.env_remove(key);
    }
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd.output().expect("run botkit")
}

fn run(home: &Path, args: &[&str]) -> Output {
    run_with_env(home, args, &[])
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn assert_ok(output: &Output) {
    assert!(
        output.status.success(),
        "stdout:\n{}\nstderr:\n{}",
        stdout(output),
        stderr(output)
    );
}

fn assert_err_contains(output: &Output, needle: &str) {
    assert!(
        !output.status.success(),
        "expected failure, stdout:\n{}\nstderr:\n{}",
        stdout(output),
        stderr(output)
    );
    let text = format!("{}{}", stdout(output), stderr(output));
    assert!(
        text.contains(needle),
        "expected error to contain `{needle}`, got:\n{text}"
    );
}

fn kv_lines(output: &Output) -> BTreeMap<String, String> {
    stdout(output)
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn config_path(home: &Path) -> std::path::PathBuf {
    home.join(".botkit/config.yaml")
}

#[test]
fn no_arguments_prints_help_and_unknown_verbs_fail() {
    let dir = tempdir().expect("tempdir");
    let help = run(dir.path(), &[]);
    assert_ok(&help);
    assert!(stdout(&help).contains("Commands:"));
    assert!(stdout(&help).contains("knowledge add <bot>"));

    assert_err_contains(&run(dir.path(), &["serve"]), "unknown command `serve`");
}

#[test]
fn init_writes_a_starter_config_once() {
    let dir = tempdir().expect("tempdir");
    let home = dir.path();

    let first = run(home, &["init"]);
    assert_ok(&first);
    let kv = kv_lines(&first);
    assert_eq!(kv["config"], config_path(home).display().to_string());
    assert_eq!(kv["state_root"], home.join(".botkit").display().to_string());
    assert_eq!(kv["default_bot"], "chatbot");
    assert!(config_path(home).is_file());

    assert_err_contains(&run(home, &["init"]), "already exists");
    assert_ok(&run(home, &["init", "--force"]));
    assert_err_contains(
        &run(home, &["init", "--force", "--state-root", "relative/dir"]),
        "absolute",
    );
}

#[test]
fn commands_that_need_config_explain_how_to_create_it() {
    let dir = tempdir().expect("tempdir");
    assert_err_contains(&run(dir.path(), &["status"]), "botkit init");
}

#[test]
fn status_reports_bots_and_key_presence() {
    let dir = tempdir().expect("tempdir");
    let home = dir.path();
    assert_ok(&run(home, &["init"]));

    let missing = run(home, &["status"]);
    assert_ok(&missing);
    let text = stdout(&missing);
    assert!(text.contains("bot=chatbot kind=persona provider=openai model=gpt-4o tools=-"));
    assert!(text.contains("provider=openai api_key_env=OPENAI_API_KEY api_key_set=false"));

    let present = run_with_env(home, &["status"], &[("OPENAI_API_KEY", "sk-test")]);
    assert!(stdout(&present).contains("api_key_set=true"));
}

#[test]
fn personas_can_be_created_listed_updated_and_deleted() {
    let dir = tempdir().expect("tempdir");
    let home = dir.path();
    assert_ok(&run(home, &["init"]));

    assert_ok(&run(
        home,
        &[
            "persona", "create", "chatbot", "pirate", "--prompt", "Talk like a pirate.",
            "--name", "Pirate", "--emoji", "🏴‍☠️",
        ],
    ));
    assert_ok(&run(
        home,
        &["persona", "create", "chatbot", "poet", "--prompt", "Answer in verse."],
    ));
    assert_err_contains(
        &run(home, &["persona", "create", "chatbot", "poet", "--prompt", "again"]),
        "already exists",
    );
    assert_err_contains(
        &run(home, &["persona", "create", "chatbot", "nobody"]),
        "--prompt",
    );

    let list = run(home, &["persona", "list", "chatbot"]);
    assert_ok(&list);
    let text = stdout(&list);
    assert!(text.contains("personas=2"));
    assert!(text.contains("*0: Pirate (pirate)"));
    assert!(text.contains(" 1: poet (poet)"));

    assert_ok(&run(
        home,
        &["persona", "update", "chatbot", "poet", "--name", "Poet"],
    ));
    assert!(stdout(&run(home, &["persona", "list", "chatbot"])).contains("1: Poet (poet)"));

    assert_ok(&run(home, &["persona", "delete", "chatbot", "pirate"]));
    let text = stdout(&run(home, &["persona", "list", "chatbot"]));
    assert!(text.contains("personas=1"));
    assert!(!text.contains("pirate"));

    let stored = fs::read_to_string(home.join(".botkit/bots/chatbot/personas.json"))
        .expect("personas file");
    assert!(stored.contains("\"prompts\""));
    assert!(stored.contains("Answer in verse."));

    assert_err_contains(
        &run(home, &["persona", "list", "ghost"]),
        "unknown bot `ghost`",
    );
}

#[test]
fn scenario_files_are_checked_without_config() {
    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("support.json");
    fs::write(
        &file,
        r#"{"scenarios": [{
            "name": "support",
            "general_system_prompt": "Help out.",
            "initial_node": "greet",
            "nodes": [
                {"id": "greet", "required_info": ["name"],
                 "edges": [{"when": "exists(name)", "next_node": "done"},
                           {"when": "vip == true", "next_node": "done"}]},
                {"id": "done", "system_prompt": "Say goodbye."}
            ]
        }]}"#,
    )
    .expect("write scenario");
    let file_arg = file.display().to_string();

    let check = run(dir.path(), &["scenario", "check", &file_arg]);
    assert_ok(&check);
    let text = stdout(&check);
    assert!(text.contains("scenario=support"));
    assert!(text.contains("initial=greet"));
    assert!(text.contains("nodes=2"));
    assert!(text.contains("node=greet required=name"));
    assert!(text.contains("  when exists(name) -> done reads=name"));
    assert!(text.contains("  when vip == true -> done reads=vip"));
    assert!(text.contains("warning=edge greet -> done reads `vip` which no node extracts"));
    assert!(!text.contains("reads `name`"));
    assert!(text.contains("node=done required=-"));

    let list = run(dir.path(), &["scenario", "list", &file_arg]);
    assert!(stdout(&list).contains("scenario=support"));

    assert_err_contains(
        &run(
            dir.path(),
            &["scenario", "check", &file_arg, "--scenario", "sales"],
        ),
        "not found",
    );
}

#[test]
fn knowledge_commands_need_a_cohere_key_and_list_an_empty_store() {
    let dir = tempdir().expect("tempdir");
    let home = dir.path();
    assert_ok(&run(home, &["init"]));

    assert_err_contains(
        &run(home, &["knowledge", "list", "chatbot"]),
        "COHERE_API_KEY",
    );

    let list = run_with_env(
        home,
        &["knowledge", "list", "chatbot"],
        &[("COHERE_API_KEY", "co-test")],
    );
    assert_ok(&list);
    assert_eq!(kv_lines(&list)["documents"], "0");
    assert!(home.join(".botkit/knowledge/chatbot.sqlite3").is_file());

    assert_err_contains(
        &run_with_env(
            home,
            &["knowledge", "remove", "chatbot", "doc-000000000000"],
            &[("COHERE_API_KEY", "co-test")],
        ),
        "doc-000000000000",
    );
}

/// Answers one chat-completions request and returns the raw request body.
fn serve_one_completion(listener: TcpListener, reply: &'static str) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("read line");
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }
        let mut body = vec![0_u8; content_length];
        reader.read_exact(&mut body).expect("read body");

        let response_body = format!(
            r#"{{"choices": [{{"message": {{"role": "assistant", "content": "{reply}"}}, "finish_reason": "stop"}}]}}"#
        );
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            response_body.len(),
            response_body
        );
        stream
            .write_all(response.as_bytes())
            .expect("write response");
        String::from_utf8_lossy(&body).to_string()
    })
}

#[test]
fn ask_sends_one_message_through_the_configured_provider() {
    let dir = tempdir().expect("tempdir");
    let home = dir.path();
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let server = serve_one_completion(listener, "Ahoy!");

    let state_root = home.join(".botkit");
    fs::create_dir_all(&state_root).expect("state root");
    fs::write(
        config_path(home),
        format!(
            "state_root: {}\ndefault_bot: chatbot\nglobal_instructions: Keep it short.\nbots:\n  chatbot:\n    provider: openai\n    model: gpt-4o\nproviders:\n  openai:\n    api_base: http://{addr}\n",
            state_root.display()
        ),
    )
    .expect("write config");

    let output = run_with_env(
        home,
        &["ask", "chatbot", "say", "hello"],
        &[("OPENAI_API_KEY", "sk-test")],
    );
    assert_ok(&output);
    assert_eq!(stdout(&output).trim(), "Ahoy!");

    let body: serde_json::Value =
        serde_json::from_str(&server.join().expect("join server")).expect("request json");
    assert_eq!(body["model"], "gpt-4o");
    let messages = body["messages"].as_array().expect("messages");
    assert!(messages[0]["content"]
        .as_str()
        .unwrap_or_default()
        .contains("Keep it short."));
    assert_eq!(messages[1]["content"], "say hello");

    let log = fs::read_to_string(state_root.join("logs/botkit.log")).expect("event log");
    assert!(log.contains("\"event\":\"bot.loaded\""));
}

#[test]
fn ask_requires_a_bot_and_a_message() {
    let dir = tempdir().expect("tempdir");
    assert_err_contains(&run(dir.path(), &["ask", "chatbot"]), "usage: ask");
}
