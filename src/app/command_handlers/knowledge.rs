use crate::app::command_support::{event_log, load_settings, require_bot};
use crate::bot::open_knowledge_base;
use crate::knowledge::AddOutcome;
use std::path::Path;

const USAGE: &str = "usage: knowledge <add|search|list|remove> <bot> ...";

pub fn cmd_knowledge(config: &Path, args: &[String]) -> Result<String, String> {
    let (Some(action), Some(bot)) = (args.first(), args.get(1)) else {
        return Err(USAGE.to_string());
    };
    let rest = &args[2..];

    let settings = load_settings(config)?;
    let bot = require_bot(&settings, bot)?;
    let log = event_log(&settings);
    let base = open_knowledge_base(&settings, bot, &log).map_err(|e| e.to_string())?;

    match action.as_str() {
        "add" => {
            if rest.is_empty() {
                return Err("usage: knowledge add <bot> <path|url>...".to_string());
            }
            let mut lines = Vec::with_capacity(rest.len());
            for source in rest {
                let outcome = base.add_source(source).map_err(|e| e.to_string())?;
                let status = match &outcome {
                    AddOutcome::Added(_) => "added",
                    AddOutcome::AlreadyIndexed(_) => "already_indexed",
                };
                let record = outcome.record();
                lines.push(format!(
                    "{status} doc_id={} chunks={} source={}",
                    record.doc_id, record.chunk_count, record.source
                ));
            }
            Ok(lines.join("\n"))
        }
        "search" => {
            if rest.is_empty() {
                return Err("usage: knowledge search <bot> <query...>".to_string());
            }
            let hits = base
                .search(&[rest.join(" ")])
                .map_err(|e| e.to_string())?;
            let mut lines = vec![format!("hits={}", hits.len())];
            for hit in hits {
                lines.push(format!(
                    "score={:.4} doc_id={} chunk={}\n  {}",
                    hit.score, hit.doc_id, hit.ordinal, hit.text
                ));
            }
            Ok(lines.join("\n"))
        }
        "list" => {
            let documents = base.list_documents().map_err(|e| e.to_string())?;
            let mut lines = vec![format!("bot={bot}"), format!("documents={}", documents.len())];
            for doc in documents {
                lines.push(format!(
                    "doc_id={} chunks={} created_at={} source={}",
                    doc.doc_id, doc.chunk_count, doc.created_at, doc.source
                ));
            }
            Ok(lines.join("\n"))
        }
        "remove" => {
            let [doc_id] = rest else {
                return Err("usage: knowledge remove <bot> <doc_id>".to_string());
            };
            base.remove_document(doc_id).map_err(|e| e.to_string())?;
            Ok(format!("document removed\nbot={bot}\ndoc_id={doc_id}"))
        }
        other => Err(format!("unknown knowledge action `{other}`\n{USAGE}")),
    }
}
