use crate::app::command_support::{load_settings, parse_args, require_bot};
use crate::persona::{Persona, PersonaCatalog, PersonaUpdate};
use std::path::Path;

const USAGE: &str = "usage: persona <list|create|update|delete> <bot> ...";

pub fn cmd_persona(config: &Path, args: &[String]) -> Result<String, String> {
    let Some(action) = args.first() else {
        return Err(USAGE.to_string());
    };
    let parsed = parse_args(&args[1..], &["prompt", "name", "emoji"])?;
    let Some(bot) = parsed.positional.first() else {
        return Err(USAGE.to_string());
    };

    let settings = load_settings(config)?;
    let bot = require_bot(&settings, bot)?;
    let mut catalog =
        PersonaCatalog::load(&settings.personas_path(bot)).map_err(|e| e.to_string())?;

    match action.as_str() {
        "list" => {
            let current = catalog.current().map(|p| p.slug.clone());
            let mut lines = vec![format!("bot={bot}"), format!("personas={}", catalog.all().len())];
            for (idx, persona) in catalog.all().iter().enumerate() {
                let marker = if current.as_deref() == Some(persona.slug.as_str()) {
                    "*"
                } else {
                    " "
                };
                lines.push(format!(
                    "{marker}{idx}: {} ({}) {}",
                    persona.display_label(),
                    persona.slug,
                    persona.emojicon
                )
                .trim_end()
                .to_string());
            }
            Ok(lines.join("\n"))
        }
        "create" => {
            let slug = slug_arg(&parsed.positional, "persona create <bot> <slug> --prompt <text>")?;
            let prompt = parsed
                .flag("prompt")
                .ok_or_else(|| "persona create requires --prompt <text>".to_string())?;
            let persona = Persona {
                slug: slug.to_string(),
                display_name: parsed.flag("name").unwrap_or_default().to_string(),
                prompt: prompt.to_string(),
                emojicon: parsed.flag("emoji").unwrap_or_default().to_string(),
            };
            catalog.create(persona).map_err(|e| e.to_string())?;
            catalog.save().map_err(|e| e.to_string())?;
            Ok(format!("persona created\nbot={bot}\nslug={slug}"))
        }
        "update" => {
            let slug = slug_arg(&parsed.positional, "persona update <bot> <slug> [--prompt ..]")?;
            let update = PersonaUpdate {
                display_name: parsed.flag("name").map(str::to_string),
                prompt: parsed.flag("prompt").map(str::to_string),
                emojicon: parsed.flag("emoji").map(str::to_string),
            };
            if update == PersonaUpdate::default() {
                return Err("persona update needs at least one of --prompt, --name, --emoji".to_string());
            }
            catalog.update(slug, update).map_err(|e| e.to_string())?;
            catalog.save().map_err(|e| e.to_string())?;
            Ok(format!("persona updated\nbot={bot}\nslug={slug}"))
        }
        "delete" => {
            let slug = slug_arg(&parsed.positional, "persona delete <bot> <slug>")?;
            catalog.delete(slug).map_err(|e| e.to_string())?;
            catalog.save().map_err(|e| e.to_string())?;
            Ok(format!("persona deleted\nbot={bot}\nslug={slug}"))
        }
        other => Err(format!("unknown persona action `{other}`\n{USAGE}")),
    }
}

fn slug_arg<'a>(positional: &'a [String], usage: &str) -> Result<&'a str, String> {
    match positional {
        [_, slug] => Ok(slug.as_str()),
        _ => Err(format!("usage: {usage}")),
    }
}
