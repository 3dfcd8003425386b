use super::error::ToolError;
use super::kind::ToolKind;
use super::media::MediaTools;
use crate::knowledge::KnowledgeBase;
use crate::persona::{PersonaCatalog, PersonaSelector};
use serde_json::Value;

pub const INVALID_PERSONA_INDEX: &str = "Invalid prompt index. Please choose a valid index.";

/// What a tool hands back to the model, plus any file produced on the side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
    pub attachment: Option<String>,
}

impl ToolOutput {
    fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachment: None,
        }
    }
}

/// Borrowed capabilities one agent turn can call into.
pub struct ToolBox<'a> {
    pub enabled: &'a [ToolKind],
    pub personas: &'a mut PersonaCatalog,
    pub knowledge: Option<&'a KnowledgeBase>,
    pub media: Option<&'a MediaTools>,
    pub max_queries: usize,
}

impl ToolBox<'_> {
    pub fn run(&mut self, name: &str, input: &Value) -> Result<ToolOutput, ToolError> {
        let kind = ToolKind::parse(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        if !self.enabled.contains(&kind) {
            return Err(ToolError::NotEnabled {
                tool: name.to_string(),
            });
        }

        match kind {
            ToolKind::GenerateImage => {
                let prompt = required_str(kind, input, "prompt")?;
                let image = self.media(kind)?.generate_image(prompt)?;
                let reference = image.reference();
                Ok(ToolOutput {
                    content: reference.clone(),
                    attachment: Some(reference),
                })
            }
            ToolKind::TextToSpeech => {
                let text = required_str(kind, input, "text")?;
                let path = self.media(kind)?.text_to_speech(text)?;
                let path = path.display().to_string();
                Ok(ToolOutput {
                    content: path.clone(),
                    attachment: Some(path),
                })
            }
            ToolKind::GetKnowledge => {
                let queries = parse_queries(input, self.max_queries)?;
                let knowledge = self.knowledge.ok_or_else(|| ToolError::Unavailable {
                    tool: kind.to_string(),
                    reason: "no knowledge base is configured for this bot".to_string(),
                })?;
                let texts = knowledge.knowledge_for(&queries)?;
                let encoded = serde_json::to_string(&texts).map_err(|err| {
                    ToolError::InvalidInput {
                        tool: kind.to_string(),
                        reason: err.to_string(),
                    }
                })?;
                Ok(ToolOutput::text(encoded))
            }
            ToolKind::SwitchPersona => {
                let index = input
                    .get("persona_index")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| ToolError::InvalidInput {
                        tool: kind.to_string(),
                        reason: "`persona_index` must be an integer".to_string(),
                    })?;
                let Ok(index) = usize::try_from(index) else {
                    return Ok(ToolOutput::text(INVALID_PERSONA_INDEX));
                };
                match self.personas.select(PersonaSelector::Index(index)) {
                    Ok(persona) => Ok(ToolOutput::text(format!(
                        "Switched to {} personality.",
                        persona.display_label()
                    ))),
                    Err(_) => Ok(ToolOutput::text(INVALID_PERSONA_INDEX)),
                }
            }
        }
    }

    fn media(&self, kind: ToolKind) -> Result<&MediaTools, ToolError> {
        self.media.ok_or_else(|| ToolError::Unavailable {
            tool: kind.to_string(),
            reason: "media generation requires an openai provider".to_string(),
        })
    }
}

fn required_str<'v>(kind: ToolKind, input: &'v Value, field: &str) -> Result<&'v str, ToolError> {
    input
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ToolError::InvalidInput {
            tool: kind.to_string(),
            reason: format!("`{field}` must be a non-empty string"),
        })
}

/// Accepts an array of strings (or a single string); keeps the first `max`.
pub fn parse_queries(input: &Value, max: usize) -> Result<Vec<String>, ToolError> {
    let invalid = |reason: &str| ToolError::InvalidInput {
        tool: ToolKind::GetKnowledge.to_string(),
        reason: reason.to_string(),
    };
    let queries: Vec<String> = match input.get("queries") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => {
            vec![single.trim().to_string()]
        }
        _ => return Err(invalid("`queries` must be an array of strings")),
    };
    if queries.is_empty() {
        return Err(invalid("`queries` must contain at least one query"));
    }
    Ok(queries.into_iter().take(max).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::Persona;
    use serde_json::json;

    fn catalog() -> PersonaCatalog {
        PersonaCatalog::from_personas(vec![
            Persona {
                slug: "friendly".to_string(),
                display_name: "Friendly".to_string(),
                prompt: "Be warm.".to_string(),
                emojicon: String::new(),
            },
            Persona {
                slug: "grumpy".to_string(),
                display_name: "Grumpy".to_string(),
                prompt: "Be curt.".to_string(),
                emojicon: String::new(),
            },
        ])
    }

    #[test]
    fn switch_persona_changes_selection_or_reports_invalid_index() {
        let mut personas = catalog();
        let enabled = [ToolKind::SwitchPersona];
        let mut tools = ToolBox {
            enabled: &enabled,
            personas: &mut personas,
            knowledge: None,
            media: None,
            max_queries: 3,
        };
        let out = tools
            .run("switch_persona", &json!({"persona_index": 1}))
            .expect("switch");
        assert_eq!(out.content, "Switched to Grumpy personality.");
        let out = tools
            .run("switch_persona", &json!({"persona_index": 7}))
            .expect("invalid index");
        assert_eq!(out.content, INVALID_PERSONA_INDEX);
        assert_eq!(personas.current().map(|p| p.slug.as_str()), Some("grumpy"));
    }

    #[test]
    fn disabled_unknown_and_unavailable_tools_error() {
        let mut personas = catalog();
        let enabled = [ToolKind::GetKnowledge, ToolKind::GenerateImage];
        let mut tools = ToolBox {
            enabled: &enabled,
            personas: &mut personas,
            knowledge: None,
            media: None,
            max_queries: 3,
        };
        assert!(matches!(
            tools.run("web_search", &json!({})),
            Err(ToolError::UnknownTool(_))
        ));
        assert!(matches!(
            tools.run("switch_persona", &json!({"persona_index": 0})),
            Err(ToolError::NotEnabled { .. })
        ));
        assert!(matches!(
            tools.run("get_knowledge", &json!({"queries": ["hours"]})),
            Err(ToolError::Unavailable { .. })
        ));
        assert!(matches!(
            tools.run("generate_image", &json!({"prompt": " "})),
            Err(ToolError::InvalidInput { .. })
        ));
    }

    #[test]
    fn queries_are_trimmed_and_capped() {
        let queries = parse_queries(&json!({"queries": [" a ", "", "b", "c", "d"]}), 3).expect("queries");
        assert_eq!(queries, vec!["a", "b", "c"]);
        assert_eq!(parse_queries(&json!({"queries": "solo"}), 3).expect("single"), vec!["solo"]);
        assert!(parse_queries(&json!({"queries": []}), 3).is_err());
        assert!(parse_queries(&json!({}), 3).is_err());
    }
}
