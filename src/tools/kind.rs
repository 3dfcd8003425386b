use crate::persona::Persona;
use crate::provider::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Side-effect tools an agent bot can expose to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    GenerateImage,
    TextToSpeech,
    GetKnowledge,
    SwitchPersona,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::GenerateImage,
        ToolKind::TextToSpeech,
        ToolKind::GetKnowledge,
        ToolKind::SwitchPersona,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GenerateImage => "generate_image",
            Self::TextToSpeech => "text_to_speech",
            Self::GetKnowledge => "get_knowledge",
            Self::SwitchPersona => "switch_persona",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }

    /// Tool declaration sent to the model. `switch_persona` lists the
    /// personas by index; `get_knowledge` caps its query array.
    pub fn spec(self, personas: &[Persona], max_queries: usize) -> ToolSpec {
        let (description, input_schema) = match self {
            Self::GenerateImage => (
                "Generate an image based on a given prompt".to_string(),
                json!({
                    "type": "object",
                    "properties": {
                        "prompt": {"type": "string", "description": "The prompt for generating the image"}
                    },
                    "required": ["prompt"]
                }),
            ),
            Self::TextToSpeech => (
                "Convert text to spoken audio and return the saved audio file".to_string(),
                json!({
                    "type": "object",
                    "properties": {
                        "text": {"type": "string", "description": "The text to speak"}
                    },
                    "required": ["text"]
                }),
            ),
            Self::GetKnowledge => (
                format!(
                    "Retrieve specific knowledge when the user asks something. Can ask up to {max_queries} queries."
                ),
                json!({
                    "type": "object",
                    "properties": {
                        "queries": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": format!("An array of up to {max_queries} queries to find answers in the knowledge base"),
                            "maxItems": max_queries
                        }
                    },
                    "required": ["queries"]
                }),
            ),
            Self::SwitchPersona => {
                let listing = personas
                    .iter()
                    .enumerate()
                    .map(|(idx, persona)| format!("{idx}: {} ({})", persona.display_label(), persona.slug))
                    .collect::<Vec<_>>()
                    .join("\n");
                (
                    format!("Switch to a different bot personality. Available personalities:\n{listing}"),
                    json!({
                        "type": "object",
                        "properties": {
                            "persona_index": {"type": "integer", "description": "The index of the personality to switch to"}
                        },
                        "required": ["persona_index"]
                    }),
                )
            }
        };
        ToolSpec {
            name: self.as_str().to_string(),
            description,
            input_schema,
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
