use super::{ensure_message, BotError, BotReply, ChatBot, ModelSettings, ReplyParams};
use crate::knowledge::KnowledgeBase;
use crate::persona::{compose_system_message, PersonaCatalog, PersonaSelector};
use crate::provider::{
    ChatBackend, ChatMessage, ChatRequest, ContentBlock, Role, StopReason, ToolChoice,
};
use crate::shared::logging::EventLog;
use crate::tools::{MediaTools, ToolBox, ToolKind};
use serde_json::Value;

/// Tool-using bot: loops on `tool_use` stops, feeding tool results back
/// until the model answers or the round limit is hit.
pub struct AgentBot {
    name: String,
    backend: Box<dyn ChatBackend>,
    model: ModelSettings,
    global_instructions: String,
    personas: PersonaCatalog,
    history: Vec<ChatMessage>,
    tools: Vec<ToolKind>,
    force_knowledge: bool,
    max_tool_rounds: u32,
    max_queries: usize,
    knowledge: Option<KnowledgeBase>,
    media: Option<MediaTools>,
    log: EventLog,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentOptions {
    pub tools: Vec<ToolKind>,
    pub force_knowledge: bool,
    pub max_tool_rounds: u32,
    pub max_queries: usize,
}

impl AgentBot {
    pub fn new(
        name: &str,
        backend: Box<dyn ChatBackend>,
        model: ModelSettings,
        global_instructions: &str,
        personas: PersonaCatalog,
        options: AgentOptions,
        log: EventLog,
    ) -> Self {
        Self {
            name: name.to_string(),
            backend,
            model,
            global_instructions: global_instructions.to_string(),
            personas,
            history: Vec::new(),
            tools: options.tools,
            force_knowledge: options.force_knowledge,
            max_tool_rounds: options.max_tool_rounds,
            max_queries: options.max_queries,
            knowledge: None,
            media: None,
            log,
        }
    }

    pub fn with_knowledge(mut self, knowledge: KnowledgeBase) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn with_media(mut self, media: MediaTools) -> Self {
        self.media = Some(media);
        self
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    fn request(&self, messages: &[ChatMessage], first_round: bool) -> ChatRequest {
        let mut request = ChatRequest::new(self.model.model.clone(), messages.to_vec());
        request.system = Some(compose_system_message(
            &self.global_instructions,
            self.personas.current(),
        ));
        request.temperature = self.model.temperature;
        request.max_tokens = self.model.max_tokens;
        request.tools = self
            .tools
            .iter()
            .map(|kind| kind.spec(self.personas.all(), self.max_queries))
            .collect();
        request.tool_choice = if first_round && self.force_knowledge {
            Some(ToolChoice::Tool(ToolKind::GetKnowledge.as_str().to_string()))
        } else {
            None
        };
        request
    }

    fn run_tool(&mut self, id: &str, name: &str, input: &Value) -> (ContentBlock, Option<String>) {
        let mut toolbox = ToolBox {
            enabled: &self.tools,
            personas: &mut self.personas,
            knowledge: self.knowledge.as_ref(),
            media: self.media.as_ref(),
            max_queries: self.max_queries,
        };
        let (content, attachment) = match toolbox.run(name, input) {
            Ok(output) => {
                self.log.info(
                    "bot.tool_used",
                    &[
                        ("bot", Value::from(self.name.as_str())),
                        ("tool", Value::from(name)),
                    ],
                );
                (output.content, output.attachment)
            }
            Err(err) => {
                self.log.warn(
                    "bot.tool_failed",
                    &[
                        ("bot", Value::from(self.name.as_str())),
                        ("tool", Value::from(name)),
                        ("reason", Value::String(err.to_string())),
                    ],
                );
                (format!("Error: {err}"), None)
            }
        };
        (
            ContentBlock::ToolResult {
                tool_use_id: id.to_string(),
                content,
            },
            attachment,
        )
    }
}

impl ChatBot for AgentBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn reply(&mut self, message: &str, params: &ReplyParams) -> Result<BotReply, BotError> {
        let message = ensure_message(message)?;
        if let Some(slug) = params.persona.as_deref() {
            self.select_persona(slug)?;
        }

        let mut messages = self.history.clone();
        messages.push(ChatMessage::user(message));
        let mut attachments = Vec::new();
        let mut rounds = 0_u32;

        let completion = loop {
            let request = self.request(&messages, rounds == 0);
            let completion = self.backend.complete(&request)?;
            if completion.stop_reason != StopReason::ToolUse {
                break completion;
            }
            if rounds >= self.max_tool_rounds {
                self.log.error(
                    "bot.tool_rounds_exceeded",
                    &[
                        ("bot", Value::from(self.name.as_str())),
                        ("rounds", Value::from(rounds)),
                    ],
                );
                return Err(BotError::ToolRoundsExceeded { rounds });
            }

            let calls: Vec<(String, String, Value)> = completion
                .tool_uses()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();
            let mut results = Vec::with_capacity(calls.len());
            for (id, name, input) in &calls {
                let (block, attachment) = self.run_tool(id, name, input);
                results.push(block);
                attachments.extend(attachment);
            }

            messages.push(ChatMessage {
                role: Role::Assistant,
                blocks: completion.blocks,
            });
            messages.push(ChatMessage {
                role: Role::User,
                blocks: results,
            });
            rounds += 1;
        };

        let text = completion.text();
        self.history.push(ChatMessage::user(message));
        self.history.push(ChatMessage::assistant(text.clone()));
        Ok(BotReply { text, attachments })
    }

    fn reset(&mut self) {
        self.history.clear();
    }

    fn personas(&self) -> Option<&PersonaCatalog> {
        Some(&self.personas)
    }

    fn select_persona(&mut self, slug: &str) -> Result<String, BotError> {
        let persona = self.personas.select(PersonaSelector::Slug(slug))?;
        Ok(persona.display_label().to_string())
    }
}
