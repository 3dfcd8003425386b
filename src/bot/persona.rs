use super::{ensure_message, BotError, BotReply, ChatBot, ModelSettings, ReplyParams};
use crate::conversation::Conversation;
use crate::knowledge::KnowledgeBase;
use crate::persona::{compose_system_message, PersonaCatalog, PersonaSelector};
use crate::provider::{ChatBackend, ChatRequest, ProviderKind};
use crate::shared::logging::EventLog;
use crate::tools::MediaTools;
use serde_json::Value;

/// Plain history bot: persona system prompt, full history, one completion per turn.
pub struct PersonaBot {
    name: String,
    backend: Box<dyn ChatBackend>,
    model: ModelSettings,
    global_instructions: String,
    personas: PersonaCatalog,
    conversation: Conversation,
    knowledge: Option<KnowledgeBase>,
    voice: Option<MediaTools>,
    speak_replies: bool,
    log: EventLog,
}

impl PersonaBot {
    pub fn new(
        name: &str,
        backend: Box<dyn ChatBackend>,
        model: ModelSettings,
        global_instructions: &str,
        personas: PersonaCatalog,
        log: EventLog,
    ) -> Self {
        let system = compose_system_message(global_instructions, personas.current());
        Self {
            name: name.to_string(),
            backend,
            model,
            global_instructions: global_instructions.to_string(),
            personas,
            conversation: Conversation::new(system),
            knowledge: None,
            voice: None,
            speak_replies: false,
            log,
        }
    }

    /// Retrieved chunks for each message are added to the request.
    pub fn with_knowledge(mut self, knowledge: KnowledgeBase) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    /// Replies are rendered to audio when `speak_replies` (or the turn's
    /// `speak` override) is set.
    pub fn with_voice(mut self, voice: MediaTools, speak_replies: bool) -> Self {
        self.voice = Some(voice);
        self.speak_replies = speak_replies;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    fn refresh_system_prompt(&mut self) {
        let system = compose_system_message(&self.global_instructions, self.personas.current());
        self.conversation.replace_system_prompt(system);
    }

    fn retrieve(&self, message: &str) -> Vec<String> {
        let Some(knowledge) = self.knowledge.as_ref() else {
            return Vec::new();
        };
        match knowledge.search(&[message.to_string()]) {
            Ok(hits) => hits.into_iter().map(|hit| hit.text).collect(),
            Err(err) => {
                self.log.warn(
                    "bot.knowledge_failed",
                    &[
                        ("bot", Value::from(self.name.as_str())),
                        ("reason", Value::String(err.to_string())),
                    ],
                );
                Vec::new()
            }
        }
    }

    fn build_request(&self, documents: Vec<String>) -> ChatRequest {
        let mut request = ChatRequest::new(
            self.model.model.clone(),
            self.conversation.messages().to_vec(),
        );
        request.temperature = self.model.temperature;
        request.max_tokens = self.model.max_tokens;

        let mut system = self.conversation.system_prompt().to_string();
        if !documents.is_empty() {
            if self.backend.kind() == ProviderKind::Cohere {
                request.documents = documents;
            } else {
                system.push_str("\n\nRelevant knowledge:\n");
                system.push_str(
                    &documents
                        .iter()
                        .map(|doc| format!("- {doc}"))
                        .collect::<Vec<_>>()
                        .join("\n"),
                );
            }
        }
        request.system = Some(system);
        request
    }
}

impl ChatBot for PersonaBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn reply(&mut self, message: &str, params: &ReplyParams) -> Result<BotReply, BotError> {
        let message = ensure_message(message)?;
        if let Some(slug) = params.persona.as_deref() {
            self.select_persona(slug)?;
        }

        let documents = self.retrieve(message);
        self.conversation.push_user(message);
        let request = self.build_request(documents);
        let completion = match self.backend.complete(&request) {
            Ok(completion) => completion,
            Err(err) => {
                self.conversation.discard_pending_user();
                self.log.error(
                    "bot.reply_failed",
                    &[
                        ("bot", Value::from(self.name.as_str())),
                        ("reason", Value::String(err.to_string())),
                    ],
                );
                return Err(err.into());
            }
        };

        let text = completion.text();
        self.conversation.push_assistant(text.clone());
        let mut reply = BotReply::text(text);

        if params.speak.unwrap_or(self.speak_replies) {
            if let Some(voice) = self.voice.as_ref() {
                let path = voice.text_to_speech(&reply.text)?;
                reply.attachments.push(path.display().to_string());
            }
        }
        Ok(reply)
    }

    fn reset(&mut self) {
        self.conversation.reset();
    }

    fn personas(&self) -> Option<&PersonaCatalog> {
        Some(&self.personas)
    }

    fn select_persona(&mut self, slug: &str) -> Result<String, BotError> {
        let label = self
            .personas
            .select(PersonaSelector::Slug(slug))?
            .display_label()
            .to_string();
        self.refresh_system_prompt();
        self.log.info(
            "bot.persona_selected",
            &[
                ("bot", Value::from(self.name.as_str())),
                ("persona", Value::from(slug)),
            ],
        );
        Ok(label)
    }
}
