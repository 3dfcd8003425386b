use super::{ensure_message, BotError, BotReply, ChatBot, ModelSettings, ReplyParams};
use crate::provider::{ChatBackend, ChatRequest};
use crate::scenario::{Extractor, StateMachine, Transition};
use crate::shared::logging::EventLog;
use serde_json::Value;

/// Drives a scenario graph: extract, merge, transition, then answer with
/// the (possibly new) node's prompt over the whole scenario history.
pub struct ScenarioBot {
    name: String,
    backend: Box<dyn ChatBackend>,
    model: ModelSettings,
    machine: StateMachine,
    extractor: Extractor,
    log: EventLog,
}

impl ScenarioBot {
    pub fn new(
        name: &str,
        backend: Box<dyn ChatBackend>,
        model: ModelSettings,
        machine: StateMachine,
        extractor: Extractor,
        log: EventLog,
    ) -> Self {
        Self {
            name: name.to_string(),
            backend,
            model,
            machine,
            extractor,
            log,
        }
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }
}

impl ChatBot for ScenarioBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn reply(&mut self, message: &str, _params: &ReplyParams) -> Result<BotReply, BotError> {
        let message = ensure_message(message)?;
        self.machine.record_user(message);

        let required = self.machine.current_node().required_info.clone();
        let extracted = self.extractor.extract(
            &*self.backend,
            message,
            &required,
            &self.machine.current_history(),
        );
        let updated = self.machine.merge_extracted(extracted);
        if !updated.is_empty() {
            self.log.info(
                "scenario.fields_extracted",
                &[
                    ("bot", Value::from(self.name.as_str())),
                    ("fields", Value::from(updated)),
                ],
            );
        }

        if let Transition::Moved {
            from,
            to,
            condition,
        } = self.machine.transition()
        {
            self.log.info(
                "scenario.transition",
                &[
                    ("bot", Value::from(self.name.as_str())),
                    ("from", Value::String(from)),
                    ("to", Value::String(to)),
                    ("condition", Value::String(condition)),
                ],
            );
        }

        let mut request = ChatRequest::new(
            self.model.model.clone(),
            self.machine.global_chat_history(),
        );
        request.system = Some(self.machine.combined_system_prompt());
        request.temperature = self.model.temperature;
        request.max_tokens = self.model.max_tokens;

        let completion = self.backend.complete(&request)?;
        let text = completion.text();
        self.machine.record_assistant(text.clone());
        Ok(BotReply::text(text))
    }

    fn reset(&mut self) {
        self.machine.reset();
    }
}
