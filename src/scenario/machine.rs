use super::definition::{NodeDefinition, ScenarioDefinition};
use crate::provider::ChatMessage;
use serde_json::{Map, Value};

/// Outcome of one `transition` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Stayed,
    Moved {
        from: String,
        to: String,
        condition: String,
    },
}

/// Runtime state for one scenario conversation.
#[derive(Debug, Clone)]
pub struct StateMachine {
    definition: ScenarioDefinition,
    current: usize,
    /// Messages in arrival order, tagged with the node they were recorded in.
    transcript: Vec<(usize, ChatMessage)>,
    data: Map<String, Value>,
}

impl StateMachine {
    pub fn new(definition: ScenarioDefinition) -> Self {
        let mut machine = Self {
            current: definition.initial_index(),
            definition,
            transcript: Vec::new(),
            data: Map::new(),
        };
        machine.enter(machine.current);
        machine
    }

    pub fn definition(&self) -> &ScenarioDefinition {
        &self.definition
    }

    pub fn current_node(&self) -> &NodeDefinition {
        &self.definition.nodes()[self.current]
    }

    pub fn current_node_id(&self) -> &str {
        self.current_node().id.as_str()
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn current_history(&self) -> Vec<ChatMessage> {
        self.transcript
            .iter()
            .filter(|(node, _)| *node == self.current)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Required fields of the current node that are still unset.
    pub fn missing_required(&self) -> Vec<&str> {
        self.current_node()
            .required_info
            .iter()
            .filter(|field| is_unset(self.data.get(field.as_str())))
            .map(String::as_str)
            .collect()
    }

    /// Fills unset fields from `extracted`; returns the names that were set.
    pub fn merge_extracted(&mut self, extracted: Map<String, Value>) -> Vec<String> {
        let mut updated = Vec::new();
        for (field, value) in extracted {
            if value.is_null() || !is_unset(self.data.get(&field)) {
                continue;
            }
            updated.push(field.clone());
            self.data.insert(field, value);
        }
        updated
    }

    /// Follows the first edge of the current node whose condition holds.
    pub fn transition(&mut self) -> Transition {
        let node = self.current_node();
        let Some(edge) = node
            .edges
            .iter()
            .find(|edge| edge.condition.evaluate(&self.data))
        else {
            return Transition::Stayed;
        };

        let from = node.id.to_string();
        let condition = edge.label().to_string();
        let target = edge.target;
        self.enter(target);
        Transition::Moved {
            from,
            to: self.current_node_id().to_string(),
            condition,
        }
    }

    pub fn record_user(&mut self, content: impl Into<String>) {
        self.transcript
            .push((self.current, ChatMessage::user(content)));
    }

    pub fn record_assistant(&mut self, content: impl Into<String>) {
        self.transcript
            .push((self.current, ChatMessage::assistant(content)));
    }

    /// What every node still holds, in the order it was said.
    pub fn global_chat_history(&self) -> Vec<ChatMessage> {
        self.transcript
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn combined_system_prompt(&self) -> String {
        format!(
            "{} {}",
            self.definition.general_system_prompt(),
            self.current_node().system_prompt
        )
        .trim()
        .to_string()
    }

    pub fn reset(&mut self) {
        self.transcript.clear();
        self.data.clear();
        self.current = self.definition.initial_index();
        self.enter(self.current);
    }

    fn enter(&mut self, index: usize) {
        self.current = index;
        self.transcript.retain(|(node, _)| *node != index);
        let required = self.definition.nodes()[index].required_info.clone();
        for field in required {
            self.data.entry(field).or_insert(Value::Null);
        }
    }
}

fn is_unset(value: Option<&Value>) -> bool {
    value.map(Value::is_null).unwrap_or(true)
}
