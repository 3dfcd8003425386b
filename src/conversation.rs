use crate::provider::{ChatMessage, Role};

/// Chat history seeded with a system prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    system_prompt: String,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages: Vec::new(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Messages after the system prompt, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// System prompt followed by the history, for APIs that take it inline.
    pub fn with_system(&self) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        if !self.system_prompt.trim().is_empty() {
            out.push(ChatMessage::system(self.system_prompt.clone()));
        }
        out.extend(self.messages.iter().cloned());
        out
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Drops the most recent message when it is an unanswered user turn.
    pub fn discard_pending_user(&mut self) {
        if self.messages.last().map(|m| m.role) == Some(Role::User) {
            self.messages.pop();
        }
    }

    pub fn replace_system_prompt(&mut self, system_prompt: impl Into<String>) {
        self.system_prompt = system_prompt.into();
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_order_and_reset_keeps_system_prompt() {
        let mut conversation = Conversation::new("be brief");
        conversation.push_user("hi");
        conversation.push_assistant("hey");
        let inline = conversation.with_system();
        assert_eq!(inline.len(), 3);
        assert_eq!(inline[0].role, Role::System);
        assert_eq!(inline[2].content(), "hey");

        conversation.reset();
        assert!(conversation.is_empty());
        assert_eq!(conversation.system_prompt(), "be brief");
    }

    #[test]
    fn pending_user_turn_is_discarded_only_when_last() {
        let mut conversation = Conversation::new("");
        conversation.push_user("q1");
        conversation.push_assistant("a1");
        conversation.discard_pending_user();
        assert_eq!(conversation.len(), 2);
        conversation.push_user("q2");
        conversation.discard_pending_user();
        assert_eq!(conversation.len(), 2);
        assert!(conversation.with_system().iter().all(|m| m.role != Role::System));
    }
}
