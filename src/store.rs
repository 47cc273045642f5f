//! Ordered message store with identity-stable, in-place updates.

use crate::{Error, Message, MessageId, Result, Role};

/// The conversation as displayed: an ordered list of turns.
///
/// Streaming updates address a turn by [`MessageId`] and mutate it in place,
/// so list order and every other turn are untouched by an update.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    next_id: u64,
}

impl MessageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from previously persisted messages.
    ///
    /// Id allocation resumes above the largest loaded id.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let next_id = messages
            .iter()
            .map(|m| m.id.get() + 1)
            .max()
            .unwrap_or(0);
        Self { messages, next_id }
    }

    fn allocate(&mut self) -> MessageId {
        let id = MessageId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, role: Role, text: impl Into<String>) -> MessageId {
        let id = self.allocate();
        self.messages.push(Message::new(id, role, text));
        id
    }

    /// Appends a user turn.
    pub fn push_user(&mut self, text: impl Into<String>) -> MessageId {
        self.push(Role::User, text)
    }

    /// Appends an empty model turn to stream into.
    pub fn push_placeholder(&mut self) -> MessageId {
        self.push(Role::Model, String::new())
    }

    /// Appends the system-authored greeting.
    pub fn push_greeting(&mut self, text: impl Into<String>) -> MessageId {
        let id = self.push(Role::Model, text);
        if let Some(message) = self.messages.last_mut() {
            message.greeting = true;
        }
        id
    }

    fn get_mut(&mut self, id: MessageId) -> Result<&mut Message> {
        self.messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::validation(format!("no message {id}"), Some("id".to_string())))
    }

    /// Appends a streamed fragment to the turn with `id`.
    pub fn append_fragment(&mut self, id: MessageId, fragment: &str) -> Result<()> {
        self.get_mut(id)?.text.push_str(fragment);
        Ok(())
    }

    /// Replaces the text of the turn with `id` by an error notice.
    pub fn mark_error(&mut self, id: MessageId, text: impl Into<String>) -> Result<()> {
        let message = self.get_mut(id)?;
        message.text = text.into();
        message.is_error = true;
        Ok(())
    }

    /// Removes every turn and leaves exactly one greeting.
    pub fn reset(&mut self, greeting: impl Into<String>) -> MessageId {
        self.messages.clear();
        self.push_greeting(greeting)
    }

    /// Looks up a turn by id.
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// All turns, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The newest turn.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The newest model turn that is neither an error nor the greeting.
    pub fn last_reply(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Model && m.is_conversational())
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if there are no turns.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of empty model turns still waiting for fragments.
    pub fn placeholder_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_placeholder()).count()
    }
}
