//! Core chat session management.
//!
//! [`ChatSession`] owns the displayed conversation, the single handle on the
//! remote chat and the persisted copy of the history. Every turn is written
//! through the [`MessageStore`] and saved after each mutation.

use futures::StreamExt;

use crate::backend::{ChatBackend, ChatRequest};
use crate::history::format_history;
use crate::observability::SESSION_RESETS;
use crate::playback::{AudioOutput, PlaybackController};
use crate::render::Renderer;
use crate::storage::HistoryStorage;
use crate::store::MessageStore;
use crate::{
    Content, Error, GenerationConfig, Message, MessageId, Mode, Model, Result, Role,
    SafetySetting, default_safety_settings,
};

/// The message left behind by a reset.
pub const GREETING: &str = "Conversation cleared. What would you like to talk about?";

/// Standing instruction sent with every request unless overridden.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You are a helpful, friendly assistant. Answer clearly and concisely.";

const EMPTY_REPLY: &str = "The model returned an empty reply. Try again.";
const INTERRUPTED_REPLY: &str = "The reply was interrupted before it finished.";

/// The live chat on the API side: one mode and the turns it has seen.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatHandle {
    mode: Mode,
    model: Model,
    history: Vec<Content>,
}

impl ChatHandle {
    fn new(mode: Mode, history: Vec<Content>) -> Self {
        Self {
            mode,
            model: mode.model(),
            history,
        }
    }

    /// The mode this handle was created for.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The model answering on this handle.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Turns sent before the next prompt.
    pub fn history(&self) -> &[Content] {
        &self.history
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The selected mode.
    pub mode: Mode,
    /// The model that will answer the next prompt.
    pub model: Model,
    /// Number of displayed turns, the greeting included.
    pub message_count: usize,
    /// Number of user turns.
    pub user_turns: usize,
    /// Number of model replies that completed.
    pub replies: usize,
    /// Number of turns that ended in an error.
    pub errors: usize,
    /// Whether a chat handle is live.
    pub has_session: bool,
    /// Turns held by the live handle.
    pub session_turns: usize,
}

/// A chat session over a [`ChatBackend`].
pub struct ChatSession<B: ChatBackend> {
    backend: B,
    store: MessageStore,
    storage: Box<dyn HistoryStorage>,
    mode: Mode,
    system_instruction: Option<String>,
    safety_settings: Vec<SafetySetting>,
    handle: Option<ChatHandle>,
    loading: bool,
    restore_error: Option<Error>,
}

impl<B: ChatBackend> ChatSession<B> {
    /// Opens a session, restoring whatever `storage` holds.
    ///
    /// With nothing saved the conversation starts from the greeting. A reply
    /// that was still streaming when the history was last saved is marked as
    /// interrupted.
    ///
    /// A history that cannot be read is set aside: the session starts fresh
    /// and the failure is kept in [`restore_error`](Self::restore_error).
    pub fn new(backend: B, storage: impl HistoryStorage + 'static) -> Result<Self> {
        let (saved, restore_error) = match storage.load() {
            Ok(saved) => (saved.unwrap_or_default(), None),
            Err(err) => (Vec::new(), Some(err)),
        };
        let mut store = MessageStore::from_messages(saved);
        if store.is_empty() {
            store.push_greeting(GREETING);
        } else {
            let stale: Vec<MessageId> = store
                .messages()
                .iter()
                .filter(|m| m.is_placeholder())
                .map(|m| m.id)
                .collect();
            for id in stale {
                store.mark_error(id, INTERRUPTED_REPLY)?;
            }
        }
        Ok(Self {
            backend,
            store,
            storage: Box::new(storage),
            mode: Mode::default(),
            system_instruction: Some(DEFAULT_SYSTEM_INSTRUCTION.to_string()),
            safety_settings: default_safety_settings(),
            handle: None,
            loading: false,
            restore_error,
        })
    }

    /// Starts in `mode`.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Replaces the standing instruction; `None` sends none.
    pub fn with_system_instruction(mut self, instruction: Option<String>) -> Self {
        self.system_instruction = instruction;
        self
    }

    /// Replaces the safety thresholds.
    pub fn with_safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = settings;
        self
    }

    /// The backend this session talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// All turns, oldest first.
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// Looks up one turn.
    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.store.get(id)
    }

    /// The newest completed model reply.
    pub fn last_reply(&self) -> Option<&Message> {
        self.store.last_reply()
    }

    /// The selected mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The standing instruction, if any.
    pub fn system_instruction(&self) -> Option<&str> {
        self.system_instruction.as_deref()
    }

    /// Returns true while a chat handle is live.
    pub fn has_session(&self) -> bool {
        self.handle.is_some()
    }

    /// Why the saved history could not be restored, if it could not.
    pub fn restore_error(&self) -> Option<&Error> {
        self.restore_error.as_ref()
    }

    /// The live chat handle.
    pub fn handle(&self) -> Option<&ChatHandle> {
        self.handle.as_ref()
    }

    /// Returns true while a reply is streaming.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Selects a mode; a change drops the chat handle.
    ///
    /// Returns true if the mode changed.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.handle = None;
        true
    }

    /// Resets the conversation to the greeting and drops the chat handle.
    pub fn clear(&mut self) -> Result<MessageId> {
        let greeting = self.store.reset(GREETING);
        self.handle = None;
        self.loading = false;
        SESSION_RESETS.click();
        self.save()?;
        Ok(greeting)
    }

    /// Sends `prompt` and streams the reply into a new model turn.
    ///
    /// Failures while streaming do not propagate: the reply turn is marked as
    /// an error carrying a user-facing message and its id is still returned.
    /// Only an empty prompt is rejected.
    pub async fn send(&mut self, prompt: &str, renderer: &mut dyn Renderer) -> Result<MessageId> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::validation(
                "prompt must not be empty",
                Some("prompt".to_string()),
            ));
        }
        self.recover_abandoned_send()?;

        if self.handle.as_ref().is_none_or(|h| h.mode != self.mode) {
            self.handle = Some(ChatHandle::new(
                self.mode,
                format_history(self.store.messages()),
            ));
        }
        let request = match &self.handle {
            Some(handle) => ChatRequest {
                model: handle.model.clone(),
                system_instruction: self.system_instruction.clone(),
                safety_settings: self.safety_settings.clone(),
                generation_config: self.generation_config(),
                history: handle.history.clone(),
                prompt: prompt.to_string(),
            },
            None => return Err(Error::validation("no chat handle", None)),
        };

        self.store.push_user(prompt);
        let reply = self.store.push_placeholder();
        self.loading = true;
        self.save_or_report(renderer);

        renderer.start_response(&request.model.to_string());
        let outcome = self.stream_into(reply, &request, renderer).await;
        self.loading = false;

        match outcome {
            Ok(text) => {
                if let Some(handle) = self.handle.as_mut() {
                    handle.history.push(Content::user(prompt));
                    handle.history.push(Content::model(text));
                }
            }
            Err(err) => {
                // The failed reply is dropped from the history but the prompt stays.
                if let Some(handle) = self.handle.as_mut() {
                    handle.history.push(Content::user(prompt));
                }
                let message = err.user_message();
                self.store.mark_error(reply, message.clone())?;
                renderer.print_error(&message);
            }
        }
        renderer.finish_response();
        self.save_or_report(renderer);
        Ok(reply)
    }

    async fn stream_into(
        &mut self,
        reply: MessageId,
        request: &ChatRequest,
        renderer: &mut dyn Renderer,
    ) -> Result<String> {
        let mut fragments = self.backend.stream_reply(request).await?;
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            self.store.append_fragment(reply, &fragment)?;
            renderer.print_text(&fragment);
            self.save_or_report(renderer);
        }
        match self.store.get(reply) {
            Some(message) if !message.text.is_empty() => Ok(message.text.clone()),
            _ => Err(Error::unknown(EMPTY_REPLY, None, None)),
        }
    }

    /// Synthesizes and plays message `id` through `playback`.
    ///
    /// Failures leave the chat history untouched.
    pub async fn speak<O: AudioOutput>(
        &self,
        id: MessageId,
        playback: &mut PlaybackController<O>,
    ) -> Result<()> {
        let text = match self.store.get(id) {
            Some(message) if !message.text.trim().is_empty() => message.text.clone(),
            Some(_) => {
                return Err(Error::validation(
                    format!("message {id} has no text to speak"),
                    Some("id".to_string()),
                ));
            }
            None => {
                return Err(Error::validation(
                    format!("no message {id}"),
                    Some("id".to_string()),
                ));
            }
        };
        playback.speak(&self.backend, id, &text).await
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let messages = self.store.messages();
        SessionStats {
            mode: self.mode,
            model: self.mode.model(),
            message_count: messages.len(),
            user_turns: messages.iter().filter(|m| m.role == Role::User).count(),
            replies: messages
                .iter()
                .filter(|m| m.role == Role::Model && m.is_conversational())
                .count(),
            errors: messages.iter().filter(|m| m.is_error).count(),
            has_session: self.handle.is_some(),
            session_turns: self.handle.as_ref().map_or(0, |h| h.history.len()),
        }
    }

    fn generation_config(&self) -> GenerationConfig {
        match self.mode {
            Mode::Fast => GenerationConfig::default(),
            Mode::Thinking => GenerationConfig::thinking(Mode::THINKING_BUDGET),
        }
    }

    // A send whose future was dropped mid-stream leaves its placeholder behind.
    fn recover_abandoned_send(&mut self) -> Result<()> {
        if !self.loading {
            return Ok(());
        }
        let stale: Vec<MessageId> = self
            .store
            .messages()
            .iter()
            .filter(|m| m.is_placeholder())
            .map(|m| m.id)
            .collect();
        for id in stale {
            self.store.mark_error(id, INTERRUPTED_REPLY)?;
        }
        if let Some(handle) = self.handle.as_mut() {
            handle.history = format_history(self.store.messages());
        }
        self.loading = false;
        self.save()
    }

    fn save(&self) -> Result<()> {
        self.storage.save(self.store.messages())
    }

    fn save_or_report(&self, renderer: &mut dyn Renderer) {
        if let Err(err) = self.save() {
            renderer.print_error(&format!("failed to save history: {err}"));
        }
    }
}
