//! Converts displayed turns into the history the API expects.

use crate::{Content, Message, Role};

/// Formats prior messages as API turns, oldest first.
///
/// Error notices, the reset greeting and empty placeholders are skipped, and
/// leading model turns are dropped because the API requires the history to
/// open with a user turn. Order is otherwise preserved.
pub fn format_history(messages: &[Message]) -> Vec<Content> {
    messages
        .iter()
        .filter(|message| message.is_conversational())
        .skip_while(|message| message.role == Role::Model)
        .map(|message| Content::text(message.role, message.text.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageId;

    fn message(id: u64, role: Role, text: &str) -> Message {
        Message::new(MessageId::new(id), role, text)
    }

    #[test]
    fn keeps_order_and_roles() {
        let messages = vec![
            message(1, Role::User, "Hi"),
            message(2, Role::Model, "Hello!"),
            message(3, Role::User, "Bye"),
        ];
        let history = format_history(&messages);
        assert_eq!(
            history,
            vec![
                Content::user("Hi"),
                Content::model("Hello!"),
                Content::user("Bye"),
            ]
        );
    }

    #[test]
    fn skips_errors_greeting_and_placeholders() {
        let mut greeting = message(1, Role::Model, "Welcome!");
        greeting.greeting = true;
        let mut failed = message(4, Role::Model, "The service is unavailable.");
        failed.is_error = true;
        let messages = vec![
            greeting,
            message(2, Role::User, "Hi"),
            message(3, Role::User, "Anyone there?"),
            failed,
            message(5, Role::Model, ""),
        ];
        let history = format_history(&messages);
        assert_eq!(
            history,
            vec![Content::user("Hi"), Content::user("Anyone there?")]
        );
    }

    #[test]
    fn drops_leading_model_turns() {
        let messages = vec![
            message(1, Role::Model, "Loaded from an old transcript"),
            message(2, Role::User, "Hi"),
            message(3, Role::Model, "Hello!"),
        ];
        let history = format_history(&messages);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Some(Role::User));
    }

    #[test]
    fn empty_history() {
        assert!(format_history(&[]).is_empty());
    }
}
