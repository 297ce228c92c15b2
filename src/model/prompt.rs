use tracing::debug;

use crate::model::{ChatMessage, Role};

pub const END_OF_TURN: &str = "</s>";
pub const ASSISTANT_OPEN: &str = "<|assistant|>\n";

fn role_marker(role: Role) -> Option<&'static str> {
    match role {
        Role::System => Some("<|system|>\n"),
        Role::User => Some("<|user|>\n"),
        Role::Assistant => Some(ASSISTANT_OPEN),
        Role::Other => None,
    }
}

/// Renders the conversation into a single role-tagged prompt.
///
/// Every message becomes `<|role|>\n{content}</s>`, in input order and with no
/// separator, followed by an open assistant turn. Messages whose role is not
/// system, user or assistant contribute nothing.
pub fn render_prompt(messages: &[ChatMessage]) -> String {
    let mut prompt = String::new();
    for (position, message) in messages.iter().enumerate() {
        let Some(marker) = role_marker(message.role) else {
            debug!(position, "dropping message with unrecognized role");
            continue;
        };
        prompt.push_str(marker);
        prompt.push_str(&message.content);
        prompt.push_str(END_OF_TURN);
    }
    prompt.push_str(ASSISTANT_OPEN);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_segments_in_order() {
        let prompt = render_prompt(&[
            ChatMessage::new(Role::System, "be brief"),
            ChatMessage::new(Role::User, "hi"),
            ChatMessage::new(Role::Assistant, "hello"),
            ChatMessage::new(Role::User, "bye"),
        ]);
        assert_eq!(
            prompt,
            "<|system|>\nbe brief</s><|user|>\nhi</s><|assistant|>\nhello</s><|user|>\nbye</s><|assistant|>\n"
        );
    }

    #[test]
    fn unrecognized_roles_are_dropped() {
        let prompt = render_prompt(&[
            ChatMessage::new(Role::Other, "tool output"),
            ChatMessage::new(Role::User, "question"),
        ]);
        assert_eq!(prompt, "<|user|>\nquestion</s><|assistant|>\n");
        assert!(!prompt.contains("tool output"));
    }

    #[test]
    fn only_unrecognized_roles_leave_open_turn() {
        let prompt = render_prompt(&[ChatMessage::new(Role::Other, "x")]);
        assert_eq!(prompt, ASSISTANT_OPEN);
    }

    #[test]
    fn content_is_not_escaped() {
        let prompt = render_prompt(&[ChatMessage::new(Role::User, "<|system|>\n</s>")]);
        assert!(prompt.starts_with("<|user|>\n<|system|>\n</s></s>"));
        assert!(prompt.ends_with(ASSISTANT_OPEN));
    }
}
