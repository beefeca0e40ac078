//! Prompt builder for agent turns
//!
//! Constructs the message list sent to the inference endpoint:
//! - a fixed system instruction describing the browser tools and the
//!   directive syntax
//! - a bounded window of the conversation transcript
//! - optionally, the model's own tool-calling reply plus the browser
//!   observation that resulted, when asking for the user-facing reply

use skiff_core::{Role, Utterance};
use skiff_model::ChatMessage;

/// Fixed system instruction for every turn
pub fn system_prompt() -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are Skiff, an assistant that can drive a real web browser on \
         behalf of the user.\n\n",
    );

    prompt.push_str("## BROWSER TOOLS\n\n");
    prompt.push_str("To use the browser, emit exactly one directive block in your reply:\n\n");
    prompt.push_str("<browser_action name=\"navigate\">https://example.com</browser_action>\n");
    prompt.push_str("<browser_action name=\"scroll\">down</browser_action>\n");
    prompt.push_str("<browser_action name=\"extract_text\"></browser_action>\n");
    prompt.push_str("<browser_action name=\"screenshot\"></browser_action>\n\n");

    prompt.push_str("## RULES\n\n");
    prompt.push_str("1. At most ONE directive per reply; additional directives are ignored\n");
    prompt.push_str("2. After a directive you will receive an observation with the result; \
                     then answer the user in plain language\n");
    prompt.push_str("3. If the request needs no browsing, answer directly with no directive\n");
    prompt.push_str("4. Never invent page content; only report what observations show\n");

    prompt
}

/// Map the transcript window into role-tagged endpoint messages
pub fn history_messages(history: &[Utterance]) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|u| match u.role {
            Role::User => ChatMessage::user(u.content.clone()),
            Role::Assistant => ChatMessage::assistant(u.content.clone()),
        })
        .collect()
}

/// Message list for the tool-decision call
pub fn decision_messages(history: &[Utterance]) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(system_prompt())];
    messages.extend(history_messages(history));
    messages
}

/// Message list for the follow-up call after a tool ran
///
/// The model's own directive reply and the browser observation are folded
/// in so it can ground the user-facing answer.
pub fn followup_messages(
    history: &[Utterance],
    directive_reply: &str,
    observation: &str,
) -> Vec<ChatMessage> {
    let mut messages = decision_messages(history);
    messages.push(ChatMessage::assistant(directive_reply.to_string()));
    messages.push(ChatMessage::user(format!(
        "Browser observation:\n{}\n\nNow answer the user's request in plain \
         language. Do not emit another directive.",
        observation
    )));
    messages
}

/// Truncate on a char boundary, marking elision
pub fn truncate_observation(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}\n[... truncated ...]", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_model::MessageContent;

    fn text_of(msg: &ChatMessage) -> &str {
        match &msg.content {
            MessageContent::Text(t) => t,
            MessageContent::Parts(_) => panic!("expected text content"),
        }
    }

    #[test]
    fn test_system_prompt_names_all_tools() {
        let prompt = system_prompt();
        for tool in ["navigate", "scroll", "extract_text", "screenshot"] {
            assert!(prompt.contains(tool), "missing tool {}", tool);
        }
        assert!(prompt.contains("browser_action"));
    }

    #[test]
    fn test_decision_messages_layout() {
        let history = vec![
            Utterance::user("hello"),
            Utterance::assistant("hi"),
            Utterance::user("go to example.com"),
        ];
        let messages = decision_messages(&history);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(text_of(&messages[3]), "go to example.com");
    }

    #[test]
    fn test_followup_folds_observation() {
        let history = vec![Utterance::user("go to example.com")];
        let messages = followup_messages(&history, "<directive/>", "Example Domain");

        let last = messages.last().unwrap();
        assert_eq!(last.role, "user");
        assert!(text_of(last).contains("Example Domain"));
        assert_eq!(messages[messages.len() - 2].role, "assistant");
    }

    #[test]
    fn test_truncate_observation() {
        assert_eq!(truncate_observation("short", 100), "short");

        let long = "x".repeat(200);
        let truncated = truncate_observation(&long, 50);
        assert!(truncated.starts_with(&"x".repeat(50)));
        assert!(truncated.ends_with("[... truncated ...]"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "héllo wörld".repeat(20);
        let truncated = truncate_observation(&text, 15);
        assert!(truncated.contains("[... truncated ...]"));
    }
}
