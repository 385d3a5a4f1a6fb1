//! Reply prompt template: instructions plus the quoted incoming message.

/// Template for auto-replies. One placeholder for the incoming text; the
/// wording sets the assistant's register (short, polite, same language).
const REPLY_PROMPT_TEMPLATE: &str = "\
You are an intelligent, friendly assistant replying to WhatsApp messages on behalf of a business.
Your responses should be helpful, clear, and conversational.

Reply appropriately to the following message in the same language it was sent in.
Keep it short, polite, and useful.

Incoming message:
\"{message_text}\"

Your reply:
";

/// Render the reply prompt for one incoming message.
pub fn render_reply_prompt(message_text: &str) -> String {
    REPLY_PROMPT_TEMPLATE.replace("{message_text}", message_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_the_incoming_text() {
        let prompt = render_reply_prompt("where are you located?");
        assert!(prompt.contains("\"where are you located?\""));
    }

    #[test]
    fn placeholder_is_fully_substituted() {
        let prompt = render_reply_prompt("hi");
        assert!(!prompt.contains("{message_text}"));
    }
}
