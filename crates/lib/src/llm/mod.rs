//! Completion service client and reply prompt.
//!
//! One non-streaming chat completion per inbound message against an
//! OpenAI-compatible API; failures are classified for the relay pipeline.

mod openai;
mod prompt;

pub use openai::CompletionClient;
pub use prompt::render_reply_prompt;
