//! Detection of structured instructions embedded in bot replies.
//!
//! The system instruction asks the model to answer image requests with a
//! single JSON object:
//!
//! ```json
//! {"action": "generate_image", "textResponse": "On it!", "prompt": "a cat"}
//! ```
//!
//! optionally wrapped in a fenced block labelled `json`.  Models do not always
//! comply, so [`parse_intent`] is best effort: it looks for a fenced block
//! first, then for the first balanced `{...}` span, and demotes anything it
//! cannot fully understand to a [`BackendIntent::PlainReply`] carrying the raw
//! text verbatim.

use serde::Deserialize;
use serde_json::Value;

use crate::observability::{INTENT_IMAGE_REQUESTS, INTENT_PARSE_FAILURES};

/// The reserved `action` value that asks for an image.
pub const GENERATE_IMAGE_ACTION: &str = "generate_image";

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// The classified meaning of a bot reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendIntent {
    /// Show the reply to the user as is.
    PlainReply {
        /// The raw reply text.
        text: String,
    },

    /// Show `conversational_text`, then generate an image from `image_prompt`.
    ImageRequest {
        /// Text to show while the image is generated.
        conversational_text: String,
        /// Prompt for the image model.
        image_prompt: String,
    },
}

impl BackendIntent {
    /// True for [`BackendIntent::ImageRequest`].
    pub fn is_image_request(&self) -> bool {
        matches!(self, BackendIntent::ImageRequest { .. })
    }
}

#[derive(Debug, Deserialize)]
struct ActionCommand {
    #[serde(default)]
    action: Option<String>,
    #[serde(default, rename = "textResponse")]
    text_response: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
}

/// Classifies a raw bot reply.
///
/// Total and side-effect free apart from logging: every input yields exactly
/// one intent, and a reply that is not a well-formed `generate_image` command
/// comes back unchanged as a plain reply.
pub fn parse_intent(raw: &str) -> BackendIntent {
    let plain = || BackendIntent::PlainReply {
        text: raw.to_string(),
    };
    let Some(candidate) = candidate_span(raw) else {
        return plain();
    };
    let command = match decode_command(candidate) {
        Ok(command) => command,
        Err(err) => {
            INTENT_PARSE_FAILURES.click();
            tracing::warn!(error = %err, "bot reply looked like a command but failed to parse");
            return plain();
        }
    };
    match command {
        ActionCommand {
            action: Some(action),
            text_response: Some(text_response),
            prompt: Some(prompt),
        } if action == GENERATE_IMAGE_ACTION
            && !text_response.is_empty()
            && !prompt.is_empty() =>
        {
            INTENT_IMAGE_REQUESTS.click();
            BackendIntent::ImageRequest {
                conversational_text: text_response,
                image_prompt: prompt,
            }
        }
        command => {
            tracing::debug!(action = ?command.action, "JSON in bot reply is not an image command");
            plain()
        }
    }
}

fn decode_command(span: &str) -> Result<ActionCommand, serde_json::Error> {
    // decode via Value so that arrays are not accepted as positional structs
    let value: Value = serde_json::from_str(span)?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("expected a JSON object"));
    }
    serde_json::from_value(value)
}

/// The text most likely to hold a command: the body of the first closed
/// ```` ```json ```` fence, or else the first balanced object literal.
fn candidate_span(text: &str) -> Option<&str> {
    fenced_json(text).or_else(|| first_object(text))
}

fn fenced_json(text: &str) -> Option<&str> {
    let start = text.find(JSON_FENCE)? + JSON_FENCE.len();
    let body = &text[start..];
    let end = body.find(FENCE)?;
    Some(body[..end].trim())
}

/// Scans for the first `{` and returns the span up to its matching `}`.
///
/// Braces inside JSON string literals (including escaped quotes) are ignored.
/// Returns `None` when the braces never balance.
fn first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
