//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction that allows
//! for different output styles. The default implementation uses ANSI
//! escape codes to tell the user's lines from the bot's.

use std::io::{self, Stdout, Write};

use crate::attachment::PendingAttachment;
use crate::types::{Attachment, AttachmentKind, Message, Sender};

/// ANSI escape code for dim text (used for ids and the typing indicator).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for sender labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the bot label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for attachments).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for the user label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Label printed for bot messages.
pub const BOT_LABEL: &str = "AB Datasonic";

/// Label printed for user messages.
pub const USER_LABEL: &str = "You";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Capturing output in tests
pub trait Renderer: Send {
    /// Print one transcript message.
    fn print_message(&mut self, message: &Message);

    /// Show that a turn is in flight.
    fn print_typing(&mut self);

    /// Print a note about a freshly staged attachment.
    fn print_staged(&mut self, pending: &PendingAttachment);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Describes an attachment in one short line.
///
/// Images show their media type and approximate size; documents show their
/// file name.
pub fn describe_attachment(attachment: &Attachment) -> String {
    match attachment.kind {
        AttachmentKind::Image => {
            let (mime_type, size) = match attachment
                .content
                .strip_prefix("data:")
                .and_then(|rest| rest.split_once(','))
            {
                Some((header, data)) => {
                    let mime_type = header.strip_suffix(";base64").unwrap_or(header);
                    (mime_type, data.len() / 4 * 3)
                }
                None => ("image", 0),
            };
            format!("[image: {mime_type}, {}]", human_size(size))
        }
        AttachmentKind::Document => format!("[document: {}]", attachment.content),
    }
}

fn human_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

/// Formats a message the way [`PlainTextRenderer`] prints it.
pub fn format_message(message: &Message, use_color: bool) -> String {
    let (label, color) = match message.sender {
        Sender::User => (USER_LABEL, ANSI_GREEN),
        Sender::Bot => (BOT_LABEL, ANSI_CYAN),
    };
    let mut out = if use_color {
        format!("{ANSI_DIM}#{}{ANSI_RESET} {ANSI_BOLD}{color}{label}:{ANSI_RESET}", message.id)
    } else {
        format!("#{} {label}:", message.id)
    };
    if !message.text.is_empty() {
        out.push(' ');
        out.push_str(&message.text);
    }
    if let Some(attachment) = &message.attachment {
        let description = describe_attachment(attachment);
        if use_color {
            out.push_str(&format!("\n    {ANSI_YELLOW}{description}{ANSI_RESET}"));
        } else {
            out.push_str(&format!("\n    {description}"));
        }
    }
    out
}

/// Plain text renderer with optional ANSI styling.
///
/// This renderer outputs text directly to stdout with optional
/// ANSI escape codes for sender labels and attachments.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, message: &Message) {
        println!("{}", format_message(message, self.use_color));
        self.flush();
    }

    fn print_typing(&mut self) {
        if self.use_color {
            println!("{ANSI_DIM}{BOT_LABEL} is typing...{ANSI_RESET}");
        } else {
            println!("{BOT_LABEL} is typing...");
        }
        self.flush();
    }

    fn print_staged(&mut self, pending: &PendingAttachment) {
        let description = describe_attachment(&pending.to_attachment());
        if self.use_color {
            println!("{ANSI_YELLOW}staged {description}{ANSI_RESET} (sent with your next message)");
        } else {
            println!("staged {description} (sent with your next message)");
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageId;

    fn stamped(message: Message, id: u64) -> Message {
        Message {
            id: MessageId(id),
            ..message
        }
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn plain_message_format() {
        let message = stamped(Message::user("Hello"), 7);
        assert_eq!(format_message(&message, false), "#7 You: Hello");
        let message = stamped(Message::bot("Hi!"), 8);
        assert_eq!(format_message(&message, false), "#8 AB Datasonic: Hi!");
    }

    #[test]
    fn attachment_only_message_format() {
        let message = stamped(
            Message::user("").with_attachment(Some(Attachment::document("plan.pdf"))),
            3,
        );
        assert_eq!(
            format_message(&message, false),
            "#3 You:\n    [document: plan.pdf]"
        );
    }

    #[test]
    fn colored_format_contains_ansi() {
        let message = stamped(Message::bot("Hi!"), 1);
        let formatted = format_message(&message, true);
        assert!(formatted.contains(ANSI_CYAN));
        assert!(formatted.ends_with("Hi!"));
    }

    #[test]
    fn image_description() {
        let attachment = Attachment::image(format!("data:image/jpeg;base64,{}", "A".repeat(4096)));
        assert_eq!(describe_attachment(&attachment), "[image: image/jpeg, 3.0 KiB]");
        let attachment = Attachment::image("data:image/png;base64,AAAA");
        assert_eq!(describe_attachment(&attachment), "[image: image/png, 3 B]");
        let attachment = Attachment::image("not a data url");
        assert_eq!(describe_attachment(&attachment), "[image: image, 0 B]");
    }
}
