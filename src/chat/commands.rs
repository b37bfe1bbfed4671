//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to stage attachments, save generated images, and inspect
//! the session without sending anything to the backend.

use crate::types::MessageId;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Stage an image file for the next message.
    Image(String),

    /// Stage a document file for the next message.
    Document(String),

    /// Drop the staged attachment.
    Detach,

    /// Save the image attached to a message.
    /// `None` derives a file name from the message text.
    Save {
        /// The message carrying the image.
        id: MessageId,
        /// Where to write it.
        path: Option<String>,
    },

    /// Print the transcript.
    History,

    /// Display session statistics (message count, models, failures).
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use datasonic::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/image cat.png").is_some());
/// assert!(parse_command("Draw me a cat").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "image" | "img" => match argument {
            Some(path) => ChatCommand::Image(path.to_string()),
            None => ChatCommand::Invalid("/image requires a file path".to_string()),
        },
        "doc" | "document" => match argument {
            Some(path) => ChatCommand::Document(path.to_string()),
            None => ChatCommand::Invalid("/doc requires a file path".to_string()),
        },
        "detach" => ChatCommand::Detach,
        "save" => parse_save_command(argument),
        "history" => ChatCommand::History,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_save_command(argument: Option<&str>) -> ChatCommand {
    let Some(arg) = argument else {
        return ChatCommand::Invalid("/save requires a message id".to_string());
    };

    let mut parts = arg.splitn(2, ' ');
    let id = parts.next().unwrap_or_default();
    let path = parts
        .next()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());
    match id.parse::<MessageId>() {
        Ok(id) => ChatCommand::Save { id, path },
        Err(_) => ChatCommand::Invalid(format!("/save expects a numeric message id, got {id}")),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /image <file>          Attach an image (png, jpeg, gif, webp, ...) to the next message
  /doc <file>            Attach a document (pdf, txt, doc, docx) to the next message
  /detach                Remove the staged attachment
  /save <id> [file]      Save the image of a message (see /history for ids)
  /history               Show the conversation so far
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat

Ask for a picture in plain words ("draw a cat in a hat") to generate one."#
}
