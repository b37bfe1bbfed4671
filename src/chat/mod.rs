//! Chat application module for conversations with AB Datasonic.
//!
//! This module provides the session logic behind the chat front end. It
//! supports:
//!
//! - Optimistic user messages with one turn in flight at a time
//! - Image and document attachments
//! - Image generation when the model asks for it
//! - Slash commands for session control
//! - Configurable models, system instruction, and greeting
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Core chat session management and backend interaction
//! - [`commands`]: Slash command parsing and handling
//! - [`render`]: Terminal output

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, ChatConfigFile, DEFAULT_GREETING, default_system_instruction};
pub use render::{
    BOT_LABEL, PlainTextRenderer, Renderer, USER_LABEL, describe_attachment, format_message,
};
pub use session::{
    ChatSession, IMAGE_FAILURE_TEXT, NO_RESPONSE_TEXT, Rejection, SendOutcome, SessionStats,
    TurnOutcome, image_caption,
};
