//! Interactive chat application for conversing with AB Datasonic.
//!
//! This binary provides a REPL interface for chatting with a Gemini model,
//! attaching images and documents, and saving generated images.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! GEMINI_API_KEY=... datasonic-chat
//!
//! # Specify a model
//! datasonic-chat --model gemini-2.5-pro
//!
//! # Load settings from a YAML file
//! datasonic-chat --config chat.yaml
//!
//! # Disable colors (useful for piping output)
//! datasonic-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/image <file>` - Attach an image to the next message
//! - `/doc <file>` - Attach a document to the next message
//! - `/save <id> [file]` - Save a generated image
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::path::PathBuf;
use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use datasonic::attachment::{decode_data_url, suggested_file_name};
use datasonic::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, SendOutcome,
    help_text, parse_command,
};
use datasonic::{Gemini, GeminiChat, MessageId, PendingAttachment, Sender};

/// Main entry point for the datasonic-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("datasonic-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;
    let use_color = config.use_color;

    let client = Gemini::new(None)?;
    let backend = Arc::new(GeminiChat::new(client, &config));
    let session = ChatSession::new(backend, &config);
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    println!(
        "AB Datasonic (chat: {}, images: {})",
        config.chat_model, config.image_model
    );
    println!("Type /help for commands, /quit to exit\n");
    for message in session.messages() {
        renderer.print_message(&message);
    }

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() && session.pending_attachment().is_none() {
                    continue;
                }
                if !line.is_empty() {
                    let _ = rl.add_history_entry(line);
                }

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Image(path) => {
                            stage(&session, &mut renderer, PendingAttachment::image(&path).await);
                        }
                        ChatCommand::Document(path) => {
                            stage(&session, &mut renderer, PendingAttachment::document(&path));
                        }
                        ChatCommand::Detach => match session.clear_attachment() {
                            Some(pending) => renderer.print_info(&format!(
                                "Removed {}.",
                                pending.path().display()
                            )),
                            None => renderer.print_info("Nothing is attached."),
                        },
                        ChatCommand::Save { id, path } => {
                            match save_image(&session, id, path.map(PathBuf::from)).await {
                                Ok(path) => renderer
                                    .print_info(&format!("Image saved to {}", path.display())),
                                Err(err) => renderer.print_error(&err),
                            }
                        }
                        ChatCommand::History => {
                            for message in session.messages() {
                                renderer.print_message(&message);
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the backend
                let seen = session.message_count();
                session.set_draft(line);
                renderer.print_typing();
                match session.submit().await {
                    SendOutcome::Rejected(rejection) => {
                        renderer.print_error(&format!("Message not sent: {rejection:?}"));
                    }
                    SendOutcome::Completed(_) => {
                        for message in session.messages_since(seen) {
                            if message.sender == Sender::Bot {
                                renderer.print_message(&message);
                            }
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn stage(
    session: &ChatSession,
    renderer: &mut PlainTextRenderer,
    pending: datasonic::Result<PendingAttachment>,
) {
    match pending {
        Ok(pending) => {
            renderer.print_staged(&pending);
            if let Some(previous) = session.stage_attachment(pending) {
                renderer.print_info(&format!("(replaces {})", previous.path().display()));
            }
        }
        Err(err) => renderer.print_error(&format!("Cannot attach: {err}")),
    }
}

async fn save_image(
    session: &ChatSession,
    id: MessageId,
    path: Option<PathBuf>,
) -> Result<PathBuf, String> {
    let message = session
        .message(id)
        .ok_or_else(|| format!("No message with id {id}"))?;
    let attachment = message
        .attachment
        .as_ref()
        .filter(|attachment| attachment.is_image())
        .ok_or_else(|| format!("Message {id} has no image"))?;
    let (_, bytes) =
        decode_data_url(&attachment.content).map_err(|err| format!("Bad image data: {err}"))?;
    let path = path.unwrap_or_else(|| PathBuf::from(suggested_file_name(&message.text)));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|err| format!("Failed to write {}: {err}", path.display()))?;
    Ok(path)
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Chat model: {}", stats.chat_model);
    println!("      Image model: {}", stats.image_model);
    println!(
        "      Messages: {} ({} from you, {} from the bot)",
        stats.message_count, stats.user_messages, stats.bot_messages
    );
    println!("      Turns: {}", stats.turns);
    println!("      Failed replies: {}", stats.chat_failures);
    println!(
        "      Images: {} generated, {} failed",
        stats.images_generated, stats.image_failures
    );
    match session.pending_attachment() {
        Some(pending) => println!("      Attached: {}", pending.path().display()),
        None => println!("      Attached: (none)"),
    }
}
