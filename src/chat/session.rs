//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the transcript,
//! the composer (draft text plus staged attachment) and the busy flag, and
//! runs one turn at a time against a [`ChatBackend`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::attachment::{self, EncodedPart, PendingAttachment};
use crate::backend::ChatBackend;
use crate::chat::config::ChatConfig;
use crate::error::Result;
use crate::intent::{BackendIntent, parse_intent};
use crate::observability::{
    SESSION_CHAT_FAILURES, SESSION_IMAGE_FAILURES, SESSION_REJECTED_BUSY, SESSION_REJECTED_EMPTY,
    SESSION_SENDS, SESSION_TURN_DURATION,
};
use crate::store::ConversationStore;
use crate::types::{Attachment, Message, MessageId, Model, Sender};

/// Appended when the chat call (or preparing its request) fails.
pub const NO_RESPONSE_TEXT: &str =
    "Sorry, I couldn't get a response. Please check the logs for errors.";

/// Appended when the image call fails.
pub const IMAGE_FAILURE_TEXT: &str = "Sorry, I couldn't generate the image. There was an error.";

/// Caption of a generated image message.
pub fn image_caption(prompt: &str) -> String {
    format!("Generated image based on: \"{prompt}\"")
}

/// Why a send was refused.  A refused send changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Blank text and no staged attachment.
    Empty,
    /// Another turn is still in flight.
    Busy,
}

/// How an accepted turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// One plain bot reply was appended.
    Replied,
    /// The conversational text and the generated image were appended.
    ImageGenerated,
    /// The conversational text and the image apology were appended.
    ImageFailed,
    /// The chat call failed; the apology was appended.
    NoResponse,
}

/// Result of [`ChatSession::send`] and [`ChatSession::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing happened.
    Rejected(Rejection),
    /// A turn ran to completion.
    Completed(TurnOutcome),
}

impl SendOutcome {
    /// True when the send was refused.
    pub fn is_rejected(&self) -> bool {
        matches!(self, SendOutcome::Rejected(_))
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The chat model.
    pub chat_model: Model,
    /// The image model.
    pub image_model: Model,
    /// Number of transcript messages, greeting included.
    pub message_count: usize,
    /// Messages written by the user.
    pub user_messages: usize,
    /// Messages written by the bot, apologies included.
    pub bot_messages: usize,
    /// Accepted turns.
    pub turns: u64,
    /// Turns whose chat call failed.
    pub chat_failures: u64,
    /// Images generated.
    pub images_generated: u64,
    /// Image calls that failed.
    pub image_failures: u64,
    /// Whether a turn is in flight right now.
    pub busy: bool,
}

#[derive(Debug, Default)]
struct Composer {
    draft: String,
    pending: Option<PendingAttachment>,
}

impl Composer {
    fn is_empty(&self) -> bool {
        self.draft.trim().is_empty() && self.pending.is_none()
    }
}

#[derive(Debug, Default)]
struct TurnCounters {
    turns: u64,
    chat_failures: u64,
    images_generated: u64,
    image_failures: u64,
}

impl TurnCounters {
    fn record(&mut self, outcome: TurnOutcome) {
        self.turns += 1;
        match outcome {
            TurnOutcome::Replied => {}
            TurnOutcome::ImageGenerated => self.images_generated += 1,
            TurnOutcome::ImageFailed => self.image_failures += 1,
            TurnOutcome::NoResponse => self.chat_failures += 1,
        }
    }
}

/// Holds the busy flag for the lifetime of a turn.
struct BusyGuard<'a> {
    busy: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(busy: &'a AtomicBool) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { busy })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// A chat session: transcript, composer and one turn in flight at most.
///
/// All methods take `&self`; share the session behind an [`Arc`] to drive it
/// from several tasks.  Sends that arrive while a turn is running are
/// rejected, not queued.
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    chat_model: Model,
    image_model: Model,
    store: Mutex<ConversationStore>,
    composer: Mutex<Composer>,
    counters: Mutex<TurnCounters>,
    busy: AtomicBool,
}

impl ChatSession {
    /// Creates a session, seeding the configured greeting.
    pub fn new(backend: Arc<dyn ChatBackend>, config: &ChatConfig) -> Self {
        let mut store = ConversationStore::new();
        if let Some(greeting) = &config.greeting {
            store.append(Message::bot(greeting.clone()));
        }
        Self {
            backend,
            chat_model: config.chat_model.clone(),
            image_model: config.image_model.clone(),
            store: Mutex::new(store),
            composer: Mutex::new(Composer::default()),
            counters: Mutex::new(TurnCounters::default()),
            busy: AtomicBool::new(false),
        }
    }

    /// True while a turn is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// A snapshot of the whole transcript.
    pub fn messages(&self) -> Vec<Message> {
        self.lock_store().all().to_vec()
    }

    /// Messages appended at or after position `index`.
    pub fn messages_since(&self, index: usize) -> Vec<Message> {
        self.lock_store().since(index).to_vec()
    }

    /// Looks up one message.
    pub fn message(&self, id: MessageId) -> Option<Message> {
        self.lock_store().get(id).cloned()
    }

    /// Number of messages in the transcript.
    pub fn message_count(&self) -> usize {
        self.lock_store().len()
    }

    /// Replaces the draft text.
    pub fn set_draft(&self, text: impl Into<String>) {
        self.lock_composer().draft = text.into();
    }

    /// The current draft text.
    pub fn draft(&self) -> String {
        self.lock_composer().draft.clone()
    }

    /// Stages an attachment, returning the one it replaced.
    pub fn stage_attachment(&self, pending: PendingAttachment) -> Option<PendingAttachment> {
        self.lock_composer().pending.replace(pending)
    }

    /// Drops the staged attachment.
    pub fn clear_attachment(&self) -> Option<PendingAttachment> {
        self.lock_composer().pending.take()
    }

    /// The staged attachment, if any.
    pub fn pending_attachment(&self) -> Option<PendingAttachment> {
        self.lock_composer().pending.clone()
    }

    /// Sends the composer's draft and staged attachment.
    ///
    /// On acceptance the composer is emptied before the backend is called, so
    /// the next turn can be prepared while this one runs.
    pub async fn submit(&self) -> SendOutcome {
        let (guard, text, pending) = {
            let mut composer = self.lock_composer();
            if composer.is_empty() {
                SESSION_REJECTED_EMPTY.click();
                return SendOutcome::Rejected(Rejection::Empty);
            }
            let Some(guard) = BusyGuard::acquire(&self.busy) else {
                SESSION_REJECTED_BUSY.click();
                return SendOutcome::Rejected(Rejection::Busy);
            };
            let text = std::mem::take(&mut composer.draft);
            (guard, text, composer.pending.take())
        };
        self.complete_turn(guard, &text, pending).await
    }

    /// Sends `text` with an optional attachment.
    ///
    /// Rejected without any state change when the text is blank and there is
    /// no attachment, or while another turn is in flight.  Otherwise the user
    /// message is appended at once and never retracted, and exactly one
    /// outcome's worth of bot messages follows.
    pub async fn send(&self, text: &str, pending: Option<PendingAttachment>) -> SendOutcome {
        if text.trim().is_empty() && pending.is_none() {
            SESSION_REJECTED_EMPTY.click();
            return SendOutcome::Rejected(Rejection::Empty);
        }
        let Some(guard) = BusyGuard::acquire(&self.busy) else {
            SESSION_REJECTED_BUSY.click();
            return SendOutcome::Rejected(Rejection::Busy);
        };
        self.complete_turn(guard, text, pending).await
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let (message_count, user_messages) = {
            let store = self.lock_store();
            let users = store.all().iter().filter(|m| m.sender == Sender::User).count();
            (store.len(), users)
        };
        let counters = self.lock_counters();
        SessionStats {
            chat_model: self.chat_model.clone(),
            image_model: self.image_model.clone(),
            message_count,
            user_messages,
            bot_messages: message_count - user_messages,
            turns: counters.turns,
            chat_failures: counters.chat_failures,
            images_generated: counters.images_generated,
            image_failures: counters.image_failures,
            busy: self.is_busy(),
        }
    }

    async fn complete_turn(
        &self,
        guard: BusyGuard<'_>,
        text: &str,
        pending: Option<PendingAttachment>,
    ) -> SendOutcome {
        SESSION_SENDS.click();
        let start = Instant::now();
        let outcome = self.run_turn(text, pending).await;
        SESSION_TURN_DURATION.add(start.elapsed().as_secs_f64());
        self.lock_counters().record(outcome);
        drop(guard);
        SendOutcome::Completed(outcome)
    }

    async fn run_turn(&self, text: &str, pending: Option<PendingAttachment>) -> TurnOutcome {
        let attachment = pending.as_ref().map(PendingAttachment::to_attachment);
        let id = self.append(Message::user(text).with_attachment(attachment));
        tracing::debug!(message_id = %id, "user message appended");

        let parts = match build_parts(text, pending.as_ref()).await {
            Ok(parts) => parts,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode attachment");
                return self.no_response();
            }
        };

        let reply = match self.backend.send_message(parts).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(error = %err, "chat request failed");
                return self.no_response();
            }
        };

        match parse_intent(&reply) {
            BackendIntent::PlainReply { text } => {
                self.append(Message::bot(text));
                TurnOutcome::Replied
            }
            BackendIntent::ImageRequest {
                conversational_text,
                image_prompt,
            } => {
                self.append(Message::bot(conversational_text));
                self.generate_image(&image_prompt).await
            }
        }
    }

    async fn generate_image(&self, prompt: &str) -> TurnOutcome {
        tracing::debug!(prompt, "generating image");
        match self.backend.generate_image(prompt).await {
            Ok(image) => {
                self.append(
                    Message::bot(image_caption(prompt))
                        .with_attachment(Some(Attachment::image(image.data_url()))),
                );
                TurnOutcome::ImageGenerated
            }
            Err(err) => {
                SESSION_IMAGE_FAILURES.click();
                tracing::error!(error = %err, "image generation failed");
                self.append(Message::bot(IMAGE_FAILURE_TEXT));
                TurnOutcome::ImageFailed
            }
        }
    }

    fn no_response(&self) -> TurnOutcome {
        SESSION_CHAT_FAILURES.click();
        self.append(Message::bot(NO_RESPONSE_TEXT));
        TurnOutcome::NoResponse
    }

    fn append(&self, message: Message) -> MessageId {
        self.lock_store().append(message)
    }

    fn lock_store(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_composer(&self) -> MutexGuard<'_, Composer> {
        self.composer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_counters(&self) -> MutexGuard<'_, TurnCounters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The request parts for one turn: attachment first, then non-blank text.
async fn build_parts(text: &str, pending: Option<&PendingAttachment>) -> Result<Vec<EncodedPart>> {
    let mut parts = Vec::with_capacity(2);
    if let Some(pending) = pending {
        parts.push(attachment::encode(pending).await?);
    }
    if !text.trim().is_empty() {
        parts.push(EncodedPart::Text(text.to_string()));
    }
    Ok(parts)
}
