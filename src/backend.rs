//! The backend seam of a chat session.
//!
//! [`ChatSession`](crate::chat::ChatSession) talks to the provider only
//! through [`ChatBackend`], so tests and alternative providers can stand in
//! for the network.  [`GeminiChat`] is the production implementation; like a
//! provider SDK's chat object it owns the conversational history and replays
//! it on every call.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::attachment::EncodedPart;
use crate::chat::ChatConfig;
use crate::client::Gemini;
use crate::error::{Error, Result};
use crate::types::{Content, GenerateContentRequest, GeneratedImage, Model, Part};

/// The two calls a chat session makes.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends one user turn and returns the raw reply text.
    ///
    /// Implementations keep the session context; a failed call must leave
    /// that context unchanged.
    async fn send_message(&self, parts: Vec<EncodedPart>) -> Result<String>;

    /// Generates one image from `prompt`.
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage>;
}

/// A Gemini chat with history, plus an Imagen model for pictures.
pub struct GeminiChat {
    client: Gemini,
    chat_model: Model,
    image_model: Model,
    system_instruction: Option<String>,
    history: Mutex<Vec<Content>>,
}

impl GeminiChat {
    /// Creates a chat with empty history using the models and system
    /// instruction from `config`.
    pub fn new(client: Gemini, config: &ChatConfig) -> Self {
        Self {
            client,
            chat_model: config.chat_model.clone(),
            image_model: config.image_model.clone(),
            system_instruction: config.system_instruction.clone(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// A snapshot of the conversation as the backend sees it.
    pub fn history(&self) -> Vec<Content> {
        self.lock_history().clone()
    }

    fn lock_history(&self) -> MutexGuard<'_, Vec<Content>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_for(&self, turn: &Content) -> GenerateContentRequest {
        let mut contents = self.history();
        contents.push(turn.clone());
        GenerateContentRequest::new(contents, self.system_instruction.clone())
    }
}

/// Converts a provider-neutral part into a Gemini part.
///
/// Documents travel as a text note naming the file; their bytes stay local.
pub fn to_part(part: EncodedPart) -> Part {
    match part {
        EncodedPart::InlineData { mime_type, data } => Part::inline_data(mime_type, data),
        EncodedPart::Text(text) => Part::text(text),
        EncodedPart::DocumentReference { name } => Part::text(format!("[Attached document: {name}]")),
    }
}

#[async_trait::async_trait]
impl ChatBackend for GeminiChat {
    async fn send_message(&self, parts: Vec<EncodedPart>) -> Result<String> {
        let turn = Content::user(parts.into_iter().map(to_part).collect());
        let request = self.request_for(&turn);
        let response = self
            .client
            .generate_content(&self.chat_model, &request)
            .await?;
        let text = response.text().ok_or_else(|| {
            Error::empty_response(match response.block_reason() {
                Some(reason) => format!("no text in response ({reason})"),
                None => "no text in response".to_string(),
            })
        })?;

        let mut history = self.lock_history();
        history.push(turn);
        history.push(Content::model_text(text.clone()));
        Ok(text)
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        self.client.generate_image(&self.image_model, prompt).await
    }
}
