//! Logging trait for Gemini client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! the raw exchanges passing through the [`Gemini`](crate::Gemini) client,
//! before any intent parsing happens.

use crate::types::{GenerateContentResponse, GeneratedImage};

/// A trait for logging Gemini client operations.
///
/// # Example
///
/// ```rust,ignore
/// use datasonic::{ClientLogger, GenerateContentResponse, GeneratedImage};
///
/// struct StderrLogger;
///
/// impl ClientLogger for StderrLogger {
///     fn log_chat_response(&self, response: &GenerateContentResponse) {
///         eprintln!("chat: {:?}", response.text());
///     }
///
///     fn log_generated_image(&self, prompt: &str, image: &GeneratedImage) {
///         eprintln!("image for {prompt:?}: {} base64 bytes", image.data.len());
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a successful `generateContent` response.
    fn log_chat_response(&self, response: &GenerateContentResponse);

    /// Log an image returned by a successful `predict` call.
    fn log_generated_image(&self, prompt: &str, image: &GeneratedImage);
}
