// Public modules
pub mod attachment;
pub mod backend;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod intent;
pub mod observability;
pub mod store;
pub mod types;
pub mod utils;

// Re-exports
pub use attachment::{EncodedPart, PendingAttachment};
pub use backend::{ChatBackend, GeminiChat};
pub use client::Gemini;
pub use client_logger::ClientLogger;
pub use error::{Error, Result};
pub use intent::{BackendIntent, parse_intent};
pub use observability::register_biometrics;
pub use store::ConversationStore;
pub use types::*;
