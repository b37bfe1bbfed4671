// Public modules
pub mod content;
pub mod generate_content;
pub mod image_prediction;
pub mod message;
pub mod model;

// Re-exports
pub use content::{Blob, Content, Part, Role};
pub use generate_content::{
    Candidate, GenerateContentRequest, GenerateContentResponse, PromptFeedback,
};
pub use image_prediction::{
    GeneratedImage, IMAGE_OUTPUT_MIME_TYPE, ImageInstance, ImageParameters, ImagePredictRequest,
    ImagePredictResponse, ImagePrediction, OutputOptions,
};
pub use message::{Attachment, AttachmentKind, Message, MessageId, Sender};
pub use model::{KnownModel, Model};
