//! Attachment staging and encoding.
//!
//! A file goes through two stages before it reaches the backend:
//!
//! 1. [`PendingAttachment`] stages it.  Images are read once to build a
//!    renderable `data:` URL preview; documents only record their file name.
//!    This is the picker side and is where the allowed types are enforced.
//! 2. [`encode`] turns the staged file into an [`EncodedPart`] when the
//!    message is sent.  Images are re-read and inlined as base64.  Documents
//!    are passed by name only; their bytes are never transmitted.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};
use crate::types::{Attachment, AttachmentKind};

/// Maximum number of characters of a caption used for a saved image's name.
const FILE_NAME_CHARS: usize = 30;

/// Fallback name for saved images with an empty caption.
const DEFAULT_IMAGE_NAME: &str = "generated-image";

/// Document extensions accepted for the document slot.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "txt", "doc", "docx"];

/// Returns the media type for a supported image file, judged by extension.
pub fn image_media_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Returns the media type for an allowed document file, judged by extension.
pub fn document_media_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        "doc" => Some("application/msword"),
        "docx" => {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        _ => None,
    }
}

/// A file the user has staged but not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttachment {
    path: PathBuf,
    preview: String,
    kind: AttachmentKind,
    media_type: &'static str,
}

impl PendingAttachment {
    /// Stages an image, reading it to build a `data:` URL preview.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unsupported extensions and an I/O error
    /// when the file cannot be read.
    pub async fn image(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let media_type = image_media_type(path).ok_or_else(|| {
            Error::validation(
                format!("{} is not a supported image", path.display()),
                Some("path".to_string()),
            )
        })?;
        let bytes = read_file(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            preview: data_url(media_type, &STANDARD.encode(bytes)),
            kind: AttachmentKind::Image,
            media_type,
        })
    }

    /// Stages a document.  Only the file name is kept for display.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the extension is not one of
    /// [`DOCUMENT_EXTENSIONS`] or the path has no file name.
    pub fn document(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let media_type = document_media_type(path).ok_or_else(|| {
            Error::validation(
                format!(
                    "{} is not an allowed document ({})",
                    path.display(),
                    DOCUMENT_EXTENSIONS.join(", ")
                ),
                Some("path".to_string()),
            )
        })?;
        let name = file_name(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            preview: name,
            kind: AttachmentKind::Document,
            media_type,
        })
    }

    /// Stages a file as an image or a document depending on its extension.
    pub async fn stage(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if image_media_type(path).is_some() {
            Self::image(path).await
        } else {
            Self::document(path)
        }
    }

    /// The staged file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A `data:` URL for images, the file name for documents.
    pub fn preview(&self) -> &str {
        &self.preview
    }

    /// Image or document.
    pub fn kind(&self) -> AttachmentKind {
        self.kind
    }

    /// Media type judged from the file extension.
    pub fn media_type(&self) -> &'static str {
        self.media_type
    }

    /// The attachment recorded on the user's transcript message.
    pub fn to_attachment(&self) -> Attachment {
        Attachment {
            content: self.preview.clone(),
            kind: self.kind,
        }
    }
}

/// One element of a chat request, in provider-neutral form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedPart {
    /// Base64 media inlined in the request.
    InlineData {
        /// Media type of the data.
        mime_type: String,
        /// Base64-encoded bytes.
        data: String,
    },

    /// User text.
    Text(String),

    /// A document passed by name only.
    DocumentReference {
        /// The document's file name.
        name: String,
    },
}

/// Encodes a staged attachment for the backend.
///
/// Images are read from disk and base64 encoded.  Documents become a
/// [`EncodedPart::DocumentReference`] without touching the file.
pub async fn encode(pending: &PendingAttachment) -> Result<EncodedPart> {
    match pending.kind {
        AttachmentKind::Image => {
            let bytes = read_file(&pending.path).await?;
            Ok(EncodedPart::InlineData {
                mime_type: pending.media_type.to_string(),
                data: STANDARD.encode(bytes),
            })
        }
        AttachmentKind::Document => Ok(EncodedPart::DocumentReference {
            name: pending.preview.clone(),
        }),
    }
}

/// Formats base64 data as a `data:` URL.
pub fn data_url(mime_type: &str, base64_data: &str) -> String {
    format!("data:{mime_type};base64,{base64_data}")
}

/// Splits a base64 `data:` URL into its media type and decoded bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| Error::encoding("not a data URL", None))?;
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| Error::encoding("data URL has no payload", None))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| Error::encoding("data URL is not base64 encoded", None))?;
    Ok((mime_type.to_string(), STANDARD.decode(data)?))
}

/// File name for saving an image, derived from its caption.
///
/// Takes the first 30 characters, replaces anything but ASCII letters and
/// digits with `_`, lowercases, and appends `.jpg`.
pub fn suggested_file_name(caption: &str) -> String {
    let stem: String = caption
        .chars()
        .take(FILE_NAME_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        format!("{DEFAULT_IMAGE_NAME}.jpg")
    } else {
        format!("{stem}.jpg")
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::validation(
                format!("{} has no file name", path.display()),
                Some("path".to_string()),
            )
        })
}
