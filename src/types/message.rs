use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Identity of a transcript message.
///
/// Ids are derived from the unix time in milliseconds at append and are
/// strictly increasing within a [`ConversationStore`](crate::ConversationStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(MessageId)
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person at the keyboard.
    User,
    /// The assistant, including local apology messages.
    Bot,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => f.write_str("user"),
            Sender::Bot => f.write_str("bot"),
        }
    }
}

/// The kind of file attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// An image, carried inline as a `data:` URL.
    Image,
    /// A document, carried by file name only.
    Document,
}

/// A file attached to exactly one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// A `data:` URL for images, the file name for documents.
    pub content: String,

    /// Whether this is an image or a document.
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
}

impl Attachment {
    /// Create an image attachment from a `data:` URL.
    pub fn image(data_url: impl Into<String>) -> Self {
        Self {
            content: data_url.into(),
            kind: AttachmentKind::Image,
        }
    }

    /// Create a document attachment from a file name.
    pub fn document(name: impl Into<String>) -> Self {
        Self {
            content: name.into(),
            kind: AttachmentKind::Document,
        }
    }

    /// True when this attachment carries image data.
    pub fn is_image(&self) -> bool {
        self.kind == AttachmentKind::Image
    }
}

/// One entry in the conversation transcript.
///
/// `id` and `created_at` are placeholders until the message is passed to
/// [`ConversationStore::append`](crate::ConversationStore::append), which
/// stamps both.  The store never hands out mutable access afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique, monotonic id.
    pub id: MessageId,

    /// Who authored the message.
    pub sender: Sender,

    /// Message text; may be empty when only an attachment was sent.
    pub text: String,

    /// Optional attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,

    /// When the message was appended.
    #[serde(with = "crate::utils::time")]
    pub created_at: OffsetDateTime,
}

impl Message {
    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: MessageId(0),
            sender,
            text: text.into(),
            attachment: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    /// A user-authored message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    /// A bot-authored message.
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text)
    }

    /// Attach a file to the message.
    pub fn with_attachment(mut self, attachment: Option<Attachment>) -> Self {
        self.attachment = attachment;
        self
    }

    /// True when the user wrote this message.
    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}
