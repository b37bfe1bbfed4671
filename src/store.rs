//! Append-only conversation transcript.
//!
//! [`ConversationStore`] is the single source of truth for what has been said
//! in a session.  Messages are appended in order and never edited or removed;
//! the rendered transcript is always a projection of [`ConversationStore::all`].

use crate::types::{Message, MessageId};
use crate::utils::time;

/// Ordered, append-only log of transcript messages.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message, stamping its id and creation time.
    ///
    /// The id is the current unix time in milliseconds, bumped past the
    /// previous id when two messages land in the same millisecond (or the
    /// clock steps backwards), so ids are unique and strictly increasing.
    pub fn append(&mut self, mut message: Message) -> MessageId {
        let created_at = time::now();
        let mut id = time::unix_millis(created_at);
        if let Some(last) = self.messages.last()
            && id <= last.id.0
        {
            id = last.id.0 + 1;
        }
        message.id = MessageId(id);
        message.created_at = created_at;
        self.messages.push(message);
        MessageId(id)
    }

    /// All messages in insertion order.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Messages appended at or after position `index`.
    pub fn since(&self, index: usize) -> &[Message] {
        self.messages.get(index..).unwrap_or(&[])
    }

    /// Looks up a message by id.
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        // ids are strictly increasing, so the log is sorted by id
        self.messages
            .binary_search_by_key(&id, |message| message.id)
            .ok()
            .map(|index| &self.messages[index])
    }

    /// The most recently appended message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages in the store.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
