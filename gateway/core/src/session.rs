//! Conversational Sessions
//!
//! A session owns the ordered message sequence for one chat thread. It is
//! created when a chat view mounts and discarded on teardown; the backend
//! history is the source of truth and replaces the local sequence whenever
//! a send resolves.
//!
//! The session also carries the single in-flight assistant message that
//! the streaming assembler mutates; everything else in the sequence is
//! immutable once appended.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

use crate::gateway::HistoryMessage;

/// Unique message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new process-unique message ID
    #[must_use]
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who authored a message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The human operator
    User,
    /// The conversational assistant
    Assistant,
}

impl Role {
    /// Map the backend's wire representation; anything unrecognized is
    /// treated as a user message.
    #[must_use]
    pub fn from_wire(role: &str) -> Self {
        if role == "assistant" {
            Self::Assistant
        } else {
            Self::User
        }
    }

    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A message in the conversation
#[derive(Clone, Debug)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: Role,
    /// Message content
    pub content: String,
    /// When the message was created
    pub created_at: DateTime<Utc>,
    /// Whether the message is still being streamed
    pub streaming: bool,
}

impl Message {
    /// Create a complete message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            streaming: false,
        }
    }

    /// Create an empty streaming message (content arrives in fragments)
    #[must_use]
    pub fn streaming(role: Role) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: String::new(),
            created_at: Utc::now(),
            streaming: true,
        }
    }

    /// Mark streaming as complete
    pub fn complete(&mut self) {
        self.streaming = false;
    }
}

/// A chat session: one thread, ordered messages
pub struct Session {
    thread_id: String,
    messages: Vec<Message>,
    streaming_id: Option<MessageId>,
}

/// Shared handle to a session, for the assembler and orchestrator
pub type SharedSession = Arc<Mutex<Session>>;

impl Session {
    /// Create a session for an existing thread
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            streaming_id: None,
        }
    }

    /// Create a session with a freshly generated thread id
    #[must_use]
    pub fn with_generated_thread() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Wrap into a [`SharedSession`]
    #[must_use]
    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    /// The backend thread this session mirrors
    #[must_use]
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// The message sequence, oldest first
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the sequence is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Look up a message by id
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Optimistically append a user message, returning its provisional id
    /// so a failed send can roll it back.
    pub fn push_user(&mut self, content: impl Into<String>) -> MessageId {
        let message = Message::new(Role::User, content);
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// Remove a message by id. Returns whether anything was removed.
    pub fn remove(&mut self, id: &MessageId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| &m.id != id);
        if self.streaming_id.as_ref() == Some(id) {
            self.streaming_id = None;
        }
        before != self.messages.len()
    }

    /// Replace the whole sequence with the backend's authoritative history.
    ///
    /// Keyed by thread id: history for a different thread is ignored and
    /// the local view is left untouched. Returns whether it applied.
    pub fn reconcile(&mut self, thread_id: &str, history: &[HistoryMessage]) -> bool {
        if thread_id != self.thread_id {
            return false;
        }
        self.streaming_id = None;
        self.messages = history
            .iter()
            .map(|m| Message {
                id: MessageId(m.id.clone()),
                role: Role::from_wire(&m.role),
                content: m.content.clone(),
                created_at: DateTime::parse_from_rfc3339(&m.timestamp)
                    .map_or_else(|_| Utc::now(), |t| t.with_timezone(&Utc)),
                streaming: false,
            })
            .collect();
        true
    }

    /// Begin the single in-flight assistant message
    pub fn begin_streaming(&mut self) -> MessageId {
        let message = Message::streaming(Role::Assistant);
        let id = message.id.clone();
        self.streaming_id = Some(id.clone());
        self.messages.push(message);
        id
    }

    /// Append one fragment to the in-flight message, space-separated.
    /// Returns whether there was an in-flight message to append to.
    pub fn append_fragment(&mut self, text: &str) -> bool {
        let Some(id) = self.streaming_id.clone() else {
            return false;
        };
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        if !message.content.is_empty() {
            message.content.push(' ');
        }
        message.content.push_str(text);
        true
    }

    /// Content of the in-flight message, if one exists
    #[must_use]
    pub fn streaming_content(&self) -> Option<&str> {
        let id = self.streaming_id.as_ref()?;
        self.messages
            .iter()
            .find(|m| &m.id == id)
            .map(|m| m.content.as_str())
    }

    /// Whether an assistant reply is currently being assembled
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming_id.is_some()
    }

    /// Commit the in-flight message as final and immutable
    pub fn commit_streaming(&mut self) -> Option<MessageId> {
        let id = self.streaming_id.take()?;
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            message.complete();
        }
        Some(id)
    }

    /// Discard the in-flight message and its partial buffer
    pub fn abort_streaming(&mut self) -> bool {
        match self.streaming_id.take() {
            Some(id) => self.remove(&id),
            None => false,
        }
    }

    /// Drop every message
    pub fn clear(&mut self) {
        self.messages.clear();
        self.streaming_id = None;
    }
}
