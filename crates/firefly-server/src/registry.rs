//! The set of connected viewer sessions.
//!
//! A [`Session`] is the sending half of one viewer's outbound queue. The
//! receiving half belongs to that viewer's writer task, which is the only
//! code that ever touches the socket's sink.
//!
//! [`SessionRegistry`] guards the set with a read-write lock: add and
//! remove take it exclusively, fan-out snapshots take it shared. A
//! session is in the registry exactly while its stream is believed open,
//! and removal is idempotent.

use std::collections::BTreeMap;

use axum::extract::ws::Utf8Bytes;
use firefly_types::SessionId;
use tokio::sync::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};

/// One encoded state message, cheap to clone across sessions.
pub type Frame = Utf8Bytes;

/// Result of offering a frame to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The frame is queued for the writer.
    Queued,
    /// The queue was full; this frame was dropped for this session.
    Dropped,
    /// The writer is gone; the session is dead.
    Closed,
}

/// Handle to one connected viewer's outbound queue.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    outbox: mpsc::Sender<Frame>,
}

impl Session {
    /// Create a session with a queue of `capacity` frames.
    ///
    /// Returns the session and the receiver its writer task drains.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (outbox, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: SessionId::new(),
                outbox,
            },
            rx,
        )
    }

    /// This session's identity.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Queue `frame` without waiting.
    pub fn offer(&self, frame: Frame) -> Delivery {
        match self.outbox.try_send(frame) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

/// Thread-safe set of sessions keyed by identity.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<BTreeMap<SessionId, Session>>,
}

impl SessionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session`. Returns the number of sessions afterwards.
    pub async fn add(&self, session: Session) -> usize {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id(), session);
        sessions.len()
    }

    /// Unregister the session with `id`.
    ///
    /// Returns `true` if it was present. Removing an absent session is a
    /// no-op.
    pub async fn remove(&self, id: SessionId) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Copy of the current sessions for fan-out.
    pub async fn snapshot(&self) -> Vec<Session> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Whether a session with `id` is registered.
    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
