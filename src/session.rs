//! Per-user conversion sessions.
//!
//! A session is the one conversion kind a user has armed, if any. The
//! store keeps only armed sessions; a user without an entry is `Idle`.
//!
//! Transitions:
//!
//! ```text
//! Idle ──select(k)──▶ Awaiting(k) ──select(j)──▶ Awaiting(j)   (last write wins)
//! Awaiting(k) ──file──▶ claim(k) … pipeline … claim dropped ──▶ Idle
//! Idle ──file──▶ Idle   (fallback reply, or an inferred claim)
//! ```
//!
//! Every selection gets a fresh generation number. A claim remembers the
//! generation it consumed and only clears that one, so a selection made
//! while the job is still running stays armed for the next file.
//!
//! The store is a sharded [`DashMap`]: updates for different users lock
//! different shards, so no single lock guards every session.

use crate::kind::ConversionKind;
use crate::transport::UserId;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Where one user stands in the conversion dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingImageToPdf,
    AwaitingWordToPdf,
    AwaitingPdfToWord,
}

impl SessionState {
    pub fn awaiting(kind: ConversionKind) -> Self {
        match kind {
            ConversionKind::ImageToPdf => SessionState::AwaitingImageToPdf,
            ConversionKind::WordToPdf => SessionState::AwaitingWordToPdf,
            ConversionKind::PdfToWord => SessionState::AwaitingPdfToWord,
        }
    }

    /// The armed kind, or `None` when idle.
    pub fn pending(self) -> Option<ConversionKind> {
        match self {
            SessionState::Idle => None,
            SessionState::AwaitingImageToPdf => Some(ConversionKind::ImageToPdf),
            SessionState::AwaitingWordToPdf => Some(ConversionKind::WordToPdf),
            SessionState::AwaitingPdfToWord => Some(ConversionKind::PdfToWord),
        }
    }
}

/// One armed selection.
#[derive(Debug, Clone, Copy)]
struct Armed {
    kind: ConversionKind,
    generation: u64,
}

/// In-memory session map shared by every concurrent job.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<UserId, Armed>>,
    generations: Arc<AtomicU64>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, user: UserId) -> SessionState {
        self.sessions
            .get(&user)
            .map(|entry| SessionState::awaiting(entry.kind))
            .unwrap_or_default()
    }

    /// Arm `kind` for `user`, replacing any earlier selection.
    /// Returns the previous state.
    pub fn select(&self, user: UserId, kind: ConversionKind) -> SessionState {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let previous = self
            .sessions
            .insert(user, Armed { kind, generation })
            .map(|armed| SessionState::awaiting(armed.kind))
            .unwrap_or_default();
        debug!(%user, ?previous, %kind, "Session armed");
        previous
    }

    pub fn clear(&self, user: UserId) {
        self.sessions.remove(&user);
    }

    /// Claim the armed kind for an arriving file.
    ///
    /// The session stays armed while the claim is alive and returns to
    /// `Idle` when it is dropped, whatever the job's outcome, unless the
    /// user selected again in the meantime.
    pub fn claim(&self, user: UserId) -> Option<SessionClaim> {
        let armed = *self.sessions.get(&user)?.value();
        Some(SessionClaim {
            user,
            kind: armed.kind,
            generation: Some(armed.generation),
            sessions: Arc::clone(&self.sessions),
        })
    }

    /// Claim `kind` for a file that arrived with no selection, when the kind
    /// was inferred from the file itself. Dropping it leaves the session
    /// untouched.
    pub fn claim_as(&self, user: UserId, kind: ConversionKind) -> SessionClaim {
        SessionClaim {
            user,
            kind,
            generation: None,
            sessions: Arc::clone(&self.sessions),
        }
    }

    /// Number of users with an armed conversion.
    pub fn armed(&self) -> usize {
        self.sessions.len()
    }
}

/// Guard for one in-flight job; resets the session on drop.
#[derive(Debug)]
pub struct SessionClaim {
    user: UserId,
    kind: ConversionKind,
    /// Selection this claim consumed; `None` for inferred claims.
    generation: Option<u64>,
    sessions: Arc<DashMap<UserId, Armed>>,
}

impl SessionClaim {
    pub fn kind(&self) -> ConversionKind {
        self.kind
    }

    pub fn user(&self) -> UserId {
        self.user
    }
}

impl Drop for SessionClaim {
    fn drop(&mut self) {
        let Some(generation) = self.generation else {
            return;
        };
        match self
            .sessions
            .remove_if(&self.user, |_, armed| armed.generation == generation)
        {
            Some(_) => debug!(user = %self.user, "Session cleared"),
            None => debug!(user = %self.user, "Session re-armed during job, kept"),
        }
    }
}
