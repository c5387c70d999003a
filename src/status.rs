//! Transient status messages shown above the results panel.
//!
//! Every posted message owns its own timer and is removed when that timer
//! fires, no matter what else was posted or clicked in the meantime.

use crate::model::StatusKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

pub const STATUS_TTL: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub id: u64,
    pub text: String,
    pub kind: StatusKind,
    /// Local wall-clock time of posting, `HH:MM:SS`.
    pub posted_at: String,
}

struct Inner {
    // Newest first.
    board: Mutex<Vec<StatusMessage>>,
    next_id: AtomicU64,
    ttl: Duration,
    echo: Option<UnboundedSender<StatusMessage>>,
}

impl Inner {
    fn board(&self) -> MutexGuard<'_, Vec<StatusMessage>> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheap to clone; clones share the same message board.
#[derive(Clone)]
pub struct StatusNotifier {
    inner: Arc<Inner>,
}

impl Default for StatusNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusNotifier {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Also forward every posted message to `echo` (headless output).
    pub fn with_echo(echo: UnboundedSender<StatusMessage>) -> Self {
        Self::build(Some(echo))
    }

    fn build(echo: Option<UnboundedSender<StatusMessage>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                board: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                ttl: STATUS_TTL,
                echo,
            }),
        }
    }

    /// Insert a message at the top and schedule its removal.
    ///
    /// Must be called from within a tokio runtime.
    pub fn post(&self, text: impl Into<String>, kind: StatusKind) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let msg = StatusMessage {
            id,
            text: text.into(),
            kind,
            posted_at: clock_label(),
        };
        match kind {
            StatusKind::Progress => tracing::debug!(status_id = id, "{}", msg.text),
            StatusKind::Success => tracing::info!(status_id = id, "{}", msg.text),
            StatusKind::Error => tracing::warn!(status_id = id, "{}", msg.text),
        }
        if let Some(echo) = &self.inner.echo {
            let _ = echo.send(msg.clone());
        }
        self.inner.board().insert(0, msg);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.ttl).await;
            inner.board().retain(|m| m.id != id);
        });
        id
    }

    pub fn progress(&self, text: impl Into<String>) -> u64 {
        self.post(text, StatusKind::Progress)
    }

    pub fn success(&self, text: impl Into<String>) -> u64 {
        self.post(text, StatusKind::Success)
    }

    pub fn error(&self, text: impl Into<String>) -> u64 {
        self.post(text, StatusKind::Error)
    }

    /// Snapshot of the live messages, newest first.
    pub fn active(&self) -> Vec<StatusMessage> {
        self.inner.board().clone()
    }

    /// Drop every message at once. Pending timers become no-ops.
    pub fn clear(&self) {
        self.inner.board().clear();
    }
}

fn clock_label() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(time::macros::format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default()
}
