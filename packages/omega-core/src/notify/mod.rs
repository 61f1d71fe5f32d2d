//! # Notification Module
//!
//! Transient toasts and yes/no confirmation dialogs, independent of how a
//! front-end draws them.
//!
//! ## Toasts
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           TOAST LIFECYCLE                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  add_toast(msg, kind, 3s) ──► id = next_id++ ──► push to back of queue │
//! │         │                                                               │
//! │         ├── duration > 0 ──► timer task: sleep(duration), remove(id)   │
//! │         │                                                               │
//! │         └── remove_toast(id) ──► remove + abort timer                  │
//! │                                                                         │
//! │  Removal is idempotent: whichever of timer/manual runs second is a     │
//! │  no-op.                                                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Confirmations
//!
//! Requests are queued first-in first-out. The front request is the visible
//! one; answering it settles its [`PendingConfirm`] and shows the next. A
//! request is never silently dropped: tearing the queue down resolves every
//! outstanding future with [`crate::Error::ConfirmationCancelled`].

mod confirm;

pub use confirm::{ConfirmState, PendingConfirm};

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::DEFAULT_TOAST_DURATION;
use confirm::ConfirmRequest;

/// Toast identifier. Unique per queue, increasing from 1.
pub type ToastId = u64;

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastKind {
    /// Neutral information
    #[default]
    Info,
    /// An action succeeded
    Success,
    /// An action failed
    Error,
}

/// A queued toast.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    /// Identifier
    pub id: ToastId,
    /// Text shown to the user
    pub message: String,
    /// Severity
    pub kind: ToastKind,
    /// Lifetime; zero means "until dismissed"
    pub duration: Duration,
    /// Creation time, Unix milliseconds
    pub created_at: i64,
}

struct Inner {
    default_duration: Duration,
    next_id: AtomicU64,
    toasts: Mutex<Vec<Toast>>,
    timers: Mutex<HashMap<ToastId, JoinHandle<()>>>,
    confirms: Mutex<VecDeque<ConfirmRequest>>,
    changes: watch::Sender<()>,
}

impl Inner {
    fn remove(&self, id: ToastId) -> bool {
        let removed = {
            let mut toasts = self.toasts.lock();
            match toasts.iter().position(|t| t.id == id) {
                Some(index) => {
                    toasts.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.changes.send_replace(());
        }
        removed
    }

    fn abort_timers(&self) {
        for (_, timer) in self.timers.lock().drain() {
            timer.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.abort_timers();
    }
}

/// Toast queue plus confirmation dialog queue. Cheap to clone; clones share
/// state.
#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<Inner>,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_DURATION)
    }
}

impl NotificationQueue {
    /// Create an empty queue. `default_duration` is used by
    /// [`info`](Self::info), [`success`](Self::success) and
    /// [`error`](Self::error).
    pub fn new(default_duration: Duration) -> Self {
        let (changes, _) = watch::channel(());
        Self {
            inner: Arc::new(Inner {
                default_duration,
                next_id: AtomicU64::new(1),
                toasts: Mutex::new(Vec::new()),
                timers: Mutex::new(HashMap::new()),
                confirms: Mutex::new(VecDeque::new()),
                changes,
            }),
        }
    }

    // ========================================================================
    // TOASTS
    // ========================================================================

    /// Append a toast. When `duration` is non-zero it is removed automatically
    /// once the duration has elapsed.
    ///
    /// Auto-removal needs a Tokio runtime; outside one the toast stays until
    /// [`remove_toast`](Self::remove_toast) is called.
    pub fn add_toast(
        &self,
        message: impl Into<String>,
        kind: ToastKind,
        duration: Duration,
    ) -> ToastId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let toast = Toast {
            id,
            message: message.into(),
            kind,
            duration,
            created_at: crate::time::now_timestamp_millis(),
        };

        tracing::debug!(id = id, kind = ?kind, "Toast added");
        self.inner.toasts.lock().push(toast);
        self.inner.changes.send_replace(());

        if !duration.is_zero() {
            self.schedule_removal(id, duration);
        }

        id
    }

    /// Info toast with the default duration.
    pub fn info(&self, message: impl Into<String>) -> ToastId {
        self.add_toast(message, ToastKind::Info, self.inner.default_duration)
    }

    /// Success toast with the default duration.
    pub fn success(&self, message: impl Into<String>) -> ToastId {
        self.add_toast(message, ToastKind::Success, self.inner.default_duration)
    }

    /// Error toast with the default duration.
    pub fn error(&self, message: impl Into<String>) -> ToastId {
        self.add_toast(message, ToastKind::Error, self.inner.default_duration)
    }

    /// Remove a toast. Returns `false` if it was already gone.
    pub fn remove_toast(&self, id: ToastId) -> bool {
        if let Some(timer) = self.inner.timers.lock().remove(&id) {
            timer.abort();
        }
        self.inner.remove(id)
    }

    /// Toasts in display order.
    pub fn toasts(&self) -> Vec<Toast> {
        self.inner.toasts.lock().clone()
    }

    fn schedule_removal(&self, id: ToastId, duration: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(id = id, "No async runtime, toast will not expire on its own");
            return;
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        // Hold the map lock across spawn so the task cannot finish before its
        // handle is recorded.
        let mut timers = self.inner.timers.lock();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = weak.upgrade() {
                inner.timers.lock().remove(&id);
                inner.remove(id);
            }
        });
        timers.insert(id, handle);
    }

    // ========================================================================
    // CONFIRMATIONS
    // ========================================================================

    /// Ask the user a yes/no question. The returned future settles with the
    /// answer passed to [`handle_confirm`](Self::handle_confirm).
    pub fn show_confirm(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> PendingConfirm {
        let (request, pending) = ConfirmRequest::new(title.into(), message.into());
        let queued = {
            let mut confirms = self.inner.confirms.lock();
            confirms.push_back(request);
            confirms.len()
        };
        if queued > 1 {
            tracing::debug!(queued = queued, "Confirmation queued behind the visible one");
        }
        self.inner.changes.send_replace(());
        pending
    }

    /// Answer the visible confirmation and show the next queued one, if any.
    /// Does nothing when no confirmation is pending.
    pub fn handle_confirm(&self, result: bool) {
        let front = self.inner.confirms.lock().pop_front();
        let Some(request) = front else {
            return;
        };

        if !request.resolve(result) {
            tracing::debug!("Confirmation answered after its caller stopped waiting");
        }
        self.inner.changes.send_replace(());
    }

    /// What the confirmation dialog should show right now.
    pub fn confirm_state(&self) -> ConfirmState {
        let confirms = self.inner.confirms.lock();
        match confirms.front() {
            Some(request) => ConfirmState {
                visible: true,
                title: request.title.clone(),
                message: request.message.clone(),
                queued: confirms.len() - 1,
            },
            None => ConfirmState::default(),
        }
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Observe any change to toasts or confirmations.
    pub fn subscribe(&self) -> watch::Receiver<()> {
        self.inner.changes.subscribe()
    }

    /// Stop all timers and cancel every outstanding confirmation. Pending
    /// futures resolve to [`crate::Error::ConfirmationCancelled`].
    pub fn shutdown(&self) {
        self.inner.abort_timers();
        let cancelled = std::mem::take(&mut *self.inner.confirms.lock());
        if !cancelled.is_empty() {
            tracing::debug!(count = cancelled.len(), "Cancelling pending confirmations");
        }
        drop(cancelled);
        self.inner.changes.send_replace(());
    }
}

// ============================================================================
// TESTS
// ============================================================================
