use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// What the confirmation dialog shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmState {
    /// Whether a dialog is open
    pub visible: bool,
    /// Dialog title, empty when hidden
    pub title: String,
    /// Dialog body, empty when hidden
    pub message: String,
    /// Requests waiting behind the visible one
    pub queued: usize,
}

pub(super) struct ConfirmRequest {
    pub(super) title: String,
    pub(super) message: String,
    resolve: oneshot::Sender<bool>,
}

impl ConfirmRequest {
    pub(super) fn new(title: String, message: String) -> (Self, PendingConfirm) {
        let (resolve, rx) = oneshot::channel();
        (
            Self {
                title,
                message,
                resolve,
            },
            PendingConfirm { rx },
        )
    }

    /// Settle the request. Returns `false` if nobody is waiting any more.
    pub(super) fn resolve(self, result: bool) -> bool {
        self.resolve.send(result).is_ok()
    }
}

/// The user's answer to a confirmation, once given.
///
/// Resolves to `Err(Error::ConfirmationCancelled)` if the queue is shut down
/// before the user answers.
#[must_use = "the answer is only observable by awaiting this future"]
#[derive(Debug)]
pub struct PendingConfirm {
    rx: oneshot::Receiver<bool>,
}

impl Future for PendingConfirm {
    type Output = Result<bool>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|answer| answer.map_err(|_| Error::ConfirmationCancelled))
    }
}
