//! Transient notification queue.
//!
//! Toasts are appended in order with strictly increasing ids and removed
//! either by an auto-expiry timer or an explicit dismissal. Identical
//! messages are not coalesced — every `show` is its own toast. A timer
//! firing after its toast was dismissed is a no-op (ids are never reused).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

/// One visible notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastItem {
    pub id: u64,
    pub message: String,
    pub kind: ToastKind,
}

#[derive(Debug)]
struct ToastState {
    next_id: u64,
    toasts: Vec<ToastItem>,
}

/// Ordered queue of transient messages.
///
/// Cheap to clone — clones share the same queue. `show` schedules the
/// auto-dismiss on the current tokio runtime.
#[derive(Clone)]
pub struct ToastQueue {
    state: Arc<Mutex<ToastState>>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ToastState {
                next_id: 1,
                toasts: Vec::new(),
            })),
        }
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.show(ToastKind::Success, message, config::TOAST_DEFAULT_DURATION)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.show(ToastKind::Error, message, config::TOAST_ERROR_DURATION)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.show(ToastKind::Info, message, config::TOAST_DEFAULT_DURATION)
    }

    /// Append a toast and schedule its removal after `duration`.
    pub fn show(&self, kind: ToastKind, message: impl Into<String>, duration: Duration) -> u64 {
        let id = {
            let Ok(mut state) = self.state.lock() else {
                return 0;
            };
            let id = state.next_id;
            state.next_id += 1;
            state.toasts.push(ToastItem {
                id,
                message: message.into(),
                kind,
            });
            id
        };

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            queue.dismiss(id);
        });

        id
    }

    /// Remove a toast now. Unknown ids (already expired or dismissed)
    /// are ignored.
    pub fn dismiss(&self, id: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.toasts.retain(|toast| toast.id != id);
        }
    }

    /// Snapshot in append order.
    pub fn toasts(&self) -> Vec<ToastItem> {
        self.state
            .lock()
            .map(|state| state.toasts.clone())
            .unwrap_or_default()
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new()
    }
}
