//! User-facing notifications.
//!
//! SYSTEM CONTEXT
//! ==============
//! Rejected selections and duplicate quick filters need a toast; fetch
//! failures only need a log line. The coordinator reports through
//! [`Notifier`] and the host decides how to display it.

use tracing::{info, warn};

use crate::error::ErrorCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A single message for the end user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub code: &'static str,
    pub message: String,
}

impl Notice {
    /// Build an error notice from a typed error.
    #[must_use]
    pub fn from_error<E: ErrorCode + ?Sized>(err: &E) -> Self {
        Self { level: NoticeLevel::Error, code: err.error_code(), message: err.to_string() }
    }
}

/// Sink for user-facing notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Default notifier: forwards notices to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!(code = notice.code, "{}", notice.message),
            NoticeLevel::Error => warn!(code = notice.code, "{}", notice.message),
        }
    }
}
