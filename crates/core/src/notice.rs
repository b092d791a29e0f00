//! Short-lived user-facing messages.

use chrono::{DateTime, Duration, Utc};

/// Default time a notice stays visible.
pub const DEFAULT_NOTICE_SECS: u64 = 3;

/// Severity used by the UI to pick a colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Neutral feedback.
    Info,
    /// A requested action completed.
    Success,
    /// Something failed; the user may want to retry.
    Error,
}

/// A message that dismisses itself after a fixed duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Text shown to the user.
    pub message: String,
    /// Severity.
    pub level: NoticeLevel,
    /// When the notice was raised; expiry counts from here.
    pub created_at: DateTime<Utc>,
}

impl Notice {
    /// Notice raised now.
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            created_at: Utc::now(),
        }
    }

    /// Info-level notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    /// Success-level notice.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    /// Error-level notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    /// Whether the notice has been visible for at least `ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at >= ttl
    }
}
