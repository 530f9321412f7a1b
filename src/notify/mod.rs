//! User-visible notifications.
//!
//! # Responsibilities
//! - Carry short, dismissible success/failure messages to the dashboard
//! - Keep a bounded log of recent notifications for the HTTP surface
//! - Mirror every notification to the structured log
//!
//! # Design Decisions
//! - Library operations never return errors past their boundary; they notify
//! - Messages are generic; only the error classification is appended

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::observability::metrics;

const DEFAULT_CAPACITY: usize = 100;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

/// A transient message shown to the dashboard user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub description: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: Level, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: description.into(),
            at: Utc::now(),
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Level::Success, title, description)
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Level::Info, title, description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Level::Error, title, description)
    }
}

/// Sink for user notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Bounded in-memory notification log.
#[derive(Debug)]
pub struct NotificationLog {
    entries: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Notifications, oldest first.
    pub fn recent(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .expect("notification log poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn count(&self, level: Level) -> usize {
        self.entries
            .lock()
            .expect("notification log poisoned")
            .iter()
            .filter(|n| n.level == level)
            .count()
    }

    pub fn clear(&self) {
        self.entries.lock().expect("notification log poisoned").clear();
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Error => tracing::warn!(title = %notification.title, description = %notification.description, "Notification"),
            _ => tracing::info!(level = notification.level.as_str(), title = %notification.title, "Notification"),
        }
        metrics::record_notification(notification.level.as_str());

        let mut entries = self.entries.lock().expect("notification log poisoned");
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(notification);
    }
}
