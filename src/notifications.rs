//! User-visible notifications
//!
//! A bounded queue of transient messages. Every notification is mirrored to
//! the tracing log at a matching level.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{error, info};
use uuid::Uuid;

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Notifications {
    queue: VecDeque<Notification>,
    capacity: usize,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Queue a message, dropping the oldest when full
    ///
    /// Returns the id of the new notification for [`Notifications::dismiss`].
    pub fn push(&mut self, level: NotificationLevel, message: impl Into<String>) -> Uuid {
        let message = message.into();
        match level {
            NotificationLevel::Error => error!(%message, "notification"),
            _ => info!(level = ?level, %message, "notification"),
        }

        if self.queue.len() >= self.capacity {
            self.queue.pop_front();
        }
        let id = Uuid::new_v4();
        self.queue.push_back(Notification {
            id,
            level,
            message,
            created_at: Utc::now(),
        });
        id
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NotificationLevel::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NotificationLevel::Error, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NotificationLevel::Info, message);
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.queue.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take every queued notification, oldest first
    pub fn drain(&mut self) -> Vec<Notification> {
        self.queue.drain(..).collect()
    }

    /// Remove one notification by id
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.queue.len();
        self.queue.retain(|n| n.id != id);
        self.queue.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_dropped_when_full() {
        let mut notes = Notifications::with_capacity(2);
        notes.info("one");
        notes.info("two");
        notes.error("three");

        let messages: Vec<_> = notes.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["two", "three"]);
        assert_eq!(notes.latest().map(|n| n.level), Some(NotificationLevel::Error));
    }

    #[test]
    fn test_push_at_capacity_returns_new_id() {
        let mut notes = Notifications::with_capacity(1);
        let first = notes.push(NotificationLevel::Info, "one");
        let second = notes.push(NotificationLevel::Info, "two");

        assert_ne!(first, second);
        assert_eq!(notes.len(), 1);
        assert!(!notes.dismiss(first));
        assert!(notes.dismiss(second));
    }

    #[test]
    fn test_dismiss_and_drain() {
        let mut notes = Notifications::new();
        let id = notes.push(NotificationLevel::Success, "saved");
        assert_eq!(notes.latest().map(|n| n.id), Some(id));
        notes.info("other");

        assert!(notes.dismiss(id));
        assert!(!notes.dismiss(id));
        assert_eq!(notes.drain().len(), 1);
        assert!(notes.is_empty());
    }
}
