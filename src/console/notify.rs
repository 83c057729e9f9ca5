use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub level: Level,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Toast queue of one console session.
///
/// Clones share the queue, so a mutation callback can report its outcome
/// without holding the session. Once `capacity` is reached the oldest toast
/// is dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
    queue: Arc<Mutex<VecDeque<Notification>>>,
    capacity: usize,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        Notifier {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, level: Level, message: impl Into<String>) -> String {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            level,
            message: message.into(),
            created_at: Utc::now(),
        };
        let id = notification.id.clone();

        let mut queue = self.queue.lock();
        while queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(notification);
        id
    }

    pub fn success(&self, message: impl Into<String>) -> String {
        self.push(Level::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) -> String {
        self.push(Level::Error, message)
    }

    pub fn info(&self, message: impl Into<String>) -> String {
        self.push(Level::Info, message)
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Latest toast without consuming it.
    pub fn last(&self) -> Option<Notification> {
        self.queue.lock().back().cloned()
    }

    /// Hands every queued toast to the front end, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        self.queue.lock().drain(..).collect()
    }
}
