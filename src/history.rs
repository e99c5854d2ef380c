//! Conversation log

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::Serialize;

/// Default number of entries kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One line of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub text: String,
    pub at: DateTime<Local>,
}

/// Bounded log; the oldest entries fall off first
#[derive(Debug, Clone)]
pub struct ChatHistory {
    entries: VecDeque<ChatEntry>,
    capacity: usize,
}

impl ChatHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, role: ChatRole, text: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ChatEntry {
            role,
            text: text.into(),
            at: Local::now(),
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
