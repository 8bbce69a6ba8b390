//! Request-scoped flash messages.
//!
//! A [`MessageStorage`] is a cheap, cloneable handle shared between the
//! request and whoever constructed it (a server adapter or a test client), so
//! messages recorded by a view can be read back after the response is built.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;

/// Message severity, mirroring Django's message levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Debug.
    Debug,
    /// Info.
    Info,
    /// Success.
    Success,
    /// Warning.
    Warning,
    /// Error.
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// A single flash message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// The severity.
    pub level: Level,
    /// The message text.
    pub text: String,
}

/// Shared storage for the messages recorded during a request.
#[derive(Debug, Clone, Default)]
pub struct MessageStorage {
    inner: Arc<Mutex<Vec<Message>>>,
}

impl MessageStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message.
    pub fn add(&self, level: Level, text: impl Into<String>) {
        let message = Message {
            level,
            text: text.into(),
        };
        // A poisoned lock only means another holder panicked mid-push.
        match self.inner.lock() {
            Ok(mut messages) => messages.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }

    /// Records a success message.
    pub fn success(&self, text: impl Into<String>) {
        self.add(Level::Success, text);
    }

    /// Records an info message.
    pub fn info(&self, text: impl Into<String>) {
        self.add(Level::Info, text);
    }

    /// Records an error message.
    pub fn error(&self, text: impl Into<String>) {
        self.add(Level::Error, text);
    }

    /// Returns a snapshot of all recorded messages.
    pub fn all(&self) -> Vec<Message> {
        match self.inner.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Removes and returns all recorded messages.
    pub fn drain(&self) -> Vec<Message> {
        match self.inner.lock() {
            Ok(mut messages) => std::mem::take(&mut *messages),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_read_back_through_clone() {
        let storage = MessageStorage::new();
        let handle = storage.clone();
        storage.success("Saved.");
        storage.error("Oops.");
        let all = handle.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].level, Level::Success);
        assert_eq!(all[1].text, "Oops.");
    }

    #[test]
    fn test_drain() {
        let storage = MessageStorage::new();
        storage.info("hello");
        assert_eq!(storage.drain().len(), 1);
        assert!(storage.all().is_empty());
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Success.to_string(), "success");
        assert_eq!(Level::Warning.to_string(), "warning");
    }
}
