//! Append-only job history.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped history record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// When the entry was recorded.
    pub date: DateTime<Utc>,
    /// What happened.
    pub message: String,
}

/// Ordered list of history records.
///
/// Entries can only be appended; there is no way to edit or remove one.
/// Serialized as `{"entries":[{"date":..,"message":..}, ..]}`, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryList {
    entries: Vec<HistoryItem>,
}

impl HistoryList {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry with an explicit date.
    pub fn add(&mut self, date: DateTime<Utc>, message: impl Into<String>) {
        self.entries.push(HistoryItem {
            date,
            message: message.into(),
        });
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[HistoryItem] {
        &self.entries
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&HistoryItem> {
        self.entries.last()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten to one `<rfc3339>: <message>` line per entry.
    pub fn to_text(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                format!(
                    "{}: {}\n",
                    entry.date.to_rfc3339_opts(SecondsFormat::Micros, true),
                    entry.message
                )
            })
            .collect()
    }
}
