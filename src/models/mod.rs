//! Data models for promem.
//!
//! The host tool owns the interaction log; promem only ever reads it, so the
//! types here are plain read models with no persistence logic of their own.

/// One logged exchange with a model, as recorded by the host tool.
///
/// Mapped from the host log's `responses` table. Timestamps are the host
/// tool's `datetime_utc` strings and compare lexicographically, which is
/// sufficient for watermark purposes because the log is append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionRecord {
    /// Row id assigned by the host tool.
    pub id: i64,
    /// The prompt text the user sent.
    pub prompt: String,
    /// Identifier of the model the user was talking to.
    pub model: String,
    /// UTC timestamp string, monotonic for polling purposes.
    pub timestamp: String,
}

impl InteractionRecord {
    /// Returns true when the record carries no usable prompt text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.prompt.trim().is_empty()
    }
}
