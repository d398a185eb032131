//! Notification sink trait and the log-only sink.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::NotifyError;
use crate::split::split_message;

/// A destination for digest messages.
///
/// Implementations send `text` as one message. Splitting long text is the
/// caller's job, see [`deliver`].
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Writes each message to the log instead of sending it anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        if text.trim().is_empty() {
            return Err(NotifyError::EmptyMessage);
        }
        info!(chars = text.chars().count(), "Digest message:\n{}", text);
        Ok(())
    }
}

/// Send `text` through `sink`, split into parts of at most `limit`
/// characters. Parts go out in order; the first failure stops the message.
///
/// Returns the number of parts sent.
pub async fn deliver(
    sink: &dyn NotificationSink,
    text: &str,
    limit: usize,
) -> Result<usize, NotifyError> {
    let parts = split_message(text, limit);
    if parts.iter().all(|p| p.trim().is_empty()) {
        return Err(NotifyError::EmptyMessage);
    }

    let total = parts.len();
    for (i, part) in parts.iter().enumerate() {
        if let Err(e) = sink.send(part).await {
            warn!(sink = sink.name(), part = i + 1, total, error = %e, "Message part not delivered");
            return Err(e);
        }
    }
    Ok(total)
}
