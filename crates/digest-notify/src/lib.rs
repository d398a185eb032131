//! Digest delivery: message splitting and notification sinks.

pub mod error;
pub mod sink;
pub mod split;
pub mod telegram;

pub use error::NotifyError;
pub use sink::{deliver, LogSink, NotificationSink};
pub use split::split_message;
pub use telegram::TelegramSink;
