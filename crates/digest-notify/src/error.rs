use thiserror::Error;

use digest_core::error::DigestError;

/// Errors from notification delivery.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Empty message")]
    EmptyMessage,
    #[error("Delivery failed: {0}")]
    Upstream(String),
}

impl From<NotifyError> for DigestError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::EmptyMessage => DigestError::DegenerateInput(err.to_string()),
            NotifyError::Upstream(msg) => DigestError::upstream("notification", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(NotifyError::EmptyMessage.to_string(), "Empty message");
        assert_eq!(
            NotifyError::Upstream("HTTP 401".into()).to_string(),
            "Delivery failed: HTTP 401"
        );
    }

    #[test]
    fn test_into_digest_error() {
        let err: DigestError = NotifyError::Upstream("down".into()).into();
        assert!(matches!(err, DigestError::Upstream { .. }));
        let err: DigestError = NotifyError::EmptyMessage.into();
        assert!(matches!(err, DigestError::DegenerateInput(_)));
    }
}
