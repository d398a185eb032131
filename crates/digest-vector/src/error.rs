use thiserror::Error;

use digest_core::error::DigestError;

/// Errors from vector arithmetic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VectorError {
    #[error("Degenerate vector: zero norm")]
    DegenerateVector,

    #[error("Empty input: no vectors to compare against")]
    EmptyInput,

    #[error("Dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

impl From<VectorError> for DigestError {
    fn from(err: VectorError) -> Self {
        DigestError::DegenerateInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            VectorError::DegenerateVector.to_string(),
            "Degenerate vector: zero norm"
        );
        assert_eq!(
            VectorError::DimensionMismatch { left: 3, right: 4 }.to_string(),
            "Dimension mismatch: 3 vs 4"
        );
    }

    #[test]
    fn test_into_digest_error() {
        let err: DigestError = VectorError::EmptyInput.into();
        assert!(matches!(err, DigestError::DegenerateInput(_)));
    }
}
