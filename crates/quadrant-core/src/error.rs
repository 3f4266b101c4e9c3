use thiserror::Error;

/// Shared lightweight error type for core primitive operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid caller input or malformed primitive value.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Fixed-width value decoded from a slice of the wrong length.
    #[error("invalid length for {what}: expected {expected} bytes, got {got}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::CoreError;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(
            CoreError::InvalidInput("bad ns").to_string(),
            "invalid input: bad ns"
        );
        assert_eq!(
            CoreError::InvalidLength {
                what: "namespace id",
                expected: 8,
                got: 3,
            }
            .to_string(),
            "invalid length for namespace id: expected 8 bytes, got 3"
        );
    }
}
