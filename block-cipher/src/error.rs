//! Error types for block cipher operations

use thiserror::Error;

/// Every failure a caller of this crate can see.
///
/// `DataLength` and `IllegalState` are kept apart on purpose: the first means the
/// call site passed bad buffers, the second means the engine was never initialised.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("data length error: {0}")]
    DataLength(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("range [{offset}, {offset} + {len}) is outside a buffer of {available} bytes")]
    OutOfRange {
        offset: usize,
        len: usize,
        available: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid block size (must be > 0)")]
    InvalidBlockSize,

    #[error("Padding error")]
    Padding,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CipherError {
    /// True for errors caused by the caller's buffers or offsets.
    pub fn is_data_length(&self) -> bool {
        matches!(self, CipherError::DataLength(_))
    }

    /// True when the engine was used before `init`.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, CipherError::IllegalState(_))
    }
}

impl From<CipherError> for std::io::Error {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::Io(inner) => inner,
            CipherError::DataLength(_) | CipherError::OutOfRange { .. } => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
            }
            other => std::io::Error::other(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CipherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        let len = CipherError::DataLength("input buffer too short".into());
        let state = CipherError::IllegalState("not initialised".into());

        assert!(len.is_data_length());
        assert!(!len.is_illegal_state());
        assert!(state.is_illegal_state());
        assert!(!state.is_data_length());
    }

    #[test]
    fn out_of_range_display() {
        let err = CipherError::OutOfRange {
            offset: 4,
            len: 16,
            available: 16,
        };
        assert_eq!(
            err.to_string(),
            "range [4, 4 + 16) is outside a buffer of 16 bytes"
        );
    }

    #[test]
    fn io_conversion_keeps_inner_error() {
        let inner = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let io: std::io::Error = CipherError::Io(inner).into();
        assert_eq!(io.kind(), std::io::ErrorKind::BrokenPipe);

        let io: std::io::Error = CipherError::DataLength("short".into()).into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidInput);
    }
}
