use oson_buffers::BufferError;
use thiserror::Error;

/// Failure taxonomy shared by every DOM, event and codec operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OutOfMemory,
    MalformedInput,
    OutOfBounds,
    Unsupported,
    NotFound,
    InvalidState,
    ReferentialIntegrity,
    BufferTooSmall,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("out of memory: {0}")]
    OutOfMemory(String),
    #[error("malformed input at byte {pos}: {msg}")]
    MalformedInput { pos: usize, msg: String },
    #[error("index {index} out of bounds for length {len}")]
    OutOfBounds { index: usize, len: usize },
    #[error("{op} is not supported by the {backend} backend")]
    Unsupported {
        op: &'static str,
        backend: &'static str,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("referential integrity violation: {0}")]
    ReferentialIntegrity(String),
    #[error("buffer too small: {required} bytes required")]
    BufferTooSmall { required: usize },
}

impl DomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomError::OutOfMemory(_) => ErrorKind::OutOfMemory,
            DomError::MalformedInput { .. } => ErrorKind::MalformedInput,
            DomError::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            DomError::Unsupported { .. } => ErrorKind::Unsupported,
            DomError::NotFound(_) => ErrorKind::NotFound,
            DomError::InvalidState(_) => ErrorKind::InvalidState,
            DomError::ReferentialIntegrity(_) => ErrorKind::ReferentialIntegrity,
            DomError::BufferTooSmall { .. } => ErrorKind::BufferTooSmall,
        }
    }

    pub(crate) fn malformed(pos: usize, msg: impl Into<String>) -> Self {
        DomError::MalformedInput {
            pos,
            msg: msg.into(),
        }
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        DomError::InvalidState(msg.into())
    }

    pub(crate) fn unsupported(op: &'static str, backend: &'static str) -> Self {
        DomError::Unsupported { op, backend }
    }

    pub(crate) fn integrity(msg: impl Into<String>) -> Self {
        DomError::ReferentialIntegrity(msg.into())
    }
}

impl From<BufferError> for DomError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::Eof { at, wanted } => DomError::malformed(
                at,
                format!("truncated binary image ({wanted} more bytes expected)"),
            ),
            BufferError::LimitExceeded { required, .. } => DomError::BufferTooSmall { required },
            BufferError::OutOfMemory { requested } => {
                DomError::OutOfMemory(format!("failed to grow buffer to {requested} bytes"))
            }
            BufferError::InvalidUtf8 { at } => DomError::malformed(at, "invalid utf-8 sequence"),
        }
    }
}

/// Fallible `Vec` growth; allocator refusal becomes [`DomError::OutOfMemory`].
pub(crate) fn reserve<T>(vec: &mut Vec<T>, additional: usize) -> crate::Result<()> {
    vec.try_reserve(additional).map_err(|_| {
        DomError::OutOfMemory(format!(
            "failed to reserve {additional} more slots ({} in use)",
            vec.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            DomError::malformed(3, "bad").kind(),
            ErrorKind::MalformedInput
        );
        assert_eq!(
            DomError::unsupported("put_field", "binary").kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            DomError::BufferTooSmall { required: 9 }.kind(),
            ErrorKind::BufferTooSmall
        );
    }

    #[test]
    fn buffer_errors_convert() {
        let err: DomError = BufferError::LimitExceeded {
            limit: 4,
            required: 10,
        }
        .into();
        assert_eq!(err, DomError::BufferTooSmall { required: 10 });
        let err: DomError = BufferError::Eof { at: 7, wanted: 2 }.into();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn messages_are_not_empty() {
        let err = DomError::malformed(5, "expected a value");
        assert_eq!(err.to_string(), "malformed input at byte 5: expected a value");
    }
}
