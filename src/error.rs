//! Error types for fcgi-wire.
//!
//! Clean end-of-input is not an error: read operations report it as
//! `Ok(None)`. Everything else that prevents a complete record from being
//! transferred is a [`FcgiError`].

use std::io;

use thiserror::Error;

/// Main error type for all record I/O operations.
#[derive(Debug, Error)]
pub enum FcgiError {
    /// Underlying read/write failure.
    ///
    /// `transferred` is the number of octets confirmed before the failure.
    /// It is diagnostic only; the operation cannot be resumed from it.
    #[error("I/O error after {transferred} octets: {source}")]
    Io {
        #[source]
        source: io::Error,
        transferred: usize,
    },

    /// Peer closed the stream part way through a header, content or padding block.
    #[error("truncated message: expected {expected} octets, received {received}")]
    TruncatedMessage { expected: usize, received: usize },

    /// Content does not fit in a single record.
    #[error("content of {len} octets exceeds the single-record maximum of {max}")]
    ContentTooLarge { len: usize, max: usize },

    /// Fewer than eight octets were handed to the header decoder.
    #[error("malformed header: need 8 octets, got {len}")]
    MalformedHeader { len: usize },

    /// A stream read saw a record belonging to another stream.
    #[error(
        "unexpected record type {record_type} for request {request_id} \
         (expected type {expected_type} for request {expected_request_id})"
    )]
    UnexpectedRecord {
        record_type: u8,
        request_id: u16,
        expected_type: u8,
        expected_request_id: u16,
    },

    /// The handle did not become readable before the deadline.
    #[error("timed out waiting for the handle to become ready")]
    TimedOut,
}

impl FcgiError {
    /// Wrap an I/O error with the number of octets moved before it happened.
    pub(crate) fn io(source: io::Error, transferred: usize) -> Self {
        FcgiError::Io {
            source,
            transferred,
        }
    }

    /// Native error code for this failure, when there is one.
    ///
    /// Truncated messages report `EPIPE`, matching the broken-pipe
    /// condition they represent.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            FcgiError::Io { source, .. } => source.raw_os_error(),
            FcgiError::TruncatedMessage { .. } => Some(libc::EPIPE),
            FcgiError::TimedOut => Some(libc::ETIMEDOUT),
            _ => None,
        }
    }

    /// Whether the peer went away in the middle of a record.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        matches!(self, FcgiError::TruncatedMessage { .. })
    }
}

impl From<io::Error> for FcgiError {
    fn from(source: io::Error) -> Self {
        FcgiError::io(source, 0)
    }
}

impl From<FcgiError> for io::Error {
    fn from(err: FcgiError) -> Self {
        match err {
            FcgiError::Io { source, .. } => source,
            FcgiError::TruncatedMessage { .. } => io::Error::new(io::ErrorKind::BrokenPipe, err),
            FcgiError::ContentTooLarge { .. } | FcgiError::MalformedHeader { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            FcgiError::UnexpectedRecord { .. } => io::Error::new(io::ErrorKind::InvalidData, err),
            FcgiError::TimedOut => io::Error::new(io::ErrorKind::TimedOut, err),
        }
    }
}

/// Result type alias using FcgiError.
pub type Result<T> = std::result::Result<T, FcgiError>;
