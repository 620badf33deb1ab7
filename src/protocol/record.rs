//! Record struct and record-level encoding.
//!
//! A record is a header followed by `content_length` content octets and
//! `padding_length` padding octets. Content is held as `bytes::Bytes` so it
//! can be handed to callers without another copy.
//!
//! # Example
//!
//! ```
//! use fcgi_wire::protocol::{parse_record, serialize_record, HEADER_SIZE};
//!
//! let bytes = serialize_record(6, 1, b"hello").unwrap();
//! let record = parse_record(&bytes[..HEADER_SIZE], &bytes[HEADER_SIZE..]).unwrap();
//!
//! assert_eq!(record.record_type(), 6);
//! assert_eq!(record.content(), b"hello");
//! ```

use bytes::Bytes;

use super::wire_format::{content_length_for, Header, HEADER_SIZE};
use crate::error::{FcgiError, Result};

/// Largest alignment [`padding_for`] accepts; padding must fit in one octet.
pub const MAX_ALIGNMENT: usize = 256;

/// A complete protocol record, padding stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Decoded header, as it appeared on the wire.
    pub header: Header,
    /// Content bytes.
    pub content: Bytes,
}

impl Record {
    /// Create a new record from header and content.
    pub fn new(header: Header, content: Bytes) -> Self {
        Self { header, content }
    }

    /// Create a record from header and raw bytes (copies data).
    pub fn from_parts(header: Header, content: &[u8]) -> Self {
        Self {
            header,
            content: Bytes::copy_from_slice(content),
        }
    }

    /// Get a reference to the content bytes.
    #[inline]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Get the record type.
    #[inline]
    pub fn record_type(&self) -> u8 {
        self.header.record_type
    }

    /// Get the request ID.
    #[inline]
    pub fn request_id(&self) -> u16 {
        self.header.request_id
    }

    /// Check if this is a zero-length stream terminator.
    #[inline]
    pub fn is_terminator(&self) -> bool {
        self.content.is_empty()
    }

    /// Consume the record, returning its content.
    #[inline]
    pub fn into_content(self) -> Bytes {
        self.content
    }
}

/// Padding needed after `content_len` octets so that the whole record
/// (header, content, padding) is a multiple of `align` octets.
///
/// An `align` of 0 or 1 means no padding.
///
/// # Panics
///
/// Panics if `align` exceeds [`MAX_ALIGNMENT`].
pub fn padding_for(content_len: usize, align: usize) -> u8 {
    assert!(align <= MAX_ALIGNMENT, "alignment {align} exceeds {MAX_ALIGNMENT}");
    if align <= 1 {
        return 0;
    }
    let total = HEADER_SIZE + content_len;
    ((align - total % align) % align) as u8
}

/// Serialize a single record with no padding.
///
/// Fails with [`FcgiError::ContentTooLarge`] if `content` does not fit in
/// one record.
pub fn serialize_record(record_type: u8, request_id: u16, content: &[u8]) -> Result<Vec<u8>> {
    serialize_record_padded(record_type, request_id, content, 0)
}

/// Serialize a single record followed by `padding_length` zero octets.
pub fn serialize_record_padded(
    record_type: u8,
    request_id: u16,
    content: &[u8],
    padding_length: u8,
) -> Result<Vec<u8>> {
    let header = Header::new(
        record_type,
        request_id,
        content_length_for(content.len())?,
        padding_length,
    );
    let mut buf = Vec::with_capacity(header.record_len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(content);
    buf.resize(header.record_len(), 0);
    Ok(buf)
}

/// Build record parts for scatter/gather I/O.
///
/// Returns the encoded header and a reference to the content, without
/// copying the content. Padding is left to the caller.
pub fn build_record_parts(
    record_type: u8,
    request_id: u16,
    content: &[u8],
    padding_length: u8,
) -> Result<([u8; HEADER_SIZE], &[u8])> {
    let header = Header::new(
        record_type,
        request_id,
        content_length_for(content.len())?,
        padding_length,
    );
    Ok((header.encode(), content))
}

/// Combine header bytes and the bytes that follow them into a record.
///
/// `content_bytes` may run past the content block (into padding or the next
/// record); only `content_length` octets are taken. Fewer than that is a
/// [`FcgiError::TruncatedMessage`].
pub fn parse_record(header_bytes: &[u8], content_bytes: &[u8]) -> Result<Record> {
    let header = Header::decode(header_bytes)?;
    let expected = header.content_length as usize;
    if content_bytes.len() < expected {
        return Err(FcgiError::TruncatedMessage {
            expected,
            received: content_bytes.len(),
        });
    }
    Ok(Record::from_parts(header, &content_bytes[..expected]))
}
