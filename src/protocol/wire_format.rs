//! Header encoding and decoding.
//!
//! Implements the fixed 8-byte FastCGI record header:
//! ```text
//! ┌─────────┬──────┬──────────┬────────────────┬─────────┬──────────┐
//! │ Version │ Type │ Req ID   │ Content Length │ Padding │ Reserved │
//! │ 1 byte  │1 byte│ 2 bytes  │ 2 bytes        │ 1 byte  │ 1 byte   │
//! │         │      │ uint16 BE│ uint16 BE      │         │          │
//! └─────────┴──────┴──────────┴────────────────┴─────────┴──────────┘
//! ```
//!
//! Version is always written as [`FCGI_VERSION_1`]; version and reserved
//! octets are ignored on decode.

use crate::error::{FcgiError, Result};

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// Protocol version written into every header.
pub const FCGI_VERSION_1: u8 = 1;

/// Largest content block a single record can carry.
pub const MAX_CONTENT_LENGTH: usize = u16::MAX as usize;

/// Largest padding block a single record can carry.
pub const MAX_PADDING_LENGTH: usize = u8::MAX as usize;

/// Decoded record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// Record type, opaque to this layer.
    pub record_type: u8,
    /// Request identifier.
    pub request_id: u16,
    /// Number of content octets following the header.
    pub content_length: u16,
    /// Number of padding octets following the content.
    pub padding_length: u8,
}

impl Header {
    /// Create a new header.
    pub fn new(record_type: u8, request_id: u16, content_length: u16, padding_length: u8) -> Self {
        Self {
            record_type,
            request_id,
            content_length,
            padding_length,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use fcgi_wire::protocol::Header;
    ///
    /// let bytes = Header::new(6, 1, 300, 4).encode();
    /// assert_eq!(bytes, [1, 6, 0, 1, 0x01, 0x2C, 4, 0]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (8 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0] = FCGI_VERSION_1;
        buf[1] = self.record_type;
        buf[2..4].copy_from_slice(&self.request_id.to_be_bytes());
        buf[4..6].copy_from_slice(&self.content_length.to_be_bytes());
        buf[6] = self.padding_length;
        buf[7] = 0;
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Only the first eight bytes are inspected. Fails with
    /// [`FcgiError::MalformedHeader`] if fewer are supplied.
    ///
    /// # Example
    ///
    /// ```
    /// use fcgi_wire::protocol::Header;
    ///
    /// let header = Header::decode(&[1, 5, 0, 42, 0, 10, 6, 0]).unwrap();
    /// assert_eq!(header.record_type, 5);
    /// assert_eq!(header.request_id, 42);
    /// assert_eq!(header.content_length, 10);
    /// assert_eq!(header.padding_length, 6);
    /// ```
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(FcgiError::MalformedHeader { len: buf.len() });
        }
        Ok(Self {
            record_type: buf[1],
            request_id: u16::from_be_bytes([buf[2], buf[3]]),
            content_length: u16::from_be_bytes([buf[4], buf[5]]),
            padding_length: buf[6],
        })
    }

    /// Octets following the header on the wire (content plus padding).
    #[inline]
    pub fn body_len(&self) -> usize {
        self.content_length as usize + self.padding_length as usize
    }

    /// Total record size on the wire, header included.
    #[inline]
    pub fn record_len(&self) -> usize {
        HEADER_SIZE + self.body_len()
    }

    /// Check if this is a zero-length record (stream terminator).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content_length == 0
    }
}

/// Encode header fields to bytes (standalone function).
#[inline]
pub fn serialize_header(
    record_type: u8,
    request_id: u16,
    content_length: u16,
    padding_length: u8,
) -> [u8; HEADER_SIZE] {
    Header::new(record_type, request_id, content_length, padding_length).encode()
}

/// Decode a header from bytes (standalone function).
#[inline]
pub fn parse_header(buf: &[u8]) -> Result<Header> {
    Header::decode(buf)
}

/// Convert a caller-facing content length into the header field, rejecting
/// lengths that do not fit in one record.
#[inline]
pub fn content_length_for(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| FcgiError::ContentTooLarge {
        len,
        max: MAX_CONTENT_LENGTH,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode_roundtrip() {
        let original = Header::new(6, 1, 100, 4);
        let encoded = original.encode();
        let decoded = Header::decode(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_header_roundtrip_over_field_ranges() {
        let request_ids = [0u16, 1, 0x00FF, 0x0100, 0x7FFF, u16::MAX];
        let lengths = [0u16, 1, 8, 255, 256, 65534, u16::MAX];
        for record_type in [0u8, 1, 11, 127, u8::MAX] {
            for &request_id in &request_ids {
                for &content_length in &lengths {
                    for padding_length in [0u8, 7, u8::MAX] {
                        let header =
                            Header::new(record_type, request_id, content_length, padding_length);
                        let bytes = serialize_header(
                            record_type,
                            request_id,
                            content_length,
                            padding_length,
                        );
                        assert_eq!(parse_header(&bytes).unwrap(), header);
                    }
                }
            }
        }
    }

    #[test]
    fn test_header_big_endian_byte_order() {
        let bytes = Header::new(0x03, 0x0102, 0x0405, 0x06).encode();

        assert_eq!(bytes[0], FCGI_VERSION_1);
        assert_eq!(bytes[1], 0x03);

        // Request ID: 0x0102 in BE
        assert_eq!(bytes[2], 0x01);
        assert_eq!(bytes[3], 0x02);

        // Content length: 0x0405 in BE
        assert_eq!(bytes[4], 0x04);
        assert_eq!(bytes[5], 0x05);

        assert_eq!(bytes[6], 0x06);
        assert_eq!(bytes[7], 0);
    }

    #[test]
    fn test_decode_ignores_version_and_reserved() {
        let bytes = [0xEE, 2, 0, 9, 0, 3, 5, 0xFF];
        let header = Header::decode(&bytes).unwrap();
        assert_eq!(header, Header::new(2, 9, 3, 5));
    }

    #[test]
    fn test_decode_too_short_buffer() {
        let buf = [0u8; 7]; // One byte short
        match Header::decode(&buf) {
            Err(FcgiError::MalformedHeader { len }) => assert_eq!(len, 7),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(parse_header(&[]).is_err());
    }

    #[test]
    fn test_decode_uses_leading_bytes_only() {
        let mut buf = Header::new(7, 3, 2, 0).encode().to_vec();
        buf.extend_from_slice(b"xy");
        assert_eq!(Header::decode(&buf).unwrap(), Header::new(7, 3, 2, 0));
    }

    #[test]
    fn test_record_len_includes_padding() {
        let header = Header::new(5, 1, 13, 3);
        assert_eq!(header.body_len(), 16);
        assert_eq!(header.record_len(), 24);
        assert!(!header.is_empty());
        assert!(Header::new(5, 1, 0, 0).is_empty());
    }

    #[test]
    fn test_content_length_for_bounds() {
        assert_eq!(content_length_for(0).unwrap(), 0);
        assert_eq!(content_length_for(MAX_CONTENT_LENGTH).unwrap(), u16::MAX);
        assert!(matches!(
            content_length_for(MAX_CONTENT_LENGTH + 1),
            Err(FcgiError::ContentTooLarge { len: 65536, max: 65535 })
        ));
    }
}
