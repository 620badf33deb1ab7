//! Record-level reads over a blocking handle.
//!
//! Composes the transfer engine with the header/record codecs. End-of-input
//! exactly on a record boundary is reported as `Ok(None)`; end-of-input
//! anywhere inside a header, content block or padding block is
//! [`FcgiError::TruncatedMessage`].
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use fcgi_wire::{read_record, serialize_record};
//!
//! let mut wire = Cursor::new(serialize_record(6, 1, b"hello").unwrap());
//!
//! let record = read_record(&mut wire).unwrap().unwrap();
//! assert_eq!(record.content(), b"hello");
//!
//! // Peer closed on a record boundary.
//! assert!(read_record(&mut wire).unwrap().is_none());
//! ```

use std::io::Read;

use bytes::{BufMut, BytesMut};

use crate::error::{FcgiError, Result};
use crate::protocol::{Header, Record, HEADER_SIZE};
use crate::transfer::{read_exact_within, read_full_into, skip_within, Fill};

/// Read and decode one header.
pub fn read_header<R>(reader: &mut R) -> Result<Option<Header>>
where
    R: Read + ?Sized,
{
    let mut buf = [0u8; HEADER_SIZE];
    match read_full_into(reader, &mut buf)? {
        Fill::Eof => Ok(None),
        Fill::Complete => Header::decode(&buf).map(Some),
    }
}

/// Read one complete record.
///
/// Padding is consumed and discarded so the handle is left on the next
/// record boundary.
pub fn read_record<R>(reader: &mut R) -> Result<Option<Record>>
where
    R: Read + ?Sized,
{
    let Some(header) = read_header(reader)? else {
        return Ok(None);
    };

    let mut content = BytesMut::zeroed(header.content_length as usize);
    read_exact_within(reader, &mut content)?;
    skip_within(reader, header.padding_length as usize)?;

    tracing::trace!(
        record_type = header.record_type,
        request_id = header.request_id,
        content_length = header.content_length,
        padding_length = header.padding_length,
        "record read"
    );

    Ok(Some(Record::new(header, content.freeze())))
}

/// Read a whole logical stream for one record type and request.
///
/// Collects records until the zero-length terminator and returns the
/// concatenated content. Returns `Ok(None)` if the handle is at clean
/// end-of-input before the first record. End-of-input after the first
/// record but before the terminator is a truncated message, and a record
/// for any other type or request is [`FcgiError::UnexpectedRecord`].
pub fn read_stream<R>(reader: &mut R, record_type: u8, request_id: u16) -> Result<Option<BytesMut>>
where
    R: Read + ?Sized,
{
    let mut content = BytesMut::new();
    let mut records = 0usize;

    loop {
        let record = match read_record(reader)? {
            Some(record) => record,
            None if records == 0 => return Ok(None),
            None => {
                tracing::debug!(records, "stream ended without terminator");
                return Err(FcgiError::TruncatedMessage {
                    expected: HEADER_SIZE,
                    received: 0,
                });
            }
        };

        if record.record_type() != record_type || record.request_id() != request_id {
            return Err(FcgiError::UnexpectedRecord {
                record_type: record.record_type(),
                request_id: record.request_id(),
                expected_type: record_type,
                expected_request_id: request_id,
            });
        }

        records += 1;
        if record.is_terminator() {
            tracing::debug!(records, octets = content.len(), "stream read");
            return Ok(Some(content));
        }
        content.put(record.into_content());
    }
}

/// Wait up to `timeout` for the handle to become readable, then read one
/// record.
///
/// Fails with [`FcgiError::TimedOut`] if no data arrives in time. Only the
/// wait is bounded: once the first octet is available the record is read
/// with the blocking transfer loop.
#[cfg(unix)]
pub fn read_record_timeout<H>(handle: &mut H, timeout: std::time::Duration) -> Result<Option<Record>>
where
    H: Read + std::os::fd::AsFd,
{
    if !crate::poll::can_read(&*handle, Some(timeout))? {
        return Err(FcgiError::TimedOut);
    }
    read_record(handle)
}
