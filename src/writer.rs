//! Record-level writes and stream chunking.
//!
//! Single-record writes ([`write_header`], [`write_record`]) validate their
//! input before touching the handle, then hand header, content and padding
//! to the transfer engine as one scatter/gather write.
//!
//! [`StreamWriter`] carries a logical byte stream of any length as a
//! sequence of bounded records for one record type and request, optionally
//! closed by a zero-length terminator record:
//!
//! ```text
//! content (200000 octets)
//!   ├─► [hdr|65535] [hdr|65535] [hdr|65535] [hdr|3395]   content records
//!   └─► [hdr|0]                                           terminator
//! ```
//!
//! # Example
//!
//! ```
//! use fcgi_wire::{read_stream, write_stream};
//!
//! let mut wire = Vec::new();
//! let written = write_stream(&mut wire, 6, 1, b"Status: 200 OK\r\n\r\n", true).unwrap();
//! assert_eq!(written, wire.len());
//!
//! let content = read_stream(&mut wire.as_slice(), 6, 1).unwrap().unwrap();
//! assert_eq!(&content[..], b"Status: 200 OK\r\n\r\n");
//! ```

use std::io::Write;

use crate::error::{FcgiError, Result};
use crate::protocol::{
    build_record_parts, padding_for, serialize_header, MAX_ALIGNMENT, MAX_CONTENT_LENGTH,
    MAX_PADDING_LENGTH,
};
use crate::transfer::{write_full, write_full_vectored};

/// Default chunk size for stream writes (the single-record maximum).
pub const DEFAULT_MAX_CHUNK_LEN: usize = MAX_CONTENT_LENGTH;

/// Zero bytes used as the padding source for every record.
static ZERO_PADDING: [u8; MAX_PADDING_LENGTH] = [0u8; MAX_PADDING_LENGTH];

/// Padding policy for records written by a [`StreamWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    /// No padding; every record ends right after its content.
    #[default]
    None,
    /// Pad each record so its total size is a multiple of the given
    /// alignment (at most [`MAX_ALIGNMENT`]).
    Align(usize),
}

impl Padding {
    /// Padding octets this policy adds after `content_len` octets.
    ///
    /// Alignments above [`MAX_ALIGNMENT`] are treated as [`MAX_ALIGNMENT`].
    #[inline]
    pub fn for_content(&self, content_len: usize) -> u8 {
        match *self {
            Padding::None => 0,
            Padding::Align(align) => padding_for(content_len, align.min(MAX_ALIGNMENT)),
        }
    }
}

/// Configuration for stream writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Largest content block per record, in `1..=65535`.
    pub max_chunk_len: usize,
    /// Padding policy applied to every record, terminator included.
    pub padding: Padding,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_chunk_len: DEFAULT_MAX_CHUNK_LEN,
            padding: Padding::None,
        }
    }
}

impl StreamConfig {
    /// Set the chunk size, clamped to `1..=65535`.
    pub fn with_max_chunk_len(mut self, max_chunk_len: usize) -> Self {
        self.max_chunk_len = max_chunk_len.clamp(1, MAX_CONTENT_LENGTH);
        self
    }

    /// Set the padding policy. Alignments above [`MAX_ALIGNMENT`] are clamped.
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = match padding {
            Padding::Align(align) => Padding::Align(align.min(MAX_ALIGNMENT)),
            Padding::None => Padding::None,
        };
        self
    }

    /// Pad every record to an 8-octet boundary.
    pub fn aligned(self) -> Self {
        self.with_padding(Padding::Align(8))
    }
}

/// Write a bare header.
pub fn write_header<W>(
    writer: &mut W,
    record_type: u8,
    request_id: u16,
    content_length: u16,
    padding_length: u8,
) -> Result<usize>
where
    W: Write + ?Sized,
{
    let header = serialize_header(record_type, request_id, content_length, padding_length);
    write_full(writer, &header)
}

/// Write a single record with no padding.
///
/// Content longer than 65535 octets fails with
/// [`FcgiError::ContentTooLarge`] before anything is written.
pub fn write_record<W>(writer: &mut W, record_type: u8, request_id: u16, content: &[u8]) -> Result<usize>
where
    W: Write + ?Sized,
{
    write_record_padded(writer, record_type, request_id, content, 0)
}

/// Write a single record followed by `padding_length` zero octets.
pub fn write_record_padded<W>(
    writer: &mut W,
    record_type: u8,
    request_id: u16,
    content: &[u8],
    padding_length: u8,
) -> Result<usize>
where
    W: Write + ?Sized,
{
    let (header, content) = build_record_parts(record_type, request_id, content, padding_length)?;
    let padding = &ZERO_PADDING[..padding_length as usize];
    write_full_vectored(writer, &[&header[..], content, padding])
}

/// Write `content` as a stream of records, optionally terminated.
///
/// Uses the default [`StreamConfig`]: 65535-octet chunks, no padding.
/// Empty content without `terminate` writes nothing.
pub fn write_stream<W>(
    writer: &mut W,
    record_type: u8,
    request_id: u16,
    content: &[u8],
    terminate: bool,
) -> Result<usize>
where
    W: Write + ?Sized,
{
    StreamWriter::new(record_type, request_id).write_stream(writer, content, terminate)
}

/// Writes one logical stream as a sequence of records.
///
/// Holds no connection and no buffered data; every call writes through to
/// the handle it is given. Chunks may be written across several calls and
/// the stream closed with [`StreamWriter::finish`].
#[derive(Debug, Clone, Copy)]
pub struct StreamWriter {
    record_type: u8,
    request_id: u16,
    config: StreamConfig,
}

impl StreamWriter {
    /// Create a stream writer with default configuration.
    pub fn new(record_type: u8, request_id: u16) -> Self {
        Self::with_config(record_type, request_id, StreamConfig::default())
    }

    /// Create a stream writer with custom configuration.
    pub fn with_config(record_type: u8, request_id: u16, config: StreamConfig) -> Self {
        let config = StreamConfig::default()
            .with_max_chunk_len(config.max_chunk_len)
            .with_padding(config.padding);
        Self {
            record_type,
            request_id,
            config,
        }
    }

    /// Get the record type.
    #[inline]
    pub fn record_type(&self) -> u8 {
        self.record_type
    }

    /// Get the request ID.
    #[inline]
    pub fn request_id(&self) -> u16 {
        self.request_id
    }

    /// Get the configuration.
    #[inline]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Write `content` as one or more records, without terminating.
    ///
    /// Returns total octets written. On failure the error reports the
    /// octets written by this call across all records so far.
    pub fn write<W>(&self, writer: &mut W, content: &[u8]) -> Result<usize>
    where
        W: Write + ?Sized,
    {
        let mut written = 0;
        let mut records = 0usize;

        for chunk in content.chunks(self.config.max_chunk_len) {
            let n = self
                .write_chunk(writer, chunk)
                .map_err(|e| with_progress(e, written))?;
            written += n;
            records += 1;
        }

        if records > 0 {
            tracing::debug!(
                record_type = self.record_type,
                request_id = self.request_id,
                records,
                octets = written,
                "stream chunks written"
            );
        }
        Ok(written)
    }

    /// Write the zero-length terminator record.
    pub fn finish<W>(&self, writer: &mut W) -> Result<usize>
    where
        W: Write + ?Sized,
    {
        tracing::trace!(
            record_type = self.record_type,
            request_id = self.request_id,
            "stream terminated"
        );
        self.write_chunk(writer, &[])
    }

    /// Write `content`, then the terminator if `terminate` is set.
    pub fn write_stream<W>(&self, writer: &mut W, content: &[u8], terminate: bool) -> Result<usize>
    where
        W: Write + ?Sized,
    {
        let mut written = self.write(writer, content)?;
        if terminate {
            let n = self
                .finish(writer)
                .map_err(|e| with_progress(e, written))?;
            written += n;
        }
        Ok(written)
    }

    fn write_chunk<W>(&self, writer: &mut W, chunk: &[u8]) -> Result<usize>
    where
        W: Write + ?Sized,
    {
        let padding = self.config.padding.for_content(chunk.len());
        write_record_padded(writer, self.record_type, self.request_id, chunk, padding)
    }
}

/// Add octets written by earlier records to an I/O error's progress count.
fn with_progress(err: FcgiError, earlier: usize) -> FcgiError {
    match err {
        FcgiError::Io {
            source,
            transferred,
        } => FcgiError::Io {
            source,
            transferred: earlier + transferred,
        },
        other => other,
    }
}
