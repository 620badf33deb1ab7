//! Async record I/O over tokio streams.
//!
//! Mirrors the blocking operations in [`crate::reader`] and
//! [`crate::writer`] for `tokio::io::AsyncRead`/`AsyncWrite` handles, with
//! the same end-of-input classification and error type. Partial reads and
//! writes are resumed exactly as in the blocking transfer loops.
//!
//! # Example
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> fcgi_wire::Result<()> {
//! use fcgi_wire::asyncio::{read_record, write_record};
//!
//! let (mut client, mut server) = tokio::io::duplex(1024);
//! write_record(&mut client, 6, 1, b"hello").await?;
//!
//! let record = read_record(&mut server).await?.unwrap();
//! assert_eq!(record.content(), b"hello");
//! # Ok(())
//! # }
//! ```

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{FcgiError, Result};
use crate::protocol::{build_record_parts, Header, Record, HEADER_SIZE, MAX_PADDING_LENGTH};
use crate::transfer::{read_step, remaining_slices, write_zero, Fill, ReadStep};
use crate::writer::StreamConfig;

/// Fill `buf` completely; see [`crate::transfer::read_full_into`].
pub async fn read_full_into<R>(reader: &mut R, buf: &mut [u8]) -> Result<Fill>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let expected = buf.len();
    let mut filled = 0;

    while filled < expected {
        match read_step(reader.read(&mut buf[filled..]).await, filled, expected) {
            ReadStep::Advance(n) => filled += n,
            ReadStep::Retry => {}
            ReadStep::Finish(outcome) => return outcome,
        }
    }

    Ok(Fill::Complete)
}

async fn read_exact_within<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match read_full_into(reader, buf).await? {
        Fill::Complete => Ok(()),
        Fill::Eof => Err(FcgiError::TruncatedMessage {
            expected: buf.len(),
            received: 0,
        }),
    }
}

/// Read and decode one header.
pub async fn read_header<R>(reader: &mut R) -> Result<Option<Header>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; HEADER_SIZE];
    match read_full_into(reader, &mut buf).await? {
        Fill::Eof => Ok(None),
        Fill::Complete => Header::decode(&buf).map(Some),
    }
}

/// Read one complete record, discarding its padding.
pub async fn read_record<R>(reader: &mut R) -> Result<Option<Record>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let Some(header) = read_header(reader).await? else {
        return Ok(None);
    };

    let mut content = BytesMut::zeroed(header.content_length as usize);
    read_exact_within(reader, &mut content).await?;

    let mut padding = [0u8; MAX_PADDING_LENGTH];
    read_exact_within(reader, &mut padding[..header.padding_length as usize]).await?;

    Ok(Some(Record::new(header, content.freeze())))
}

/// Write all `parts` back to back, then flush.
///
/// Uses `write_vectored` and resumes from the exact unwritten offset after
/// short writes.
pub async fn write_full_vectored<W>(writer: &mut W, parts: &[&[u8]]) -> Result<usize>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let total: usize = parts.iter().map(|p| p.len()).sum();
    let mut written = 0;

    while written < total {
        let slices = remaining_slices(parts, written);
        match writer.write_vectored(&slices).await {
            Ok(0) => return Err(write_zero(written)),
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FcgiError::io(e, written)),
        }
    }

    writer
        .flush()
        .await
        .map_err(|e| FcgiError::io(e, written))?;
    Ok(written)
}

/// Write a single record followed by `padding_length` zero octets.
pub async fn write_record_padded<W>(
    writer: &mut W,
    record_type: u8,
    request_id: u16,
    content: &[u8],
    padding_length: u8,
) -> Result<usize>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let (header, content) = build_record_parts(record_type, request_id, content, padding_length)?;
    let padding = [0u8; MAX_PADDING_LENGTH];
    write_full_vectored(
        writer,
        &[&header[..], content, &padding[..padding_length as usize]],
    )
    .await
}

/// Write a single record with no padding.
pub async fn write_record<W>(
    writer: &mut W,
    record_type: u8,
    request_id: u16,
    content: &[u8],
) -> Result<usize>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    write_record_padded(writer, record_type, request_id, content, 0).await
}

/// Write `content` as a stream of records with the given configuration,
/// then the terminator if `terminate` is set.
pub async fn write_stream_with<W>(
    writer: &mut W,
    record_type: u8,
    request_id: u16,
    content: &[u8],
    terminate: bool,
    config: StreamConfig,
) -> Result<usize>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let config = StreamConfig::default()
        .with_max_chunk_len(config.max_chunk_len)
        .with_padding(config.padding);
    let mut written = 0;

    let mut chunks: Vec<&[u8]> = content.chunks(config.max_chunk_len).collect();
    if terminate {
        chunks.push(&[]);
    }

    for chunk in chunks {
        let padding = config.padding.for_content(chunk.len());
        match write_record_padded(writer, record_type, request_id, chunk, padding).await {
            Ok(n) => written += n,
            Err(FcgiError::Io {
                source,
                transferred,
            }) => {
                return Err(FcgiError::Io {
                    source,
                    transferred: written + transferred,
                })
            }
            Err(e) => return Err(e),
        }
    }

    Ok(written)
}

/// Write `content` as a stream of records using the default configuration.
pub async fn write_stream<W>(
    writer: &mut W,
    record_type: u8,
    request_id: u16,
    content: &[u8],
    terminate: bool,
) -> Result<usize>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    write_stream_with(
        writer,
        record_type,
        request_id,
        content,
        terminate,
        StreamConfig::default(),
    )
    .await
}
