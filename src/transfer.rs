//! Reliable transfer over blocking byte streams.
//!
//! Every function here loops the underlying `read`/`write` calls until the
//! whole request has been moved, the peer has gone away, or a non-transient
//! error occurs. Calls interrupted by a signal (`ErrorKind::Interrupted`) are
//! retried in place.
//!
//! # End-of-input classification
//!
//! ```text
//! octets received before EOF    result
//! ─────────────────────────     ──────────────────────────
//! 0                             Ok(None)   (clean EOF)
//! 1 ..= n-1                     Err(TruncatedMessage)
//! n                             Ok(Some(..))
//! ```
//!
//! Partial data is never returned to the caller.

use std::io::{self, IoSlice, Read, Write};

use bytes::{Bytes, BytesMut};

use crate::error::{FcgiError, Result};

/// Outcome of filling a buffer from a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The buffer was filled completely.
    Complete,
    /// The reader was already at end-of-input; nothing was read.
    Eof,
}

/// Fill `buf` completely from `reader`.
///
/// Returns [`Fill::Eof`] if the very first read reports end-of-input, and
/// [`FcgiError::TruncatedMessage`] if end-of-input arrives after some but
/// not all of `buf` was filled. An empty `buf` is always `Complete`.
pub fn read_full_into<R>(reader: &mut R, buf: &mut [u8]) -> Result<Fill>
where
    R: Read + ?Sized,
{
    let expected = buf.len();
    let mut filled = 0;

    while filled < expected {
        match read_step(reader.read(&mut buf[filled..]), filled, expected) {
            ReadStep::Advance(n) => filled += n,
            ReadStep::Retry => {}
            ReadStep::Finish(outcome) => return outcome,
        }
    }

    Ok(Fill::Complete)
}

/// What a fill loop does with the outcome of one `read` call.
pub(crate) enum ReadStep {
    /// `n` more octets landed in the buffer.
    Advance(usize),
    /// The call was interrupted; issue it again.
    Retry,
    /// The fill is over, with this outcome.
    Finish(Result<Fill>),
}

/// Classify one `read` result for a fill of `expected` octets that has
/// `filled` octets so far. Shared by the blocking and async fill loops.
pub(crate) fn read_step(result: io::Result<usize>, filled: usize, expected: usize) -> ReadStep {
    match result {
        Ok(0) if filled == 0 => {
            tracing::trace!(expected, "clean end of input");
            ReadStep::Finish(Ok(Fill::Eof))
        }
        Ok(0) => {
            tracing::debug!(expected, received = filled, "peer closed mid-message");
            ReadStep::Finish(Err(FcgiError::TruncatedMessage {
                expected,
                received: filled,
            }))
        }
        Ok(n) => ReadStep::Advance(n),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => {
            tracing::trace!(filled, "read interrupted, retrying");
            ReadStep::Retry
        }
        Err(e) => ReadStep::Finish(Err(FcgiError::io(e, filled))),
    }
}

/// Read exactly `n` octets.
///
/// Returns `Ok(None)` on clean end-of-input; see [`read_full_into`].
pub fn read_full<R>(reader: &mut R, n: usize) -> Result<Option<Bytes>>
where
    R: Read + ?Sized,
{
    let mut buf = BytesMut::zeroed(n);
    match read_full_into(reader, &mut buf)? {
        Fill::Complete => Ok(Some(buf.freeze())),
        Fill::Eof => Ok(None),
    }
}

/// Fill `buf` completely, treating any end-of-input as truncation.
///
/// Used for blocks that sit strictly inside a record, where even a clean
/// EOF at the start of the block means the record was cut short.
pub fn read_exact_within<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: Read + ?Sized,
{
    match read_full_into(reader, buf)? {
        Fill::Complete => Ok(()),
        Fill::Eof => Err(FcgiError::TruncatedMessage {
            expected: buf.len(),
            received: 0,
        }),
    }
}

/// Read and discard exactly `n` octets inside a record.
pub fn skip_within<R>(reader: &mut R, n: usize) -> Result<()>
where
    R: Read + ?Sized,
{
    let mut scratch = [0u8; 256];
    let mut remaining = n;
    while remaining > 0 {
        let step = remaining.min(scratch.len());
        read_exact_within(reader, &mut scratch[..step]).map_err(|e| match e {
            FcgiError::TruncatedMessage { received, .. } => FcgiError::TruncatedMessage {
                expected: n,
                received: n - remaining + received,
            },
            other => other,
        })?;
        remaining -= step;
    }
    Ok(())
}

/// Write all of `buf`, then flush.
///
/// Short writes continue from the unwritten offset. On failure the error
/// carries the number of octets confirmed so far.
pub fn write_full<W>(writer: &mut W, buf: &[u8]) -> Result<usize>
where
    W: Write + ?Sized,
{
    let mut written = 0;

    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) => return Err(write_zero(written)),
            Ok(n) => {
                written += n;
                if written < buf.len() {
                    tracing::trace!(written, total = buf.len(), "short write, continuing");
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                tracing::trace!(written, "write interrupted, retrying");
            }
            Err(e) => return Err(FcgiError::io(e, written)),
        }
    }

    flush(writer, written)?;
    Ok(written)
}

/// Write all `parts` back to back using scatter/gather I/O, then flush.
///
/// Behaves like [`write_full`] over the concatenation of `parts` without
/// building that concatenation.
pub fn write_full_vectored<W>(writer: &mut W, parts: &[&[u8]]) -> Result<usize>
where
    W: Write + ?Sized,
{
    let total: usize = parts.iter().map(|p| p.len()).sum();
    let mut written = 0;

    while written < total {
        let slices = remaining_slices(parts, written);
        match writer.write_vectored(&slices) {
            Ok(0) => return Err(write_zero(written)),
            Ok(n) => {
                written += n;
                if written < total {
                    tracing::trace!(written, total, "short vectored write, continuing");
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                tracing::trace!(written, "vectored write interrupted, retrying");
            }
            Err(e) => return Err(FcgiError::io(e, written)),
        }
    }

    flush(writer, written)?;
    Ok(written)
}

/// Build IoSlice array for the data left after `skip_bytes` were written.
pub(crate) fn remaining_slices<'a>(parts: &[&'a [u8]], skip_bytes: usize) -> Vec<IoSlice<'a>> {
    let mut slices = Vec::with_capacity(parts.len());
    let mut start = 0;

    for part in parts {
        let end = start + part.len();
        if skip_bytes < end && !part.is_empty() {
            let offset = skip_bytes.saturating_sub(start);
            slices.push(IoSlice::new(&part[offset..]));
        }
        start = end;
    }

    slices
}

fn flush<W>(writer: &mut W, written: usize) -> Result<()>
where
    W: Write + ?Sized,
{
    loop {
        match writer.flush() {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FcgiError::io(e, written)),
        }
    }
}

pub(crate) fn write_zero(written: usize) -> FcgiError {
    FcgiError::io(
        io::Error::new(io::ErrorKind::WriteZero, "write returned 0"),
        written,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// Reader that replays a script of read outcomes.
    struct ScriptedReader {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedReader {
        fn new(steps: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.steps.push_front(Ok(chunk.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    /// Writer that accepts at most `max_per_call` bytes and fails on cue.
    struct ScriptedWriter {
        data: Vec<u8>,
        max_per_call: usize,
        failures: VecDeque<Option<io::Error>>,
    }

    impl ScriptedWriter {
        fn new(max_per_call: usize, failures: Vec<Option<io::Error>>) -> Self {
            Self {
                data: Vec::new(),
                max_per_call,
                failures: failures.into(),
            }
        }
    }

    impl Write for ScriptedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Some(Some(e)) = self.failures.pop_front() {
                return Err(e);
            }
            let n = buf.len().min(self.max_per_call);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn interrupted() -> io::Error {
        io::Error::from(io::ErrorKind::Interrupted)
    }

    #[test]
    fn test_read_full_complete() {
        let mut reader = Cursor::new(b"abcdefgh".to_vec());
        let data = read_full(&mut reader, 8).unwrap().unwrap();
        assert_eq!(&data[..], b"abcdefgh");
    }

    #[test]
    fn test_read_full_clean_eof() {
        let mut reader = Cursor::new(Vec::new());
        assert!(read_full(&mut reader, 8).unwrap().is_none());
    }

    #[test]
    fn test_read_full_zero_length_reads_nothing() {
        let mut reader = ScriptedReader::new(vec![Err(io::Error::from(io::ErrorKind::Other))]);
        let data = read_full(&mut reader, 0).unwrap().unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_read_full_truncated() {
        for received in 1..8 {
            let mut reader = Cursor::new(vec![7u8; received]);
            match read_full(&mut reader, 8) {
                Err(FcgiError::TruncatedMessage {
                    expected,
                    received: got,
                }) => {
                    assert_eq!(expected, 8);
                    assert_eq!(got, received);
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn test_read_full_accumulates_short_reads() {
        let mut reader = ScriptedReader::new(vec![
            Ok(b"ab".to_vec()),
            Ok(b"c".to_vec()),
            Ok(b"defgh".to_vec()),
        ]);
        let data = read_full(&mut reader, 8).unwrap().unwrap();
        assert_eq!(&data[..], b"abcdefgh");
    }

    #[test]
    fn test_read_full_retries_interrupted() {
        let mut plain = ScriptedReader::new(vec![Ok(b"abcd".to_vec()), Ok(b"efgh".to_vec())]);
        let mut noisy = ScriptedReader::new(vec![
            Err(interrupted()),
            Ok(b"abcd".to_vec()),
            Err(interrupted()),
            Ok(b"efgh".to_vec()),
        ]);

        let expected = read_full(&mut plain, 8).unwrap();
        assert_eq!(read_full(&mut noisy, 8).unwrap(), expected);
    }

    #[test]
    fn test_read_full_interrupted_then_eof_is_clean() {
        let mut reader = ScriptedReader::new(vec![Err(interrupted())]);
        assert!(read_full(&mut reader, 8).unwrap().is_none());
    }

    #[test]
    fn test_read_full_io_error_discards_partial() {
        let mut reader = ScriptedReader::new(vec![
            Ok(b"abc".to_vec()),
            Err(io::Error::from_raw_os_error(libc::ECONNRESET)),
        ]);
        match read_full(&mut reader, 8) {
            Err(err @ FcgiError::Io { .. }) => {
                assert_eq!(err.raw_os_error(), Some(libc::ECONNRESET));
                assert!(matches!(err, FcgiError::Io { transferred: 3, .. }));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_read_exact_within_eof_is_truncation() {
        let mut reader = Cursor::new(Vec::new());
        let mut buf = [0u8; 4];
        assert!(matches!(
            read_exact_within(&mut reader, &mut buf),
            Err(FcgiError::TruncatedMessage { expected: 4, received: 0 })
        ));
    }

    #[test]
    fn test_skip_within() {
        let mut reader = Cursor::new(vec![0u8; 300]);
        skip_within(&mut reader, 300).unwrap();
        assert_eq!(reader.position(), 300);

        let mut short = Cursor::new(vec![0u8; 270]);
        assert!(matches!(
            skip_within(&mut short, 300),
            Err(FcgiError::TruncatedMessage { expected: 300, received: 270 })
        ));
    }

    #[test]
    fn test_write_full_short_writes() {
        let mut writer = ScriptedWriter::new(3, vec![]);
        let written = write_full(&mut writer, b"hello world").unwrap();
        assert_eq!(written, 11);
        assert_eq!(writer.data, b"hello world");
    }

    #[test]
    fn test_write_full_retries_interrupted() {
        let mut writer = ScriptedWriter::new(4, vec![Some(interrupted()), None, Some(interrupted())]);
        let written = write_full(&mut writer, b"hello world").unwrap();
        assert_eq!(written, 11);
        assert_eq!(writer.data, b"hello world");
    }

    #[test]
    fn test_write_full_error_reports_progress() {
        let mut writer = ScriptedWriter::new(
            4,
            vec![None, None, Some(io::Error::from_raw_os_error(libc::EPIPE))],
        );
        match write_full(&mut writer, b"hello world") {
            Err(FcgiError::Io {
                source,
                transferred,
            }) => {
                assert_eq!(transferred, 8);
                assert_eq!(source.raw_os_error(), Some(libc::EPIPE));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_write_full_zero_is_error() {
        let mut writer = ScriptedWriter::new(0, vec![]);
        match write_full(&mut writer, b"x") {
            Err(FcgiError::Io { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::WriteZero)
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_write_full_empty_buffer() {
        let mut writer = ScriptedWriter::new(0, vec![]);
        assert_eq!(write_full(&mut writer, b"").unwrap(), 0);
    }

    #[test]
    fn test_write_full_vectored_concatenates() {
        let mut writer = ScriptedWriter::new(5, vec![Some(interrupted())]);
        let parts: [&[u8]; 4] = [b"header!!", b"", b"content", b"\0\0"];
        let written = write_full_vectored(&mut writer, &parts).unwrap();
        assert_eq!(written, 17);
        assert_eq!(writer.data, b"header!!content\0\0");
    }

    const PARTS: [&[u8]; 2] = [b"abcdefgh", b"hello"];

    #[test]
    fn test_remaining_slices_no_skip() {
        let slices = remaining_slices(&PARTS, 0);
        assert_eq!(slices.len(), 2);
    }

    #[test]
    fn test_remaining_slices_partial_first() {
        let slices = remaining_slices(&PARTS, 5);
        assert_eq!(slices.len(), 2);
        assert_eq!(&*slices[0], b"fgh");
        assert_eq!(&*slices[1], b"hello");
    }

    #[test]
    fn test_remaining_slices_skip_first() {
        let slices = remaining_slices(&PARTS, 9);
        assert_eq!(slices.len(), 1);
        assert_eq!(&*slices[0], b"ello");
    }
}
