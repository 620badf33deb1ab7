//! # fcgi-wire
//!
//! FastCGI record framing and reliable transfer over connected byte streams.
//!
//! This crate reads and writes FastCGI records over a handle the caller has
//! already opened and connected (typically a socket). It owns no connection
//! and keeps no state between calls.
//!
//! ## Architecture
//!
//! - **Codecs** ([`protocol`]): 8-byte header and record encoding, no I/O
//! - **Transfer** ([`transfer`]): loop-until-complete reads and writes that
//!   retry on signal interruption and tell clean EOF from truncation
//! - **Records** ([`reader`], [`writer`]): header/record/stream operations
//! - **Readiness** ([`poll`]): bounded-wait readable/writable checks
//!
//! Bounded-wait I/O is built by composing the two: check [`can_read`] with a
//! timeout, then call [`read_record`].
//!
//! ## Example
//!
//! ```
//! use std::os::unix::net::UnixStream;
//! use std::time::Duration;
//! use fcgi_wire::{can_read, read_record, write_stream};
//!
//! let (mut app, mut server) = UnixStream::pair().unwrap();
//!
//! write_stream(&mut app, 6, 1, b"Content-Type: text/plain\r\n\r\nhi", true).unwrap();
//!
//! assert!(can_read(&server, Some(Duration::from_secs(1))).unwrap());
//! let record = read_record(&mut server).unwrap().unwrap();
//! assert_eq!(record.content(), b"Content-Type: text/plain\r\n\r\nhi");
//!
//! let terminator = read_record(&mut server).unwrap().unwrap();
//! assert!(terminator.is_terminator());
//! ```

pub mod error;
pub mod protocol;
pub mod reader;
pub mod transfer;
pub mod writer;

#[cfg(unix)]
pub mod poll;

#[cfg(feature = "tokio")]
pub mod asyncio;

pub use error::{FcgiError, Result};
pub use protocol::{parse_header, parse_record, serialize_header, serialize_record, Header, Record};
pub use reader::{read_header, read_record, read_stream};
pub use transfer::{read_full, write_full};
pub use writer::{
    write_header, write_record, write_record_padded, write_stream, Padding, StreamConfig,
    StreamWriter,
};

#[cfg(unix)]
pub use poll::{can_read, can_write};
#[cfg(unix)]
pub use reader::read_record_timeout;
