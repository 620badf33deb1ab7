//! Protocol module - header and record codecs.
//!
//! This module implements the pure, I/O-free half of the layer:
//! - 8-byte header encoding/decoding
//! - Record composition with content and padding

mod record;
mod wire_format;

pub use record::{
    build_record_parts, padding_for, parse_record, serialize_record, serialize_record_padded,
    Record, MAX_ALIGNMENT,
};
pub use wire_format::{
    content_length_for, parse_header, serialize_header, Header, FCGI_VERSION_1, HEADER_SIZE,
    MAX_CONTENT_LENGTH, MAX_PADDING_LENGTH,
};
