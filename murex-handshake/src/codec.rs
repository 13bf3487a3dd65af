//! Byte-level wire codec shared by all layers.
//!
//! All multi-byte integers are little-endian. Enum discriminants and other
//! small unsigned values use a variable-length encoding: values `0..=250`
//! occupy a single byte; larger values are written as the sentinel byte
//! `0xFB` followed by a 4-byte little-endian `u32`. The remaining sentinel
//! bytes (`0xFC`/`0xFD`/`0xFE` for 2/4/8-byte forms) are accepted on read
//! for forward compatibility but never produced.
//!
//! Strings and sequences carry a `u64` little-endian length prefix. Options
//! carry a one-byte presence tag. UTC timestamps are a `{ secs: i64,
//! nsecs: u32 }` record measured from the Unix epoch.
//!
//! The decoder never reads past its input and never allocates more than the
//! remaining input could justify, so adversarial lengths fail before memory
//! is committed.

use chrono::{DateTime, Utc};

use crate::error::CodecError;

/// Largest value encoded inline as a single varint byte.
pub const VARINT_INLINE_MAX: u8 = 250;
/// Sentinel prefix for the 4-byte `u32` varint form (the only form written).
pub const VARINT_U32_SENTINEL: u8 = 0xFB;

const SENTINEL_2_BYTE: u8 = 0xFC;
const SENTINEL_4_BYTE: u8 = 0xFD;
const SENTINEL_8_BYTE: u8 = 0xFE;

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Append-only encoder producing wire-format bytes.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes encoded so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been encoded yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// View the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the encoder, yielding the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Encode a `u32` in the variable-length form.
    ///
    /// Values `0..=250` occupy one byte; anything larger is the `0xFB`
    /// sentinel followed by the 4-byte little-endian value.
    pub fn put_varint_u32(&mut self, value: u32) {
        if value <= u32::from(VARINT_INLINE_MAX) {
            self.buf.push(value as u8);
        } else {
            self.buf.push(VARINT_U32_SENTINEL);
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
    }

    /// Encode a string as a `u64` length prefix followed by UTF-8 bytes.
    pub fn put_str(&mut self, value: &str) {
        self.put_u64(value.len() as u64);
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Encode an option presence tag (`0` = absent, `1` = present).
    ///
    /// When present, the caller encodes the value immediately after.
    pub fn put_option_tag(&mut self, present: bool) {
        self.buf.push(u8::from(present));
    }

    /// Encode an optional string.
    pub fn put_option_str(&mut self, value: Option<&str>) {
        match value {
            Some(s) => {
                self.put_option_tag(true);
                self.put_str(s);
            }
            None => self.put_option_tag(false),
        }
    }

    /// Encode a sequence length prefix. Elements follow, concatenated.
    pub fn put_seq_len(&mut self, len: usize) {
        self.put_u64(len as u64);
    }

    /// Encode a UTC timestamp as `secs: i64` then `nsecs: u32`.
    pub fn put_datetime(&mut self, value: &DateTime<Utc>) {
        self.put_i64(value.timestamp());
        // chrono represents a leap second as nsecs >= 1e9; clamp to the
        // last representable nanosecond of the preceding second.
        self.put_u32(
            value
                .timestamp_subsec_nanos()
                .min(NANOS_PER_SECOND - 1),
        );
    }
}

/// Bounds-checked decoder over wire-format bytes.
#[derive(Debug)]
pub struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Create a decoder over `input`.
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Number of undecoded bytes left.
    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    /// Whether all input has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if len > self.remaining() {
            return Err(CodecError::UnexpectedEnd);
        }
        let bytes = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(self.take(N)?);
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    /// Decode a variable-length `u32`.
    ///
    /// Accepts the inline and `0xFB` forms this codec writes, plus the
    /// `0xFC`/`0xFD`/`0xFE` wide forms for forward compatibility. Wide
    /// values that do not fit a `u32` are rejected with `ValueOutOfRange`;
    /// the 16-byte `0xFF` form is rejected as `InvalidVarint`.
    pub fn read_varint_u32(&mut self) -> Result<u32, CodecError> {
        let first = self.read_u8()?;
        match first {
            0..=VARINT_INLINE_MAX => Ok(u32::from(first)),
            VARINT_U32_SENTINEL => self.read_u32(),
            SENTINEL_2_BYTE => Ok(u32::from(self.read_u16()?)),
            SENTINEL_4_BYTE => self.read_u32(),
            SENTINEL_8_BYTE => {
                u32::try_from(self.read_u64()?).map_err(|_| CodecError::ValueOutOfRange)
            }
            other => Err(CodecError::InvalidVarint(other)),
        }
    }

    /// Decode a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<String, CodecError> {
        let len = self.read_length()?;
        let bytes = self.take(len)?;
        core::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    /// Decode an option presence tag.
    pub fn read_option_tag(&mut self) -> Result<bool, CodecError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(CodecError::InvalidOptionTag(tag)),
        }
    }

    /// Decode an optional string.
    pub fn read_option_str(&mut self) -> Result<Option<String>, CodecError> {
        if self.read_option_tag()? {
            Ok(Some(self.read_str()?))
        } else {
            Ok(None)
        }
    }

    /// Decode a sequence length prefix.
    ///
    /// Every element occupies at least one byte, so a declared count larger
    /// than the remaining input is rejected before any element is decoded.
    pub fn read_seq_len(&mut self) -> Result<usize, CodecError> {
        let len = self.read_u64()?;
        if len > self.remaining() as u64 {
            return Err(CodecError::LengthOverflow);
        }
        Ok(len as usize)
    }

    /// Decode a UTC timestamp.
    pub fn read_datetime(&mut self) -> Result<DateTime<Utc>, CodecError> {
        let secs = self.read_i64()?;
        let nsecs = self.read_u32()?;
        if nsecs >= NANOS_PER_SECOND {
            return Err(CodecError::InvalidTimestamp);
        }
        DateTime::<Utc>::from_timestamp(secs, nsecs).ok_or(CodecError::InvalidTimestamp)
    }

    /// Read a `u64` length prefix, bounded by the remaining input.
    fn read_length(&mut self) -> Result<usize, CodecError> {
        let len = self.read_u64()?;
        if len > self.remaining() as u64 {
            return Err(CodecError::UnexpectedEnd);
        }
        // Fits: remaining() is a usize.
        Ok(len as usize)
    }
}
