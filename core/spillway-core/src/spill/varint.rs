//! LEB128 variable-length integers.
//!
//! Unsigned values use plain LEB128 (7 bits per byte, low group first, high
//! bit set on every byte but the last). Signed values are zigzag-mapped
//! first, so small negative numbers stay short.

use crate::error::{SpillwayError, SpillwayResult};
use std::io::{self, Read, Write};

/// Longest LEB128 encoding of a `u64`.
const MAX_VARINT_LEN: usize = 10;

#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

pub fn write_var_uint<W: Write + ?Sized>(mut value: u64, out: &mut W) -> io::Result<()> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut len = 0;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf[len] = byte;
            len += 1;
            break;
        }
        buf[len] = byte | 0x80;
        len += 1;
    }
    out.write_all(&buf[..len])
}

pub fn write_var_int<W: Write + ?Sized>(value: i64, out: &mut W) -> io::Result<()> {
    write_var_uint(zigzag_encode(value), out)
}

/// Read an unsigned varint, or `None` if the input ends before its first byte.
///
/// Running out of input in the middle of a value is a decode error.
pub fn try_read_var_uint<R: Read + ?Sized>(input: &mut R) -> SpillwayResult<Option<u64>> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let mut byte = [0u8; 1];
        match input.read_exact(&mut byte) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                if i == 0 {
                    return Ok(None);
                }
                return Err(SpillwayError::Decode(
                    "unexpected end of input inside varint".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }
        // The tenth byte carries only bit 63.
        if i == MAX_VARINT_LEN - 1 && byte[0] > 0x01 {
            return Err(SpillwayError::Decode("varint overflows 64 bits".to_string()));
        }
        value |= u64::from(byte[0] & 0x7f) << (7 * i);
        if byte[0] & 0x80 == 0 {
            return Ok(Some(value));
        }
    }
    Err(SpillwayError::Decode("varint longer than 10 bytes".to_string()))
}

pub fn read_var_uint<R: Read + ?Sized>(input: &mut R) -> SpillwayResult<u64> {
    try_read_var_uint(input)?
        .ok_or_else(|| SpillwayError::Decode("unexpected end of input, expected varint".to_string()))
}

pub fn read_var_int<R: Read + ?Sized>(input: &mut R) -> SpillwayResult<i64> {
    read_var_uint(input).map(zigzag_decode)
}
