//! Low-level integer helpers: byte-order aware fixed-width reads and writes,
//! two's-complement correction and bit masks.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::value::Endian;

/// Reads all of `data` (1..=8 bytes) as an unsigned integer.
pub fn read_uint(data: &[u8], endian: Endian) -> u64 {
    match endian {
        Endian::Little => LittleEndian::read_uint(data, data.len()),
        Endian::Big => BigEndian::read_uint(data, data.len()),
    }
}

/// Writes `value` into all of `out` (1..=8 bytes). The caller checks that it fits.
pub fn write_uint(out: &mut [u8], value: u64, endian: Endian) {
    let nbytes = out.len();
    match endian {
        Endian::Little => LittleEndian::write_uint(out, value, nbytes),
        Endian::Big => BigEndian::write_uint(out, value, nbytes),
    }
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
///
/// Equivalent to subtracting `2^bits` when bit `bits - 1` is set.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Mask with the low `bits` bits set.
pub fn low_mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

/// Extracts `len` bits starting `offset` bits above the LSB.
pub fn extract_bits(value: u64, offset: u32, len: u32) -> u64 {
    if offset >= 64 {
        return 0;
    }

    (value >> offset) & low_mask(len)
}

/// True if `value` is representable as an unsigned integer of `width` bytes.
pub fn fits_unsigned(value: u64, width: usize) -> bool {
    width >= 8 || value <= low_mask(width as u32 * 8)
}

/// True if `value` is representable in two's complement with `width` bytes.
pub fn fits_signed(value: i64, width: usize) -> bool {
    if width >= 8 {
        return true;
    }

    let bits = width as u32 * 8;
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;

    (min..=max).contains(&value)
}
