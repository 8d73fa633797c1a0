//! Encoders writing scalar values as UTF-8, UTF-16 or UTF-32 bytes
//!
//! Each encoder accepts any iterator of scalar values and replaces invalid
//! ones with the family's replacement scalar before writing, so surrogates
//! and values past U+10FFFF never reach the output.

use crate::scalar::sanitize;
use crate::{Encoding, Endianness, Family};

/// Encode `scalars` in `target`, optionally prefixed with its BOM
///
/// `UTF16` and `UTF32` are written big-endian.
pub fn encode<I>(scalars: I, target: Encoding, add_bom: bool) -> Vec<u8>
where
    I: IntoIterator<Item = u32>,
{
    match target.family() {
        Family::Utf8 => encode_utf8(scalars, add_bom),
        Family::Utf16 => encode_utf16(scalars, target.output_endianness(), add_bom),
        Family::Utf32 => encode_utf32(scalars, target.output_endianness(), add_bom),
    }
}

fn with_capacity<I: Iterator>(scalars: &I, unit: usize, bom: &[u8], add_bom: bool) -> Vec<u8> {
    let (lower, _) = scalars.size_hint();
    let mut output = Vec::with_capacity(lower.saturating_mul(unit) + bom.len());
    if add_bom {
        output.extend_from_slice(bom);
    }
    output
}

/// Encode scalar values as UTF-8
pub fn encode_utf8<I>(scalars: I, add_bom: bool) -> Vec<u8>
where
    I: IntoIterator<Item = u32>,
{
    let scalars = scalars.into_iter();
    let mut output = with_capacity(&scalars, 1, Encoding::UTF8.bom(), add_bom);

    for value in scalars {
        push_utf8(&mut output, sanitize(value, Family::Utf8));
    }

    output
}

/// Append one valid scalar value in the UTF-8 layout
#[inline]
fn push_utf8(output: &mut Vec<u8>, value: u32) {
    if value < 0x80 {
        output.push(value as u8);
    } else if value < 0x800 {
        output.extend_from_slice(&[0xC0 | (value >> 6) as u8, continuation(value)]);
    } else if value < 0x10000 {
        output.extend_from_slice(&[
            0xE0 | (value >> 12) as u8,
            continuation(value >> 6),
            continuation(value),
        ]);
    } else {
        output.extend_from_slice(&[
            0xF0 | (value >> 18) as u8,
            continuation(value >> 12),
            continuation(value >> 6),
            continuation(value),
        ]);
    }
}

/// Low six bits of `bits` behind the `10` continuation prefix
#[inline]
fn continuation(bits: u32) -> u8 {
    0x80 | (bits & 0x3F) as u8
}

/// Encode scalar values as UTF-16 in the given byte order
///
/// Values above U+FFFF are split into a surrogate pair.
pub fn encode_utf16<I>(scalars: I, endianness: Endianness, add_bom: bool) -> Vec<u8>
where
    I: IntoIterator<Item = u32>,
{
    let scalars = scalars.into_iter();
    let mut output = with_capacity(&scalars, 2, Family::Utf16.bom(endianness), add_bom);

    for value in scalars {
        let value = sanitize(value, Family::Utf16);
        if value < 0x10000 {
            push_u16(&mut output, value as u16, endianness);
        } else {
            let offset = value - 0x10000;
            push_u16(&mut output, 0xD800 + (offset >> 10) as u16, endianness);
            push_u16(&mut output, 0xDC00 + (offset & 0x3FF) as u16, endianness);
        }
    }

    output
}

#[inline]
fn push_u16(output: &mut Vec<u8>, unit: u16, endianness: Endianness) {
    match endianness {
        Endianness::Little => output.extend_from_slice(&unit.to_le_bytes()),
        Endianness::Big => output.extend_from_slice(&unit.to_be_bytes()),
    }
}

/// Encode scalar values as UTF-32 in the given byte order
pub fn encode_utf32<I>(scalars: I, endianness: Endianness, add_bom: bool) -> Vec<u8>
where
    I: IntoIterator<Item = u32>,
{
    let scalars = scalars.into_iter();
    let mut output = with_capacity(&scalars, 4, Family::Utf32.bom(endianness), add_bom);

    for value in scalars {
        let value = sanitize(value, Family::Utf32);
        match endianness {
            Endianness::Little => output.extend_from_slice(&value.to_le_bytes()),
            Endianness::Big => output.extend_from_slice(&value.to_be_bytes()),
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARIES: [(u32, &[u8]); 9] = [
        (0x7F, &[0x7F]),
        (0x80, &[0xC2, 0x80]),
        (0x7FF, &[0xDF, 0xBF]),
        (0x800, &[0xE0, 0xA0, 0x80]),
        (0xD7FF, &[0xED, 0x9F, 0xBF]),
        (0xE000, &[0xEE, 0x80, 0x80]),
        (0xFFFF, &[0xEF, 0xBF, 0xBF]),
        (0x10000, &[0xF0, 0x90, 0x80, 0x80]),
        (0x10FFFF, &[0xF4, 0x8F, 0xBF, 0xBF]),
    ];

    #[test]
    fn test_utf8_boundaries() {
        for (value, expected) in BOUNDARIES {
            assert_eq!(encode_utf8([value], false), expected, "U+{value:04X}");
            assert_eq!(
                encode_utf8([value], false),
                char::from_u32(value).unwrap().to_string().into_bytes()
            );
        }
    }

    #[test]
    fn test_utf32_boundaries() {
        for (value, _) in BOUNDARIES {
            assert_eq!(encode_utf32([value], Endianness::Big, false), value.to_be_bytes());
            assert_eq!(encode_utf32([value], Endianness::Little, false), value.to_le_bytes());
        }
        assert_eq!(
            encode_utf32([0x10FFFF], Endianness::Big, false),
            [0x00, 0x10, 0xFF, 0xFF]
        );
        assert_eq!(
            encode_utf32([0xD7FF], Endianness::Little, false),
            [0xFF, 0xD7, 0x00, 0x00]
        );
    }

    #[test]
    fn test_utf16_surrogate_pairs() {
        assert_eq!(
            encode_utf16([0x10000], Endianness::Little, false),
            [0x00, 0xD8, 0x00, 0xDC]
        );
        assert_eq!(
            encode_utf16([0x10FFFF], Endianness::Little, false),
            [0xFF, 0xDB, 0xFF, 0xDF]
        );
        assert_eq!(
            encode_utf16([0x1F600], Endianness::Big, false),
            [0xD8, 0x3D, 0xDE, 0x00]
        );
        assert_eq!(encode_utf16([0xFFFF], Endianness::Big, false), [0xFF, 0xFF]);
    }

    #[test]
    fn test_out_of_range_replaced_in_every_target() {
        assert_eq!(encode_utf8([0x110000], false), [0xEF, 0xBF, 0xBD]);
        assert_eq!(encode_utf16([0x110000], Endianness::Little, false), [0xFD, 0xFF]);
        assert_eq!(encode_utf16([0x110000], Endianness::Big, false), [0xFF, 0xFD]);
        assert_eq!(
            encode_utf32([0x110000], Endianness::Big, false),
            [0x00, 0x00, 0xFF, 0xFD]
        );
        assert_eq!(
            encode_utf32([0x110000], Endianness::Little, false),
            [0xFD, 0xFF, 0x00, 0x00]
        );
    }

    #[test]
    fn test_surrogates_never_written() {
        assert_eq!(encode_utf8([0xD800], false), [0xEF, 0xBF, 0xBD]);
        assert_eq!(encode_utf16([0xDFFF], Endianness::Big, false), [0xFF, 0xFD]);
        assert_eq!(
            encode_utf32([0xDC00], Endianness::Little, false),
            [0xFD, 0xFF, 0x00, 0x00]
        );
    }

    #[test]
    fn test_bom_prefixes() {
        assert_eq!(encode_utf8([0x41], true), [0xEF, 0xBB, 0xBF, 0x41]);
        assert_eq!(
            encode_utf16([0x41], Endianness::Little, true),
            [0xFF, 0xFE, 0x41, 0x00]
        );
        assert_eq!(
            encode_utf16([0x41], Endianness::Big, true),
            [0xFE, 0xFF, 0x00, 0x41]
        );
        assert_eq!(
            encode_utf32([0x41], Endianness::Little, true),
            [0xFF, 0xFE, 0x00, 0x00, 0x41, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            encode_utf32([0x41], Endianness::Big, true),
            [0x00, 0x00, 0xFE, 0xFF, 0x00, 0x00, 0x00, 0x41]
        );
        assert_eq!(
            encode_utf32(std::iter::empty(), Endianness::Big, true),
            [0x00, 0x00, 0xFE, 0xFF]
        );
    }

    #[test]
    fn test_dispatch_by_target() {
        let scalars = [0x48, 0x1F600];
        assert_eq!(encode(scalars, Encoding::UTF8, false), "H\u{1F600}".as_bytes());
        assert_eq!(
            encode(scalars, Encoding::UTF16, false),
            [0x00, 0x48, 0xD8, 0x3D, 0xDE, 0x00]
        );
        assert_eq!(
            encode(scalars, Encoding::UTF16LE, false),
            [0x48, 0x00, 0x3D, 0xD8, 0x00, 0xDE]
        );
        assert_eq!(
            encode(scalars, Encoding::UTF32, true),
            [0x00, 0x00, 0xFE, 0xFF, 0x00, 0x00, 0x00, 0x48, 0x00, 0x01, 0xF6, 0x00]
        );
    }

    #[test]
    fn test_unit_multiples() {
        let scalars = [0x41, 0xE9, 0x20AC, 0x1F600, 0x110000];
        assert_eq!(encode_utf16(scalars, Endianness::Little, false).len() % 2, 0);
        assert_eq!(encode_utf32(scalars, Endianness::Little, false).len(), 20);
    }
}
