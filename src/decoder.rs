//! Decoders turning UTF-8, UTF-16 and UTF-32 bytes into scalar values
//!
//! Decoders are lazy iterators over the borrowed input, so a transcode feeds
//! each scalar value to the encoder as soon as it is read. Every value they
//! yield has been through [`sanitize`](crate::scalar::sanitize): malformed
//! input shows up as U+FFFD, never as a surrogate or out-of-range value.

use std::iter::FusedIterator;

use tracing::debug;

use crate::detection::{ByteOrderDetector, DetectionResult, detect_declared};
use crate::scalar::sanitize;
use crate::{Encoding, Endianness, Error, Family, Result};

const LEAD_SURROGATES: std::ops::RangeInclusive<u16> = 0xD800..=0xDBFF;
const TRAIL_SURROGATES: std::ops::RangeInclusive<u16> = 0xDC00..=0xDFFF;

/// Build the decoder for `encoding` over `input`
///
/// 16- and 32-bit inputs must be a positive multiple of the code unit size.
/// Their byte order comes from a BOM when present, then from the byte order
/// named by `encoding`, and finally from content sniffing.
pub fn decode(input: &[u8], encoding: Encoding) -> Result<Decoder<'_>> {
    match encoding.family() {
        Family::Utf8 => Ok(Decoder::Utf8(Utf8Decoder::new(input))),
        Family::Utf16 => Utf16Decoder::new(input, encoding).map(Decoder::Utf16),
        Family::Utf32 => Utf32Decoder::new(input, encoding).map(Decoder::Utf32),
    }
}

fn check_length(input: &[u8], encoding: Encoding) -> Result<()> {
    let unit = encoding.family().unit_size();
    if input.is_empty() || input.len() % unit != 0 {
        return Err(Error::InvalidInput {
            encoding: encoding.name(),
            len: input.len(),
            unit,
        });
    }
    Ok(())
}

/// Settle the byte order for a fixed-width source: a BOM wins, then the
/// byte order named by the identifier, then the sniffed one.
fn resolve_byte_order(input: &[u8], encoding: Encoding) -> DetectionResult {
    let resolved = match (encoding.explicit_endianness(), encoding.family()) {
        (Some(declared), family) => detect_declared(input, family, declared),
        (None, Family::Utf32) => ByteOrderDetector::new().detect_utf32(input),
        (None, _) => ByteOrderDetector::new().detect_utf16(input),
    };

    debug!(
        "{} source read as {} (bom: {}, {:?})",
        encoding, resolved.endianness, resolved.bom_detected, resolved.confidence
    );
    resolved
}

/// Any of the three decoders
#[derive(Debug, Clone)]
pub enum Decoder<'a> {
    /// UTF-8 decoder
    Utf8(Utf8Decoder<'a>),
    /// UTF-16 decoder
    Utf16(Utf16Decoder<'a>),
    /// UTF-32 decoder
    Utf32(Utf32Decoder<'a>),
}

impl Decoder<'_> {
    /// Byte order the input is read in, `None` for UTF-8
    pub fn endianness(&self) -> Option<Endianness> {
        match self {
            Decoder::Utf8(_) => None,
            Decoder::Utf16(decoder) => Some(decoder.endianness()),
            Decoder::Utf32(decoder) => Some(decoder.endianness()),
        }
    }

    /// Whether a leading BOM was found and skipped
    pub fn bom_detected(&self) -> bool {
        match self {
            Decoder::Utf8(decoder) => decoder.bom_detected(),
            Decoder::Utf16(decoder) => decoder.bom_detected(),
            Decoder::Utf32(decoder) => decoder.bom_detected(),
        }
    }
}

impl Iterator for Decoder<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        match self {
            Decoder::Utf8(decoder) => decoder.next(),
            Decoder::Utf16(decoder) => decoder.next(),
            Decoder::Utf32(decoder) => decoder.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Decoder::Utf8(decoder) => decoder.size_hint(),
            Decoder::Utf16(decoder) => decoder.size_hint(),
            Decoder::Utf32(decoder) => decoder.size_hint(),
        }
    }
}

impl FusedIterator for Decoder<'_> {}

/// Lenient UTF-8 decoder
///
/// A lead byte announcing more bytes than remain, or matching no lead
/// pattern at all, is yielded on its own as a raw value.
#[derive(Debug, Clone)]
pub struct Utf8Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    bom_detected: bool,
}

impl<'a> Utf8Decoder<'a> {
    /// Create a decoder, skipping a leading UTF-8 BOM
    pub fn new(input: &'a [u8]) -> Self {
        let bom_detected = input.starts_with(Encoding::UTF8.bom());
        let pos = if bom_detected {
            Encoding::UTF8.bom().len()
        } else {
            0
        };
        if bom_detected {
            debug!("UTF-8 BOM detected");
        }

        Self {
            input,
            pos,
            bom_detected,
        }
    }

    /// Whether a leading BOM was skipped
    pub fn bom_detected(&self) -> bool {
        self.bom_detected
    }
}

/// Sequence length announced by a UTF-8 lead byte and the mask for its
/// payload bits
#[inline]
fn sequence_width(lead: u8) -> (usize, u8) {
    if lead & 0x80 == 0 {
        (1, 0x7F)
    } else if lead & 0xE0 == 0xC0 {
        (2, 0x1F)
    } else if lead & 0xF0 == 0xE0 {
        (3, 0x0F)
    } else if lead & 0xF8 == 0xF0 {
        (4, 0x07)
    } else {
        (1, 0xFF)
    }
}

impl Iterator for Utf8Decoder<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let rest = self.input.get(self.pos..)?;
        let (&lead, _) = rest.split_first()?;
        let (width, mask) = sequence_width(lead);

        if width > 1 && rest.len() >= width {
            let value = rest[1..width]
                .iter()
                .fold(u32::from(lead & mask), |acc, &byte| {
                    (acc << 6) | u32::from(byte & 0x3F)
                });
            self.pos += width;
            Some(sanitize(value, Family::Utf8))
        } else {
            self.pos += 1;
            Some(sanitize(u32::from(lead), Family::Utf8))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.input.len().saturating_sub(self.pos);
        (remaining.div_ceil(4), Some(remaining))
    }
}

impl FusedIterator for Utf8Decoder<'_> {}

/// UTF-16 decoder recombining surrogate pairs
///
/// Only a lead surrogate directly followed by a trail surrogate is
/// combined. Any other surrogate unit decodes to U+FFFD on its own and the
/// unit after it is decoded normally.
#[derive(Debug, Clone)]
pub struct Utf16Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    detection: DetectionResult,
}

impl<'a> Utf16Decoder<'a> {
    /// Create a decoder for `input` read as `encoding`, a 16-bit identifier
    pub(crate) fn new(input: &'a [u8], encoding: Encoding) -> Result<Self> {
        check_length(input, encoding)?;
        let detection = resolve_byte_order(input, encoding);

        Ok(Self {
            input,
            pos: detection.bom_len(Family::Utf16),
            detection,
        })
    }

    /// Byte order the input is read in
    pub fn endianness(&self) -> Endianness {
        self.detection.endianness
    }

    /// Whether a leading BOM was skipped
    pub fn bom_detected(&self) -> bool {
        self.detection.bom_detected
    }

    fn unit_at(&self, pos: usize) -> Option<u16> {
        let bytes: [u8; 2] = self.input.get(pos..pos + 2)?.try_into().ok()?;
        Some(match self.detection.endianness {
            Endianness::Little => u16::from_le_bytes(bytes),
            Endianness::Big => u16::from_be_bytes(bytes),
        })
    }
}

impl Iterator for Utf16Decoder<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let unit = self.unit_at(self.pos)?;
        self.pos += 2;

        if LEAD_SURROGATES.contains(&unit)
            && let Some(trail) = self
                .unit_at(self.pos)
                .filter(|t| TRAIL_SURROGATES.contains(t))
        {
            self.pos += 2;
            let value =
                ((u32::from(unit) - 0xD800) << 10) + (u32::from(trail) - 0xDC00) + 0x10000;
            return Some(sanitize(value, Family::Utf16));
        }

        Some(sanitize(u32::from(unit), Family::Utf16))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let units = self.input.len().saturating_sub(self.pos) / 2;
        (units.div_ceil(2), Some(units))
    }
}

impl FusedIterator for Utf16Decoder<'_> {}

/// UTF-32 decoder
#[derive(Debug, Clone)]
pub struct Utf32Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    detection: DetectionResult,
}

impl<'a> Utf32Decoder<'a> {
    /// Create a decoder for `input` read as `encoding`, a 32-bit identifier
    pub(crate) fn new(input: &'a [u8], encoding: Encoding) -> Result<Self> {
        check_length(input, encoding)?;
        let detection = resolve_byte_order(input, encoding);

        Ok(Self {
            input,
            pos: detection.bom_len(Family::Utf32),
            detection,
        })
    }

    /// Byte order the input is read in
    pub fn endianness(&self) -> Endianness {
        self.detection.endianness
    }

    /// Whether a leading BOM was skipped
    pub fn bom_detected(&self) -> bool {
        self.detection.bom_detected
    }
}

impl Iterator for Utf32Decoder<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let bytes: [u8; 4] = self.input.get(self.pos..self.pos + 4)?.try_into().ok()?;
        self.pos += 4;

        let value = match self.detection.endianness {
            Endianness::Little => u32::from_le_bytes(bytes),
            Endianness::Big => u32::from_be_bytes(bytes),
        };
        Some(sanitize(value, Family::Utf32))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let units = self.input.len().saturating_sub(self.pos) / 4;
        (units, Some(units))
    }
}

impl ExactSizeIterator for Utf32Decoder<'_> {}

impl FusedIterator for Utf32Decoder<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::REPLACEMENT_CHARACTER;

    fn scalars(input: &[u8], encoding: Encoding) -> Vec<u32> {
        decode(input, encoding).unwrap().collect()
    }

    #[test]
    fn test_utf8_widths() {
        assert_eq!(scalars(b"A", Encoding::UTF8), [0x41]);
        assert_eq!(scalars(&[0xC3, 0xA9], Encoding::UTF8), [0xE9]);
        assert_eq!(scalars(&[0xE2, 0x82, 0xAC], Encoding::UTF8), [0x20AC]);
        assert_eq!(scalars(&[0xF0, 0x9F, 0x98, 0x80], Encoding::UTF8), [0x1F600]);
        assert_eq!(
            scalars(&[0x41, 0xC3, 0xA9, 0xF4, 0x8F, 0xBF, 0xBF], Encoding::UTF8),
            [0x41, 0xE9, 0x10FFFF]
        );
    }

    #[test]
    fn test_utf8_bom_skipped() {
        let decoder = decode(&[0xEF, 0xBB, 0xBF, 0x41], Encoding::UTF8).unwrap();
        assert!(decoder.bom_detected());
        assert_eq!(decoder.endianness(), None);
        assert_eq!(decoder.collect::<Vec<_>>(), [0x41]);
    }

    #[test]
    fn test_utf8_truncated_sequence_falls_back_to_raw_bytes() {
        // A 3-byte lead with only one byte after it.
        assert_eq!(scalars(&[0xE2, 0x82], Encoding::UTF8), [0xE2, 0x82]);
        assert_eq!(scalars(&[0xF0], Encoding::UTF8), [0xF0]);
    }

    #[test]
    fn test_utf8_invalid_values_replaced() {
        // Encoded surrogate U+D800
        assert_eq!(
            scalars(&[0xED, 0xA0, 0x80], Encoding::UTF8),
            [REPLACEMENT_CHARACTER]
        );
        // U+110000 packed into a 4-byte sequence
        assert_eq!(
            scalars(&[0xF4, 0x90, 0x80, 0x80], Encoding::UTF8),
            [REPLACEMENT_CHARACTER]
        );
        // Bytes matching no lead pattern come through as Latin-1 values.
        assert_eq!(scalars(&[0xFF, 0x80], Encoding::UTF8), [0xFF, 0x80]);
    }

    #[test]
    fn test_utf16_pairs() {
        let le_bom = [0xFF, 0xFE];
        let input = [le_bom, [0x00, 0xD8], [0x00, 0xDC]].concat();
        assert_eq!(scalars(&input, Encoding::UTF16), [0x10000]);
        let input = [le_bom, [0xFF, 0xDB], [0xFF, 0xDF]].concat();
        assert_eq!(scalars(&input, Encoding::UTF16), [0x10FFFF]);
        assert_eq!(scalars(&[0xD8, 0x3D, 0xDE, 0x00], Encoding::UTF16BE), [0x1F600]);
        assert_eq!(scalars(&[0xDB, 0xC4, 0xDC, 0x00], Encoding::UTF16), [0x101000]);
    }

    #[test]
    fn test_utf16_lone_surrogates_replaced() {
        // Lead surrogate at the end of input
        assert_eq!(
            scalars(&[0xFF, 0xFE, 0x3C, 0xD8], Encoding::UTF16),
            [REPLACEMENT_CHARACTER]
        );
        // Trail surrogate with no lead
        assert_eq!(
            scalars(&[0x00, 0xDC, 0x41, 0x00], Encoding::UTF16LE),
            [REPLACEMENT_CHARACTER, 0x41]
        );
        // Lead surrogate followed by a non-trail unit keeps the unit.
        assert_eq!(
            scalars(&[0x00, 0xD8, 0x41, 0x00], Encoding::UTF16LE),
            [REPLACEMENT_CHARACTER, 0x41]
        );
        // Two leads in a row, then a proper pair
        assert_eq!(
            scalars(&[0xD8, 0x00, 0xD8, 0x00, 0xDC, 0x00], Encoding::UTF16BE),
            [REPLACEMENT_CHARACTER, 0x10000]
        );
    }

    #[test]
    fn test_utf16_noncharacters_pass_through() {
        assert_eq!(
            scalars(&[0xFD, 0xFF, 0xFE, 0xFF, 0x11, 0x00], Encoding::UTF16LE),
            [0xFFFD, 0xFFFE, 0x11]
        );
    }

    #[test]
    fn test_utf16_byte_order_resolution() {
        let decoder = decode(&[0x48, 0x00], Encoding::UTF16).unwrap();
        assert_eq!(decoder.endianness(), Some(Endianness::Big));
        assert!(!decoder.bom_detected());
        assert_eq!(decoder.collect::<Vec<_>>(), [0x4800]);

        let decoder = decode(&[0x48, 0x00], Encoding::UTF16LE).unwrap();
        assert_eq!(decoder.endianness(), Some(Endianness::Little));
        assert_eq!(decoder.collect::<Vec<_>>(), [0x48]);

        let decoder = decode(&[0xFF, 0xFE, 0x48, 0x00], Encoding::UTF16BE).unwrap();
        assert_eq!(decoder.endianness(), Some(Endianness::Little));
        assert!(decoder.bom_detected());
        assert_eq!(decoder.collect::<Vec<_>>(), [0x48]);
    }

    #[test]
    fn test_utf16_bom_only() {
        assert!(scalars(&[0xFE, 0xFF], Encoding::UTF16).is_empty());
    }

    #[test]
    fn test_utf32_units() {
        assert_eq!(
            scalars(&[0x41, 0, 0, 0, 0x00, 0xF6, 0x01, 0x00], Encoding::UTF32),
            [0x41, 0x1F600]
        );
        assert_eq!(scalars(&[0, 0, 0, 0x41], Encoding::UTF32), [0x41]);
        assert_eq!(
            scalars(&[0x00, 0x00, 0xFE, 0xFF, 0x00, 0x10, 0xFF, 0xFF], Encoding::UTF32),
            [0x10FFFF]
        );
    }

    #[test]
    fn test_utf32_invalid_values_replaced() {
        assert_eq!(
            scalars(&[0x00, 0xD8, 0x00, 0x00], Encoding::UTF32LE),
            [REPLACEMENT_CHARACTER]
        );
        assert_eq!(
            scalars(&[0x00, 0x11, 0x00, 0x00], Encoding::UTF32BE),
            [REPLACEMENT_CHARACTER]
        );
        assert_eq!(
            scalars(&[0xFF, 0xFF, 0xFF, 0xFF], Encoding::UTF32LE),
            [REPLACEMENT_CHARACTER]
        );
    }

    #[test]
    fn test_utf32_length_checked() {
        for input in [&[][..], &[0x41][..], &[0x41, 0, 0][..], &[0x41, 0, 0, 0, 0, 0][..]] {
            let err = decode(input, Encoding::UTF32LE).unwrap_err();
            assert_eq!(
                err,
                Error::InvalidInput {
                    encoding: "UTF-32LE",
                    len: input.len(),
                    unit: 4
                }
            );
        }
    }

    #[test]
    fn test_size_hints() {
        let input = [0xFF, 0xFE, 0x00, 0x00, 0x41, 0, 0, 0, 0x42, 0, 0, 0];
        let decoder = decode(&input, Encoding::UTF32).unwrap();
        assert_eq!(decoder.size_hint(), (2, Some(2)));

        let decoder = decode(b"abcd", Encoding::UTF8).unwrap();
        assert_eq!(decoder.size_hint(), (1, Some(4)));
    }
}
