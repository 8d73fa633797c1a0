//! Byte order and BOM detection for 16- and 32-bit sources
//!
//! Detection never fails: when neither a BOM nor the content decides, a
//! fixed default is returned with [`Confidence::Fallback`], so callers always
//! get a definite byte order and can see how much to trust it.

use serde::Serialize;
use tracing::trace;

use crate::{Encoding, Endianness, Family};

/// How a byte order was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// A byte order mark was present
    Bom,
    /// The encoding identifier named the byte order and no BOM disagreed
    Declared,
    /// The content could only be read one way
    Heuristic,
    /// Nothing in the buffer decided; the family default was used
    Fallback,
}

impl Confidence {
    /// Confidence score (0.0 to 1.0)
    pub fn score(self) -> f64 {
        match self {
            Confidence::Bom => 1.0,
            Confidence::Declared => 0.9,
            Confidence::Heuristic => 0.7,
            Confidence::Fallback => 0.3,
        }
    }
}

/// Result of byte order detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    /// Most likely byte order
    pub endianness: Endianness,
    /// Whether a BOM was detected
    pub bom_detected: bool,
    /// How the byte order was decided
    pub confidence: Confidence,
}

impl DetectionResult {
    fn bom(endianness: Endianness) -> Self {
        Self {
            endianness,
            bom_detected: true,
            confidence: Confidence::Bom,
        }
    }

    fn heuristic(endianness: Endianness) -> Self {
        Self {
            endianness,
            bom_detected: false,
            confidence: Confidence::Heuristic,
        }
    }

    fn fallback(endianness: Endianness) -> Self {
        Self {
            endianness,
            bom_detected: false,
            confidence: Confidence::Fallback,
        }
    }

    /// Number of leading BOM bytes to skip for `family`
    pub fn bom_len(&self, family: Family) -> usize {
        if self.bom_detected {
            family.bom(self.endianness).len()
        } else {
            0
        }
    }
}

/// Byte order detector for fixed-width Unicode encodings
#[derive(Debug, Clone, Copy)]
pub struct ByteOrderDetector {
    /// Maximum bytes to scan when no BOM is present
    max_sample_size: usize,
}

impl Default for ByteOrderDetector {
    fn default() -> Self {
        Self {
            max_sample_size: usize::MAX,
        }
    }
}

impl ByteOrderDetector {
    /// Create a detector that scans the whole buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create detector with custom sample size
    pub fn with_sample_size(max_sample_size: usize) -> Self {
        Self { max_sample_size }
    }

    /// Detect the byte order of `data` for `family`
    ///
    /// Returns `None` for UTF-8, which has no byte order.
    pub fn detect(&self, data: &[u8], family: Family) -> Option<DetectionResult> {
        match family {
            Family::Utf8 => None,
            Family::Utf16 => Some(self.detect_utf16(data)),
            Family::Utf32 => Some(self.detect_utf32(data)),
        }
    }

    /// Detect UTF-16 byte order, defaulting to big-endian
    ///
    /// Without a BOM the sample is read both ways. A reading that contains
    /// a lone or mis-ordered surrogate is ruled out. When both readings are
    /// well formed, the one that alone finds surrogate pairs wins. Anything
    /// else falls back to big-endian.
    pub fn detect_utf16(&self, data: &[u8]) -> DetectionResult {
        if let Some(endianness) = bom_endianness(data, Family::Utf16) {
            trace!("UTF-16 {} BOM detected", endianness);
            return DetectionResult::bom(endianness);
        }

        let sample = self.sample(data);
        let big = SurrogateProfile::scan(sample, Endianness::Big);
        let little = SurrogateProfile::scan(sample, Endianness::Little);
        trace!("UTF-16 surrogate profiles: big {:?}, little {:?}", big, little);

        match (big.well_formed, little.well_formed) {
            (true, false) => DetectionResult::heuristic(Endianness::Big),
            (false, true) => DetectionResult::heuristic(Endianness::Little),
            (true, true) if big.pairs > 0 && little.pairs == 0 => {
                DetectionResult::heuristic(Endianness::Big)
            }
            (true, true) if little.pairs > 0 && big.pairs == 0 => {
                DetectionResult::heuristic(Endianness::Little)
            }
            _ => {
                trace!("No UTF-16 byte order evidence, assuming big-endian");
                DetectionResult::fallback(Endianness::Big)
            }
        }
    }

    /// Detect UTF-32 byte order, defaulting to little-endian
    ///
    /// Without a BOM, a unit is read as big-endian when its last byte is set
    /// or the top three bits of its third byte are set, since that value
    /// would exceed U+10FFFF read little-endian. The mirrored test on the
    /// first two bytes signals little-endian. The first deciding unit wins.
    pub fn detect_utf32(&self, data: &[u8]) -> DetectionResult {
        if let Some(endianness) = bom_endianness(data, Family::Utf32) {
            trace!("UTF-32 {} BOM detected", endianness);
            return DetectionResult::bom(endianness);
        }

        for unit in self.sample(data).chunks_exact(4) {
            if unit[3] != 0 || unit[2] & 0xE0 != 0 {
                return DetectionResult::heuristic(Endianness::Big);
            }
            if unit[0] != 0 || unit[1] & 0xE0 != 0 {
                return DetectionResult::heuristic(Endianness::Little);
            }
        }

        trace!("No UTF-32 byte order evidence, assuming little-endian");
        DetectionResult::fallback(Endianness::Little)
    }

    /// Number of bytes scanned out of a buffer of `len` bytes
    pub fn sample_len(&self, len: usize) -> usize {
        len.min(self.max_sample_size)
    }

    fn sample<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[..self.sample_len(data.len())]
    }
}

/// Surrogate structure of a 16-bit buffer read in one byte order
#[derive(Debug, Clone, Copy)]
struct SurrogateProfile {
    pairs: usize,
    well_formed: bool,
}

impl SurrogateProfile {
    /// A lead surrogate in the last unit counts as neither pair nor error:
    /// the sample may end mid-pair.
    fn scan(data: &[u8], endianness: Endianness) -> Self {
        let mut units = data
            .chunks_exact(2)
            .map(|unit| {
                let bytes = [unit[0], unit[1]];
                match endianness {
                    Endianness::Little => u16::from_le_bytes(bytes),
                    Endianness::Big => u16::from_be_bytes(bytes),
                }
            })
            .peekable();

        let mut profile = Self {
            pairs: 0,
            well_formed: true,
        };
        while let Some(unit) = units.next() {
            match unit {
                0xD800..=0xDBFF => match units.peek() {
                    Some(&(0xDC00..=0xDFFF)) => {
                        units.next();
                        profile.pairs += 1;
                    }
                    Some(_) => {
                        profile.well_formed = false;
                        break;
                    }
                    None => {}
                },
                0xDC00..=0xDFFF => {
                    profile.well_formed = false;
                    break;
                }
                _ => {}
            }
        }
        profile
    }
}

fn bom_endianness(data: &[u8], family: Family) -> Option<Endianness> {
    [Endianness::Little, Endianness::Big]
        .into_iter()
        .find(|&endianness| data.starts_with(family.bom(endianness)))
}

/// Byte order of a source whose identifier already names one
///
/// Only a BOM can override `declared`; the content is not scanned.
pub fn detect_declared(data: &[u8], family: Family, declared: Endianness) -> DetectionResult {
    match bom_endianness(data, family) {
        Some(endianness) => DetectionResult::bom(endianness),
        None => DetectionResult {
            endianness: declared,
            bom_detected: false,
            confidence: Confidence::Declared,
        },
    }
}

/// Detect any Unicode BOM (Byte Order Mark)
///
/// Returns the encoding the BOM belongs to and its length. The UTF-32LE
/// mark is tested before UTF-16LE because it starts with the same two bytes.
pub fn detect_bom(data: &[u8]) -> Option<(Encoding, usize)> {
    [
        Encoding::UTF32LE,
        Encoding::UTF32BE,
        Encoding::UTF8,
        Encoding::UTF16LE,
        Encoding::UTF16BE,
    ]
    .into_iter()
    .find(|encoding| data.starts_with(encoding.bom()))
    .map(|encoding| (encoding, encoding.bom().len()))
}
