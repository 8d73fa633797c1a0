//! # utfcodec - Unicode Transcoding Library
//!
//! Converts byte buffers between the three Unicode encoding families
//! (UTF-8, UTF-16 and UTF-32), detecting byte order marks and byte order
//! on the way in and honoring a requested byte order on the way out.
//!
//! ## Features
//!
//! - **Whole-buffer conversions** between every pair of distinct families
//! - **Byte order sniffing** from BOMs, with a heuristic fallback
//! - **Surrogate pair** decomposition and recombination for UTF-16
//! - **Best-effort decoding**: malformed values become U+FFFD instead of errors
//! - **Thread-safe** operations with no global state
//!
//! ## Quick Start
//!
//! ```rust
//! use utfcodec::{Encoding, Translator};
//!
//! let translator = Translator::new(Encoding::UTF8, Encoding::UTF16LE).unwrap();
//!
//! // U+1F600 as UTF-8
//! let utf16 = translator.convert(&[0xF0, 0x9F, 0x98, 0x80]).unwrap();
//! assert_eq!(utf16, [0x3D, 0xD8, 0x00, 0xDE]);
//! ```

#![deny(missing_docs)]

use std::fmt;

use serde::Serialize;
use tracing::debug;

pub mod decoder;
pub mod detection;
pub mod encoder;
pub mod scalar;

pub use decoder::{Decoder, decode};
pub use detection::{ByteOrderDetector, Confidence, DetectionResult};
pub use encoder::encode;
pub use scalar::{REPLACEMENT_CHARACTER, is_valid_scalar, replacement_scalar_for};

/// Result type for transcoding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a whole conversion
///
/// Individual malformed values never produce an error; they are replaced
/// with U+FFFD and the conversion carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Source buffer length is not a positive multiple of the code unit size
    #[error("invalid {encoding} input: {len} bytes is not a positive multiple of {unit}")]
    InvalidInput {
        /// Source encoding name
        encoding: &'static str,
        /// Length of the rejected buffer
        len: usize,
        /// Code unit size of the source family
        unit: usize,
    },
    /// No decoder/encoder path is wired for this pair
    #[error("unsupported conversion from {from} to {to}")]
    UnsupportedConversion {
        /// Source encoding name
        from: &'static str,
        /// Target encoding name
        to: &'static str,
    },
}

/// Byte order of a multi-byte code unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Little => f.write_str("little-endian"),
            Endianness::Big => f.write_str("big-endian"),
        }
    }
}

/// Unicode encoding families, distinguished by code unit width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    /// 8-bit code units
    Utf8,
    /// 16-bit code units
    Utf16,
    /// 32-bit code units
    Utf32,
}

impl Family {
    /// Size of one code unit in bytes
    pub fn unit_size(self) -> usize {
        match self {
            Family::Utf8 => 1,
            Family::Utf16 => 2,
            Family::Utf32 => 4,
        }
    }

    /// Byte order mark for this family written in the given byte order
    ///
    /// UTF-8 has a single BOM regardless of `endianness`.
    pub fn bom(self, endianness: Endianness) -> &'static [u8] {
        match (self, endianness) {
            (Family::Utf8, _) => &[0xEF, 0xBB, 0xBF],
            (Family::Utf16, Endianness::Little) => &[0xFF, 0xFE],
            (Family::Utf16, Endianness::Big) => &[0xFE, 0xFF],
            (Family::Utf32, Endianness::Little) => &[0xFF, 0xFE, 0x00, 0x00],
            (Family::Utf32, Endianness::Big) => &[0x00, 0x00, 0xFE, 0xFF],
        }
    }
}

/// Supported encoding identifiers
///
/// `UTF16` and `UTF32` carry no explicit byte order: as a target they mean
/// big-endian, as a source the byte order is sniffed from the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[allow(non_camel_case_types)]
pub enum Encoding {
    /// UTF-8 (variable length, 1-4 bytes)
    UTF8,
    /// UTF-16 with byte order from BOM or content
    UTF16,
    /// UTF-16 little endian
    UTF16LE,
    /// UTF-16 big endian
    UTF16BE,
    /// UTF-32 with byte order from BOM or content
    UTF32,
    /// UTF-32 little endian
    UTF32LE,
    /// UTF-32 big endian
    UTF32BE,
}

impl Encoding {
    /// Every supported identifier, in listing order
    pub const ALL: [Encoding; 7] = [
        Encoding::UTF8,
        Encoding::UTF16,
        Encoding::UTF16LE,
        Encoding::UTF16BE,
        Encoding::UTF32,
        Encoding::UTF32LE,
        Encoding::UTF32BE,
    ];

    /// Get the canonical name of this encoding
    pub fn name(self) -> &'static str {
        match self {
            Encoding::UTF8 => "UTF-8",
            Encoding::UTF16 => "UTF-16",
            Encoding::UTF16LE => "UTF-16LE",
            Encoding::UTF16BE => "UTF-16BE",
            Encoding::UTF32 => "UTF-32",
            Encoding::UTF32LE => "UTF-32LE",
            Encoding::UTF32BE => "UTF-32BE",
        }
    }

    /// Code unit family of this encoding
    pub fn family(self) -> Family {
        match self {
            Encoding::UTF8 => Family::Utf8,
            Encoding::UTF16 | Encoding::UTF16LE | Encoding::UTF16BE => Family::Utf16,
            Encoding::UTF32 | Encoding::UTF32LE | Encoding::UTF32BE => Family::Utf32,
        }
    }

    /// Byte order named by the identifier itself, if any
    pub fn explicit_endianness(self) -> Option<Endianness> {
        match self {
            Encoding::UTF16LE | Encoding::UTF32LE => Some(Endianness::Little),
            Encoding::UTF16BE | Encoding::UTF32BE => Some(Endianness::Big),
            Encoding::UTF8 | Encoding::UTF16 | Encoding::UTF32 => None,
        }
    }

    /// Byte order used when writing this encoding
    pub fn output_endianness(self) -> Endianness {
        self.explicit_endianness().unwrap_or(Endianness::Big)
    }

    /// Get the byte order mark written for this encoding
    pub fn bom(self) -> &'static [u8] {
        self.family().bom(self.output_endianness())
    }

    /// Whether a conversion from `self` to `to` is wired
    ///
    /// Only pairs crossing families are supported; same-family requests,
    /// byte order swaps included, are rejected.
    pub fn supports(self, to: Encoding) -> bool {
        self.family() != to.family()
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Converter between one source and one target encoding
///
/// Construction validates the pair, so a `Translator` that exists can
/// always run; only the input length can still be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translator {
    from: Encoding,
    to: Encoding,
    add_bom: bool,
}

impl Translator {
    /// Create a new translator between two encodings
    pub fn new(from: Encoding, to: Encoding) -> Result<Self> {
        if !from.supports(to) {
            return Err(Error::UnsupportedConversion {
                from: from.name(),
                to: to.name(),
            });
        }

        Ok(Self {
            from,
            to,
            add_bom: false,
        })
    }

    /// Prefix every output with the target's byte order mark
    pub fn with_bom(mut self, add_bom: bool) -> Self {
        self.add_bom = add_bom;
        self
    }

    /// Get source encoding
    pub fn from_encoding(&self) -> Encoding {
        self.from
    }

    /// Get target encoding
    pub fn to_encoding(&self) -> Encoding {
        self.to
    }

    /// Whether outputs are prefixed with a BOM
    pub fn adds_bom(&self) -> bool {
        self.add_bom
    }

    /// Convert data from source to target encoding
    ///
    /// Scalar values flow straight from the decoder into the encoder.
    pub fn convert(&self, input: &[u8]) -> Result<Vec<u8>> {
        debug!(
            "Converting {} bytes from {} to {}",
            input.len(),
            self.from,
            self.to
        );

        let scalars = decode(input, self.from)?;
        let output = encode(scalars, self.to, self.add_bom);

        debug!("Produced {} bytes of {}", output.len(), self.to);
        Ok(output)
    }
}

/// Transcode `input` from one encoding to another in a single call
///
/// ```rust
/// use utfcodec::{Encoding, transcode};
///
/// let utf32 = transcode(b"A", Encoding::UTF8, Encoding::UTF32LE, true).unwrap();
/// assert_eq!(utf32, [0xFF, 0xFE, 0x00, 0x00, 0x41, 0x00, 0x00, 0x00]);
/// ```
pub fn transcode(input: &[u8], from: Encoding, to: Encoding, add_bom: bool) -> Result<Vec<u8>> {
    Translator::new(from, to)?.with_bom(add_bom).convert(input)
}
