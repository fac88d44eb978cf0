//! Error types shared by the bit-level reader and the byte-stream framer.

use thiserror::Error;

/// Errors produced by [`crate::bitreader::BitReader`] and the framer helpers.
///
/// Per-codec parsers (`vparse-avc`, `vparse-hevc`, `vparse-av1`) define their
/// own error enums and convert a [`CoreError`] into their own `Bitstream`
/// variant via `#[from]`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unexpected end of bitstream at bit offset {0}")]
    UnexpectedEof(u64),

    #[error("parse error at bit offset {offset}: {message}")]
    Parse { offset: u64, message: String },

    #[error("emulation-prevention byte at offset {offset} followed by invalid byte {following:#04x}")]
    InvalidEmulationPrevention { offset: usize, following: u8 },
}

pub type Result<T> = std::result::Result<T, CoreError>;
