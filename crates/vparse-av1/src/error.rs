//! Error types for AV1 parsing.

use thiserror::Error;

/// AV1 parsing error types.
#[derive(Debug, Error)]
pub enum Av1Error {
    /// Bit-level read ran past the end of an OBU payload, or a bit-level
    /// decode (leb128/uvlc/ns/su) malformed.
    #[error(transparent)]
    Bitstream(#[from] vparse_core::CoreError),

    /// Invalid OBU header (forbidden bit set, missing size field, etc).
    #[error("invalid OBU header: {0}")]
    InvalidObuHeader(String),

    /// Invalid sequence header.
    #[error("invalid sequence header: {0}")]
    InvalidSequenceHeader(String),

    /// Invalid frame header.
    #[error("invalid frame header: {0}")]
    InvalidFrameHeader(String),

    /// A frame/tile-group OBU referenced a sequence header that was never
    /// received.
    #[error("missing sequence header")]
    MissingSequenceHeader,

    /// `show_existing_frame` / redundant-frame-header bookkeeping violated
    /// the OBU ordering rules in 7.4 / 7.5.
    #[error("invalid OBU ordering: {0}")]
    InvalidObuOrdering(String),

    /// Reported per "Unimplemented-optional-branch": the caller decides
    /// whether to continue. Covers the `load_grain_params` branch this
    /// parser does not implement, and the `FrameSizeWithRefs` found_ref
    /// path that has no well-defined output without a live DPB.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Result type alias for AV1 operations.
pub type Result<T> = std::result::Result<T, Av1Error>;
