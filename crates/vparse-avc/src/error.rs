//! Error types for H.264/AVC parsing.

use thiserror::Error;

/// AVC parsing error types.
#[derive(Debug, Error)]
pub enum AvcError {
    /// Bit-level read ran past the end of the NAL payload, or a bit-level
    /// decode (Exp-Golomb/leb128/etc) malformed.
    #[error(transparent)]
    Bitstream(#[from] vparse_core::CoreError),

    /// Invalid NAL unit header.
    #[error("invalid NAL unit: {0}")]
    InvalidNalUnit(String),

    /// Invalid SPS.
    #[error("invalid SPS: {0}")]
    InvalidSps(String),

    /// Invalid PPS.
    #[error("invalid PPS: {0}")]
    InvalidPps(String),

    /// Invalid slice header.
    #[error("invalid slice header: {0}")]
    InvalidSliceHeader(String),

    /// A slice header referenced a PPS or SPS id that was never received.
    #[error("missing parameter set: {0}")]
    MissingParameterSet(String),

    /// DPB has no eligible free slot and no Unused slot exists.
    #[error("DPB overflow: {0}")]
    DpbOverflow(String),

    /// Reported per §7 "Unimplemented-optional-branch": the caller decides
    /// whether to continue.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Result type alias for AVC operations.
pub type Result<T> = std::result::Result<T, AvcError>;
