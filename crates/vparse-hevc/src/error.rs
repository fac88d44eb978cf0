//! Error types for H.265/HEVC parsing.

use thiserror::Error;

/// HEVC parsing error types.
#[derive(Debug, Error)]
pub enum HevcError {
    #[error(transparent)]
    Bitstream(#[from] vparse_core::CoreError),

    #[error("invalid NAL unit: {0}")]
    InvalidNalUnit(String),

    #[error("invalid VPS: {0}")]
    InvalidVps(String),

    #[error("invalid SPS: {0}")]
    InvalidSps(String),

    #[error("invalid PPS: {0}")]
    InvalidPps(String),

    #[error("invalid slice segment header: {0}")]
    InvalidSliceHeader(String),

    #[error("missing parameter set: {0}")]
    MissingParameterSet(String),

    #[error("DPB overflow: {0}")]
    DpbOverflow(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, HevcError>;
