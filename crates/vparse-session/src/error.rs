//! Error types for session-level orchestration.

use thiserror::Error;

/// Aggregates every per-codec parse error plus faults that only make sense
/// once pictures are assembled into a DPB and handed to callbacks.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error(transparent)]
    Avc(#[from] vparse_avc::AvcError),

    #[error(transparent)]
    Hevc(#[from] vparse_hevc::HevcError),

    #[error(transparent)]
    Av1(#[from] vparse_av1::Av1Error),

    /// `create()` rejected an out-of-range or contradictory `SessionConfig`.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A public entry point was called on a handle that was never
    /// initialized, or after `destroy`.
    #[error("session not initialized")]
    NotInitialized,

    /// DPB has no eligible free slot and no `Unused` slot exists.
    #[error("DPB overflow: {0}")]
    DpbOverflow(String),

    /// `sequence_cb`/`decode_cb`/`display_cb`/`sei_cb` returned a failure
    /// status; per §7 this is fatal, not recoverable.
    #[error("callback rejected {0}")]
    CallbackRejected(&'static str),

    /// `parse_video_data` was called with an empty payload and no
    /// `EndOfStream` flag.
    #[error("empty payload without end-of-stream flag")]
    EmptyPayload,
}

pub type Result<T> = std::result::Result<T, ParserError>;
