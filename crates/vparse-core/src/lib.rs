//! Shared bit-level reader, error types and emulation-prevention helpers
//! used by `vparse-avc`, `vparse-hevc` and `vparse-av1`.

mod bitreader;
mod error;

pub use bitreader::{remove_emulation_prevention_bytes, BitReader};
pub use error::{CoreError, Result};
