//! Per-codec `ParserCore` implementations (§4.9). Each core owns its
//! parameter-set store, RPS/POC derivation, DPB, decode pool and output
//! reorder queue, and exposes a `process_packet` entry point that
//! `ParserSession` dispatches to by codec tag.

pub mod av1;
pub mod avc;
pub mod hevc;
