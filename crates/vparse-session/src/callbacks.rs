//! The four host callbacks (§6), modeled as a trait object invoked
//! synchronously from `ParserSession::parse_video_data` on the caller's
//! thread. The host ABI's `int` return convention becomes `bool` here;
//! `sequence_cb`'s ">1 overrides DPB size" escape hatch becomes
//! `Some(n)`.

use crate::config::Codec;

/// Bitmask on an incoming packet (§6).
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketFlags {
    pub end_of_stream: bool,
    pub timestamp_valid: bool,
    pub discontinuity: bool,
    pub end_of_picture: bool,
    pub notify_eos: bool,
}

impl PacketFlags {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            end_of_stream: bits & 0x01 != 0,
            timestamp_valid: bits & 0x02 != 0,
            discontinuity: bits & 0x04 != 0,
            end_of_picture: bits & 0x08 != 0,
            notify_eos: bits & 0x10 != 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AspectRatio {
    pub x: u32,
    pub y: u32,
}

/// Emitted by `sequence_cb` when a new or changed parameter set is
/// activated. Only the fields forwarded at the ABI boundary (§4.4) are
/// carried; HRD/VUI details beyond that are parsed but stay in the
/// per-codec parameter-set structs.
#[derive(Debug, Clone)]
pub struct VideoFormat {
    pub codec: Codec,
    pub frame_rate_num: u32,
    pub frame_rate_den: u32,
    pub progressive: bool,
    pub bit_depth_luma: u8,
    pub bit_depth_chroma: u8,
    pub min_num_decode_surfaces: u32,
    pub coded_width: u32,
    pub coded_height: u32,
    pub display_width: u32,
    pub display_height: u32,
    pub chroma_format_idc: u8,
    pub bitrate: u32,
    pub aspect_ratio: AspectRatio,
    /// Raw sequence-header bytes forwarded verbatim, capped at 1024 per §6.
    pub sequence_header_bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct DispInfo {
    pub pic_idx: u8,
    pub progressive_frame: bool,
    pub top_field_first: bool,
    pub repeat_first_field: bool,
    pub pts: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct SeiMessageInfo {
    pub payload_type: u32,
    pub payload: Vec<u8>,
}

/// Host callback surface (§6). Invoked synchronously; implementers must
/// not hold locks across these calls (§5).
pub trait ParserCallbacks {
    /// Return `None` to fail (propagated as a fatal error), `Some(None)`
    /// for a plain accept, `Some(Some(n))` to override the DPB size to `n`.
    fn sequence(&mut self, format: &VideoFormat) -> Option<Option<u32>>;

    /// Return `false` to fail.
    fn decode(&mut self, pic: &crate::pic_params::PicParams) -> bool;

    /// Return `false` to fail.
    fn display(&mut self, info: &DispInfo) -> bool;

    /// Return `false` to fail.
    fn sei(&mut self, info: &SeiMessageInfo) -> bool;
}
