//! `PicParams`: the hardware-decoder-ready structure emitted via
//! `decode_cb` (§6). Codec-tagged union plus the common envelope fields.

use vparse_av1::FrameHeader as Av1FrameHeader;
use vparse_avc::{Pps as AvcPps, SliceHeader as AvcSliceHeader, Sps as AvcSps};
use vparse_hevc::{Pps as HevcPps, SliceHeader as HevcSliceHeader, Sps as HevcSps};

/// One slot of a `ref_frames[]` array. `pic_idx = 0xFF` marks an unused
/// entry, per the `PicParams.hevc.ref_frames[15]` contract in §6 (also
/// reused, generalized, for AVC and AV1's reference-frame arrays).
#[derive(Debug, Clone, Copy)]
pub struct RefFrameEntry {
    pub pic_idx: u8,
    pub surface_idx: u8,
    /// POC (AVC/HEVC) or order_hint (AV1).
    pub order_key: i32,
    pub long_term: bool,
}

impl RefFrameEntry {
    pub const EMPTY: RefFrameEntry =
        RefFrameEntry { pic_idx: 0xFF, surface_idx: 0xFF, order_key: 0, long_term: false };
}

#[derive(Debug, Clone)]
pub struct AvcSliceParams {
    pub header: AvcSliceHeader,
    pub ref_pic_list: [Vec<u8>; 2],
}

#[derive(Debug, Clone)]
pub struct AvcPicParams {
    pub sps: AvcSps,
    pub pps: AvcPps,
    pub frame_num: u32,
    pub field_pic_flag: bool,
    pub bottom_field_flag: bool,
    pub ref_pic_flag: bool,
    pub intra_pic_flag: bool,
    pub ref_frames: [RefFrameEntry; 16],
    pub slices: Vec<AvcSliceParams>,
}

#[derive(Debug, Clone)]
pub struct HevcSliceParams {
    pub header: HevcSliceHeader,
    /// Indices into `HevcPicParams::ref_frames`, not raw DPB indices.
    pub ref_pic_list: [Vec<u8>; 2],
}

#[derive(Debug, Clone)]
pub struct HevcPicParams {
    pub sps: HevcSps,
    pub pps: HevcPps,
    pub poc: i32,
    pub intra_pic_flag: bool,
    /// Filled ST-curr-before, ST-curr-after, LT-curr, ST-foll, LT-foll;
    /// unused entries have `pic_idx = 0xFF` (§6).
    pub ref_frames: [RefFrameEntry; 15],
    pub slices: Vec<HevcSliceParams>,
}

#[derive(Debug, Clone)]
pub struct Av1PicParams {
    pub frame_header: Av1FrameHeader,
    pub ref_frames: [RefFrameEntry; 8],
    pub tile_data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum CodecPicParams {
    Avc(AvcPicParams),
    Hevc(HevcPicParams),
    Av1(Av1PicParams),
}

/// Common envelope plus the codec-tagged union (§6).
#[derive(Debug, Clone)]
pub struct PicParams {
    pub width: u32,
    pub height: u32,
    /// Current picture's surface index, i.e. where the decoded samples
    /// will land.
    pub curr_pic_idx: u8,
    pub field_pic_flag: bool,
    pub bottom_field_flag: bool,
    /// Contiguous bytes of this picture's NAL units/OBUs.
    pub bitstream: Vec<u8>,
    pub num_slices: u32,
    pub codec: CodecPicParams,
}
