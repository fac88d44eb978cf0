//! H.264/AVC bitstream parsing: NAL framing, SPS/PPS/slice-header syntax,
//! picture-order-count derivation and reference-list construction.

pub mod error;
pub mod nal;
pub mod poc;
pub mod pps;
pub mod ref_list;
pub mod rps;
pub mod slice;
pub mod sps;

pub use error::{AvcError, Result};
pub use nal::{parse_nal_header, parse_nal_units, NalUnit, NalUnitHeader, NalUnitType};
pub use poc::{PicOrderCnt, PocState};
pub use pps::{parse_pps, Pps};
pub use ref_list::{assign_pic_nums, build_ref_pic_lists, RefFrame, RefPicLists};
pub use rps::{apply_mmco, sliding_window, MarkingDecision, MarkingOutcome};
pub use slice::{parse_slice_header, SliceHeader, SliceType};
pub use sps::{parse_sps, ChromaFormat, ProfileIdc, Sps};
