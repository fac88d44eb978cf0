//! H.265/HEVC bitstream parsing: NAL framing, VPS/SPS/PPS/slice-header
//! syntax, scaling lists, picture-order-count derivation, reference picture
//! set derivation, reference-list construction, and DPB management.

pub mod dpb;
pub mod error;
pub mod nal;
pub mod poc;
pub mod pps;
pub mod ref_list;
pub mod rps;
pub mod scaling_list;
pub mod slice;
pub mod sps;
pub mod vps;

pub use dpb::{Dpb, DpbFrame, ReferenceMarking};
pub use error::{HevcError, Result};
pub use nal::{parse_nal_header, parse_nal_units, NalUnit, NalUnitHeader, NalUnitType};
pub use poc::PocState;
pub use pps::{parse_pps, Pps, TileConfig};
pub use ref_list::{build_ref_pic_lists, RefPicLists, RefPicSetIndices};
pub use rps::{derive_rps, parse_short_term_ref_pic_set, DerivedRps, ShortTermRefPicSet};
pub use scaling_list::{parse_scaling_list_data, ScalingListData};
pub use slice::{
    parse_slice_header, LongTermRefPicSet, PredWeightTable, RefPicListModification, SliceHeader,
    SliceType,
};
pub use sps::{parse_sps, ChromaFormat, PcmInfo, Sps, VuiParameters};
pub use vps::{parse_vps, ProfileTierLevel, Vps};
