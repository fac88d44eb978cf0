//! AV1 bitstream parsing: OBU framing, sequence/frame header syntax,
//! tile group extraction and the §7.8 reference-frame derivation process.

pub mod consts;
pub mod error;
pub mod frame_header;
pub mod obu;
pub mod rps;
pub mod sequence_header;
pub mod tile_group;

pub use error::{Av1Error, Result};
pub use frame_header::{
    parse_frame_header, parse_frame_header_from_reader, get_qindex, CdefParams, DeltaLfParams,
    DeltaQParams, FilmGrainParams, FrameHeader, FrameType, GlobalMotionParams, GlobalMotionType,
    LoopFilterParams, LrParams, QuantizationParams, RefFrameContext, RefFrameState,
    RestorationType, SegmentationParams, TileInfo, TxMode,
};
pub use obu::{parse_obu, parse_obu_header, Obu, ObuHeader, ObuIterator, ObuType};
pub use rps::{get_relative_dist, set_frame_refs};
pub use sequence_header::{
    parse_sequence_header, Av1Profile, ChromaSamplePosition, ColorConfig, ColorPrimaries,
    DecoderModelInfo, MatrixCoefficients, OperatingPoint, SequenceHeader, TimingInfo,
    TransferCharacteristics,
};
pub use tile_group::{parse_tile_group, Tile, TileGroup};
