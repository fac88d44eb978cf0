//! Per-stream session orchestration: DPB management, decode/display
//! surface pooling, output reordering, and the per-codec parser cores
//! (AVC, HEVC, AV1) that turn parsed syntax into hardware-decoder-ready
//! `PicParams`.

pub mod callbacks;
pub mod config;
pub mod core;
pub mod decode_pool;
pub mod dpb;
pub mod error;
pub mod output_reorder;
pub mod pic_params;
pub mod session;

pub use callbacks::{AspectRatio, DispInfo, ParserCallbacks, PacketFlags, SeiMessageInfo, VideoFormat};
pub use config::{Codec, SessionConfig};
pub use decode_pool::{DecodePool, DecodeSurface};
pub use dpb::{Dpb, DpbSlot, ReferenceState, UseStatus, MAX_DPB_FRAMES};
pub use error::{ParserError, Result};
pub use output_reorder::OutputReorder;
pub use pic_params::{
    Av1PicParams, AvcPicParams, AvcSliceParams, CodecPicParams, HevcPicParams, HevcSliceParams,
    PicParams, RefFrameEntry,
};
pub use session::ParserSession;
