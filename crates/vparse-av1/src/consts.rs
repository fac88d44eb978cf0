//! Fixed constants from the AV1 specification (§3 Symbols and abbreviated
//! terms, and the per-section tables they parameterize).

pub const NUM_REF_FRAMES: usize = 8;
pub const REFS_PER_FRAME: usize = 7;
pub const TOTAL_REFS_PER_FRAME: usize = 8;
pub const PRIMARY_REF_NONE: u32 = 7;

pub const SELECT_SCREEN_CONTENT_TOOLS: u32 = 2;
pub const SELECT_INTEGER_MV: u32 = 2;

pub const MAX_SEGMENTS: usize = 8;
pub const SEG_LVL_MAX: usize = 8;
pub const SEG_LVL_ALT_Q: usize = 0;
pub const SEG_LVL_REF_FRAME: usize = 5;
pub const SEG_LVL_SKIP: usize = 6;
pub const SEG_LVL_GLOBALMV: usize = 7;

pub const MAX_LOOP_FILTER: i32 = 63;

pub const SUPERRES_NUM: u32 = 8;
pub const SUPERRES_DENOM_MIN: u32 = 9;
pub const SUPERRES_DENOM_BITS: u8 = 3;

pub const MAX_TILE_WIDTH: u32 = 4096;
pub const MAX_TILE_AREA: u32 = 4096 * 2304;
pub const MAX_TILE_COLS: u32 = 64;
pub const MAX_TILE_ROWS: u32 = 64;

pub const WARPEDMODEL_PREC_BITS: i32 = 16;
pub const GM_ABS_ALPHA_BITS: u8 = 12;
pub const GM_ALPHA_PREC_BITS: i32 = 15;
pub const GM_ABS_TRANS_BITS: u8 = 12;
pub const GM_TRANS_PREC_BITS: i32 = 6;
pub const GM_ABS_TRANS_ONLY_BITS: u8 = 9;
pub const GM_TRANS_ONLY_PREC_BITS: i32 = 3;

pub const RESTORATION_TILESIZE_MAX: u32 = 256;

/// Per-feature bit widths for `segmentation_feature_bits` (7-32 Table).
pub const SEGMENTATION_FEATURE_BITS: [u8; SEG_LVL_MAX] = [8, 6, 6, 6, 6, 3, 0, 0];
/// Per-feature signedness for `segmentation_feature_signed`.
pub const SEGMENTATION_FEATURE_SIGNED: [bool; SEG_LVL_MAX] =
    [true, true, true, true, true, false, false, false];
/// Per-feature maximum magnitude for `segmentation_feature_max`, with
/// `MAX_LOOP_FILTER` substituted for the loop-filter deltas at parse time.
pub const SEGMENTATION_FEATURE_MAX: [i32; SEG_LVL_MAX] = [255, 63 * 4, 63 * 4, 63 * 4, 63 * 4, 7, 0, 0];

/// Reference frame indices (§6.10.24), `NONE = -1` handled separately.
pub const INTRA_FRAME: usize = 0;
pub const LAST_FRAME: usize = 1;
pub const LAST2_FRAME: usize = 2;
pub const LAST3_FRAME: usize = 3;
pub const GOLDEN_FRAME: usize = 4;
pub const BWDREF_FRAME: usize = 5;
pub const ALTREF2_FRAME: usize = 6;
pub const ALTREF_FRAME: usize = 7;
