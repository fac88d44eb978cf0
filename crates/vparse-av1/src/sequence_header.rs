//! Sequence header OBU syntax (§5.5).

use serde::{Deserialize, Serialize};
use vparse_core::BitReader;

use crate::consts::SELECT_INTEGER_MV;
use crate::error::Result;

/// `seq_profile` (§6.4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Av1Profile {
    Main,
    High,
    Professional,
    Reserved(u8),
}

impl Av1Profile {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Main,
            1 => Self::High,
            2 => Self::Professional,
            other => Self::Reserved(other),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::High => "high",
            Self::Professional => "professional",
            Self::Reserved(_) => "reserved",
        }
    }
}

/// `color_primaries` (§6.4.2, CICP Table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorPrimaries {
    Bt709,
    Unspecified,
    Bt470M,
    Bt470BG,
    Smpte170M,
    Smpte240M,
    Film,
    Bt2020,
    Xyz,
    Smpte431,
    Smpte432,
    Ebu3213,
    Reserved(u8),
}

impl ColorPrimaries {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Bt709,
            2 => Self::Unspecified,
            4 => Self::Bt470M,
            5 => Self::Bt470BG,
            6 => Self::Smpte170M,
            7 => Self::Smpte240M,
            8 => Self::Film,
            9 => Self::Bt2020,
            10 => Self::Xyz,
            11 => Self::Smpte431,
            12 => Self::Smpte432,
            22 => Self::Ebu3213,
            other => Self::Reserved(other),
        }
    }
}

/// `transfer_characteristics` (§6.4.2, CICP Table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferCharacteristics {
    Bt709,
    Unspecified,
    Bt470M,
    Bt470BG,
    Bt601,
    Smpte240,
    Linear,
    Log100,
    Log100Sqrt10,
    Iec61966,
    Bt1361,
    Srgb,
    Bt2020TenBit,
    Bt2020TwelveBit,
    Smpte2084,
    Smpte428,
    Hlg,
    Reserved(u8),
}

impl TransferCharacteristics {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Bt709,
            2 => Self::Unspecified,
            4 => Self::Bt470M,
            5 => Self::Bt470BG,
            6 => Self::Bt601,
            7 => Self::Smpte240,
            8 => Self::Linear,
            9 => Self::Log100,
            10 => Self::Log100Sqrt10,
            11 => Self::Iec61966,
            12 => Self::Bt1361,
            13 => Self::Srgb,
            14 => Self::Bt2020TenBit,
            15 => Self::Bt2020TwelveBit,
            16 => Self::Smpte2084,
            17 => Self::Smpte428,
            18 => Self::Hlg,
            other => Self::Reserved(other),
        }
    }
}

/// `matrix_coefficients` (§6.4.2, CICP Table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixCoefficients {
    Identity,
    Bt709,
    Unspecified,
    Fcc,
    Bt470BG,
    Bt601,
    Smpte240,
    SmpteYcgco,
    Bt2020Ncl,
    Bt2020Cl,
    Smpte2085,
    ChromatNcl,
    ChromatCl,
    Ictcp,
    Reserved(u8),
}

impl MatrixCoefficients {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Identity,
            1 => Self::Bt709,
            2 => Self::Unspecified,
            4 => Self::Fcc,
            5 => Self::Bt470BG,
            6 => Self::Bt601,
            7 => Self::Smpte240,
            8 => Self::SmpteYcgco,
            9 => Self::Bt2020Ncl,
            10 => Self::Bt2020Cl,
            11 => Self::Smpte2085,
            12 => Self::ChromatNcl,
            13 => Self::ChromatCl,
            14 => Self::Ictcp,
            other => Self::Reserved(other),
        }
    }
}

/// `chroma_sample_position` (§6.4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChromaSamplePosition {
    Unknown,
    Vertical,
    Colocated,
    Reserved,
}

impl ChromaSamplePosition {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Unknown,
            1 => Self::Vertical,
            2 => Self::Colocated,
            _ => Self::Reserved,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorConfig {
    pub bit_depth: u8,
    pub mono_chrome: bool,
    pub num_planes: u8,
    pub color_primaries: ColorPrimaries,
    pub transfer_characteristics: TransferCharacteristics,
    pub matrix_coefficients: MatrixCoefficients,
    pub color_range: bool,
    pub subsampling_x: u8,
    pub subsampling_y: u8,
    pub chroma_sample_position: ChromaSamplePosition,
    pub separate_uv_delta_q: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingInfo {
    pub num_units_in_display_tick: u32,
    pub time_scale: u32,
    pub equal_picture_interval: bool,
    pub num_ticks_per_picture_minus_1: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderModelInfo {
    pub buffer_delay_length_minus_1: u8,
    pub num_units_in_decoding_tick: u32,
    pub buffer_removal_time_length_minus_1: u8,
    pub frame_presentation_time_length_minus_1: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingPoint {
    pub idc: u16,
    pub seq_level_idx: u8,
    pub seq_tier: u8,
    pub decoder_model_present: bool,
    pub initial_display_delay_minus_1: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceHeader {
    pub profile: Av1Profile,
    pub still_picture: bool,
    pub reduced_still_picture_header: bool,
    pub timing_info: Option<TimingInfo>,
    pub decoder_model_info: Option<DecoderModelInfo>,
    pub operating_points: Vec<OperatingPoint>,

    pub frame_width_bits_minus_1: u8,
    pub frame_height_bits_minus_1: u8,
    pub max_frame_width: u32,
    pub max_frame_height: u32,

    pub frame_id_numbers_present: bool,
    pub delta_frame_id_length_minus_2: Option<u8>,
    pub additional_frame_id_length_minus_1: Option<u8>,

    pub use_128x128_superblock: bool,
    pub enable_filter_intra: bool,
    pub enable_intra_edge_filter: bool,

    pub enable_interintra_compound: bool,
    pub enable_masked_compound: bool,
    pub enable_warped_motion: bool,
    pub enable_dual_filter: bool,
    pub enable_order_hint: bool,
    pub enable_jnt_comp: bool,
    pub enable_ref_frame_mvs: bool,

    /// `SELECT_SCREEN_CONTENT_TOOLS` (2) means "decide per frame".
    pub seq_force_screen_content_tools: u32,
    /// `SELECT_INTEGER_MV` (2) means "decide per frame".
    pub seq_force_integer_mv: u32,
    pub order_hint_bits: u8,

    pub enable_superres: bool,
    pub enable_cdef: bool,
    pub enable_restoration: bool,

    pub color_config: ColorConfig,
    pub film_grain_params_present: bool,
}

impl SequenceHeader {
    pub fn width(&self) -> u32 {
        self.max_frame_width
    }

    pub fn height(&self) -> u32 {
        self.max_frame_height
    }

    pub fn bit_depth(&self) -> u8 {
        self.color_config.bit_depth
    }

    /// `seq_force_integer_mv == SELECT_INTEGER_MV` is the "decide per frame"
    /// sentinel; any other value is a fixed setting for every frame.
    pub fn force_integer_mv_is_selectable(&self) -> bool {
        self.seq_force_integer_mv == SELECT_INTEGER_MV
    }
}

fn parse_timing_info(r: &mut BitReader<'_>) -> Result<TimingInfo> {
    let num_units_in_display_tick = r.read_bits(32)?;
    let time_scale = r.read_bits(32)?;
    let equal_picture_interval = r.read_flag()?;
    let num_ticks_per_picture_minus_1 = if equal_picture_interval {
        Some(r.read_uvlc()?)
    } else {
        None
    };
    Ok(TimingInfo {
        num_units_in_display_tick,
        time_scale,
        equal_picture_interval,
        num_ticks_per_picture_minus_1,
    })
}

fn parse_decoder_model_info(r: &mut BitReader<'_>) -> Result<DecoderModelInfo> {
    Ok(DecoderModelInfo {
        buffer_delay_length_minus_1: r.read_bits(5)? as u8,
        num_units_in_decoding_tick: r.read_bits(32)?,
        buffer_removal_time_length_minus_1: r.read_bits(5)? as u8,
        frame_presentation_time_length_minus_1: r.read_bits(5)? as u8,
    })
}

/// `color_config()` (§5.5.2).
fn parse_color_config(r: &mut BitReader<'_>, profile: Av1Profile) -> Result<ColorConfig> {
    let high_bitdepth = r.read_flag()?;
    let bit_depth = if matches!(profile, Av1Profile::Professional) && high_bitdepth {
        if r.read_flag()? {
            12
        } else {
            10
        }
    } else if high_bitdepth {
        10
    } else {
        8
    };

    let mono_chrome = if matches!(profile, Av1Profile::High) {
        false
    } else {
        r.read_flag()?
    };
    let num_planes = if mono_chrome { 1 } else { 3 };

    let color_description_present_flag = r.read_flag()?;
    let (color_primaries, transfer_characteristics, matrix_coefficients) =
        if color_description_present_flag {
            (
                ColorPrimaries::from_u8(r.read_bits(8)? as u8),
                TransferCharacteristics::from_u8(r.read_bits(8)? as u8),
                MatrixCoefficients::from_u8(r.read_bits(8)? as u8),
            )
        } else {
            (
                ColorPrimaries::Unspecified,
                TransferCharacteristics::Unspecified,
                MatrixCoefficients::Unspecified,
            )
        };

    if mono_chrome {
        let color_range = r.read_flag()?;
        return Ok(ColorConfig {
            bit_depth,
            mono_chrome: true,
            num_planes,
            color_primaries,
            transfer_characteristics,
            matrix_coefficients,
            color_range,
            subsampling_x: 1,
            subsampling_y: 1,
            chroma_sample_position: ChromaSamplePosition::Unknown,
            separate_uv_delta_q: false,
        });
    }

    let (color_range, subsampling_x, subsampling_y);
    if color_primaries == ColorPrimaries::Bt709
        && transfer_characteristics == TransferCharacteristics::Srgb
        && matrix_coefficients == MatrixCoefficients::Identity
    {
        color_range = true;
        subsampling_x = 0;
        subsampling_y = 0;
    } else {
        color_range = r.read_flag()?;
        match profile {
            Av1Profile::Main => {
                subsampling_x = 1;
                subsampling_y = 1;
            }
            Av1Profile::High => {
                subsampling_x = 0;
                subsampling_y = 0;
            }
            _ => {
                if bit_depth == 12 {
                    subsampling_x = r.read_flag()? as u8;
                    subsampling_y = if subsampling_x == 1 {
                        r.read_flag()? as u8
                    } else {
                        0
                    };
                } else {
                    subsampling_x = 1;
                    subsampling_y = 0;
                }
            }
        }
    }

    let chroma_sample_position = if subsampling_x == 1 && subsampling_y == 1 {
        ChromaSamplePosition::from_u8(r.read_bits(2)? as u8)
    } else {
        ChromaSamplePosition::Unknown
    };

    let separate_uv_delta_q = r.read_flag()?;

    Ok(ColorConfig {
        bit_depth,
        mono_chrome: false,
        num_planes,
        color_primaries,
        transfer_characteristics,
        matrix_coefficients,
        color_range,
        subsampling_x,
        subsampling_y,
        chroma_sample_position,
        separate_uv_delta_q,
    })
}

/// `sequence_header_obu()` (§5.5.1).
pub fn parse_sequence_header(data: &[u8]) -> Result<SequenceHeader> {
    let mut r = BitReader::new(data);

    let profile = Av1Profile::from_u8(r.read_bits(3)? as u8);
    let still_picture = r.read_flag()?;
    let reduced_still_picture_header = r.read_flag()?;

    let mut timing_info = None;
    let mut decoder_model_info = None;
    let mut operating_points = Vec::new();
    let mut decoder_model_info_present_flag = false;

    if reduced_still_picture_header {
        operating_points.push(OperatingPoint {
            idc: 0,
            seq_level_idx: r.read_bits(5)? as u8,
            seq_tier: 0,
            decoder_model_present: false,
            initial_display_delay_minus_1: None,
        });
    } else {
        let timing_info_present_flag = r.read_flag()?;
        if timing_info_present_flag {
            timing_info = Some(parse_timing_info(&mut r)?);
            decoder_model_info_present_flag = r.read_flag()?;
            if decoder_model_info_present_flag {
                decoder_model_info = Some(parse_decoder_model_info(&mut r)?);
            }
        }

        let initial_display_delay_present_flag = r.read_flag()?;
        let operating_points_cnt_minus_1 = r.read_bits(5)?;
        for _ in 0..=operating_points_cnt_minus_1 {
            let idc = r.read_bits(12)? as u16;
            let seq_level_idx = r.read_bits(5)? as u8;
            let seq_tier = if seq_level_idx > 7 { r.read_bits(1)? as u8 } else { 0 };

            let decoder_model_present = if decoder_model_info_present_flag {
                let present = r.read_flag()?;
                if present {
                    let buf_delay_bits = decoder_model_info
                        .as_ref()
                        .map(|d| d.buffer_delay_length_minus_1 + 1)
                        .unwrap_or(0);
                    r.read_bits(buf_delay_bits)?;
                    r.read_bits(buf_delay_bits)?;
                    r.read_flag()?;
                }
                present
            } else {
                false
            };

            let initial_display_delay_minus_1 = if initial_display_delay_present_flag {
                if r.read_flag()? {
                    Some(r.read_bits(4)? as u8)
                } else {
                    None
                }
            } else {
                None
            };

            operating_points.push(OperatingPoint {
                idc,
                seq_level_idx,
                seq_tier,
                decoder_model_present,
                initial_display_delay_minus_1,
            });
        }
    }

    let frame_width_bits_minus_1 = r.read_bits(4)? as u8;
    let frame_height_bits_minus_1 = r.read_bits(4)? as u8;
    let max_frame_width = r.read_bits(frame_width_bits_minus_1 + 1)? + 1;
    let max_frame_height = r.read_bits(frame_height_bits_minus_1 + 1)? + 1;

    let frame_id_numbers_present = if reduced_still_picture_header {
        false
    } else {
        r.read_flag()?
    };
    let (delta_frame_id_length_minus_2, additional_frame_id_length_minus_1) =
        if frame_id_numbers_present {
            (Some(r.read_bits(4)? as u8), Some(r.read_bits(3)? as u8))
        } else {
            (None, None)
        };

    let use_128x128_superblock = r.read_flag()?;
    let enable_filter_intra = r.read_flag()?;
    let enable_intra_edge_filter = r.read_flag()?;

    let enable_interintra_compound;
    let enable_masked_compound;
    let enable_warped_motion;
    let enable_dual_filter;
    let enable_order_hint;
    let enable_jnt_comp;
    let enable_ref_frame_mvs;
    let seq_force_screen_content_tools;
    let seq_force_integer_mv;
    let order_hint_bits;

    if reduced_still_picture_header {
        enable_interintra_compound = false;
        enable_masked_compound = false;
        enable_warped_motion = false;
        enable_dual_filter = false;
        enable_order_hint = false;
        enable_jnt_comp = false;
        enable_ref_frame_mvs = false;
        seq_force_screen_content_tools = crate::consts::SELECT_SCREEN_CONTENT_TOOLS;
        seq_force_integer_mv = SELECT_INTEGER_MV;
        order_hint_bits = 0;
    } else {
        enable_interintra_compound = r.read_flag()?;
        enable_masked_compound = r.read_flag()?;
        enable_warped_motion = r.read_flag()?;
        enable_dual_filter = r.read_flag()?;
        enable_order_hint = r.read_flag()?;
        if enable_order_hint {
            enable_jnt_comp = r.read_flag()?;
            enable_ref_frame_mvs = r.read_flag()?;
        } else {
            enable_jnt_comp = false;
            enable_ref_frame_mvs = false;
        }

        let seq_choose_screen_content_tools = r.read_flag()?;
        seq_force_screen_content_tools = if seq_choose_screen_content_tools {
            crate::consts::SELECT_SCREEN_CONTENT_TOOLS
        } else {
            r.read_bits(1)?
        };
        seq_force_integer_mv = if seq_force_screen_content_tools > 0 {
            let seq_choose_integer_mv = r.read_flag()?;
            if seq_choose_integer_mv {
                SELECT_INTEGER_MV
            } else {
                r.read_bits(1)?
            }
        } else {
            SELECT_INTEGER_MV
        };

        order_hint_bits = if enable_order_hint {
            r.read_bits(3)? as u8 + 1
        } else {
            0
        };
    }

    let enable_superres = r.read_flag()?;
    let enable_cdef = r.read_flag()?;
    let enable_restoration = r.read_flag()?;

    let color_config = parse_color_config(&mut r, profile)?;

    let film_grain_params_present = r.read_flag()?;

    Ok(SequenceHeader {
        profile,
        still_picture,
        reduced_still_picture_header,
        timing_info,
        decoder_model_info,
        operating_points,
        frame_width_bits_minus_1,
        frame_height_bits_minus_1,
        max_frame_width,
        max_frame_height,
        frame_id_numbers_present,
        delta_frame_id_length_minus_2,
        additional_frame_id_length_minus_1,
        use_128x128_superblock,
        enable_filter_intra,
        enable_intra_edge_filter,
        enable_interintra_compound,
        enable_masked_compound,
        enable_warped_motion,
        enable_dual_filter,
        enable_order_hint,
        enable_jnt_comp,
        enable_ref_frame_mvs,
        seq_force_screen_content_tools,
        seq_force_integer_mv,
        order_hint_bits,
        enable_superres,
        enable_cdef,
        enable_restoration,
        color_config,
        film_grain_params_present,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal reduced_still_picture_header=1 sequence header:
    // profile(3)=0, still_picture(1)=1, reduced(1)=1, seq_level_idx(5)=0,
    // frame_width_bits_minus_1(4)=7, frame_height_bits_minus_1(4)=7,
    // max_frame_width_minus_1(8)=319 (320 wide), max_frame_height_minus_1(8)=239 (240 tall),
    // use_128x128_superblock=0, enable_filter_intra=0, enable_intra_edge_filter=0,
    // enable_superres=0, enable_cdef=0, enable_restoration=0,
    // color_config: high_bitdepth=0, mono_chrome=0, color_description_present_flag=0,
    //   color_range=0 (not the bt709/srgb/identity shortcut since primaries=unspecified),
    //   subsampling_x=1, subsampling_y=1 (profile Main), chroma_sample_position(2)=0,
    //   separate_uv_delta_q=0, film_grain_params_present=0
    fn minimal_reduced_still_picture_bytes() -> Vec<u8> {
        let mut bits: Vec<bool> = Vec::new();
        let mut push = |v: u32, n: u32| {
            for i in (0..n).rev() {
                bits.push((v >> i) & 1 == 1);
            }
        };
        push(0, 3); // seq_profile
        push(1, 1); // still_picture
        push(1, 1); // reduced_still_picture_header
        push(0, 5); // seq_level_idx[0]
        push(7, 4); // frame_width_bits_minus_1
        push(7, 4); // frame_height_bits_minus_1
        push(319, 8); // max_frame_width_minus_1
        push(239, 8); // max_frame_height_minus_1
        push(0, 1); // use_128x128_superblock
        push(0, 1); // enable_filter_intra
        push(0, 1); // enable_intra_edge_filter
        push(0, 1); // enable_superres
        push(0, 1); // enable_cdef
        push(0, 1); // enable_restoration
        push(0, 1); // high_bitdepth
        push(0, 1); // mono_chrome
        push(0, 1); // color_description_present_flag
        push(0, 1); // color_range
        push(0, 2); // chroma_sample_position
        push(0, 1); // separate_uv_delta_q
        push(0, 1); // film_grain_params_present

        let mut bytes = vec![0u8; bits.len().div_ceil(8)];
        for (i, bit) in bits.iter().enumerate() {
            if *bit {
                bytes[i / 8] |= 1 << (7 - (i % 8));
            }
        }
        bytes
    }

    #[test]
    fn reduced_still_picture_header_sets_select_sentinels() {
        let data = minimal_reduced_still_picture_bytes();
        let seq = parse_sequence_header(&data).unwrap();
        assert!(seq.reduced_still_picture_header);
        assert_eq!(seq.width(), 320);
        assert_eq!(seq.height(), 240);
        assert_eq!(seq.seq_force_screen_content_tools, crate::consts::SELECT_SCREEN_CONTENT_TOOLS);
        assert_eq!(seq.seq_force_integer_mv, SELECT_INTEGER_MV);
        assert_eq!(seq.order_hint_bits, 0);
        assert!(!seq.enable_order_hint);
    }

    #[test]
    fn color_config_defaults_to_420_for_main_profile() {
        let data = minimal_reduced_still_picture_bytes();
        let seq = parse_sequence_header(&data).unwrap();
        assert_eq!(seq.color_config.subsampling_x, 1);
        assert_eq!(seq.color_config.subsampling_y, 1);
        assert_eq!(seq.color_config.bit_depth, 8);
        assert_eq!(seq.color_config.num_planes, 3);
    }
}
