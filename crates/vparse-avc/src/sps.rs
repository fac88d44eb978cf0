//! H.264/AVC Sequence Parameter Set (SPS) parsing.

use crate::error::{AvcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use vparse_core::BitReader;

/// H.264/AVC Profile IDC values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProfileIdc {
    Baseline = 66,
    Main = 77,
    Extended = 88,
    High = 100,
    High10 = 110,
    High422 = 122,
    High444 = 244,
    Cavlc444 = 44,
    ScalableBaseline = 83,
    ScalableHigh = 86,
    MultiviewHigh = 118,
    StereoHigh = 128,
    Unknown = 0,
}

impl ProfileIdc {
    pub fn from_u8(value: u8) -> Self {
        match value {
            66 => ProfileIdc::Baseline,
            77 => ProfileIdc::Main,
            88 => ProfileIdc::Extended,
            100 => ProfileIdc::High,
            110 => ProfileIdc::High10,
            122 => ProfileIdc::High422,
            244 => ProfileIdc::High444,
            44 => ProfileIdc::Cavlc444,
            83 => ProfileIdc::ScalableBaseline,
            86 => ProfileIdc::ScalableHigh,
            118 => ProfileIdc::MultiviewHigh,
            128 => ProfileIdc::StereoHigh,
            _ => ProfileIdc::Unknown,
        }
    }

    /// Profiles that carry the high-profile extension syntax (chroma format,
    /// bit depth, scaling matrices) right after `level_idc`.
    pub fn is_high_profile(&self) -> bool {
        matches!(
            self,
            ProfileIdc::High
                | ProfileIdc::High10
                | ProfileIdc::High422
                | ProfileIdc::High444
                | ProfileIdc::Cavlc444
                | ProfileIdc::ScalableHigh
                | ProfileIdc::MultiviewHigh
                | ProfileIdc::StereoHigh
        )
    }
}

impl fmt::Display for ProfileIdc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProfileIdc::Baseline => "Baseline",
            ProfileIdc::Main => "Main",
            ProfileIdc::Extended => "Extended",
            ProfileIdc::High => "High",
            ProfileIdc::High10 => "High 10",
            ProfileIdc::High422 => "High 4:2:2",
            ProfileIdc::High444 => "High 4:4:4",
            ProfileIdc::Cavlc444 => "CAVLC 4:4:4",
            ProfileIdc::ScalableBaseline => "Scalable Baseline",
            ProfileIdc::ScalableHigh => "Scalable High",
            ProfileIdc::MultiviewHigh => "Multiview High",
            ProfileIdc::StereoHigh => "Stereo High",
            ProfileIdc::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

/// Chroma sampling format (Table 6-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChromaFormat {
    Monochrome = 0,
    #[default]
    Yuv420 = 1,
    Yuv422 = 2,
    Yuv444 = 3,
}

impl ChromaFormat {
    /// Caller must validate the raw `chroma_format_idc` is in `0..=3` first;
    /// see the bounds check in `parse_sps`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ChromaFormat::Monochrome,
            1 => ChromaFormat::Yuv420,
            2 => ChromaFormat::Yuv422,
            3 => ChromaFormat::Yuv444,
            _ => ChromaFormat::Yuv420,
        }
    }

    pub fn sub_width_c(&self) -> u32 {
        match self {
            ChromaFormat::Monochrome => 0,
            ChromaFormat::Yuv420 | ChromaFormat::Yuv422 => 2,
            ChromaFormat::Yuv444 => 1,
        }
    }

    pub fn sub_height_c(&self) -> u32 {
        match self {
            ChromaFormat::Monochrome => 0,
            ChromaFormat::Yuv420 => 2,
            ChromaFormat::Yuv422 | ChromaFormat::Yuv444 => 1,
        }
    }
}

/// VUI (Video Usability Information) parameters, trimmed to the fields
/// `VideoFormat` and the DPB-sizing logic forward.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VuiParameters {
    pub aspect_ratio_info_present_flag: bool,
    pub aspect_ratio_idc: u8,
    pub sar_width: u16,
    pub sar_height: u16,
    pub video_signal_type_present_flag: bool,
    pub video_format: u8,
    pub video_full_range_flag: bool,
    pub colour_description_present_flag: bool,
    pub colour_primaries: u8,
    pub transfer_characteristics: u8,
    pub matrix_coefficients: u8,
    pub timing_info_present_flag: bool,
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub fixed_frame_rate_flag: bool,
    pub bitstream_restriction_flag: bool,
    /// max_num_reorder_frames: feeds `Dpb::conditional_bump`'s reorder bound.
    pub max_num_reorder_frames: u32,
    /// max_dec_frame_buffering: feeds `Dpb::size` when VUI is present.
    pub max_dec_frame_buffering: u32,
}

/// Sequence Parameter Set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sps {
    pub profile_idc: ProfileIdc,
    pub constraint_set0_flag: bool,
    pub constraint_set1_flag: bool,
    pub constraint_set2_flag: bool,
    pub constraint_set3_flag: bool,
    pub constraint_set4_flag: bool,
    pub constraint_set5_flag: bool,
    pub level_idc: u8,
    pub seq_parameter_set_id: u8,
    pub chroma_format_idc: ChromaFormat,
    pub separate_colour_plane_flag: bool,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub qpprime_y_zero_transform_bypass_flag: bool,
    pub seq_scaling_matrix_present_flag: bool,
    pub log2_max_frame_num_minus4: u8,
    pub pic_order_cnt_type: u8,
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    pub delta_pic_order_always_zero_flag: bool,
    pub offset_for_non_ref_pic: i32,
    pub offset_for_top_to_bottom_field: i32,
    pub num_ref_frames_in_pic_order_cnt_cycle: u8,
    pub offset_for_ref_frame: Vec<i32>,
    pub max_num_ref_frames: u32,
    pub gaps_in_frame_num_value_allowed_flag: bool,
    pub pic_width_in_mbs_minus1: u32,
    pub pic_height_in_map_units_minus1: u32,
    pub frame_mbs_only_flag: bool,
    pub mb_adaptive_frame_field_flag: bool,
    pub direct_8x8_inference_flag: bool,
    pub frame_cropping_flag: bool,
    pub frame_crop_left_offset: u32,
    pub frame_crop_right_offset: u32,
    pub frame_crop_top_offset: u32,
    pub frame_crop_bottom_offset: u32,
    pub vui_parameters_present_flag: bool,
    pub vui_parameters: Option<VuiParameters>,
    pub received: bool,
}

impl Sps {
    pub fn pic_width(&self) -> u32 {
        (self.pic_width_in_mbs_minus1 + 1) * 16
    }

    pub fn pic_height(&self) -> u32 {
        let frame_height_in_mbs =
            (2 - self.frame_mbs_only_flag as u32) * (self.pic_height_in_map_units_minus1 + 1);
        frame_height_in_mbs * 16
    }

    pub fn display_width(&self) -> u32 {
        let width = self.pic_width();
        if self.frame_cropping_flag {
            let crop_unit_x = if self.chroma_format_idc == ChromaFormat::Monochrome {
                1
            } else {
                self.chroma_format_idc.sub_width_c()
            };
            width - crop_unit_x * (self.frame_crop_left_offset + self.frame_crop_right_offset)
        } else {
            width
        }
    }

    pub fn display_height(&self) -> u32 {
        let height = self.pic_height();
        if self.frame_cropping_flag {
            let crop_unit_y = if self.chroma_format_idc == ChromaFormat::Monochrome {
                1
            } else {
                self.chroma_format_idc.sub_height_c()
            } * (2 - self.frame_mbs_only_flag as u32);
            height - crop_unit_y * (self.frame_crop_top_offset + self.frame_crop_bottom_offset)
        } else {
            height
        }
    }

    pub fn bit_depth_luma(&self) -> u8 {
        self.bit_depth_luma_minus8 + 8
    }

    pub fn bit_depth_chroma(&self) -> u8 {
        self.bit_depth_chroma_minus8 + 8
    }

    /// `MaxFrameNum = 2^(log2_max_frame_num_minus4 + 4)` (Eq 7-10).
    pub fn max_frame_num(&self) -> u32 {
        1u32 << (self.log2_max_frame_num_minus4 + 4)
    }

    /// `MaxPicOrderCntLsb = 2^(log2_max_pic_order_cnt_lsb_minus4 + 4)` (Eq 7-11).
    pub fn max_pic_order_cnt_lsb(&self) -> u32 {
        1u32 << (self.log2_max_pic_order_cnt_lsb_minus4 + 4)
    }

    /// DPB size: VUI's `max_dec_frame_buffering` when present, else
    /// `max_num_ref_frames` as the conservative fallback (Annex A.3.1/E.2.1).
    pub fn dpb_size(&self) -> u32 {
        self.vui_parameters
            .as_ref()
            .filter(|vui| vui.bitstream_restriction_flag)
            .map(|vui| vui.max_dec_frame_buffering)
            .unwrap_or(self.max_num_ref_frames)
            .max(1)
    }

    /// Display-reorder bound: VUI's `max_num_reorder_frames` when present,
    /// else conservatively equal to the DPB size.
    pub fn max_num_reorder_frames(&self) -> u32 {
        self.vui_parameters
            .as_ref()
            .filter(|vui| vui.bitstream_restriction_flag)
            .map(|vui| vui.max_num_reorder_frames)
            .unwrap_or_else(|| self.dpb_size())
    }
}

/// Parse SPS from NAL unit payload (after the NAL header byte).
pub fn parse_sps(data: &[u8]) -> Result<Sps> {
    let mut reader = BitReader::new(data);

    let profile_idc = ProfileIdc::from_u8(reader.read_bits(8)? as u8);
    let constraint_set0_flag = reader.read_flag()?;
    let constraint_set1_flag = reader.read_flag()?;
    let constraint_set2_flag = reader.read_flag()?;
    let constraint_set3_flag = reader.read_flag()?;
    let constraint_set4_flag = reader.read_flag()?;
    let constraint_set5_flag = reader.read_flag()?;
    let reserved_zero_2bits = reader.read_bits(2)?;
    if reserved_zero_2bits != 0 {
        tracing::warn!(reserved_zero_2bits, "seq_parameter_set_rbsp reserved_zero_2bits is not 0");
    }
    let level_idc = reader.read_bits(8)? as u8;
    let seq_parameter_set_id = reader.read_ue()? as u8;

    let mut chroma_format_idc = ChromaFormat::Yuv420;
    let mut separate_colour_plane_flag = false;
    let mut bit_depth_luma_minus8 = 0u8;
    let mut bit_depth_chroma_minus8 = 0u8;
    let mut qpprime_y_zero_transform_bypass_flag = false;
    let mut seq_scaling_matrix_present_flag = false;

    if profile_idc.is_high_profile() || profile_idc == ProfileIdc::ScalableBaseline {
        let raw_chroma_format = reader.read_ue()?;
        if raw_chroma_format > 3 {
            return Err(AvcError::InvalidSps(format!(
                "chroma_format_idc {raw_chroma_format} exceeds maximum 3"
            )));
        }
        chroma_format_idc = ChromaFormat::from_u8(raw_chroma_format as u8);

        if chroma_format_idc == ChromaFormat::Yuv444 {
            separate_colour_plane_flag = reader.read_flag()?;
        }

        const MAX_BIT_DEPTH_MINUS8: u32 = 6;
        let raw_bit_depth_luma = reader.read_ue()?;
        if raw_bit_depth_luma > MAX_BIT_DEPTH_MINUS8 {
            return Err(AvcError::InvalidSps(format!(
                "bit_depth_luma_minus8 {raw_bit_depth_luma} exceeds maximum {MAX_BIT_DEPTH_MINUS8}"
            )));
        }
        bit_depth_luma_minus8 = raw_bit_depth_luma as u8;

        let raw_bit_depth_chroma = reader.read_ue()?;
        if raw_bit_depth_chroma > MAX_BIT_DEPTH_MINUS8 {
            return Err(AvcError::InvalidSps(format!(
                "bit_depth_chroma_minus8 {raw_bit_depth_chroma} exceeds maximum {MAX_BIT_DEPTH_MINUS8}"
            )));
        }
        bit_depth_chroma_minus8 = raw_bit_depth_chroma as u8;

        qpprime_y_zero_transform_bypass_flag = reader.read_flag()?;
        seq_scaling_matrix_present_flag = reader.read_flag()?;

        if seq_scaling_matrix_present_flag {
            let num_scaling_lists = if chroma_format_idc != ChromaFormat::Yuv444 {
                8
            } else {
                12
            };
            for i in 0..num_scaling_lists {
                let scaling_list_present_flag = reader.read_flag()?;
                if scaling_list_present_flag {
                    skip_scaling_list(&mut reader, if i < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    let log2_max_frame_num_minus4 = reader.read_ue()? as u8;
    let pic_order_cnt_type = reader.read_ue()? as u8;

    let mut log2_max_pic_order_cnt_lsb_minus4 = 0u8;
    let mut delta_pic_order_always_zero_flag = false;
    let mut offset_for_non_ref_pic = 0i32;
    let mut offset_for_top_to_bottom_field = 0i32;
    let mut num_ref_frames_in_pic_order_cnt_cycle = 0u8;
    let mut offset_for_ref_frame = Vec::new();

    match pic_order_cnt_type {
        0 => {
            log2_max_pic_order_cnt_lsb_minus4 = reader.read_ue()? as u8;
        }
        1 => {
            delta_pic_order_always_zero_flag = reader.read_flag()?;
            offset_for_non_ref_pic = reader.read_se()?;
            offset_for_top_to_bottom_field = reader.read_se()?;

            const MAX_REF_FRAMES_IN_CYCLE: u32 = 255;
            let raw_ref_cycle_count = reader.read_ue()?;
            if raw_ref_cycle_count > MAX_REF_FRAMES_IN_CYCLE {
                return Err(AvcError::InvalidSps(format!(
                    "num_ref_frames_in_pic_order_cnt_cycle {raw_ref_cycle_count} exceeds maximum {MAX_REF_FRAMES_IN_CYCLE}"
                )));
            }
            num_ref_frames_in_pic_order_cnt_cycle = raw_ref_cycle_count as u8;

            for _ in 0..num_ref_frames_in_pic_order_cnt_cycle {
                offset_for_ref_frame.push(reader.read_se()?);
            }
        }
        _ => {}
    }

    const MAX_NUM_REF_FRAMES: u32 = 32;
    let max_num_ref_frames = reader.read_ue()?;
    if max_num_ref_frames > MAX_NUM_REF_FRAMES {
        return Err(AvcError::InvalidSps(format!(
            "max_num_ref_frames {max_num_ref_frames} exceeds maximum {MAX_NUM_REF_FRAMES}"
        )));
    }

    let gaps_in_frame_num_value_allowed_flag = reader.read_flag()?;

    const MAX_PIC_DIMENSION_IN_MBS: u32 = 16384;
    let pic_width_in_mbs_minus1 = reader.read_ue()?;
    if pic_width_in_mbs_minus1 >= MAX_PIC_DIMENSION_IN_MBS {
        return Err(AvcError::InvalidSps(format!(
            "pic_width_in_mbs_minus1 {pic_width_in_mbs_minus1} exceeds maximum {MAX_PIC_DIMENSION_IN_MBS}"
        )));
    }
    let pic_height_in_map_units_minus1 = reader.read_ue()?;
    if pic_height_in_map_units_minus1 >= MAX_PIC_DIMENSION_IN_MBS {
        return Err(AvcError::InvalidSps(format!(
            "pic_height_in_map_units_minus1 {pic_height_in_map_units_minus1} exceeds maximum {MAX_PIC_DIMENSION_IN_MBS}"
        )));
    }

    let frame_mbs_only_flag = reader.read_flag()?;

    let mut mb_adaptive_frame_field_flag = false;
    if !frame_mbs_only_flag {
        mb_adaptive_frame_field_flag = reader.read_flag()?;
    }

    let direct_8x8_inference_flag = reader.read_flag()?;
    let frame_cropping_flag = reader.read_flag()?;

    let mut frame_crop_left_offset = 0;
    let mut frame_crop_right_offset = 0;
    let mut frame_crop_top_offset = 0;
    let mut frame_crop_bottom_offset = 0;

    if frame_cropping_flag {
        frame_crop_left_offset = reader.read_ue()?;
        frame_crop_right_offset = reader.read_ue()?;
        frame_crop_top_offset = reader.read_ue()?;
        frame_crop_bottom_offset = reader.read_ue()?;
    }

    let vui_parameters_present_flag = reader.read_flag()?;
    let vui_parameters = if vui_parameters_present_flag {
        Some(parse_vui(&mut reader)?)
    } else {
        None
    };

    Ok(Sps {
        profile_idc,
        constraint_set0_flag,
        constraint_set1_flag,
        constraint_set2_flag,
        constraint_set3_flag,
        constraint_set4_flag,
        constraint_set5_flag,
        level_idc,
        seq_parameter_set_id,
        chroma_format_idc,
        separate_colour_plane_flag,
        bit_depth_luma_minus8,
        bit_depth_chroma_minus8,
        qpprime_y_zero_transform_bypass_flag,
        seq_scaling_matrix_present_flag,
        log2_max_frame_num_minus4,
        pic_order_cnt_type,
        log2_max_pic_order_cnt_lsb_minus4,
        delta_pic_order_always_zero_flag,
        offset_for_non_ref_pic,
        offset_for_top_to_bottom_field,
        num_ref_frames_in_pic_order_cnt_cycle,
        offset_for_ref_frame,
        max_num_ref_frames,
        gaps_in_frame_num_value_allowed_flag,
        pic_width_in_mbs_minus1,
        pic_height_in_map_units_minus1,
        frame_mbs_only_flag,
        mb_adaptive_frame_field_flag,
        direct_8x8_inference_flag,
        frame_cropping_flag,
        frame_crop_left_offset,
        frame_crop_right_offset,
        frame_crop_top_offset,
        frame_crop_bottom_offset,
        vui_parameters_present_flag,
        vui_parameters,
        received: true,
    })
}

fn skip_scaling_list(reader: &mut BitReader, size: usize) -> Result<()> {
    let mut last_scale = 8i32;
    let mut next_scale = 8i32;

    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = reader.read_se()?;
            next_scale = (last_scale + delta_scale + 256) % 256;
        }
        last_scale = if next_scale == 0 {
            last_scale
        } else {
            next_scale
        };
    }

    Ok(())
}

fn parse_vui(reader: &mut BitReader) -> Result<VuiParameters> {
    let mut vui = VuiParameters::default();

    vui.aspect_ratio_info_present_flag = reader.read_flag()?;
    if vui.aspect_ratio_info_present_flag {
        vui.aspect_ratio_idc = reader.read_bits(8)? as u8;
        if vui.aspect_ratio_idc == 255 {
            vui.sar_width = reader.read_bits(16)? as u16;
            vui.sar_height = reader.read_bits(16)? as u16;
        }
    }

    let overscan_info_present_flag = reader.read_flag()?;
    if overscan_info_present_flag {
        let _overscan_appropriate_flag = reader.read_flag()?;
    }

    vui.video_signal_type_present_flag = reader.read_flag()?;
    if vui.video_signal_type_present_flag {
        vui.video_format = reader.read_bits(3)? as u8;
        vui.video_full_range_flag = reader.read_flag()?;
        vui.colour_description_present_flag = reader.read_flag()?;
        if vui.colour_description_present_flag {
            vui.colour_primaries = reader.read_bits(8)? as u8;
            vui.transfer_characteristics = reader.read_bits(8)? as u8;
            vui.matrix_coefficients = reader.read_bits(8)? as u8;
        }
    }

    let chroma_loc_info_present_flag = reader.read_flag()?;
    if chroma_loc_info_present_flag {
        const MAX_CHROMA_LOC_TYPE: u32 = 64;
        let top = reader.read_ue()?;
        if top > MAX_CHROMA_LOC_TYPE {
            return Err(AvcError::InvalidSps(format!(
                "chroma_sample_loc_type_top_field {top} exceeds maximum {MAX_CHROMA_LOC_TYPE}"
            )));
        }
        let bottom = reader.read_ue()?;
        if bottom > MAX_CHROMA_LOC_TYPE {
            return Err(AvcError::InvalidSps(format!(
                "chroma_sample_loc_type_bottom_field {bottom} exceeds maximum {MAX_CHROMA_LOC_TYPE}"
            )));
        }
    }

    vui.timing_info_present_flag = reader.read_flag()?;
    if vui.timing_info_present_flag {
        vui.num_units_in_tick = reader.read_bits(32)?;
        vui.time_scale = reader.read_bits(32)?;
        vui.fixed_frame_rate_flag = reader.read_flag()?;
    }

    let nal_hrd_parameters_present_flag = reader.read_flag()?;
    if nal_hrd_parameters_present_flag {
        skip_hrd_parameters(reader)?;
    }

    let vcl_hrd_parameters_present_flag = reader.read_flag()?;
    if vcl_hrd_parameters_present_flag {
        skip_hrd_parameters(reader)?;
    }

    if nal_hrd_parameters_present_flag || vcl_hrd_parameters_present_flag {
        let _low_delay_hrd_flag = reader.read_flag()?;
    }

    let _pic_struct_present_flag = reader.read_flag()?;
    vui.bitstream_restriction_flag = reader.read_flag()?;

    if vui.bitstream_restriction_flag {
        let _motion_vectors_over_pic_boundaries_flag = reader.read_flag()?;
        let _max_bytes_per_pic_denom = reader.read_ue()?;
        let _max_bits_per_mb_denom = reader.read_ue()?;
        let _log2_max_mv_length_horizontal = reader.read_ue()?;
        let _log2_max_mv_length_vertical = reader.read_ue()?;

        const MAX_NUM_REORDER_FRAMES: u32 = 16;
        const MAX_DEC_FRAME_BUFFERING: u32 = 32;
        vui.max_num_reorder_frames = reader.read_ue()?;
        if vui.max_num_reorder_frames > MAX_NUM_REORDER_FRAMES {
            return Err(AvcError::InvalidSps(format!(
                "max_num_reorder_frames {} exceeds maximum {MAX_NUM_REORDER_FRAMES}",
                vui.max_num_reorder_frames
            )));
        }
        vui.max_dec_frame_buffering = reader.read_ue()?;
        if vui.max_dec_frame_buffering > MAX_DEC_FRAME_BUFFERING {
            return Err(AvcError::InvalidSps(format!(
                "max_dec_frame_buffering {} exceeds maximum {MAX_DEC_FRAME_BUFFERING}",
                vui.max_dec_frame_buffering
            )));
        }
    }

    Ok(vui)
}

fn skip_hrd_parameters(reader: &mut BitReader) -> Result<()> {
    const MAX_CPB_COUNT: u32 = 32;
    let cpb_cnt_minus1 = reader.read_ue()?;

    if cpb_cnt_minus1 > MAX_CPB_COUNT {
        return Err(AvcError::InvalidSps(format!(
            "cpb_cnt_minus1 {cpb_cnt_minus1} exceeds maximum {MAX_CPB_COUNT}"
        )));
    }

    let _bit_rate_scale = reader.read_bits(4)?;
    let _cpb_size_scale = reader.read_bits(4)?;

    for _ in 0..=cpb_cnt_minus1 {
        let _bit_rate_value_minus1 = reader.read_ue()?;
        let _cpb_size_value_minus1 = reader.read_ue()?;
        let _cbr_flag = reader.read_flag()?;
    }

    let _initial_cpb_removal_delay_length_minus1 = reader.read_bits(5)?;
    let _cpb_removal_delay_length_minus1 = reader.read_bits(5)?;
    let _dpb_output_delay_length_minus1 = reader.read_bits(5)?;
    let _time_offset_length = reader.read_bits(5)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_idc_roundtrip() {
        assert_eq!(ProfileIdc::from_u8(66), ProfileIdc::Baseline);
        assert_eq!(ProfileIdc::from_u8(100), ProfileIdc::High);
        assert!(ProfileIdc::High.is_high_profile());
        assert!(!ProfileIdc::Baseline.is_high_profile());
    }

    #[test]
    fn chroma_format_subsampling() {
        assert_eq!(ChromaFormat::from_u8(1), ChromaFormat::Yuv420);
        assert_eq!(ChromaFormat::Yuv420.sub_width_c(), 2);
        assert_eq!(ChromaFormat::Yuv420.sub_height_c(), 2);
        assert_eq!(ChromaFormat::Yuv444.sub_width_c(), 1);
    }

    #[test]
    fn dpb_size_falls_back_to_max_ref_frames_without_vui() {
        let sps = Sps {
            profile_idc: ProfileIdc::Baseline,
            constraint_set0_flag: false,
            constraint_set1_flag: false,
            constraint_set2_flag: false,
            constraint_set3_flag: false,
            constraint_set4_flag: false,
            constraint_set5_flag: false,
            level_idc: 30,
            seq_parameter_set_id: 0,
            chroma_format_idc: ChromaFormat::Yuv420,
            separate_colour_plane_flag: false,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            qpprime_y_zero_transform_bypass_flag: false,
            seq_scaling_matrix_present_flag: false,
            log2_max_frame_num_minus4: 4,
            pic_order_cnt_type: 0,
            log2_max_pic_order_cnt_lsb_minus4: 2,
            delta_pic_order_always_zero_flag: false,
            offset_for_non_ref_pic: 0,
            offset_for_top_to_bottom_field: 0,
            num_ref_frames_in_pic_order_cnt_cycle: 0,
            offset_for_ref_frame: Vec::new(),
            max_num_ref_frames: 4,
            gaps_in_frame_num_value_allowed_flag: false,
            pic_width_in_mbs_minus1: 79,
            pic_height_in_map_units_minus1: 44,
            frame_mbs_only_flag: true,
            mb_adaptive_frame_field_flag: false,
            direct_8x8_inference_flag: true,
            frame_cropping_flag: false,
            frame_crop_left_offset: 0,
            frame_crop_right_offset: 0,
            frame_crop_top_offset: 0,
            frame_crop_bottom_offset: 0,
            vui_parameters_present_flag: false,
            vui_parameters: None,
            received: true,
        };
        assert_eq!(sps.dpb_size(), 4);
        assert_eq!(sps.max_num_reorder_frames(), 4);
        assert_eq!(sps.max_frame_num(), 1 << 8);
        assert_eq!(sps.max_pic_order_cnt_lsb(), 1 << 6);
    }
}
