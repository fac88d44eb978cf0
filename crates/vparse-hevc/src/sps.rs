//! HEVC Sequence Parameter Set parsing (7.3.2.2).

use crate::error::Result;
use crate::rps::{parse_short_term_ref_pic_set, ShortTermRefPicSet};
use crate::scaling_list::{parse_scaling_list_data, ScalingListData};
use crate::vps::{parse_profile_tier_level, ProfileTierLevel};
use serde::{Deserialize, Serialize};
use vparse_core::BitReader;

/// Chroma sampling format (`chroma_format_idc`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChromaFormat {
    Monochrome = 0,
    Chroma420 = 1,
    Chroma422 = 2,
    Chroma444 = 3,
}

impl From<u8> for ChromaFormat {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Monochrome,
            2 => Self::Chroma422,
            3 => Self::Chroma444,
            _ => Self::Chroma420,
        }
    }
}

/// Video Usability Information (E.2.1), the subset `PicParams` and session
/// callbacks care about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VuiParameters {
    pub aspect_ratio_info_present_flag: bool,
    pub aspect_ratio_idc: Option<u8>,
    pub sar_width: Option<u16>,
    pub sar_height: Option<u16>,
    pub overscan_info_present_flag: bool,
    pub overscan_appropriate_flag: Option<bool>,
    pub video_signal_type_present_flag: bool,
    pub video_format: Option<u8>,
    pub video_full_range_flag: Option<bool>,
    pub colour_description_present_flag: Option<bool>,
    pub colour_primaries: Option<u8>,
    pub transfer_characteristics: Option<u8>,
    pub matrix_coeffs: Option<u8>,
    pub chroma_loc_info_present_flag: bool,
    pub timing_info_present_flag: bool,
    pub num_units_in_tick: Option<u32>,
    pub time_scale: Option<u32>,
}

/// PCM sample parameters (7.3.2.2.1, when `pcm_enabled_flag`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PcmInfo {
    pub pcm_sample_bit_depth_luma_minus1: u8,
    pub pcm_sample_bit_depth_chroma_minus1: u8,
    pub log2_min_pcm_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_pcm_luma_coding_block_size: u8,
    pub pcm_loop_filter_disabled_flag: bool,
}

/// HEVC Sequence Parameter Set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sps {
    pub sps_video_parameter_set_id: u8,
    pub sps_max_sub_layers_minus1: u8,
    pub sps_temporal_id_nesting_flag: bool,
    pub profile_tier_level: ProfileTierLevel,
    pub sps_seq_parameter_set_id: u8,
    pub chroma_format_idc: ChromaFormat,
    pub separate_colour_plane_flag: bool,
    pub pic_width_in_luma_samples: u32,
    pub pic_height_in_luma_samples: u32,
    pub conformance_window_flag: bool,
    pub conf_win_left_offset: u32,
    pub conf_win_right_offset: u32,
    pub conf_win_top_offset: u32,
    pub conf_win_bottom_offset: u32,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    pub sps_sub_layer_ordering_info_present_flag: bool,
    pub sps_max_dec_pic_buffering_minus1: Vec<u32>,
    pub sps_max_num_reorder_pics: Vec<u32>,
    pub sps_max_latency_increase_plus1: Vec<u32>,
    pub log2_min_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_luma_coding_block_size: u8,
    pub log2_min_luma_transform_block_size_minus2: u8,
    pub log2_diff_max_min_luma_transform_block_size: u8,
    pub max_transform_hierarchy_depth_inter: u8,
    pub max_transform_hierarchy_depth_intra: u8,
    pub scaling_list_enabled_flag: bool,
    pub scaling_list_data: Option<ScalingListData>,
    pub amp_enabled_flag: bool,
    pub sample_adaptive_offset_enabled_flag: bool,
    pub pcm_enabled_flag: bool,
    pub pcm_info: Option<PcmInfo>,
    pub num_short_term_ref_pic_sets: u8,
    pub short_term_ref_pic_sets: Vec<ShortTermRefPicSet>,
    pub long_term_ref_pics_present_flag: bool,
    pub num_long_term_ref_pics_sps: u8,
    /// (POC LSB, used_by_curr_pic) for each SPS-signalled long-term picture.
    pub lt_ref_pic_poc_lsb_sps: Vec<(u32, bool)>,
    pub sps_temporal_mvp_enabled_flag: bool,
    pub strong_intra_smoothing_enabled_flag: bool,
    pub vui_parameters_present_flag: bool,
    pub vui_parameters: Option<VuiParameters>,
    pub received: bool,
}

impl Sps {
    pub fn bit_depth_luma(&self) -> u8 {
        self.bit_depth_luma_minus8 + 8
    }

    pub fn bit_depth_chroma(&self) -> u8 {
        self.bit_depth_chroma_minus8 + 8
    }

    pub fn ctb_size(&self) -> u32 {
        1 << (self.log2_min_luma_coding_block_size_minus3
            + 3
            + self.log2_diff_max_min_luma_coding_block_size)
    }

    pub fn min_cb_size(&self) -> u32 {
        1 << (self.log2_min_luma_coding_block_size_minus3 + 3)
    }

    pub fn pic_width_in_ctbs(&self) -> u32 {
        let ctb_size = self.ctb_size();
        (self.pic_width_in_luma_samples + ctb_size - 1) / ctb_size
    }

    pub fn pic_height_in_ctbs(&self) -> u32 {
        let ctb_size = self.ctb_size();
        (self.pic_height_in_luma_samples + ctb_size - 1) / ctb_size
    }

    pub fn display_width(&self) -> u32 {
        let sub_width_c = match self.chroma_format_idc {
            ChromaFormat::Chroma420 | ChromaFormat::Chroma422 => 2,
            _ => 1,
        };
        self.pic_width_in_luma_samples
            - sub_width_c * (self.conf_win_left_offset + self.conf_win_right_offset)
    }

    pub fn display_height(&self) -> u32 {
        let sub_height_c = match self.chroma_format_idc {
            ChromaFormat::Chroma420 => 2,
            _ => 1,
        };
        self.pic_height_in_luma_samples
            - sub_height_c * (self.conf_win_top_offset + self.conf_win_bottom_offset)
    }

    pub fn max_poc_lsb(&self) -> u32 {
        1 << (self.log2_max_pic_order_cnt_lsb_minus4 + 4)
    }

    /// `sps_max_dec_pic_buffering_minus1[HighestTid] + 1`: DPB size at the
    /// highest temporal sub-layer, the value callers size their DPB to.
    pub fn dpb_size(&self) -> u32 {
        self.sps_max_dec_pic_buffering_minus1
            .last()
            .copied()
            .unwrap_or(0)
            + 1
    }

    pub fn max_num_reorder_pics(&self) -> u32 {
        self.sps_max_num_reorder_pics.last().copied().unwrap_or(0)
    }
}

/// Parse SPS from RBSP data (after the 2-byte NAL header).
pub fn parse_sps(data: &[u8]) -> Result<Sps> {
    let mut reader = BitReader::new(data);

    let sps_video_parameter_set_id = reader.read_bits(4)? as u8;
    let sps_max_sub_layers_minus1 = reader.read_bits(3)? as u8;
    let sps_temporal_id_nesting_flag = reader.read_flag()?;

    let profile_tier_level = parse_profile_tier_level(&mut reader, true, sps_max_sub_layers_minus1)?;

    let sps_seq_parameter_set_id = reader.read_ue()? as u8;
    let chroma_format_idc = ChromaFormat::from(reader.read_ue()? as u8);
    let separate_colour_plane_flag = if chroma_format_idc == ChromaFormat::Chroma444 {
        reader.read_flag()?
    } else {
        false
    };

    let pic_width_in_luma_samples = reader.read_ue()?;
    let pic_height_in_luma_samples = reader.read_ue()?;

    let conformance_window_flag = reader.read_flag()?;
    let (conf_win_left_offset, conf_win_right_offset, conf_win_top_offset, conf_win_bottom_offset) =
        if conformance_window_flag {
            (
                reader.read_ue()?,
                reader.read_ue()?,
                reader.read_ue()?,
                reader.read_ue()?,
            )
        } else {
            (0, 0, 0, 0)
        };

    let bit_depth_luma_minus8 = reader.read_ue()? as u8;
    let bit_depth_chroma_minus8 = reader.read_ue()? as u8;
    let log2_max_pic_order_cnt_lsb_minus4 = reader.read_ue()? as u8;

    let sps_sub_layer_ordering_info_present_flag = reader.read_flag()?;
    let start_idx = if sps_sub_layer_ordering_info_present_flag {
        0
    } else {
        sps_max_sub_layers_minus1
    };

    let mut sps_max_dec_pic_buffering_minus1 = vec![0u32; sps_max_sub_layers_minus1 as usize + 1];
    let mut sps_max_num_reorder_pics = vec![0u32; sps_max_sub_layers_minus1 as usize + 1];
    let mut sps_max_latency_increase_plus1 = vec![0u32; sps_max_sub_layers_minus1 as usize + 1];

    for i in start_idx..=sps_max_sub_layers_minus1 {
        sps_max_dec_pic_buffering_minus1[i as usize] = reader.read_ue()?;
        sps_max_num_reorder_pics[i as usize] = reader.read_ue()?;
        sps_max_latency_increase_plus1[i as usize] = reader.read_ue()?;
    }
    if !sps_sub_layer_ordering_info_present_flag {
        for i in 0..start_idx {
            sps_max_dec_pic_buffering_minus1[i as usize] = sps_max_dec_pic_buffering_minus1[0];
            sps_max_num_reorder_pics[i as usize] = sps_max_num_reorder_pics[0];
            sps_max_latency_increase_plus1[i as usize] = sps_max_latency_increase_plus1[0];
        }
    }

    let log2_min_luma_coding_block_size_minus3 = reader.read_ue()? as u8;
    let log2_diff_max_min_luma_coding_block_size = reader.read_ue()? as u8;
    let log2_min_luma_transform_block_size_minus2 = reader.read_ue()? as u8;
    let log2_diff_max_min_luma_transform_block_size = reader.read_ue()? as u8;
    let max_transform_hierarchy_depth_inter = reader.read_ue()? as u8;
    let max_transform_hierarchy_depth_intra = reader.read_ue()? as u8;

    let scaling_list_enabled_flag = reader.read_flag()?;
    let mut scaling_list_data = None;
    if scaling_list_enabled_flag {
        let sps_scaling_list_data_present_flag = reader.read_flag()?;
        scaling_list_data = Some(if sps_scaling_list_data_present_flag {
            parse_scaling_list_data(&mut reader)?
        } else {
            ScalingListData::default()
        });
    }

    let amp_enabled_flag = reader.read_flag()?;
    let sample_adaptive_offset_enabled_flag = reader.read_flag()?;

    let pcm_enabled_flag = reader.read_flag()?;
    let pcm_info = if pcm_enabled_flag {
        Some(PcmInfo {
            pcm_sample_bit_depth_luma_minus1: reader.read_bits(4)? as u8,
            pcm_sample_bit_depth_chroma_minus1: reader.read_bits(4)? as u8,
            log2_min_pcm_luma_coding_block_size_minus3: reader.read_ue()? as u8,
            log2_diff_max_min_pcm_luma_coding_block_size: reader.read_ue()? as u8,
            pcm_loop_filter_disabled_flag: reader.read_flag()?,
        })
    } else {
        None
    };

    let num_short_term_ref_pic_sets = reader.read_ue()? as u8;
    let mut short_term_ref_pic_sets = Vec::with_capacity(num_short_term_ref_pic_sets as usize);
    for i in 0..num_short_term_ref_pic_sets as usize {
        let rps = parse_short_term_ref_pic_set(
            &mut reader,
            i,
            num_short_term_ref_pic_sets as usize,
            &short_term_ref_pic_sets,
        )?;
        short_term_ref_pic_sets.push(rps);
    }

    let long_term_ref_pics_present_flag = reader.read_flag()?;
    let mut num_long_term_ref_pics_sps = 0u8;
    let mut lt_ref_pic_poc_lsb_sps = Vec::new();
    if long_term_ref_pics_present_flag {
        num_long_term_ref_pics_sps = reader.read_ue()? as u8;
        for _ in 0..num_long_term_ref_pics_sps {
            let poc_lsb = reader.read_bits(log2_max_pic_order_cnt_lsb_minus4 + 4)?;
            let used_by_curr_pic = reader.read_flag()?;
            lt_ref_pic_poc_lsb_sps.push((poc_lsb, used_by_curr_pic));
        }
    }

    let sps_temporal_mvp_enabled_flag = reader.read_flag()?;
    let strong_intra_smoothing_enabled_flag = reader.read_flag()?;

    let vui_parameters_present_flag = reader.read_flag()?;
    let vui_parameters = if vui_parameters_present_flag {
        Some(parse_vui_parameters(&mut reader)?)
    } else {
        None
    };

    Ok(Sps {
        sps_video_parameter_set_id,
        sps_max_sub_layers_minus1,
        sps_temporal_id_nesting_flag,
        profile_tier_level,
        sps_seq_parameter_set_id,
        chroma_format_idc,
        separate_colour_plane_flag,
        pic_width_in_luma_samples,
        pic_height_in_luma_samples,
        conformance_window_flag,
        conf_win_left_offset,
        conf_win_right_offset,
        conf_win_top_offset,
        conf_win_bottom_offset,
        bit_depth_luma_minus8,
        bit_depth_chroma_minus8,
        log2_max_pic_order_cnt_lsb_minus4,
        sps_sub_layer_ordering_info_present_flag,
        sps_max_dec_pic_buffering_minus1,
        sps_max_num_reorder_pics,
        sps_max_latency_increase_plus1,
        log2_min_luma_coding_block_size_minus3,
        log2_diff_max_min_luma_coding_block_size,
        log2_min_luma_transform_block_size_minus2,
        log2_diff_max_min_luma_transform_block_size,
        max_transform_hierarchy_depth_inter,
        max_transform_hierarchy_depth_intra,
        scaling_list_enabled_flag,
        scaling_list_data,
        amp_enabled_flag,
        sample_adaptive_offset_enabled_flag,
        pcm_enabled_flag,
        pcm_info,
        num_short_term_ref_pic_sets,
        short_term_ref_pic_sets,
        long_term_ref_pics_present_flag,
        num_long_term_ref_pics_sps,
        lt_ref_pic_poc_lsb_sps,
        sps_temporal_mvp_enabled_flag,
        strong_intra_smoothing_enabled_flag,
        vui_parameters_present_flag,
        vui_parameters,
        received: true,
    })
}

fn parse_vui_parameters(reader: &mut BitReader) -> Result<VuiParameters> {
    let mut vui = VuiParameters::default();

    vui.aspect_ratio_info_present_flag = reader.read_flag()?;
    if vui.aspect_ratio_info_present_flag {
        vui.aspect_ratio_idc = Some(reader.read_bits(8)? as u8);
        if vui.aspect_ratio_idc == Some(255) {
            vui.sar_width = Some(reader.read_bits(16)? as u16);
            vui.sar_height = Some(reader.read_bits(16)? as u16);
        }
    }

    vui.overscan_info_present_flag = reader.read_flag()?;
    if vui.overscan_info_present_flag {
        vui.overscan_appropriate_flag = Some(reader.read_flag()?);
    }

    vui.video_signal_type_present_flag = reader.read_flag()?;
    if vui.video_signal_type_present_flag {
        vui.video_format = Some(reader.read_bits(3)? as u8);
        vui.video_full_range_flag = Some(reader.read_flag()?);
        vui.colour_description_present_flag = Some(reader.read_flag()?);
        if vui.colour_description_present_flag == Some(true) {
            vui.colour_primaries = Some(reader.read_bits(8)? as u8);
            vui.transfer_characteristics = Some(reader.read_bits(8)? as u8);
            vui.matrix_coeffs = Some(reader.read_bits(8)? as u8);
        }
    }

    vui.chroma_loc_info_present_flag = reader.read_flag()?;
    if vui.chroma_loc_info_present_flag {
        let _chroma_sample_loc_type_top_field = reader.read_ue()?;
        let _chroma_sample_loc_type_bottom_field = reader.read_ue()?;
    }

    let _neutral_chroma_indication_flag = reader.read_flag()?;
    let _field_seq_flag = reader.read_flag()?;
    let _frame_field_info_present_flag = reader.read_flag()?;

    let default_display_window_flag = reader.read_flag()?;
    if default_display_window_flag {
        let _def_disp_win_left_offset = reader.read_ue()?;
        let _def_disp_win_right_offset = reader.read_ue()?;
        let _def_disp_win_top_offset = reader.read_ue()?;
        let _def_disp_win_bottom_offset = reader.read_ue()?;
    }

    vui.timing_info_present_flag = reader.read_flag()?;
    if vui.timing_info_present_flag {
        vui.num_units_in_tick = Some(reader.read_bits(32)?);
        vui.time_scale = Some(reader.read_bits(32)?);
    }

    Ok(vui)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sps() -> Sps {
        Sps {
            sps_video_parameter_set_id: 0,
            sps_max_sub_layers_minus1: 0,
            sps_temporal_id_nesting_flag: true,
            profile_tier_level: ProfileTierLevel::default(),
            sps_seq_parameter_set_id: 0,
            chroma_format_idc: ChromaFormat::Chroma420,
            separate_colour_plane_flag: false,
            pic_width_in_luma_samples: 1920,
            pic_height_in_luma_samples: 1080,
            conformance_window_flag: false,
            conf_win_left_offset: 0,
            conf_win_right_offset: 0,
            conf_win_top_offset: 0,
            conf_win_bottom_offset: 0,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            log2_max_pic_order_cnt_lsb_minus4: 4,
            sps_sub_layer_ordering_info_present_flag: false,
            sps_max_dec_pic_buffering_minus1: vec![4],
            sps_max_num_reorder_pics: vec![2],
            sps_max_latency_increase_plus1: vec![0],
            log2_min_luma_coding_block_size_minus3: 0,
            log2_diff_max_min_luma_coding_block_size: 3,
            log2_min_luma_transform_block_size_minus2: 0,
            log2_diff_max_min_luma_transform_block_size: 3,
            max_transform_hierarchy_depth_inter: 2,
            max_transform_hierarchy_depth_intra: 2,
            scaling_list_enabled_flag: false,
            scaling_list_data: None,
            amp_enabled_flag: true,
            sample_adaptive_offset_enabled_flag: true,
            pcm_enabled_flag: false,
            pcm_info: None,
            num_short_term_ref_pic_sets: 0,
            short_term_ref_pic_sets: Vec::new(),
            long_term_ref_pics_present_flag: false,
            num_long_term_ref_pics_sps: 0,
            lt_ref_pic_poc_lsb_sps: Vec::new(),
            sps_temporal_mvp_enabled_flag: true,
            strong_intra_smoothing_enabled_flag: true,
            vui_parameters_present_flag: false,
            vui_parameters: None,
            received: true,
        }
    }

    #[test]
    fn derived_dimensions_match_ctb_grid() {
        let sps = sample_sps();
        assert_eq!(sps.bit_depth_luma(), 8);
        assert_eq!(sps.ctb_size(), 64);
        assert_eq!(sps.min_cb_size(), 8);
        assert_eq!(sps.pic_width_in_ctbs(), 30);
        assert_eq!(sps.pic_height_in_ctbs(), 17);
        assert_eq!(sps.max_poc_lsb(), 256);
    }

    #[test]
    fn dpb_size_uses_highest_sub_layer() {
        let mut sps = sample_sps();
        sps.sps_max_dec_pic_buffering_minus1 = vec![1, 3, 5];
        assert_eq!(sps.dpb_size(), 6);
    }
}
