//! HEVC picture order count derivation (8.3.1).

use crate::nal::NalUnitType;
use crate::sps::Sps;

/// Whether a NAL unit type is a reference picture per `IsRefPic`: any VCL NAL
/// with an odd type in the TRAIL..RSV_VCL_R15 range, or any IRAP type.
fn is_ref_pic(nal_type: NalUnitType) -> bool {
    let v = nal_type as u8;
    (v <= 15 && v % 2 != 0) || (16..=23).contains(&v)
}

/// Tracks `prevTid0Pic`'s POC LSB/MSB across pictures for 8.3.1 derivation.
#[derive(Debug, Clone, Default)]
pub struct PocState {
    prev_poc_lsb: u32,
    prev_poc_msb: i32,
}

impl PocState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive `PicOrderCntVal` for the current picture (8.3.1). `no_rasl_output_flag`
    /// is `true` for an IRAP picture that resets `PicOrderCntMsb` to 0 (first
    /// picture in the bitstream, or the first after an EOS NAL). `temporal_id`
    /// is the NAL unit's `TemporalId`, needed to gate the prevTid0Pic update.
    pub fn derive(
        &mut self,
        sps: &Sps,
        nal_type: NalUnitType,
        temporal_id: u8,
        slice_pic_order_cnt_lsb: u32,
        no_rasl_output_flag: bool,
    ) -> i32 {
        if nal_type.is_idr() {
            self.prev_poc_lsb = 0;
            self.prev_poc_msb = 0;
            return 0;
        }

        let max_poc_lsb = sps.max_poc_lsb() as i32;
        let poc_msb = if nal_type.is_irap() && no_rasl_output_flag {
            0
        } else if (slice_pic_order_cnt_lsb as i32) < self.prev_poc_lsb as i32
            && (self.prev_poc_lsb as i32 - slice_pic_order_cnt_lsb as i32) >= max_poc_lsb / 2
        {
            self.prev_poc_msb + max_poc_lsb
        } else if (slice_pic_order_cnt_lsb as i32) > self.prev_poc_lsb as i32
            && (slice_pic_order_cnt_lsb as i32 - self.prev_poc_lsb as i32) > max_poc_lsb / 2
        {
            self.prev_poc_msb - max_poc_lsb
        } else {
            self.prev_poc_msb
        };

        let poc = poc_msb + slice_pic_order_cnt_lsb as i32;

        if temporal_id == 0 && is_ref_pic(nal_type) && !nal_type.is_rasl() && !nal_type.is_radl() {
            self.prev_poc_lsb = slice_pic_order_cnt_lsb;
            self.prev_poc_msb = poc_msb;
        }

        poc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sps::ChromaFormat;
    use crate::vps::ProfileTierLevel;

    fn sps_with_poc_bits(bits: u8) -> Sps {
        Sps {
            sps_video_parameter_set_id: 0,
            sps_max_sub_layers_minus1: 0,
            sps_temporal_id_nesting_flag: false,
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
            log2_max_pic_order_cnt_lsb_minus4: bits - 4,
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
    fn idr_resets_poc_to_zero() {
        let sps = sps_with_poc_bits(8);
        let mut state = PocState::new();
        let poc = state.derive(&sps, NalUnitType::IdrWRadl, 0, 5, true);
        assert_eq!(poc, 0);
    }

    #[test]
    fn forward_lsb_jump_past_half_range_wraps_msb_backward() {
        let sps = sps_with_poc_bits(8); // MaxPicOrderCntLsb = 256
        let mut state = PocState::new();
        assert_eq!(state.derive(&sps, NalUnitType::IdrWRadl, 0, 0, true), 0);
        // lsb jumps from 0 to 200, which is > 128 (half range) forward: wraps backward.
        let poc = state.derive(&sps, NalUnitType::TrailR, 0, 200, false);
        assert_eq!(poc, 200 - 256);
    }

    #[test]
    fn non_tid0_ref_does_not_update_prev_state() {
        let sps = sps_with_poc_bits(8);
        let mut state = PocState::new();
        state.derive(&sps, NalUnitType::IdrWRadl, 0, 0, true);
        // RASL picture: reference but excluded from prevTid0Pic update.
        state.derive(&sps, NalUnitType::RaslR, 0, 10, false);
        assert_eq!(state.prev_poc_lsb, 0);
    }
}
