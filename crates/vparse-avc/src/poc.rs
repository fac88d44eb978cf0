//! Picture order count derivation (8.2.1) for all three `pic_order_cnt_type`
//! variants, including the MMCO-5 "treat as IDR" carry-over (8.2.1.1/2/3).

use crate::nal::NalUnitType;
use crate::slice::SliceHeader;
use crate::sps::Sps;

/// Top/bottom/frame picture order count for one coded picture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PicOrderCnt {
    pub top_field_order_cnt: i32,
    pub bottom_field_order_cnt: i32,
    /// `PicOrderCnt`: the field value for field pictures, else
    /// `min(top, bottom)`.
    pub pic_order_cnt: i32,
}

/// Carries the state 8.2.1 needs across pictures: previous frame_num,
/// previous msb/lsb (type 0), previous frame_num_offset (types 1/2), and
/// whether the previous reference picture invoked MMCO 5.
#[derive(Debug, Clone, Default)]
pub struct PocState {
    prev_pic_order_cnt_msb: i32,
    prev_pic_order_cnt_lsb: i32,
    prev_top_field_order_cnt: i32,
    prev_frame_num_offset: i32,
    prev_frame_num: u32,
    prev_has_mmco_5: bool,
    prev_ref_pic_bottom_field: bool,
}

impl PocState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call once for every coded picture, after `frame_num`/`pic_order_cnt_lsb`
    /// etc. have been read from the slice header but before the next
    /// picture's state is folded in via [`PocState::note_decoded`].
    pub fn derive(&mut self, sps: &Sps, slice: &SliceHeader) -> PicOrderCnt {
        let is_idr = slice.nal_unit_type == NalUnitType::IdrSlice;
        let max_frame_num = sps.max_frame_num() as i32;

        match sps.pic_order_cnt_type {
            0 => self.derive_type0(sps, slice, is_idr),
            1 => self.derive_type1(sps, slice, is_idr, max_frame_num),
            _ => self.derive_type2(slice, is_idr, max_frame_num),
        }
    }

    fn derive_type0(&mut self, sps: &Sps, slice: &SliceHeader, is_idr: bool) -> PicOrderCnt {
        let max_poc_lsb = sps.max_pic_order_cnt_lsb() as i32;

        let (prev_msb, prev_lsb) = if is_idr {
            (0, 0)
        } else if self.prev_has_mmco_5 {
            if self.prev_ref_pic_bottom_field {
                (0, 0)
            } else {
                (0, self.prev_top_field_order_cnt)
            }
        } else {
            (self.prev_pic_order_cnt_msb, self.prev_pic_order_cnt_lsb)
        };

        let poc_lsb = slice.pic_order_cnt_lsb as i32;
        let pic_order_cnt_msb = if poc_lsb < prev_lsb && (prev_lsb - poc_lsb) >= max_poc_lsb / 2 {
            prev_msb + max_poc_lsb
        } else if poc_lsb > prev_lsb && (poc_lsb - prev_lsb) > max_poc_lsb / 2 {
            prev_msb - max_poc_lsb
        } else {
            prev_msb
        };

        let mut poc = PicOrderCnt::default();
        if !slice.field_pic_flag || !slice.bottom_field_flag {
            poc.top_field_order_cnt = pic_order_cnt_msb + poc_lsb;
        }
        if !slice.field_pic_flag {
            poc.bottom_field_order_cnt = poc.top_field_order_cnt + slice.delta_pic_order_cnt_bottom;
        } else if slice.bottom_field_flag {
            poc.bottom_field_order_cnt = pic_order_cnt_msb + poc_lsb;
        }

        if slice.nal_ref_idc != 0 {
            self.prev_pic_order_cnt_msb = pic_order_cnt_msb;
            self.prev_pic_order_cnt_lsb = poc_lsb;
            self.prev_top_field_order_cnt = poc.top_field_order_cnt;
        }

        poc.pic_order_cnt = Self::pick(slice, poc);
        poc
    }

    fn derive_type1(
        &mut self,
        sps: &Sps,
        slice: &SliceHeader,
        is_idr: bool,
        max_frame_num: i32,
    ) -> PicOrderCnt {
        let frame_num = slice.frame_num as i32;

        let frame_num_offset = if is_idr {
            0
        } else {
            let prev_offset = if self.prev_has_mmco_5 {
                0
            } else {
                self.prev_frame_num_offset
            };
            if self.prev_frame_num as i32 > frame_num {
                prev_offset + max_frame_num
            } else {
                prev_offset
            }
        };

        let num_ref_frames_in_cycle = sps.num_ref_frames_in_pic_order_cnt_cycle as i32;
        let mut abs_frame_num = if num_ref_frames_in_cycle != 0 {
            frame_num_offset + frame_num
        } else {
            0
        };
        if slice.nal_ref_idc == 0 && abs_frame_num > 0 {
            abs_frame_num -= 1;
        }

        let expected_delta: i32 = sps.offset_for_ref_frame.iter().sum();

        let mut expected_pic_order_cnt = if abs_frame_num > 0 {
            let cycle_cnt = (abs_frame_num - 1) / num_ref_frames_in_cycle;
            let frame_num_in_cycle = (abs_frame_num - 1) % num_ref_frames_in_cycle;
            let mut expected = cycle_cnt * expected_delta;
            for offset in &sps.offset_for_ref_frame[..=(frame_num_in_cycle as usize)] {
                expected += offset;
            }
            expected
        } else {
            0
        };
        if slice.nal_ref_idc == 0 {
            expected_pic_order_cnt += sps.offset_for_non_ref_pic;
        }

        let mut poc = PicOrderCnt::default();
        if !slice.field_pic_flag {
            poc.top_field_order_cnt = expected_pic_order_cnt + slice.delta_pic_order_cnt[0];
            poc.bottom_field_order_cnt =
                poc.top_field_order_cnt + sps.offset_for_top_to_bottom_field + slice.delta_pic_order_cnt[1];
        } else if slice.bottom_field_flag {
            poc.bottom_field_order_cnt =
                expected_pic_order_cnt + sps.offset_for_top_to_bottom_field + slice.delta_pic_order_cnt[0];
        } else {
            poc.top_field_order_cnt = expected_pic_order_cnt + slice.delta_pic_order_cnt[0];
        }

        self.prev_frame_num = slice.frame_num;
        self.prev_frame_num_offset = frame_num_offset;

        poc.pic_order_cnt = Self::pick(slice, poc);
        poc
    }

    fn derive_type2(&mut self, slice: &SliceHeader, is_idr: bool, max_frame_num: i32) -> PicOrderCnt {
        let frame_num = slice.frame_num as i32;
        let mut poc = PicOrderCnt::default();

        let frame_num_offset = if is_idr {
            0
        } else {
            let prev_offset = if self.prev_has_mmco_5 {
                0
            } else {
                self.prev_frame_num_offset
            };
            let frame_num_offset = if self.prev_frame_num as i32 > frame_num {
                prev_offset + max_frame_num
            } else {
                prev_offset
            };

            let temp_poc = if slice.nal_ref_idc == 0 {
                2 * (frame_num_offset + frame_num) - 1
            } else {
                2 * (frame_num_offset + frame_num)
            };

            if !slice.field_pic_flag {
                poc.top_field_order_cnt = temp_poc;
                poc.bottom_field_order_cnt = temp_poc;
            } else if slice.bottom_field_flag {
                poc.bottom_field_order_cnt = temp_poc;
            } else {
                poc.top_field_order_cnt = temp_poc;
            }

            frame_num_offset
        };

        self.prev_frame_num = slice.frame_num;
        self.prev_frame_num_offset = frame_num_offset;

        poc.pic_order_cnt = Self::pick(slice, poc);
        poc
    }

    fn pick(slice: &SliceHeader, poc: PicOrderCnt) -> i32 {
        if slice.field_pic_flag {
            if slice.bottom_field_flag {
                poc.bottom_field_order_cnt
            } else {
                poc.top_field_order_cnt
            }
        } else {
            poc.top_field_order_cnt.min(poc.bottom_field_order_cnt)
        }
    }

    /// Recorded by the DPB/RPS layer once MMCO processing for the just
    /// decoded reference picture is known; feeds the next picture's 8.2.1
    /// "prevPicOrderCntMsb/Lsb set to 0" carry when MMCO 5 fired.
    pub fn note_mmco5(&mut self, bottom_field: bool, top_field_order_cnt: i32) {
        self.prev_has_mmco_5 = true;
        self.prev_ref_pic_bottom_field = bottom_field;
        self.prev_top_field_order_cnt = top_field_order_cnt;
    }

    pub fn clear_mmco5(&mut self) {
        self.prev_has_mmco_5 = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::SliceType;
    use crate::sps::ChromaFormat;

    fn base_sps() -> Sps {
        Sps {
            profile_idc: crate::sps::ProfileIdc::Baseline,
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
        }
    }

    fn base_slice(nal_unit_type: NalUnitType, nal_ref_idc: u8, poc_lsb: u32) -> SliceHeader {
        SliceHeader {
            first_mb_in_slice: 0,
            slice_type: SliceType::I,
            pic_parameter_set_id: 0,
            colour_plane_id: 0,
            frame_num: 0,
            field_pic_flag: false,
            bottom_field_flag: false,
            idr_pic_id: 0,
            pic_order_cnt_lsb: poc_lsb,
            delta_pic_order_cnt_bottom: 0,
            delta_pic_order_cnt: [0, 0],
            redundant_pic_cnt: 0,
            direct_spatial_mv_pred_flag: false,
            num_ref_idx_active_override_flag: false,
            num_ref_idx_l0_active_minus1: 0,
            num_ref_idx_l1_active_minus1: 0,
            ref_pic_list_modification_flag_l0: false,
            ref_pic_list_modification_flag_l1: false,
            ref_pic_list_modification_l0: Default::default(),
            ref_pic_list_modification_l1: Default::default(),
            dec_ref_pic_marking: Default::default(),
            cabac_init_idc: 0,
            slice_qp_delta: 0,
            sp_for_switch_flag: false,
            slice_qs_delta: 0,
            disable_deblocking_filter_idc: 0,
            slice_alpha_c0_offset_div2: 0,
            slice_beta_offset_div2: 0,
            slice_group_change_cycle: 0,
            nal_unit_type,
            nal_ref_idc,
        }
    }

    #[test]
    fn type0_idr_starts_at_zero() {
        let sps = base_sps();
        let slice = base_slice(NalUnitType::IdrSlice, 3, 0);
        let mut state = PocState::new();
        let poc = state.derive(&sps, &slice);
        assert_eq!(poc.pic_order_cnt, 0);
    }

    #[test]
    fn type0_large_forward_lsb_jump_wraps_msb_backward() {
        let sps = base_sps();
        let mut state = PocState::new();
        let idr = base_slice(NalUnitType::IdrSlice, 3, 0);
        state.derive(&sps, &idr);

        // max_pic_order_cnt_lsb = 64; a jump from lsb 0 straight to 60
        // exceeds half-range, so 8.2.1's wraparound rule subtracts a full
        // cycle from pic_order_cnt_msb.
        let p = base_slice(NalUnitType::NonIdrSlice, 2, 60);
        let poc = state.derive(&sps, &p);
        assert_eq!(poc.top_field_order_cnt, -4);
    }

    #[test]
    fn type2_derives_from_frame_num_only() {
        let mut sps = base_sps();
        sps.pic_order_cnt_type = 2;
        let mut state = PocState::new();

        let idr = base_slice(NalUnitType::IdrSlice, 3, 0);
        let poc = state.derive(&sps, &idr);
        assert_eq!(poc.pic_order_cnt, 0);

        let mut p = base_slice(NalUnitType::NonIdrSlice, 2, 0);
        p.frame_num = 1;
        let poc = state.derive(&sps, &p);
        assert_eq!(poc.pic_order_cnt, 2);
    }
}
