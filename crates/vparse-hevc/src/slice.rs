//! HEVC slice segment header parsing (7.3.6).

use crate::error::{HevcError, Result};
use crate::nal::NalUnitType;
use crate::pps::Pps;
use crate::rps::{parse_short_term_ref_pic_set, ShortTermRefPicSet};
use crate::sps::{ChromaFormat, Sps};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vparse_core::BitReader;

/// HEVC slice type (7.4.7.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SliceType {
    B = 0,
    P = 1,
    I = 2,
}

impl SliceType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::B),
            1 => Some(Self::P),
            2 => Some(Self::I),
            _ => None,
        }
    }

    pub fn is_intra(&self) -> bool {
        matches!(self, Self::I)
    }

    pub fn is_inter(&self) -> bool {
        matches!(self, Self::B | Self::P)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::B => "B",
            Self::P => "P",
            Self::I => "I",
        }
    }
}

/// `ref_pic_lists_modification()` (7.3.6.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefPicListModification {
    pub ref_pic_list_modification_flag_l0: bool,
    pub list_entry_l0: Vec<u8>,
    pub ref_pic_list_modification_flag_l1: bool,
    pub list_entry_l1: Vec<u8>,
}

/// Long-term reference pictures signalled in a slice header (7.3.6.1), after
/// merging SPS-predicted entries (`lt_idx_sps`) with pictures signalled
/// explicitly and resolving `DeltaPocMsbCycleLt` accumulation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LongTermRefPicSet {
    pub poc_lsb_lt: Vec<u32>,
    pub used_by_curr_pic_lt: Vec<bool>,
    pub delta_poc_msb_present_flag: Vec<bool>,
    pub delta_poc_msb_cycle_lt: Vec<u32>,
}

/// `pred_weight_table()` (7.3.6.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredWeightTable {
    pub luma_log2_weight_denom: u8,
    pub delta_chroma_log2_weight_denom: i8,
    pub luma_weight_l0: Vec<i16>,
    pub luma_offset_l0: Vec<i16>,
    pub chroma_weight_l0: Vec<[i16; 2]>,
    pub chroma_offset_l0: Vec<[i16; 2]>,
    pub luma_weight_l1: Vec<i16>,
    pub luma_offset_l1: Vec<i16>,
    pub chroma_weight_l1: Vec<[i16; 2]>,
    pub chroma_offset_l1: Vec<[i16; 2]>,
}

/// HEVC slice segment header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceHeader {
    pub first_slice_segment_in_pic_flag: bool,
    pub no_output_of_prior_pics_flag: bool,
    pub slice_pic_parameter_set_id: u8,
    pub dependent_slice_segment_flag: bool,
    pub slice_segment_address: u32,
    pub slice_type: SliceType,
    pub pic_output_flag: bool,
    pub colour_plane_id: u8,
    pub slice_pic_order_cnt_lsb: u32,
    pub short_term_ref_pic_set_sps_flag: bool,
    pub short_term_ref_pic_set_idx: u8,
    /// The resolved set for this slice, whether signalled inline or by index
    /// into the SPS's `short_term_ref_pic_sets`.
    pub short_term_ref_pic_set: ShortTermRefPicSet,
    pub num_long_term_sps: u8,
    pub num_long_term_pics: u8,
    pub long_term_ref_pic_set: LongTermRefPicSet,
    pub slice_temporal_mvp_enabled_flag: bool,
    pub slice_sao_luma_flag: bool,
    pub slice_sao_chroma_flag: bool,
    pub num_ref_idx_l0_active_minus1: u8,
    pub num_ref_idx_l1_active_minus1: u8,
    pub ref_pic_list_modification: Option<RefPicListModification>,
    pub mvd_l1_zero_flag: bool,
    pub cabac_init_flag: bool,
    pub collocated_from_l0_flag: bool,
    pub collocated_ref_idx: u8,
    pub pred_weight_table: Option<PredWeightTable>,
    pub five_minus_max_num_merge_cand: u8,
    pub slice_qp_delta: i8,
    pub slice_cb_qp_offset: i8,
    pub slice_cr_qp_offset: i8,
    pub deblocking_filter_override_flag: bool,
    pub slice_deblocking_filter_disabled_flag: bool,
    pub slice_beta_offset_div2: i8,
    pub slice_tc_offset_div2: i8,
    pub slice_loop_filter_across_slices_enabled_flag: bool,
    pub num_entry_point_offsets: u32,
    pub entry_point_offset_minus1: Vec<u32>,
}

impl Default for SliceHeader {
    fn default() -> Self {
        Self {
            first_slice_segment_in_pic_flag: true,
            no_output_of_prior_pics_flag: false,
            slice_pic_parameter_set_id: 0,
            dependent_slice_segment_flag: false,
            slice_segment_address: 0,
            slice_type: SliceType::I,
            pic_output_flag: true,
            colour_plane_id: 0,
            slice_pic_order_cnt_lsb: 0,
            short_term_ref_pic_set_sps_flag: false,
            short_term_ref_pic_set_idx: 0,
            short_term_ref_pic_set: ShortTermRefPicSet::default(),
            num_long_term_sps: 0,
            num_long_term_pics: 0,
            long_term_ref_pic_set: LongTermRefPicSet::default(),
            slice_temporal_mvp_enabled_flag: false,
            slice_sao_luma_flag: false,
            slice_sao_chroma_flag: false,
            num_ref_idx_l0_active_minus1: 0,
            num_ref_idx_l1_active_minus1: 0,
            ref_pic_list_modification: None,
            mvd_l1_zero_flag: false,
            cabac_init_flag: false,
            collocated_from_l0_flag: true,
            collocated_ref_idx: 0,
            pred_weight_table: None,
            five_minus_max_num_merge_cand: 0,
            slice_qp_delta: 0,
            slice_cb_qp_offset: 0,
            slice_cr_qp_offset: 0,
            deblocking_filter_override_flag: false,
            slice_deblocking_filter_disabled_flag: false,
            slice_beta_offset_div2: 0,
            slice_tc_offset_div2: 0,
            slice_loop_filter_across_slices_enabled_flag: false,
            num_entry_point_offsets: 0,
            entry_point_offset_minus1: Vec::new(),
        }
    }
}

impl SliceHeader {
    pub fn qp(&self, pps: &Pps) -> i8 {
        26 + pps.init_qp_minus26 + self.slice_qp_delta
    }

    pub fn max_num_merge_cand(&self) -> u8 {
        5 - self.five_minus_max_num_merge_cand
    }

    pub fn is_intra(&self) -> bool {
        self.slice_type.is_intra()
    }

    pub fn is_inter(&self) -> bool {
        self.slice_type.is_inter()
    }

    pub fn num_ref_idx_l0_active(&self) -> u8 {
        self.num_ref_idx_l0_active_minus1 + 1
    }

    pub fn num_ref_idx_l1_active(&self) -> u8 {
        if self.slice_type == SliceType::B {
            self.num_ref_idx_l1_active_minus1 + 1
        } else {
            0
        }
    }

    /// `NumPicTotalCurr` (7-57) computed from the slice's resolved RPS.
    pub fn num_pic_total_curr(&self) -> u32 {
        let st = self
            .short_term_ref_pic_set
            .used_by_curr_pic_s0
            .iter()
            .filter(|&&b| b)
            .count()
            + self
                .short_term_ref_pic_set
                .used_by_curr_pic_s1
                .iter()
                .filter(|&&b| b)
                .count();
        let lt = self
            .long_term_ref_pic_set
            .used_by_curr_pic_lt
            .iter()
            .filter(|&&b| b)
            .count();
        (st + lt) as u32
    }
}

fn ceil_log2(n: u32) -> u8 {
    if n <= 1 {
        0
    } else {
        32 - (n - 1).leading_zeros() as u8
    }
}

fn parse_pred_weight_table(
    reader: &mut BitReader,
    chroma_array_type: u8,
    slice_type: SliceType,
    num_ref_idx_l0_active_minus1: u8,
    num_ref_idx_l1_active_minus1: u8,
) -> Result<PredWeightTable> {
    let mut table = PredWeightTable::default();
    table.luma_log2_weight_denom = reader.read_ue()? as u8;
    if chroma_array_type != 0 {
        table.delta_chroma_log2_weight_denom = reader.read_se()? as i8;
    }
    let chroma_log2_weight_denom =
        table.luma_log2_weight_denom as i32 + table.delta_chroma_log2_weight_denom as i32;

    let n0 = num_ref_idx_l0_active_minus1 as usize + 1;
    let mut luma_weight_l0_flag = vec![false; n0];
    let mut chroma_weight_l0_flag = vec![false; n0];
    for flag in luma_weight_l0_flag.iter_mut() {
        *flag = reader.read_flag()?;
    }
    if chroma_array_type != 0 {
        for flag in chroma_weight_l0_flag.iter_mut() {
            *flag = reader.read_flag()?;
        }
    }
    table.luma_weight_l0 = vec![1i16 << table.luma_log2_weight_denom; n0];
    table.luma_offset_l0 = vec![0; n0];
    table.chroma_weight_l0 = vec![[1i16 << chroma_log2_weight_denom.max(0); 2]; n0];
    table.chroma_offset_l0 = vec![[0; 2]; n0];
    for i in 0..n0 {
        if luma_weight_l0_flag[i] {
            let delta = reader.read_se()? as i16;
            table.luma_weight_l0[i] = (1 << table.luma_log2_weight_denom) + delta;
            table.luma_offset_l0[i] = reader.read_se()? as i16;
        }
        if chroma_weight_l0_flag[i] {
            for j in 0..2 {
                let delta_weight = reader.read_se()?;
                let delta_offset = reader.read_se()?;
                let weight = (1i32 << chroma_log2_weight_denom) + delta_weight;
                let offset = (delta_offset - ((128 * weight) >> chroma_log2_weight_denom) + 128)
                    .clamp(-128, 127);
                table.chroma_weight_l0[i][j] = weight as i16;
                table.chroma_offset_l0[i][j] = offset as i16;
            }
        }
    }

    if slice_type == SliceType::B {
        let n1 = num_ref_idx_l1_active_minus1 as usize + 1;
        let mut luma_weight_l1_flag = vec![false; n1];
        let mut chroma_weight_l1_flag = vec![false; n1];
        for flag in luma_weight_l1_flag.iter_mut() {
            *flag = reader.read_flag()?;
        }
        if chroma_array_type != 0 {
            for flag in chroma_weight_l1_flag.iter_mut() {
                *flag = reader.read_flag()?;
            }
        }
        table.luma_weight_l1 = vec![1i16 << table.luma_log2_weight_denom; n1];
        table.luma_offset_l1 = vec![0; n1];
        table.chroma_weight_l1 = vec![[1i16 << chroma_log2_weight_denom.max(0); 2]; n1];
        table.chroma_offset_l1 = vec![[0; 2]; n1];
        for i in 0..n1 {
            if luma_weight_l1_flag[i] {
                let delta = reader.read_se()? as i16;
                table.luma_weight_l1[i] = (1 << table.luma_log2_weight_denom) + delta;
                table.luma_offset_l1[i] = reader.read_se()? as i16;
            }
            if chroma_weight_l1_flag[i] {
                for j in 0..2 {
                    let delta_weight = reader.read_se()?;
                    let delta_offset = reader.read_se()?;
                    let weight = (1i32 << chroma_log2_weight_denom) + delta_weight;
                    let offset = (delta_offset - ((128 * weight) >> chroma_log2_weight_denom) + 128)
                        .clamp(-128, 127);
                    table.chroma_weight_l1[i][j] = weight as i16;
                    table.chroma_offset_l1[i][j] = offset as i16;
                }
            }
        }
    }

    Ok(table)
}

/// Parse a slice segment header from RBSP data (after the 2-byte NAL header).
pub fn parse_slice_header(
    data: &[u8],
    sps_map: &HashMap<u8, Sps>,
    pps_map: &HashMap<u8, Pps>,
    nal_type: NalUnitType,
) -> Result<SliceHeader> {
    let mut reader = BitReader::new(data);
    let mut header = SliceHeader::default();

    header.first_slice_segment_in_pic_flag = reader.read_flag()?;
    if nal_type.is_irap() {
        header.no_output_of_prior_pics_flag = reader.read_flag()?;
    }

    header.slice_pic_parameter_set_id = reader.read_ue()? as u8;

    let pps = pps_map
        .get(&header.slice_pic_parameter_set_id)
        .ok_or_else(|| {
            HevcError::MissingParameterSet(format!(
                "PPS {} not found",
                header.slice_pic_parameter_set_id
            ))
        })?;
    let sps = sps_map.get(&pps.pps_seq_parameter_set_id).ok_or_else(|| {
        HevcError::MissingParameterSet(format!("SPS {} not found", pps.pps_seq_parameter_set_id))
    })?;

    if !header.first_slice_segment_in_pic_flag {
        if pps.dependent_slice_segments_enabled_flag {
            header.dependent_slice_segment_flag = reader.read_flag()?;
        }
        let pic_size_in_ctbs = sps.pic_width_in_ctbs() * sps.pic_height_in_ctbs();
        let bits_needed = ceil_log2(pic_size_in_ctbs);
        if bits_needed > 0 {
            header.slice_segment_address = reader.read_bits(bits_needed)?;
        }
    }

    if !header.dependent_slice_segment_flag {
        for _ in 0..pps.num_extra_slice_header_bits {
            let _ = reader.read_flag()?;
        }

        let slice_type_raw = reader.read_ue()?;
        header.slice_type = SliceType::from_u32(slice_type_raw).ok_or_else(|| {
            HevcError::InvalidSliceHeader(format!("invalid slice_type {slice_type_raw}"))
        })?;

        if pps.output_flag_present_flag {
            header.pic_output_flag = reader.read_flag()?;
        }

        if sps.separate_colour_plane_flag {
            header.colour_plane_id = reader.read_bits(2)? as u8;
        }

        let chroma_array_type = if sps.separate_colour_plane_flag {
            0
        } else {
            sps.chroma_format_idc as u8
        };

        if !nal_type.is_idr() {
            let poc_bits = sps.log2_max_pic_order_cnt_lsb_minus4 + 4;
            header.slice_pic_order_cnt_lsb = reader.read_bits(poc_bits)?;

            header.short_term_ref_pic_set_sps_flag = reader.read_flag()?;
            if !header.short_term_ref_pic_set_sps_flag {
                header.short_term_ref_pic_set = parse_short_term_ref_pic_set(
                    &mut reader,
                    sps.num_short_term_ref_pic_sets as usize,
                    sps.num_short_term_ref_pic_sets as usize,
                    &sps.short_term_ref_pic_sets,
                )?;
            } else {
                if sps.num_short_term_ref_pic_sets > 1 {
                    let bits_needed = ceil_log2(sps.num_short_term_ref_pic_sets as u32);
                    header.short_term_ref_pic_set_idx = reader.read_bits(bits_needed)? as u8;
                }
                header.short_term_ref_pic_set = sps
                    .short_term_ref_pic_sets
                    .get(header.short_term_ref_pic_set_idx as usize)
                    .cloned()
                    .ok_or_else(|| {
                        HevcError::InvalidSliceHeader(
                            "short_term_ref_pic_set_idx out of range".to_string(),
                        )
                    })?;
            }

            if sps.long_term_ref_pics_present_flag {
                if sps.num_long_term_ref_pics_sps > 0 {
                    header.num_long_term_sps = reader.read_ue()? as u8;
                }
                header.num_long_term_pics = reader.read_ue()? as u8;

                let bits_for_ltrp_in_sps = ceil_log2(sps.num_long_term_ref_pics_sps as u32);
                let total = header.num_long_term_sps as usize + header.num_long_term_pics as usize;
                let mut lt = LongTermRefPicSet::default();
                let mut prev_delta_poc_msb_cycle_lt = 0u32;

                for i in 0..total {
                    let (poc_lsb, used_by_curr) = if i < header.num_long_term_sps as usize {
                        if sps.num_long_term_ref_pics_sps > 1 && bits_for_ltrp_in_sps > 0 {
                            let lt_idx_sps = reader.read_bits(bits_for_ltrp_in_sps)? as usize;
                            sps.lt_ref_pic_poc_lsb_sps
                                .get(lt_idx_sps)
                                .copied()
                                .ok_or_else(|| {
                                    HevcError::InvalidSliceHeader(
                                        "lt_idx_sps out of range".to_string(),
                                    )
                                })?
                        } else {
                            sps.lt_ref_pic_poc_lsb_sps.first().copied().unwrap_or((0, false))
                        }
                    } else {
                        let poc_lsb = reader.read_bits(sps.log2_max_pic_order_cnt_lsb_minus4 + 4)?;
                        let used_by_curr = reader.read_flag()?;
                        (poc_lsb, used_by_curr)
                    };
                    lt.poc_lsb_lt.push(poc_lsb);
                    lt.used_by_curr_pic_lt.push(used_by_curr);

                    let delta_poc_msb_present_flag = reader.read_flag()?;
                    lt.delta_poc_msb_present_flag.push(delta_poc_msb_present_flag);

                    let mut delta_poc_msb_cycle_lt = 0u32;
                    if delta_poc_msb_present_flag {
                        delta_poc_msb_cycle_lt = reader.read_ue()?;
                    }
                    if i == 0 || i == header.num_long_term_sps as usize {
                        prev_delta_poc_msb_cycle_lt = delta_poc_msb_cycle_lt;
                    } else {
                        prev_delta_poc_msb_cycle_lt += delta_poc_msb_cycle_lt;
                    }
                    lt.delta_poc_msb_cycle_lt.push(prev_delta_poc_msb_cycle_lt);
                }

                header.long_term_ref_pic_set = lt;
            }

            if sps.sps_temporal_mvp_enabled_flag {
                header.slice_temporal_mvp_enabled_flag = reader.read_flag()?;
            }
        }

        if sps.sample_adaptive_offset_enabled_flag {
            header.slice_sao_luma_flag = reader.read_flag()?;
            if chroma_array_type != 0 {
                header.slice_sao_chroma_flag = reader.read_flag()?;
            }
        }

        if header.slice_type.is_inter() {
            let num_ref_idx_active_override_flag = reader.read_flag()?;
            if num_ref_idx_active_override_flag {
                header.num_ref_idx_l0_active_minus1 = reader.read_ue()? as u8;
                if header.slice_type == SliceType::B {
                    header.num_ref_idx_l1_active_minus1 = reader.read_ue()? as u8;
                }
            } else {
                header.num_ref_idx_l0_active_minus1 = pps.num_ref_idx_l0_default_active_minus1;
                header.num_ref_idx_l1_active_minus1 = pps.num_ref_idx_l1_default_active_minus1;
            }

            let num_pic_total_curr = header.num_pic_total_curr();
            if pps.lists_modification_present_flag && num_pic_total_curr > 1 {
                let list_entry_bits = ceil_log2(num_pic_total_curr);
                let mut modification = RefPicListModification::default();

                modification.ref_pic_list_modification_flag_l0 = reader.read_flag()?;
                if modification.ref_pic_list_modification_flag_l0 {
                    for _ in 0..=header.num_ref_idx_l0_active_minus1 {
                        modification
                            .list_entry_l0
                            .push(reader.read_bits(list_entry_bits)? as u8);
                    }
                }

                if header.slice_type == SliceType::B {
                    modification.ref_pic_list_modification_flag_l1 = reader.read_flag()?;
                    if modification.ref_pic_list_modification_flag_l1 {
                        for _ in 0..=header.num_ref_idx_l1_active_minus1 {
                            modification
                                .list_entry_l1
                                .push(reader.read_bits(list_entry_bits)? as u8);
                        }
                    }
                }

                header.ref_pic_list_modification = Some(modification);
            }

            if header.slice_type == SliceType::B {
                header.mvd_l1_zero_flag = reader.read_flag()?;
            }
            if pps.cabac_init_present_flag {
                header.cabac_init_flag = reader.read_flag()?;
            }

            if header.slice_temporal_mvp_enabled_flag {
                if header.slice_type == SliceType::B {
                    header.collocated_from_l0_flag = reader.read_flag()?;
                }
                let num_ref = if header.collocated_from_l0_flag {
                    header.num_ref_idx_l0_active_minus1
                } else {
                    header.num_ref_idx_l1_active_minus1
                };
                if num_ref > 0 {
                    header.collocated_ref_idx = reader.read_ue()? as u8;
                }
            }

            if (pps.weighted_pred_flag && header.slice_type == SliceType::P)
                || (pps.weighted_bipred_flag && header.slice_type == SliceType::B)
            {
                header.pred_weight_table = Some(parse_pred_weight_table(
                    &mut reader,
                    chroma_array_type,
                    header.slice_type,
                    header.num_ref_idx_l0_active_minus1,
                    header.num_ref_idx_l1_active_minus1,
                )?);
            }

            header.five_minus_max_num_merge_cand = reader.read_ue()? as u8;
        }

        header.slice_qp_delta = reader.read_se()? as i8;

        if pps.pps_slice_chroma_qp_offsets_present_flag {
            header.slice_cb_qp_offset = reader.read_se()? as i8;
            header.slice_cr_qp_offset = reader.read_se()? as i8;
        }

        if pps.deblocking_filter_override_enabled_flag {
            header.deblocking_filter_override_flag = reader.read_flag()?;
        }

        if header.deblocking_filter_override_flag {
            header.slice_deblocking_filter_disabled_flag = reader.read_flag()?;
            if !header.slice_deblocking_filter_disabled_flag {
                header.slice_beta_offset_div2 = reader.read_se()? as i8;
                header.slice_tc_offset_div2 = reader.read_se()? as i8;
            }
        } else {
            header.slice_deblocking_filter_disabled_flag = pps.pps_deblocking_filter_disabled_flag;
            header.slice_beta_offset_div2 = pps.pps_beta_offset_div2;
            header.slice_tc_offset_div2 = pps.pps_tc_offset_div2;
        }

        if pps.pps_loop_filter_across_slices_enabled_flag
            && (header.slice_sao_luma_flag
                || header.slice_sao_chroma_flag
                || !header.slice_deblocking_filter_disabled_flag)
        {
            header.slice_loop_filter_across_slices_enabled_flag = reader.read_flag()?;
        }
    }

    if pps.tiles_enabled_flag || pps.entropy_coding_sync_enabled_flag {
        const MAX_ENTRY_POINT_OFFSETS: u32 = 1000;
        const MAX_OFFSET_BITS: u8 = 32;

        header.num_entry_point_offsets = reader.read_ue()?;
        if header.num_entry_point_offsets > MAX_ENTRY_POINT_OFFSETS {
            return Err(HevcError::InvalidSliceHeader(format!(
                "num_entry_point_offsets {} exceeds {}",
                header.num_entry_point_offsets, MAX_ENTRY_POINT_OFFSETS
            )));
        }

        if header.num_entry_point_offsets > 0 {
            let offset_len_minus1 = reader.read_ue()?;
            let offset_bits = (offset_len_minus1 + 1) as u8;
            if offset_bits > MAX_OFFSET_BITS {
                return Err(HevcError::InvalidSliceHeader(format!(
                    "offset_len_minus1 {offset_len_minus1} exceeds maximum"
                )));
            }
            for _ in 0..header.num_entry_point_offsets {
                header
                    .entry_point_offset_minus1
                    .push(reader.read_bits(offset_bits)?);
            }
        }
    }

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_type_classification() {
        assert!(SliceType::I.is_intra());
        assert!(SliceType::P.is_inter());
        assert!(SliceType::B.is_inter());
        assert_eq!(SliceType::I.name(), "I");
    }

    #[test]
    fn default_header_reports_five_merge_candidates() {
        let header = SliceHeader::default();
        assert!(header.is_intra());
        assert_eq!(header.max_num_merge_cand(), 5);
    }

    #[test]
    fn ceil_log2_matches_reference_points() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(4), 2);
        assert_eq!(ceil_log2(5), 3);
    }

    #[test]
    fn num_pic_total_curr_counts_used_by_curr_entries() {
        let mut header = SliceHeader::default();
        header.short_term_ref_pic_set.used_by_curr_pic_s0 = vec![true, false];
        header.short_term_ref_pic_set.used_by_curr_pic_s1 = vec![true];
        header.long_term_ref_pic_set.used_by_curr_pic_lt = vec![true, false];
        assert_eq!(header.num_pic_total_curr(), 3);
    }
}
