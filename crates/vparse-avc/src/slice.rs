//! H.264/AVC slice header parsing.

use crate::error::{AvcError, Result};
use crate::nal::NalUnitType;
use crate::pps::Pps;
use crate::sps::{ChromaFormat, Sps};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vparse_core::BitReader;

/// Slice type (Table 7-6), values already taken mod 5 since encoders may
/// signal `slice_type + 5` to indicate "all slices in this picture share
/// this type".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SliceType {
    P = 0,
    B = 1,
    I = 2,
    Sp = 3,
    Si = 4,
}

impl SliceType {
    pub fn from_u32(value: u32) -> Self {
        match value % 5 {
            0 => SliceType::P,
            1 => SliceType::B,
            2 => SliceType::I,
            3 => SliceType::Sp,
            4 => SliceType::Si,
            _ => unreachable!("value % 5 is always in 0..5"),
        }
    }

    pub fn is_intra(&self) -> bool {
        matches!(self, SliceType::I | SliceType::Si)
    }

    pub fn is_b(&self) -> bool {
        matches!(self, SliceType::B)
    }

    pub fn is_p(&self) -> bool {
        matches!(self, SliceType::P | SliceType::Sp)
    }
}

/// One `modification_of_pic_nums_idc` entry from `ref_pic_list_modification()`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RefPicListModEntry {
    pub idc: u32,
    /// `abs_diff_pic_num_minus1` (idc 0/1) or `long_term_pic_num` (idc 2).
    pub value: u32,
}

/// Reference picture list modification (8.2.4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefPicListModification {
    pub entries: Vec<RefPicListModEntry>,
}

/// One memory_management_control_operation entry (8.2.5.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MmcoOp {
    pub op: u32,
    pub difference_of_pic_nums_minus1: u32,
    pub long_term_pic_num: u32,
    pub long_term_frame_idx: u32,
    pub max_long_term_frame_idx_plus1: u32,
}

/// `dec_ref_pic_marking()` (7.3.3.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecRefPicMarking {
    pub no_output_of_prior_pics_flag: bool,
    pub long_term_reference_flag: bool,
    pub adaptive_ref_pic_marking_mode_flag: bool,
    pub mmco_ops: Vec<MmcoOp>,
}

/// Slice header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceHeader {
    pub first_mb_in_slice: u32,
    pub slice_type: SliceType,
    pub pic_parameter_set_id: u8,
    pub colour_plane_id: u8,
    pub frame_num: u32,
    pub field_pic_flag: bool,
    pub bottom_field_flag: bool,
    pub idr_pic_id: u32,
    pub pic_order_cnt_lsb: u32,
    pub delta_pic_order_cnt_bottom: i32,
    pub delta_pic_order_cnt: [i32; 2],
    pub redundant_pic_cnt: u32,
    pub direct_spatial_mv_pred_flag: bool,
    pub num_ref_idx_active_override_flag: bool,
    pub num_ref_idx_l0_active_minus1: u32,
    pub num_ref_idx_l1_active_minus1: u32,
    pub ref_pic_list_modification_flag_l0: bool,
    pub ref_pic_list_modification_flag_l1: bool,
    pub ref_pic_list_modification_l0: RefPicListModification,
    pub ref_pic_list_modification_l1: RefPicListModification,
    pub dec_ref_pic_marking: DecRefPicMarking,
    pub cabac_init_idc: u32,
    pub slice_qp_delta: i32,
    pub sp_for_switch_flag: bool,
    pub slice_qs_delta: i32,
    pub disable_deblocking_filter_idc: u32,
    pub slice_alpha_c0_offset_div2: i32,
    pub slice_beta_offset_div2: i32,
    pub slice_group_change_cycle: u32,
    /// NAL-level context the reference-list builder and RPS engine need;
    /// not itself part of `slice_header()` syntax.
    pub nal_unit_type: NalUnitType,
    pub nal_ref_idc: u8,
}

impl SliceHeader {
    pub fn qp(&self, pps: &Pps) -> i32 {
        26 + pps.pic_init_qp_minus26 + self.slice_qp_delta
    }

    pub fn is_first_slice(&self) -> bool {
        self.first_mb_in_slice == 0
    }

    pub fn is_idr(&self) -> bool {
        self.nal_unit_type == NalUnitType::IdrSlice
    }
}

/// Parse slice header from NAL unit payload (after the NAL header byte).
pub fn parse_slice_header(
    data: &[u8],
    sps_map: &HashMap<u8, Sps>,
    pps_map: &HashMap<u8, Pps>,
    nal_type: NalUnitType,
    nal_ref_idc: u8,
) -> Result<SliceHeader> {
    let mut reader = BitReader::new(data);

    let first_mb_in_slice = reader.read_ue()?;
    let slice_type = SliceType::from_u32(reader.read_ue()?);
    let pic_parameter_set_id = reader.read_ue()? as u8;

    let pps = pps_map.get(&pic_parameter_set_id).ok_or_else(|| {
        AvcError::MissingParameterSet(format!("PPS {pic_parameter_set_id} not received"))
    })?;
    let sps = sps_map.get(&pps.seq_parameter_set_id).ok_or_else(|| {
        AvcError::MissingParameterSet(format!("SPS {} not received", pps.seq_parameter_set_id))
    })?;

    let mut colour_plane_id = 0;
    if sps.separate_colour_plane_flag {
        colour_plane_id = reader.read_bits(2)? as u8;
    }

    let frame_num_bits = sps.log2_max_frame_num_minus4 + 4;
    let frame_num = reader.read_bits(frame_num_bits)?;

    let mut field_pic_flag = false;
    let mut bottom_field_flag = false;
    if !sps.frame_mbs_only_flag {
        field_pic_flag = reader.read_flag()?;
        if field_pic_flag {
            bottom_field_flag = reader.read_flag()?;
        }
    }

    let mut idr_pic_id = 0;
    if nal_type == NalUnitType::IdrSlice {
        idr_pic_id = reader.read_ue()?;
    }

    let mut pic_order_cnt_lsb = 0;
    let mut delta_pic_order_cnt_bottom = 0;
    let mut delta_pic_order_cnt = [0i32; 2];

    match sps.pic_order_cnt_type {
        0 => {
            let poc_lsb_bits = sps.log2_max_pic_order_cnt_lsb_minus4 + 4;
            pic_order_cnt_lsb = reader.read_bits(poc_lsb_bits)?;
            if pps.bottom_field_pic_order_in_frame_present_flag && !field_pic_flag {
                delta_pic_order_cnt_bottom = reader.read_se()?;
            }
        }
        1 if !sps.delta_pic_order_always_zero_flag => {
            delta_pic_order_cnt[0] = reader.read_se()?;
            if pps.bottom_field_pic_order_in_frame_present_flag && !field_pic_flag {
                delta_pic_order_cnt[1] = reader.read_se()?;
            }
        }
        _ => {}
    }

    let mut redundant_pic_cnt = 0;
    if pps.redundant_pic_cnt_present_flag {
        redundant_pic_cnt = reader.read_ue()?;
    }

    let mut direct_spatial_mv_pred_flag = false;
    if slice_type.is_b() {
        direct_spatial_mv_pred_flag = reader.read_flag()?;
    }

    let mut num_ref_idx_active_override_flag = false;
    let mut num_ref_idx_l0_active_minus1 = pps.num_ref_idx_l0_default_active_minus1;
    let mut num_ref_idx_l1_active_minus1 = pps.num_ref_idx_l1_default_active_minus1;

    if slice_type.is_p() || slice_type.is_b() {
        num_ref_idx_active_override_flag = reader.read_flag()?;
        if num_ref_idx_active_override_flag {
            num_ref_idx_l0_active_minus1 = reader.read_ue()?;
            if slice_type.is_b() {
                num_ref_idx_l1_active_minus1 = reader.read_ue()?;
            }
        }
    }

    let mut ref_pic_list_modification_flag_l0 = false;
    let mut ref_pic_list_modification_flag_l1 = false;
    let mut ref_pic_list_modification_l0 = RefPicListModification::default();
    let mut ref_pic_list_modification_l1 = RefPicListModification::default();

    if !slice_type.is_intra() {
        ref_pic_list_modification_flag_l0 = reader.read_flag()?;
        if ref_pic_list_modification_flag_l0 {
            ref_pic_list_modification_l0 = parse_ref_pic_list_modification(&mut reader)?;
        }
    }

    if slice_type.is_b() {
        ref_pic_list_modification_flag_l1 = reader.read_flag()?;
        if ref_pic_list_modification_flag_l1 {
            ref_pic_list_modification_l1 = parse_ref_pic_list_modification(&mut reader)?;
        }
    }

    if (pps.weighted_pred_flag && (slice_type.is_p() || matches!(slice_type, SliceType::Sp)))
        || (pps.weighted_bipred_idc == 1 && slice_type.is_b())
    {
        skip_pred_weight_table(
            &mut reader,
            slice_type,
            num_ref_idx_l0_active_minus1,
            num_ref_idx_l1_active_minus1,
            sps,
        )?;
    }

    let mut dec_ref_pic_marking = DecRefPicMarking::default();
    if nal_ref_idc != 0 {
        dec_ref_pic_marking = parse_dec_ref_pic_marking(&mut reader, nal_type)?;
    }

    let mut cabac_init_idc = 0;
    if pps.entropy_coding_mode_flag && !slice_type.is_intra() {
        cabac_init_idc = reader.read_ue()?;
    }

    let slice_qp_delta = reader.read_se()?;

    let mut sp_for_switch_flag = false;
    let mut slice_qs_delta = 0;
    if matches!(slice_type, SliceType::Sp | SliceType::Si) {
        if matches!(slice_type, SliceType::Sp) {
            sp_for_switch_flag = reader.read_flag()?;
        }
        slice_qs_delta = reader.read_se()?;
    }

    let mut disable_deblocking_filter_idc = 0;
    let mut slice_alpha_c0_offset_div2 = 0;
    let mut slice_beta_offset_div2 = 0;

    if pps.deblocking_filter_control_present_flag {
        disable_deblocking_filter_idc = reader.read_ue()?;
        if disable_deblocking_filter_idc != 1 {
            slice_alpha_c0_offset_div2 = reader.read_se()?;
            slice_beta_offset_div2 = reader.read_se()?;
        }
    }

    let mut slice_group_change_cycle = 0;
    if pps.num_slice_groups_minus1 > 0
        && pps.slice_group_map_type >= 3
        && pps.slice_group_map_type <= 5
    {
        let pic_size_in_map_units =
            (sps.pic_width_in_mbs_minus1 + 1) * (sps.pic_height_in_map_units_minus1 + 1);
        // Ceil(Log2(PicSizeInMapUnits / SliceGroupChangeRate + 1)), approximated
        // the way the lineage's parser does: bits over the raw map-unit count.
        let bits = (32 - pic_size_in_map_units.max(1).leading_zeros() + 1) as u8;
        slice_group_change_cycle = reader.read_bits(bits)?;
    }

    Ok(SliceHeader {
        first_mb_in_slice,
        slice_type,
        pic_parameter_set_id,
        colour_plane_id,
        frame_num,
        field_pic_flag,
        bottom_field_flag,
        idr_pic_id,
        pic_order_cnt_lsb,
        delta_pic_order_cnt_bottom,
        delta_pic_order_cnt,
        redundant_pic_cnt,
        direct_spatial_mv_pred_flag,
        num_ref_idx_active_override_flag,
        num_ref_idx_l0_active_minus1,
        num_ref_idx_l1_active_minus1,
        ref_pic_list_modification_flag_l0,
        ref_pic_list_modification_flag_l1,
        ref_pic_list_modification_l0,
        ref_pic_list_modification_l1,
        dec_ref_pic_marking,
        cabac_init_idc,
        slice_qp_delta,
        sp_for_switch_flag,
        slice_qs_delta,
        disable_deblocking_filter_idc,
        slice_alpha_c0_offset_div2,
        slice_beta_offset_div2,
        slice_group_change_cycle,
        nal_unit_type: nal_type,
        nal_ref_idc,
    })
}

fn parse_ref_pic_list_modification(reader: &mut BitReader) -> Result<RefPicListModification> {
    let mut entries = Vec::new();

    loop {
        let idc = reader.read_ue()?;
        if idc == 3 {
            break;
        }
        let value = match idc {
            0 | 1 | 2 => reader.read_ue()?,
            _ => {
                return Err(AvcError::InvalidSliceHeader(format!(
                    "unknown modification_of_pic_nums_idc {idc}"
                )))
            }
        };
        entries.push(RefPicListModEntry { idc, value });
    }

    Ok(RefPicListModification { entries })
}

fn parse_dec_ref_pic_marking(reader: &mut BitReader, nal_type: NalUnitType) -> Result<DecRefPicMarking> {
    let mut marking = DecRefPicMarking::default();

    if nal_type == NalUnitType::IdrSlice {
        marking.no_output_of_prior_pics_flag = reader.read_flag()?;
        marking.long_term_reference_flag = reader.read_flag()?;
        return Ok(marking);
    }

    marking.adaptive_ref_pic_marking_mode_flag = reader.read_flag()?;
    if !marking.adaptive_ref_pic_marking_mode_flag {
        return Ok(marking);
    }

    loop {
        let op = reader.read_ue()?;
        if op == 0 {
            break;
        }

        let mut entry = MmcoOp {
            op,
            difference_of_pic_nums_minus1: 0,
            long_term_pic_num: 0,
            long_term_frame_idx: 0,
            max_long_term_frame_idx_plus1: 0,
        };

        match op {
            1 => {
                entry.difference_of_pic_nums_minus1 = reader.read_ue()?;
            }
            2 => {
                entry.long_term_pic_num = reader.read_ue()?;
            }
            3 => {
                entry.difference_of_pic_nums_minus1 = reader.read_ue()?;
                entry.long_term_frame_idx = reader.read_ue()?;
            }
            4 => {
                entry.max_long_term_frame_idx_plus1 = reader.read_ue()?;
            }
            5 | 6 => {
                if op == 6 {
                    entry.long_term_frame_idx = reader.read_ue()?;
                }
            }
            _ => {
                return Err(AvcError::InvalidSliceHeader(format!(
                    "unknown memory_management_control_operation {op}"
                )))
            }
        }

        marking.mmco_ops.push(entry);
    }

    Ok(marking)
}

fn skip_pred_weight_table(
    reader: &mut BitReader,
    slice_type: SliceType,
    num_ref_idx_l0_active_minus1: u32,
    num_ref_idx_l1_active_minus1: u32,
    sps: &Sps,
) -> Result<()> {
    let _luma_log2_weight_denom = reader.read_ue()?;
    if sps.chroma_format_idc != ChromaFormat::Monochrome {
        let _chroma_log2_weight_denom = reader.read_ue()?;
    }

    skip_pred_weight_list(reader, num_ref_idx_l0_active_minus1, sps)?;
    if slice_type.is_b() {
        skip_pred_weight_list(reader, num_ref_idx_l1_active_minus1, sps)?;
    }

    Ok(())
}

/// Weighted-prediction defaults (8.4.2.3.2): an unused luma/chroma weight
/// flag means `weight = 1 << log2_denom, offset = 0`; this function only
/// advances the reader, the defaults are applied by the RPS/RefListBuilder
/// when it assembles `PicParams`' weighted-prediction tables.
fn skip_pred_weight_list(reader: &mut BitReader, num_ref_idx_active_minus1: u32, sps: &Sps) -> Result<()> {
    for _ in 0..=num_ref_idx_active_minus1 {
        let luma_weight_flag = reader.read_flag()?;
        if luma_weight_flag {
            let _luma_weight = reader.read_se()?;
            let _luma_offset = reader.read_se()?;
        }

        if sps.chroma_format_idc != ChromaFormat::Monochrome {
            let chroma_weight_flag = reader.read_flag()?;
            if chroma_weight_flag {
                for _ in 0..2 {
                    let _chroma_weight = reader.read_se()?;
                    let _chroma_offset = reader.read_se()?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_type_wraps_mod_5() {
        assert_eq!(SliceType::from_u32(0), SliceType::P);
        assert_eq!(SliceType::from_u32(5), SliceType::P);
        assert_eq!(SliceType::from_u32(7), SliceType::I);
        assert!(SliceType::I.is_intra());
        assert!(SliceType::B.is_b());
        assert!(SliceType::P.is_p());
    }

    #[test]
    fn missing_pps_is_an_error() {
        let sps_map = HashMap::new();
        let pps_map = HashMap::new();
        let data = [0x10, 0x00];
        let result = parse_slice_header(&data, &sps_map, &pps_map, NalUnitType::IdrSlice, 1);
        assert!(result.is_err());
    }
}
