//! HEVC Picture Parameter Set parsing (7.3.2.3).

use crate::error::Result;
use crate::scaling_list::{parse_scaling_list_data, ScalingListData};
use serde::{Deserialize, Serialize};
use vparse_core::BitReader;

/// Tile layout from PPS (7.3.2.3.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileConfig {
    pub num_tile_columns_minus1: u16,
    pub num_tile_rows_minus1: u16,
    pub uniform_spacing_flag: bool,
    pub column_width_minus1: Vec<u16>,
    pub row_height_minus1: Vec<u16>,
}

impl TileConfig {
    pub fn num_columns(&self) -> u16 {
        self.num_tile_columns_minus1 + 1
    }

    pub fn num_rows(&self) -> u16 {
        self.num_tile_rows_minus1 + 1
    }

    pub fn num_tiles(&self) -> u32 {
        self.num_columns() as u32 * self.num_rows() as u32
    }
}

/// HEVC Picture Parameter Set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pps {
    pub pps_pic_parameter_set_id: u8,
    pub pps_seq_parameter_set_id: u8,
    pub dependent_slice_segments_enabled_flag: bool,
    pub output_flag_present_flag: bool,
    pub num_extra_slice_header_bits: u8,
    pub sign_data_hiding_enabled_flag: bool,
    pub cabac_init_present_flag: bool,
    pub num_ref_idx_l0_default_active_minus1: u8,
    pub num_ref_idx_l1_default_active_minus1: u8,
    pub init_qp_minus26: i8,
    pub constrained_intra_pred_flag: bool,
    pub transform_skip_enabled_flag: bool,
    pub cu_qp_delta_enabled_flag: bool,
    pub diff_cu_qp_delta_depth: u8,
    pub pps_cb_qp_offset: i8,
    pub pps_cr_qp_offset: i8,
    pub pps_slice_chroma_qp_offsets_present_flag: bool,
    pub weighted_pred_flag: bool,
    pub weighted_bipred_flag: bool,
    pub transquant_bypass_enabled_flag: bool,
    pub tiles_enabled_flag: bool,
    pub entropy_coding_sync_enabled_flag: bool,
    pub tile_config: Option<TileConfig>,
    pub loop_filter_across_tiles_enabled_flag: bool,
    pub pps_loop_filter_across_slices_enabled_flag: bool,
    pub deblocking_filter_control_present_flag: bool,
    pub deblocking_filter_override_enabled_flag: bool,
    pub pps_deblocking_filter_disabled_flag: bool,
    pub pps_beta_offset_div2: i8,
    pub pps_tc_offset_div2: i8,
    pub pps_scaling_list_data_present_flag: bool,
    pub scaling_list_data: Option<ScalingListData>,
    pub lists_modification_present_flag: bool,
    pub log2_parallel_merge_level_minus2: u8,
    pub slice_segment_header_extension_present_flag: bool,
    pub pps_extension_present_flag: bool,
    pub pps_range_extension_flag: bool,
    pub pps_multilayer_extension_flag: bool,
    pub pps_3d_extension_flag: bool,
    pub pps_scc_extension_flag: bool,
    pub received: bool,
}

impl Default for Pps {
    fn default() -> Self {
        Self {
            pps_pic_parameter_set_id: 0,
            pps_seq_parameter_set_id: 0,
            dependent_slice_segments_enabled_flag: false,
            output_flag_present_flag: false,
            num_extra_slice_header_bits: 0,
            sign_data_hiding_enabled_flag: false,
            cabac_init_present_flag: false,
            num_ref_idx_l0_default_active_minus1: 0,
            num_ref_idx_l1_default_active_minus1: 0,
            init_qp_minus26: 0,
            constrained_intra_pred_flag: false,
            transform_skip_enabled_flag: false,
            cu_qp_delta_enabled_flag: false,
            diff_cu_qp_delta_depth: 0,
            pps_cb_qp_offset: 0,
            pps_cr_qp_offset: 0,
            pps_slice_chroma_qp_offsets_present_flag: false,
            weighted_pred_flag: false,
            weighted_bipred_flag: false,
            transquant_bypass_enabled_flag: false,
            tiles_enabled_flag: false,
            entropy_coding_sync_enabled_flag: false,
            tile_config: None,
            loop_filter_across_tiles_enabled_flag: true,
            pps_loop_filter_across_slices_enabled_flag: false,
            deblocking_filter_control_present_flag: false,
            deblocking_filter_override_enabled_flag: false,
            pps_deblocking_filter_disabled_flag: false,
            pps_beta_offset_div2: 0,
            pps_tc_offset_div2: 0,
            pps_scaling_list_data_present_flag: false,
            scaling_list_data: None,
            lists_modification_present_flag: false,
            log2_parallel_merge_level_minus2: 0,
            slice_segment_header_extension_present_flag: false,
            pps_extension_present_flag: false,
            pps_range_extension_flag: false,
            pps_multilayer_extension_flag: false,
            pps_3d_extension_flag: false,
            pps_scc_extension_flag: false,
            received: false,
        }
    }
}

impl Pps {
    pub fn init_qp(&self) -> i8 {
        26 + self.init_qp_minus26
    }

    pub fn has_tiles(&self) -> bool {
        self.tiles_enabled_flag && self.tile_config.is_some()
    }

    pub fn num_tiles(&self) -> Option<u32> {
        self.tile_config.as_ref().map(|tc| tc.num_tiles())
    }

    pub fn wpp_enabled(&self) -> bool {
        self.entropy_coding_sync_enabled_flag
    }
}

/// Parse PPS from RBSP data (after the 2-byte NAL header).
#[allow(clippy::field_reassign_with_default)]
pub fn parse_pps(data: &[u8]) -> Result<Pps> {
    let mut reader = BitReader::new(data);
    let mut pps = Pps::default();

    pps.pps_pic_parameter_set_id = reader.read_ue()? as u8;
    pps.pps_seq_parameter_set_id = reader.read_ue()? as u8;
    pps.dependent_slice_segments_enabled_flag = reader.read_flag()?;
    pps.output_flag_present_flag = reader.read_flag()?;
    pps.num_extra_slice_header_bits = reader.read_bits(3)? as u8;
    pps.sign_data_hiding_enabled_flag = reader.read_flag()?;
    pps.cabac_init_present_flag = reader.read_flag()?;
    pps.num_ref_idx_l0_default_active_minus1 = reader.read_ue()? as u8;
    pps.num_ref_idx_l1_default_active_minus1 = reader.read_ue()? as u8;
    pps.init_qp_minus26 = reader.read_se()? as i8;
    pps.constrained_intra_pred_flag = reader.read_flag()?;
    pps.transform_skip_enabled_flag = reader.read_flag()?;
    pps.cu_qp_delta_enabled_flag = reader.read_flag()?;

    if pps.cu_qp_delta_enabled_flag {
        pps.diff_cu_qp_delta_depth = reader.read_ue()? as u8;
    }

    pps.pps_cb_qp_offset = reader.read_se()? as i8;
    pps.pps_cr_qp_offset = reader.read_se()? as i8;
    pps.pps_slice_chroma_qp_offsets_present_flag = reader.read_flag()?;
    pps.weighted_pred_flag = reader.read_flag()?;
    pps.weighted_bipred_flag = reader.read_flag()?;
    pps.transquant_bypass_enabled_flag = reader.read_flag()?;
    pps.tiles_enabled_flag = reader.read_flag()?;
    pps.entropy_coding_sync_enabled_flag = reader.read_flag()?;

    if pps.tiles_enabled_flag {
        let num_tile_columns_minus1 = reader.read_ue()? as u16;
        let num_tile_rows_minus1 = reader.read_ue()? as u16;
        let uniform_spacing_flag = reader.read_flag()?;

        let mut tile_config = TileConfig {
            num_tile_columns_minus1,
            num_tile_rows_minus1,
            uniform_spacing_flag,
            ..Default::default()
        };

        if !tile_config.uniform_spacing_flag {
            for _ in 0..tile_config.num_tile_columns_minus1 {
                tile_config.column_width_minus1.push(reader.read_ue()? as u16);
            }
            for _ in 0..tile_config.num_tile_rows_minus1 {
                tile_config.row_height_minus1.push(reader.read_ue()? as u16);
            }
        }

        pps.loop_filter_across_tiles_enabled_flag = reader.read_flag()?;
        pps.tile_config = Some(tile_config);
    }

    pps.pps_loop_filter_across_slices_enabled_flag = reader.read_flag()?;
    pps.deblocking_filter_control_present_flag = reader.read_flag()?;

    if pps.deblocking_filter_control_present_flag {
        pps.deblocking_filter_override_enabled_flag = reader.read_flag()?;
        pps.pps_deblocking_filter_disabled_flag = reader.read_flag()?;

        if !pps.pps_deblocking_filter_disabled_flag {
            pps.pps_beta_offset_div2 = reader.read_se()? as i8;
            pps.pps_tc_offset_div2 = reader.read_se()? as i8;
        }
    }

    pps.pps_scaling_list_data_present_flag = reader.read_flag()?;
    if pps.pps_scaling_list_data_present_flag {
        pps.scaling_list_data = Some(parse_scaling_list_data(&mut reader)?);
    }

    pps.lists_modification_present_flag = reader.read_flag()?;
    pps.log2_parallel_merge_level_minus2 = reader.read_ue()? as u8;
    pps.slice_segment_header_extension_present_flag = reader.read_flag()?;
    pps.pps_extension_present_flag = reader.read_flag()?;

    if pps.pps_extension_present_flag {
        pps.pps_range_extension_flag = reader.read_flag()?;
        pps.pps_multilayer_extension_flag = reader.read_flag()?;
        pps.pps_3d_extension_flag = reader.read_flag()?;
        pps.pps_scc_extension_flag = reader.read_flag()?;
        let _pps_extension_4bits = reader.read_bits(4)?;
    }

    pps.received = true;

    Ok(pps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_init_qp() {
        let pps = Pps::default();
        assert_eq!(pps.init_qp(), 26);
        assert!(!pps.has_tiles());
        assert!(!pps.wpp_enabled());
    }

    #[test]
    fn tile_config_counts_tiles() {
        let tile_config = TileConfig {
            num_tile_columns_minus1: 3,
            num_tile_rows_minus1: 2,
            ..Default::default()
        };
        assert_eq!(tile_config.num_columns(), 4);
        assert_eq!(tile_config.num_rows(), 3);
        assert_eq!(tile_config.num_tiles(), 12);
    }
}
