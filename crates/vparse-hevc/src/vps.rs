//! HEVC Video Parameter Set (VPS) parsing (7.3.2.1).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use vparse_core::BitReader;

/// Timing information for VPS/SPS.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingInfo {
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub poc_proportional_to_timing_flag: bool,
    pub num_ticks_poc_diff_one_minus1: u32,
}

/// Profile, tier, and level for a sub-layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubLayerProfileTierLevel {
    pub sub_layer_profile_present_flag: bool,
    pub sub_layer_level_present_flag: bool,
    pub sub_layer_profile_space: u8,
    pub sub_layer_tier_flag: bool,
    pub sub_layer_profile_idc: u8,
    pub sub_layer_level_idc: u8,
}

/// Profile, tier, and level (general + per sub-layer).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileTierLevel {
    pub general_profile_space: u8,
    pub general_tier_flag: bool,
    pub general_profile_idc: u8,
    pub general_profile_compatibility_flag: u32,
    pub general_progressive_source_flag: bool,
    pub general_interlaced_source_flag: bool,
    pub general_non_packed_constraint_flag: bool,
    pub general_frame_only_constraint_flag: bool,
    pub general_level_idc: u8,
    pub sub_layer_profile_tier_level: Vec<SubLayerProfileTierLevel>,
}

/// HEVC Video Parameter Set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vps {
    pub vps_video_parameter_set_id: u8,
    pub vps_base_layer_internal_flag: bool,
    pub vps_base_layer_available_flag: bool,
    pub vps_max_layers_minus1: u8,
    pub vps_max_sub_layers_minus1: u8,
    pub vps_temporal_id_nesting_flag: bool,
    pub profile_tier_level: ProfileTierLevel,
    pub vps_sub_layer_ordering_info_present_flag: bool,
    pub vps_max_dec_pic_buffering_minus1: Vec<u32>,
    pub vps_max_num_reorder_pics: Vec<u32>,
    pub vps_max_latency_increase_plus1: Vec<u32>,
    pub vps_max_layer_id: u8,
    pub vps_num_layer_sets_minus1: u16,
    pub vps_timing_info_present_flag: bool,
    pub timing_info: Option<TimingInfo>,
    pub vps_num_hrd_parameters: u16,
    pub received: bool,
}

impl Vps {
    pub fn max_sub_layers(&self) -> u8 {
        self.vps_max_sub_layers_minus1 + 1
    }

    pub fn max_layers(&self) -> u8 {
        self.vps_max_layers_minus1 + 1
    }
}

/// Parse VPS from NAL unit payload (after the 2-byte NAL header).
pub fn parse_vps(data: &[u8]) -> Result<Vps> {
    let mut reader = BitReader::new(data);

    let vps_video_parameter_set_id = reader.read_bits(4)? as u8;
    let vps_base_layer_internal_flag = reader.read_flag()?;
    let vps_base_layer_available_flag = reader.read_flag()?;
    let vps_max_layers_minus1 = reader.read_bits(6)? as u8;
    let vps_max_sub_layers_minus1 = reader.read_bits(3)? as u8;
    let vps_temporal_id_nesting_flag = reader.read_flag()?;

    let reserved = reader.read_bits(16)?;
    if reserved != 0xFFFF {
        tracing::warn!(reserved, "vps_reserved_0xffff_16bits is not 0xFFFF");
    }

    let profile_tier_level = parse_profile_tier_level(&mut reader, true, vps_max_sub_layers_minus1)?;

    let vps_sub_layer_ordering_info_present_flag = reader.read_flag()?;
    let start_idx = if vps_sub_layer_ordering_info_present_flag {
        0
    } else {
        vps_max_sub_layers_minus1 as usize
    };

    let mut vps_max_dec_pic_buffering_minus1 = Vec::new();
    let mut vps_max_num_reorder_pics = Vec::new();
    let mut vps_max_latency_increase_plus1 = Vec::new();

    for _ in start_idx..=vps_max_sub_layers_minus1 as usize {
        vps_max_dec_pic_buffering_minus1.push(reader.read_ue()?);
        vps_max_num_reorder_pics.push(reader.read_ue()?);
        vps_max_latency_increase_plus1.push(reader.read_ue()?);
    }

    let vps_max_layer_id = reader.read_bits(6)? as u8;
    let vps_num_layer_sets_minus1 = reader.read_ue()? as u16;

    for _ in 1..=vps_num_layer_sets_minus1 as usize {
        for _ in 0..=vps_max_layer_id as usize {
            let _layer_id_included_flag = reader.read_flag()?;
        }
    }

    let vps_timing_info_present_flag = reader.read_flag()?;
    let mut timing_info = None;

    if vps_timing_info_present_flag {
        let mut timing = TimingInfo {
            num_units_in_tick: reader.read_bits(32)?,
            time_scale: reader.read_bits(32)?,
            ..Default::default()
        };
        timing.poc_proportional_to_timing_flag = reader.read_flag()?;
        if timing.poc_proportional_to_timing_flag {
            timing.num_ticks_poc_diff_one_minus1 = reader.read_ue()?;
        }
        timing_info = Some(timing);
    }

    // vps_num_hrd_parameters and hrd_parameters()/vps_extension are not
    // forwarded into PicParams; the bitstream position past this doesn't
    // matter since VPS is never itself a byte-range a slice depends on.
    let vps_num_hrd_parameters = if vps_timing_info_present_flag {
        reader.read_ue()? as u16
    } else {
        0
    };

    Ok(Vps {
        vps_video_parameter_set_id,
        vps_base_layer_internal_flag,
        vps_base_layer_available_flag,
        vps_max_layers_minus1,
        vps_max_sub_layers_minus1,
        vps_temporal_id_nesting_flag,
        profile_tier_level,
        vps_sub_layer_ordering_info_present_flag,
        vps_max_dec_pic_buffering_minus1,
        vps_max_num_reorder_pics,
        vps_max_latency_increase_plus1,
        vps_max_layer_id,
        vps_num_layer_sets_minus1,
        vps_timing_info_present_flag,
        timing_info,
        vps_num_hrd_parameters,
        received: true,
    })
}

/// Parse `profile_tier_level()` (7.3.3), shared by VPS and SPS.
pub fn parse_profile_tier_level(
    reader: &mut BitReader,
    profile_present_flag: bool,
    max_sub_layers_minus1: u8,
) -> Result<ProfileTierLevel> {
    let mut ptl = ProfileTierLevel::default();

    if profile_present_flag {
        ptl.general_profile_space = reader.read_bits(2)? as u8;
        ptl.general_tier_flag = reader.read_flag()?;
        ptl.general_profile_idc = reader.read_bits(5)? as u8;
        ptl.general_profile_compatibility_flag = reader.read_bits(32)?;
        ptl.general_progressive_source_flag = reader.read_flag()?;
        ptl.general_interlaced_source_flag = reader.read_flag()?;
        ptl.general_non_packed_constraint_flag = reader.read_flag()?;
        ptl.general_frame_only_constraint_flag = reader.read_flag()?;
        reader.skip_bits(44)?;
    }

    ptl.general_level_idc = reader.read_bits(8)? as u8;

    let mut sub_layer_profile_present_flag = vec![false; max_sub_layers_minus1 as usize];
    let mut sub_layer_level_present_flag = vec![false; max_sub_layers_minus1 as usize];

    for i in 0..max_sub_layers_minus1 as usize {
        sub_layer_profile_present_flag[i] = reader.read_flag()?;
        sub_layer_level_present_flag[i] = reader.read_flag()?;
    }

    if max_sub_layers_minus1 > 0 {
        for _ in max_sub_layers_minus1..8 {
            let _reserved_zero_2bits = reader.read_bits(2)?;
        }
    }

    for i in 0..max_sub_layers_minus1 as usize {
        let mut sub = SubLayerProfileTierLevel {
            sub_layer_profile_present_flag: sub_layer_profile_present_flag[i],
            sub_layer_level_present_flag: sub_layer_level_present_flag[i],
            ..Default::default()
        };

        if sub.sub_layer_profile_present_flag {
            sub.sub_layer_profile_space = reader.read_bits(2)? as u8;
            sub.sub_layer_tier_flag = reader.read_flag()?;
            sub.sub_layer_profile_idc = reader.read_bits(5)? as u8;
            reader.skip_bits(32)?;
            reader.skip_bits(48)?;
        }

        if sub.sub_layer_level_present_flag {
            sub.sub_layer_level_idc = reader.read_bits(8)? as u8;
        }

        ptl.sub_layer_profile_tier_level.push(sub);
    }

    Ok(ptl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_layers_and_sub_layers() {
        let vps = Vps {
            vps_video_parameter_set_id: 0,
            vps_base_layer_internal_flag: true,
            vps_base_layer_available_flag: true,
            vps_max_layers_minus1: 0,
            vps_max_sub_layers_minus1: 0,
            vps_temporal_id_nesting_flag: true,
            profile_tier_level: ProfileTierLevel::default(),
            vps_sub_layer_ordering_info_present_flag: true,
            vps_max_dec_pic_buffering_minus1: vec![1],
            vps_max_num_reorder_pics: vec![0],
            vps_max_latency_increase_plus1: vec![0],
            vps_max_layer_id: 0,
            vps_num_layer_sets_minus1: 0,
            vps_timing_info_present_flag: false,
            timing_info: None,
            vps_num_hrd_parameters: 0,
            received: true,
        };
        assert_eq!(vps.max_sub_layers(), 1);
        assert_eq!(vps.max_layers(), 1);
    }
}
