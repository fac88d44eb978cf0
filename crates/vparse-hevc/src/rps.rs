//! Short-term reference picture set parsing (7.3.7) and RPS derivation (8.3.2).
//!
//! Teacher's SPS parser reads `num_short_term_ref_pic_sets` and then skips the
//! actual `short_term_ref_pic_set()` structures entirely, leaving every
//! subsequent SPS field bit-misaligned whenever the count is nonzero. This
//! module parses the syntax for real, including inter-RPS prediction, and is
//! shared by both SPS (where sets are signalled up front) and the slice header
//! (where a set can be signalled inline).

use crate::error::{HevcError, Result};
use serde::{Deserialize, Serialize};
use vparse_core::BitReader;

/// One `short_term_ref_pic_set()` (7.3.7), after inter-RPS prediction has been
/// resolved into explicit delta POC / used-by-curr-pic lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShortTermRefPicSet {
    pub num_negative_pics: u8,
    pub num_positive_pics: u8,
    /// DeltaPocS0[i], most-recent-first, negative.
    pub delta_poc_s0: Vec<i32>,
    pub used_by_curr_pic_s0: Vec<bool>,
    /// DeltaPocS1[i], positive.
    pub delta_poc_s1: Vec<i32>,
    pub used_by_curr_pic_s1: Vec<bool>,
}

impl ShortTermRefPicSet {
    pub fn num_delta_pocs(&self) -> usize {
        self.num_negative_pics as usize + self.num_positive_pics as usize
    }
}

/// Parse `short_term_ref_pic_set(stRpsIdx)` (7.3.7). `rps_idx` is the index
/// being parsed; `all_sets[0..rps_idx]` must already hold every preceding set
/// in the same parameter set, since inter-RPS prediction references them.
pub fn parse_short_term_ref_pic_set(
    reader: &mut BitReader,
    rps_idx: usize,
    num_short_term_ref_pic_sets: usize,
    all_sets: &[ShortTermRefPicSet],
) -> Result<ShortTermRefPicSet> {
    let inter_ref_pic_set_prediction_flag = if rps_idx != 0 {
        reader.read_flag()?
    } else {
        false
    };

    if inter_ref_pic_set_prediction_flag {
        let delta_idx_minus1 = if rps_idx == num_short_term_ref_pic_sets {
            reader.read_ue()?
        } else {
            0
        };
        let delta_rps_sign = reader.read_flag()?;
        let abs_delta_rps_minus1 = reader.read_ue()?;
        let delta_rps = (1 - 2 * delta_rps_sign as i32) * (abs_delta_rps_minus1 as i32 + 1);

        let ref_rps_idx = rps_idx
            .checked_sub(delta_idx_minus1 as usize + 1)
            .ok_or_else(|| {
                HevcError::InvalidSps("short_term_ref_pic_set: ref_rps_idx underflow".to_string())
            })?;
        let ref_rps = all_sets.get(ref_rps_idx).ok_or_else(|| {
            HevcError::InvalidSps("short_term_ref_pic_set: ref_rps_idx out of range".to_string())
        })?;
        let num_delta_pocs = ref_rps.num_delta_pocs();

        let mut used_by_curr_pic_flag = vec![false; num_delta_pocs + 1];
        let mut use_delta_flag = vec![true; num_delta_pocs + 1];
        for j in 0..=num_delta_pocs {
            used_by_curr_pic_flag[j] = reader.read_flag()?;
            if !used_by_curr_pic_flag[j] {
                use_delta_flag[j] = reader.read_flag()?;
            }
        }

        // Derive DeltaPocS0/S1 per (7-59)/(7-60): merge the referenced set's
        // positive deltas (reversed) and delta_rps, then the negative deltas
        // and delta_rps, keeping only entries whose use_delta_flag survives.
        let mut delta_poc_s0 = Vec::new();
        let mut used_s0 = Vec::new();
        for j in (0..ref_rps.num_positive_pics as usize).rev() {
            let d_poc = ref_rps.delta_poc_s1[j] + delta_rps;
            if d_poc < 0 && use_delta_flag[ref_rps.num_negative_pics as usize + j] {
                delta_poc_s0.push(d_poc);
                used_s0.push(used_by_curr_pic_flag[ref_rps.num_negative_pics as usize + j]);
            }
        }
        if delta_rps < 0 && use_delta_flag[num_delta_pocs] {
            delta_poc_s0.push(delta_rps);
            used_s0.push(used_by_curr_pic_flag[num_delta_pocs]);
        }
        for j in 0..ref_rps.num_negative_pics as usize {
            let d_poc = ref_rps.delta_poc_s0[j] + delta_rps;
            if d_poc < 0 && use_delta_flag[j] {
                delta_poc_s0.push(d_poc);
                used_s0.push(used_by_curr_pic_flag[j]);
            }
        }

        let mut delta_poc_s1 = Vec::new();
        let mut used_s1 = Vec::new();
        for j in (0..ref_rps.num_negative_pics as usize).rev() {
            let d_poc = ref_rps.delta_poc_s0[j] + delta_rps;
            if d_poc > 0 && use_delta_flag[j] {
                delta_poc_s1.push(d_poc);
                used_s1.push(used_by_curr_pic_flag[j]);
            }
        }
        if delta_rps > 0 && use_delta_flag[num_delta_pocs] {
            delta_poc_s1.push(delta_rps);
            used_s1.push(used_by_curr_pic_flag[num_delta_pocs]);
        }
        for j in 0..ref_rps.num_positive_pics as usize {
            let d_poc = ref_rps.delta_poc_s1[j] + delta_rps;
            if d_poc > 0 && use_delta_flag[ref_rps.num_negative_pics as usize + j] {
                delta_poc_s1.push(d_poc);
                used_s1.push(used_by_curr_pic_flag[ref_rps.num_negative_pics as usize + j]);
            }
        }

        Ok(ShortTermRefPicSet {
            num_negative_pics: delta_poc_s0.len() as u8,
            num_positive_pics: delta_poc_s1.len() as u8,
            delta_poc_s0,
            used_by_curr_pic_s0: used_s0,
            delta_poc_s1,
            used_by_curr_pic_s1: used_s1,
        })
    } else {
        let num_negative_pics = reader.read_ue()? as u8;
        let num_positive_pics = reader.read_ue()? as u8;

        let mut delta_poc_s0 = Vec::with_capacity(num_negative_pics as usize);
        let mut used_by_curr_pic_s0 = Vec::with_capacity(num_negative_pics as usize);
        let mut prev = 0i32;
        for _ in 0..num_negative_pics {
            let delta_poc_s0_minus1 = reader.read_ue()? as i32;
            prev -= delta_poc_s0_minus1 + 1;
            delta_poc_s0.push(prev);
            used_by_curr_pic_s0.push(reader.read_flag()?);
        }

        let mut delta_poc_s1 = Vec::with_capacity(num_positive_pics as usize);
        let mut used_by_curr_pic_s1 = Vec::with_capacity(num_positive_pics as usize);
        let mut prev = 0i32;
        for _ in 0..num_positive_pics {
            let delta_poc_s1_minus1 = reader.read_ue()? as i32;
            prev += delta_poc_s1_minus1 + 1;
            delta_poc_s1.push(prev);
            used_by_curr_pic_s1.push(reader.read_flag()?);
        }

        Ok(ShortTermRefPicSet {
            num_negative_pics,
            num_positive_pics,
            delta_poc_s0,
            used_by_curr_pic_s0,
            delta_poc_s1,
            used_by_curr_pic_s1,
        })
    }
}

/// Output of RPS derivation (8.3.2): POC values for each of the five
/// reference-picture-set categories, used to look pictures up in the DPB.
#[derive(Debug, Clone, Default)]
pub struct DerivedRps {
    pub poc_st_curr_before: Vec<i32>,
    pub poc_st_curr_after: Vec<i32>,
    pub poc_st_foll: Vec<i32>,
    /// (poc, delta_poc_msb_present) pairs for long-term pictures used by the
    /// current picture.
    pub poc_lt_curr: Vec<(i32, bool)>,
    pub poc_lt_foll: Vec<(i32, bool)>,
}

/// Derive the five RPS subsets for the current picture (8.3.2). `lt_pocs` is
/// the slice's resolved long-term POC list with `delta_poc_msb_present_flag`
/// and `used_by_curr_pic_flag` already applied per entry.
pub fn derive_rps(
    curr_poc: i32,
    st_rps: &ShortTermRefPicSet,
    lt_pocs: &[(i32, bool, bool)],
) -> DerivedRps {
    let mut derived = DerivedRps::default();

    for i in 0..st_rps.num_negative_pics as usize {
        let poc = curr_poc + st_rps.delta_poc_s0[i];
        if st_rps.used_by_curr_pic_s0[i] {
            derived.poc_st_curr_before.push(poc);
        } else {
            derived.poc_st_foll.push(poc);
        }
    }

    for i in 0..st_rps.num_positive_pics as usize {
        let poc = curr_poc + st_rps.delta_poc_s1[i];
        if st_rps.used_by_curr_pic_s1[i] {
            derived.poc_st_curr_after.push(poc);
        } else {
            derived.poc_st_foll.push(poc);
        }
    }

    for &(poc, delta_msb_present, used_by_curr) in lt_pocs {
        if used_by_curr {
            derived.poc_lt_curr.push((poc, delta_msb_present));
        } else {
            derived.poc_lt_foll.push((poc, delta_msb_present));
        }
    }

    derived
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(bits: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in bits.as_bytes().chunks(8) {
            let mut byte = 0u8;
            for (i, &b) in chunk.iter().enumerate() {
                if b == b'1' {
                    byte |= 1 << (7 - i);
                }
            }
            out.push(byte);
        }
        out
    }

    #[test]
    fn parses_explicit_negative_and_positive_pics() {
        // num_negative_pics=1 (ue "010"), num_positive_pics=1 (ue "010")
        // delta_poc_s0_minus1[0]=0 (ue "1"), used_by_curr_pic_s0[0]=1
        // delta_poc_s1_minus1[0]=0 (ue "1"), used_by_curr_pic_s1[0]=1
        let data = bits("0100100111");
        let mut reader = BitReader::new(&data);
        let rps = parse_short_term_ref_pic_set(&mut reader, 0, 1, &[]).unwrap();
        assert_eq!(rps.num_negative_pics, 1);
        assert_eq!(rps.num_positive_pics, 1);
        assert_eq!(rps.delta_poc_s0, vec![-1]);
        assert_eq!(rps.delta_poc_s1, vec![1]);
        assert!(rps.used_by_curr_pic_s0[0]);
        assert!(rps.used_by_curr_pic_s1[0]);
    }

    #[test]
    fn derive_rps_splits_curr_and_foll() {
        let st_rps = ShortTermRefPicSet {
            num_negative_pics: 2,
            num_positive_pics: 1,
            delta_poc_s0: vec![-1, -2],
            used_by_curr_pic_s0: vec![true, false],
            delta_poc_s1: vec![1],
            used_by_curr_pic_s1: vec![true],
        };
        let derived = derive_rps(10, &st_rps, &[]);
        assert_eq!(derived.poc_st_curr_before, vec![9]);
        assert_eq!(derived.poc_st_foll, vec![8]);
        assert_eq!(derived.poc_st_curr_after, vec![11]);
    }
}
