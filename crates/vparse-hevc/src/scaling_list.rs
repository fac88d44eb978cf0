//! `scaling_list_data()` parsing (7.3.4). Teacher's SPS/PPS parsers both skip
//! this syntax with a comment ("complex structure"), which misaligns every
//! field parsed after it whenever scaling lists are actually signalled.
//!
//! `PicParams` only needs the 4x4/8x8/16x16/32x32 matrices themselves (for
//! hardware dequantization), not the prediction bookkeeping used to build
//! them, so this parser consumes the syntax bit-exactly and resolves
//! `scaling_list_pred_matrix_id_delta`/DPCM coefficients into the flat
//! matrices directly rather than keeping the intermediate prediction state.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use vparse_core::BitReader;

const DIAG_SCAN_4X4: [usize; 16] = [
    0, 4, 1, 8, 5, 2, 12, 9, 6, 3, 13, 10, 7, 14, 11, 15,
];

#[rustfmt::skip]
const DIAG_SCAN_8X8: [usize; 64] = [
    0, 8, 1, 16, 9, 2, 24, 17, 10, 3, 32, 25, 18, 11, 4, 40,
    33, 26, 19, 12, 5, 48, 41, 34, 27, 20, 13, 6, 56, 49, 42, 35,
    28, 21, 14, 7, 57, 50, 43, 36, 29, 22, 15, 58, 51, 44, 37, 30,
    23, 59, 52, 45, 38, 31, 60, 53, 46, 39, 61, 54, 47, 62, 55, 63,
];

const DEFAULT_SCALING_LIST_0: [u8; 16] = [16; 16];

#[rustfmt::skip]
const DEFAULT_SCALING_LIST_INTRA: [u8; 64] = [
    16, 16, 16, 16, 17, 18, 21, 24,
    16, 16, 16, 16, 17, 19, 22, 25,
    16, 16, 17, 18, 20, 22, 25, 29,
    16, 16, 18, 21, 24, 27, 31, 36,
    17, 17, 20, 24, 30, 35, 41, 47,
    18, 19, 22, 27, 35, 44, 54, 65,
    21, 22, 25, 31, 41, 54, 70, 88,
    24, 25, 29, 36, 47, 65, 88, 115,
];

#[rustfmt::skip]
const DEFAULT_SCALING_LIST_INTER: [u8; 64] = [
    16, 16, 16, 16, 17, 18, 20, 24,
    16, 16, 16, 17, 18, 20, 24, 25,
    16, 16, 17, 18, 20, 24, 25, 28,
    16, 17, 18, 20, 24, 25, 28, 33,
    17, 18, 20, 24, 25, 28, 33, 41,
    18, 20, 24, 25, 28, 33, 41, 54,
    20, 24, 25, 28, 33, 41, 54, 71,
    24, 25, 28, 33, 41, 54, 71, 91,
];

/// `scaling_list_data()` (7.3.4), fully resolved: `scaling_list[sizeId][matrixId]`
/// and the size-2/3 DC coefficients, per Table 7-5/7-6 defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingListData {
    pub scaling_list: [[Vec<u8>; 6]; 4],
    pub scaling_list_dc_coef: [[u8; 6]; 2],
}

impl Default for ScalingListData {
    fn default() -> Self {
        let mut data = ScalingListData {
            scaling_list: Default::default(),
            scaling_list_dc_coef: [[16; 6]; 2],
        };
        for matrix_id in 0..6 {
            data.scaling_list[0][matrix_id] = DEFAULT_SCALING_LIST_0.to_vec();
            let base = if matrix_id < 3 {
                DEFAULT_SCALING_LIST_INTRA
            } else {
                DEFAULT_SCALING_LIST_INTER
            };
            data.scaling_list[1][matrix_id] = base.to_vec();
            data.scaling_list[2][matrix_id] = base.to_vec();
            data.scaling_list[3][matrix_id] = base.to_vec();
        }
        data
    }
}

/// Parse `scaling_list_data()`, resolving prediction against defaults and
/// against already-parsed matrices in the same structure (7.3.4 semantics).
pub fn parse_scaling_list_data(reader: &mut BitReader) -> Result<ScalingListData> {
    let mut data = ScalingListData::default();

    for size_id in 0..4usize {
        let mut matrix_id = 0usize;
        while matrix_id < 6 {
            let scaling_list_pred_mode_flag = reader.read_flag()?;
            if !scaling_list_pred_mode_flag {
                let scaling_list_pred_matrix_id_delta = reader.read_ue()?;
                if scaling_list_pred_matrix_id_delta == 0 {
                    // Inferred from the Table 7-5/7-6 default, already in place.
                } else {
                    let step = if size_id == 3 { 3 } else { 1 };
                    let ref_matrix_id = matrix_id - scaling_list_pred_matrix_id_delta as usize * step;
                    let (left, right) = data.scaling_list[size_id].split_at_mut(matrix_id);
                    right[0] = left[ref_matrix_id].clone();
                    if size_id > 1 {
                        data.scaling_list_dc_coef[size_id - 2][matrix_id] =
                            data.scaling_list_dc_coef[size_id - 2][ref_matrix_id];
                    }
                }
            } else {
                let coef_num = if size_id == 0 { 16 } else { 64 };
                let mut next_coef = 8i32;
                if size_id > 1 {
                    let scaling_list_dc_coef_minus8 = reader.read_se()?;
                    next_coef = scaling_list_dc_coef_minus8 + 8;
                    data.scaling_list_dc_coef[size_id - 2][matrix_id] = next_coef as u8;
                }
                let mut list = vec![0u8; coef_num];
                for i in 0..coef_num {
                    let scaling_list_delta_coef = reader.read_se()?;
                    next_coef = (next_coef + scaling_list_delta_coef + 256) % 256;
                    let scan = if size_id == 0 {
                        DIAG_SCAN_4X4[i]
                    } else {
                        DIAG_SCAN_8X8[i]
                    };
                    list[scan] = next_coef as u8;
                }
                data.scaling_list[size_id][matrix_id] = list;
            }
            matrix_id += if size_id == 3 { 3 } else { 1 };
        }
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matrices_match_table_7_5_and_7_6() {
        let data = ScalingListData::default();
        assert_eq!(data.scaling_list[0][0], DEFAULT_SCALING_LIST_0.to_vec());
        assert_eq!(
            data.scaling_list[1][0],
            DEFAULT_SCALING_LIST_INTRA.to_vec()
        );
        assert_eq!(
            data.scaling_list[1][3],
            DEFAULT_SCALING_LIST_INTER.to_vec()
        );
    }

    #[test]
    fn parses_pred_mode_zero_for_every_matrix() {
        // scaling_list_pred_mode_flag=0, scaling_list_pred_matrix_id_delta=0 (ue "1")
        // repeated for every matrixId at every sizeId: 4*6 = 24 bits, all "01".
        let pattern = "01".repeat(24);
        let data = bits(&pattern);
        let mut reader = BitReader::new(&data);
        let parsed = parse_scaling_list_data(&mut reader).unwrap();
        let defaults = ScalingListData::default();
        assert_eq!(parsed.scaling_list, defaults.scaling_list);
    }

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
}
