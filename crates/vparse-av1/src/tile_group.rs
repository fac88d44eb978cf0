//! Tile group OBU syntax (§5.11.1).

use vparse_core::BitReader;

use crate::error::{Av1Error, Result};
use crate::frame_header::TileInfo;

/// One tile's raw coded data, located within a tile group OBU's payload.
#[derive(Debug, Clone, Copy)]
pub struct Tile<'a> {
    pub tile_row: u32,
    pub tile_col: u32,
    pub data: &'a [u8],
}

/// A parsed `tile_group_obu()`.
#[derive(Debug, Clone)]
pub struct TileGroup<'a> {
    pub tile_start_and_end_present_flag: bool,
    pub tg_start: u32,
    pub tg_end: u32,
    pub tiles: Vec<Tile<'a>>,
}

impl<'a> TileGroup<'a> {
    /// Whether this tile group's `tg_end` reaches the frame's last tile,
    /// the point at which the bitstream resets `SeenFrameHeader` (owned by
    /// the session layer, not this parser).
    pub fn is_last_tile_group(&self, num_tiles: u32) -> bool {
        self.tg_end == num_tiles.saturating_sub(1)
    }
}

/// `tile_group_obu(sz)` (§5.11.1). `tile_info` comes from the frame header
/// this tile group belongs to.
pub fn parse_tile_group<'a>(data: &'a [u8], tile_info: &TileInfo) -> Result<TileGroup<'a>> {
    let num_tiles = tile_info.tile_cols * tile_info.tile_rows;
    if num_tiles == 0 {
        return Err(Av1Error::InvalidFrameHeader("tile_info has zero tiles".to_string()));
    }

    let mut r = BitReader::new(data);
    let tile_start_and_end_present_flag = if num_tiles > 1 { r.read_flag()? } else { false };

    let tile_bits = tile_info.tile_cols_log2 + tile_info.tile_rows_log2;
    let (tg_start, tg_end) = if num_tiles == 1 || !tile_start_and_end_present_flag {
        (0, num_tiles - 1)
    } else {
        let start = r.read_bits(tile_bits)?;
        let end = r.read_bits(tile_bits)?;
        (start, end)
    };

    if tg_end < tg_start || tg_end >= num_tiles {
        return Err(Av1Error::InvalidFrameHeader(format!(
            "tile group range [{tg_start}, {tg_end}] invalid for {num_tiles} tiles"
        )));
    }

    r.byte_align();
    let header_bytes = r.byte_position();
    let mut remaining = data.get(header_bytes..).ok_or_else(|| {
        Av1Error::InvalidFrameHeader("tile group header overruns its own OBU payload".to_string())
    })?;

    let mut tiles = Vec::with_capacity((tg_end - tg_start + 1) as usize);
    for tile_num in tg_start..=tg_end {
        let tile_row = tile_num / tile_info.tile_cols;
        let tile_col = tile_num % tile_info.tile_cols;
        let is_last = tile_num == tg_end;

        let tile_size = if is_last {
            remaining.len()
        } else {
            let size_bytes = tile_info.tile_size_bytes as usize;
            if remaining.len() < size_bytes {
                return Err(Av1Error::InvalidFrameHeader(
                    "tile group truncated before tile size field".to_string(),
                ));
            }
            let mut tile_size_minus_1 = 0u64;
            for (i, &byte) in remaining[..size_bytes].iter().enumerate() {
                tile_size_minus_1 |= (byte as u64) << (8 * i);
            }
            remaining = &remaining[size_bytes..];
            tile_size_minus_1 as usize + 1
        };

        if remaining.len() < tile_size {
            return Err(Av1Error::InvalidFrameHeader(format!(
                "tile {tile_num} size {tile_size} overruns remaining tile group data"
            )));
        }
        let (tile_data, rest) = remaining.split_at(tile_size);
        tiles.push(Tile { tile_row, tile_col, data: tile_data });
        remaining = rest;
    }

    Ok(TileGroup { tile_start_and_end_present_flag, tg_start, tg_end, tiles })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_tile_info() -> TileInfo {
        TileInfo {
            tile_cols_log2: 0,
            tile_rows_log2: 0,
            tile_cols: 1,
            tile_rows: 1,
            mi_col_starts: vec![0, 8],
            mi_row_starts: vec![0, 8],
            context_update_tile_id: 0,
            tile_size_bytes: 1,
        }
    }

    #[test]
    fn single_tile_takes_whole_payload() {
        let data = [0xAA, 0xBB, 0xCC, 0xDD];
        let tile_info = single_tile_info();
        let tg = parse_tile_group(&data, &tile_info).unwrap();
        assert_eq!(tg.tiles.len(), 1);
        assert_eq!(tg.tiles[0].data, &data[..]);
        assert!(!tg.tile_start_and_end_present_flag);
        assert!(tg.is_last_tile_group(1));
    }

    #[test]
    fn multi_tile_group_reads_size_prefixed_tiles() {
        let tile_info = TileInfo {
            tile_cols_log2: 1,
            tile_rows_log2: 0,
            tile_cols: 2,
            tile_rows: 1,
            mi_col_starts: vec![0, 4, 8],
            mi_row_starts: vec![0, 8],
            context_update_tile_id: 0,
            tile_size_bytes: 1,
        };
        // tile_start_and_end_present_flag = 0 (since num_tiles=2>1, but we choose the
        // "not present" bit so tg covers the whole frame: start=0, end=1).
        // Bits: [0] then byte-align (7 bits padding) -> header is 1 byte.
        let header = [0b0_0000000u8];
        // tile 0: size_minus_1=1 (2 bytes), data = [0x01, 0x02]
        // tile 1 (last): remainder = [0x03, 0x04, 0x05]
        let payload = [2u8 - 1, 0x01, 0x02, 0x03, 0x04, 0x05];
        let mut data = header.to_vec();
        data.extend_from_slice(&payload);

        let tg = parse_tile_group(&data, &tile_info).unwrap();
        assert_eq!(tg.tiles.len(), 2);
        assert_eq!(tg.tiles[0].data, &[0x01, 0x02]);
        assert_eq!(tg.tiles[1].data, &[0x03, 0x04, 0x05]);
        assert_eq!(tg.tiles[0].tile_col, 0);
        assert_eq!(tg.tiles[1].tile_col, 1);
    }

    #[test]
    fn zero_tiles_is_rejected() {
        let tile_info = TileInfo {
            tile_cols_log2: 0,
            tile_rows_log2: 0,
            tile_cols: 0,
            tile_rows: 1,
            mi_col_starts: vec![0],
            mi_row_starts: vec![0, 8],
            context_update_tile_id: 0,
            tile_size_bytes: 1,
        };
        assert!(parse_tile_group(&[0x00], &tile_info).is_err());
    }
}
