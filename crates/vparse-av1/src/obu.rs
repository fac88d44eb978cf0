//! Open Bitstream Unit framing (§5.2 / §5.3).

use std::fmt;

use vparse_core::BitReader;

use crate::error::{Av1Error, Result};

/// `obu_type` (§6.2.2, Table 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObuType {
    Reserved0 = 0,
    SequenceHeader = 1,
    TemporalDelimiter = 2,
    FrameHeader = 3,
    TileGroup = 4,
    Metadata = 5,
    Frame = 6,
    RedundantFrameHeader = 7,
    TileList = 8,
    Reserved9 = 9,
    Reserved10 = 10,
    Reserved11 = 11,
    Reserved12 = 12,
    Reserved13 = 13,
    Reserved14 = 14,
    Padding = 15,
}

impl ObuType {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Reserved0,
            1 => Self::SequenceHeader,
            2 => Self::TemporalDelimiter,
            3 => Self::FrameHeader,
            4 => Self::TileGroup,
            5 => Self::Metadata,
            6 => Self::Frame,
            7 => Self::RedundantFrameHeader,
            8 => Self::TileList,
            9 => Self::Reserved9,
            10 => Self::Reserved10,
            11 => Self::Reserved11,
            12 => Self::Reserved12,
            13 => Self::Reserved13,
            14 => Self::Reserved14,
            _ => Self::Padding,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Reserved0 => "reserved_0",
            Self::SequenceHeader => "sequence_header",
            Self::TemporalDelimiter => "temporal_delimiter",
            Self::FrameHeader => "frame_header",
            Self::TileGroup => "tile_group",
            Self::Metadata => "metadata",
            Self::Frame => "frame",
            Self::RedundantFrameHeader => "redundant_frame_header",
            Self::TileList => "tile_list",
            Self::Reserved9 | Self::Reserved10 | Self::Reserved11 | Self::Reserved12 | Self::Reserved13 | Self::Reserved14 => "reserved",
            Self::Padding => "padding",
        }
    }

    /// Whether this OBU type carries an uncompressed frame header (i.e.
    /// `FrameHeader`, `RedundantFrameHeader` or `Frame`).
    pub fn has_frame_header(self) -> bool {
        matches!(self, Self::FrameHeader | Self::RedundantFrameHeader | Self::Frame)
    }
}

impl fmt::Display for ObuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// `obu_header()` (§5.3.2).
#[derive(Debug, Clone, Copy)]
pub struct ObuHeader {
    pub obu_type: ObuType,
    pub has_extension: bool,
    pub has_size_field: bool,
    pub temporal_id: u8,
    pub spatial_id: u8,
    /// Size in bytes of the header itself (1, or 2 with the extension byte).
    pub header_size: usize,
}

/// A single OBU: header plus its payload slice (excluding header and
/// leb128 size field).
#[derive(Debug, Clone, Copy)]
pub struct Obu<'a> {
    pub header: ObuHeader,
    pub payload: &'a [u8],
    /// Byte offset of this OBU (header start) within the buffer it was
    /// parsed from.
    pub offset: usize,
    /// Total size of header + size field + payload.
    pub total_size: usize,
}

/// Parse `obu_header()` from the start of `data`.
pub fn parse_obu_header(data: &[u8]) -> Result<ObuHeader> {
    let mut reader = BitReader::new(data);

    if reader.read_bit()? {
        return Err(Av1Error::InvalidObuHeader(
            "obu_forbidden_bit must be 0".to_string(),
        ));
    }
    let obu_type = ObuType::from_u8(reader.read_bits(4)? as u8);
    let has_extension = reader.read_bit()?;
    let has_size_field = reader.read_bit()?;
    if !has_size_field {
        return Err(Av1Error::InvalidObuHeader(
            "obu_has_size_field must be 1 (§5.2)".to_string(),
        ));
    }
    if reader.read_bit()? {
        return Err(Av1Error::InvalidObuHeader(
            "obu_reserved_1bit must be 0".to_string(),
        ));
    }

    let (temporal_id, spatial_id, header_size) = if has_extension {
        let temporal_id = reader.read_bits(3)? as u8;
        let spatial_id = reader.read_bits(2)? as u8;
        if reader.read_bits(3)? != 0 {
            return Err(Av1Error::InvalidObuHeader(
                "extension_header_reserved_3bits must be 0".to_string(),
            ));
        }
        (temporal_id, spatial_id, 2)
    } else {
        (0, 0, 1)
    };

    Ok(ObuHeader {
        obu_type,
        has_extension,
        has_size_field,
        temporal_id,
        spatial_id,
        header_size,
    })
}

/// Parse one OBU starting at `data[offset..]`. Returns the OBU and the total
/// number of bytes it occupies (header + leb128 size field + payload).
pub fn parse_obu(data: &[u8], offset: usize) -> Result<(Obu<'_>, usize)> {
    let slice = data.get(offset..).ok_or_else(|| {
        Av1Error::InvalidObuHeader(format!("offset {offset} past end of buffer"))
    })?;
    let header = parse_obu_header(slice)?;

    let after_header = &slice[header.header_size..];
    let mut size_reader = BitReader::new(after_header);
    let (obu_size, size_bytes) = size_reader.read_leb128()?;
    let size_bytes = size_bytes as usize;
    let obu_size = obu_size as usize;

    let payload_start = header.header_size + size_bytes;
    let payload_end = payload_start
        .checked_add(obu_size)
        .filter(|&end| end <= slice.len())
        .ok_or_else(|| {
            Av1Error::InvalidObuHeader(format!(
                "obu_size {obu_size} overruns the remaining buffer"
            ))
        })?;

    let obu = Obu {
        header,
        payload: &slice[payload_start..payload_end],
        offset,
        total_size: payload_end,
    };
    Ok((obu, payload_end))
}

/// Iterate every OBU in a temporal unit / annex-B packet.
pub struct ObuIterator<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ObuIterator<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }
}

impl<'a> Iterator for ObuIterator<'a> {
    type Item = Result<Obu<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }
        match parse_obu(self.data, self.offset) {
            Ok((obu, consumed)) => {
                self.offset += consumed;
                Some(Ok(obu))
            }
            Err(e) => {
                self.offset = self.data.len();
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_header_obu_header_no_extension() {
        // 0b0_0001_0_1_0 = obu_type=1 (SequenceHeader), no extension, has_size=1, reserved=0
        let data = [0b0_0001_0_1_0, 0x05];
        let header = parse_obu_header(&data).unwrap();
        assert_eq!(header.obu_type, ObuType::SequenceHeader);
        assert!(!header.has_extension);
        assert_eq!(header.header_size, 1);
    }

    #[test]
    fn forbidden_bit_set_is_fatal() {
        let data = [0b1_0001_0_1_0];
        assert!(parse_obu_header(&data).is_err());
    }

    #[test]
    fn missing_size_field_is_fatal() {
        // has_size_field = 0
        let data = [0b0_0001_0_0_0];
        assert!(parse_obu_header(&data).is_err());
    }

    #[test]
    fn extension_byte_reads_temporal_and_spatial_id() {
        // obu_type=6 (Frame), extension=1, has_size=1, reserved=0
        let header_byte = 0b0_0110_1_1_0u8;
        // temporal_id=3, spatial_id=1, reserved_3bits=0 -> 011_01_000
        let ext_byte = 0b011_01_000u8;
        let data = [header_byte, ext_byte, 0x00];
        let header = parse_obu_header(&data).unwrap();
        assert!(header.has_extension);
        assert_eq!(header.temporal_id, 3);
        assert_eq!(header.spatial_id, 1);
        assert_eq!(header.header_size, 2);
    }

    #[test]
    fn parse_obu_slices_payload_by_leb128_size() {
        // header byte: obu_type=2 (TemporalDelimiter), no ext, has_size=1
        let data = [0b0_0010_0_1_0, 0x00];
        let (obu, consumed) = parse_obu(&data, 0).unwrap();
        assert_eq!(obu.header.obu_type, ObuType::TemporalDelimiter);
        assert_eq!(obu.payload.len(), 0);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn obu_iterator_walks_multiple_obus() {
        let data = [
            0b0_0010_0_1_0, 0x00, // temporal delimiter, size 0
            0b0_0001_0_1_0, 0x01, 0xAB, // sequence header, size 1
        ];
        let obus: Vec<_> = ObuIterator::new(&data).collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(obus.len(), 2);
        assert_eq!(obus[0].header.obu_type, ObuType::TemporalDelimiter);
        assert_eq!(obus[1].header.obu_type, ObuType::SequenceHeader);
        assert_eq!(obus[1].payload, &[0xAB]);
    }
}
