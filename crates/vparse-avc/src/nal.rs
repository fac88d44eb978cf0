//! H.264/AVC NAL (Network Abstraction Layer) unit parsing.

use crate::error::{AvcError, Result};
use serde::{Deserialize, Serialize};
use vparse_core::remove_emulation_prevention_bytes;

/// H.264/AVC NAL unit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum NalUnitType {
    Unspecified = 0,
    NonIdrSlice = 1,
    SliceDataA = 2,
    SliceDataB = 3,
    SliceDataC = 4,
    IdrSlice = 5,
    Sei = 6,
    Sps = 7,
    Pps = 8,
    Aud = 9,
    EndOfSequence = 10,
    EndOfStream = 11,
    FillerData = 12,
    SpsExtension = 13,
    PrefixNal = 14,
    SubsetSps = 15,
    Dps = 16,
    Reserved17 = 17,
    Reserved18 = 18,
    AuxSlice = 19,
    SliceExtension = 20,
    SliceExtensionDepth = 21,
    Reserved22 = 22,
    Reserved23 = 23,
    Unspecified24 = 24,
}

impl NalUnitType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => NalUnitType::Unspecified,
            1 => NalUnitType::NonIdrSlice,
            2 => NalUnitType::SliceDataA,
            3 => NalUnitType::SliceDataB,
            4 => NalUnitType::SliceDataC,
            5 => NalUnitType::IdrSlice,
            6 => NalUnitType::Sei,
            7 => NalUnitType::Sps,
            8 => NalUnitType::Pps,
            9 => NalUnitType::Aud,
            10 => NalUnitType::EndOfSequence,
            11 => NalUnitType::EndOfStream,
            12 => NalUnitType::FillerData,
            13 => NalUnitType::SpsExtension,
            14 => NalUnitType::PrefixNal,
            15 => NalUnitType::SubsetSps,
            16 => NalUnitType::Dps,
            17 => NalUnitType::Reserved17,
            18 => NalUnitType::Reserved18,
            19 => NalUnitType::AuxSlice,
            20 => NalUnitType::SliceExtension,
            21 => NalUnitType::SliceExtensionDepth,
            22 => NalUnitType::Reserved22,
            23 => NalUnitType::Reserved23,
            _ => NalUnitType::Unspecified24,
        }
    }

    pub fn is_vcl(&self) -> bool {
        matches!(
            self,
            NalUnitType::NonIdrSlice
                | NalUnitType::SliceDataA
                | NalUnitType::SliceDataB
                | NalUnitType::SliceDataC
                | NalUnitType::IdrSlice
                | NalUnitType::AuxSlice
                | NalUnitType::SliceExtension
                | NalUnitType::SliceExtensionDepth
        )
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(
            self,
            NalUnitType::Sps
                | NalUnitType::Pps
                | NalUnitType::SpsExtension
                | NalUnitType::SubsetSps
        )
    }
}

/// NAL unit header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NalUnitHeader {
    pub forbidden_zero_bit: bool,
    pub nal_ref_idc: u8,
    pub nal_unit_type: NalUnitType,
}

/// One NAL unit isolated from an Annex-B byte stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NalUnit {
    pub header: NalUnitHeader,
    /// Byte offset of the start code in the original stream.
    pub offset: usize,
    /// Size of the NAL unit in bytes, including header and start code.
    pub size: usize,
    /// Payload after the header byte, with emulation-prevention bytes removed.
    pub payload: Vec<u8>,
}

impl NalUnit {
    pub fn nal_type(&self) -> NalUnitType {
        self.header.nal_unit_type
    }

    pub fn is_reference(&self) -> bool {
        self.header.nal_ref_idc > 0
    }
}

/// Parse a NAL unit header from its single header byte.
pub fn parse_nal_header(byte: u8) -> Result<NalUnitHeader> {
    let forbidden_zero_bit = (byte >> 7) & 1 != 0;
    let nal_ref_idc = (byte >> 5) & 0x03;
    let nal_unit_type = NalUnitType::from_u8(byte & 0x1F);

    if forbidden_zero_bit {
        return Err(AvcError::InvalidNalUnit(
            "forbidden_zero_bit is set".to_string(),
        ));
    }

    Ok(NalUnitHeader {
        forbidden_zero_bit,
        nal_ref_idc,
        nal_unit_type,
    })
}

/// Scan for Annex-B start codes (`00 00 01` with any number of leading zero
/// bytes); returns offsets to the first byte *after* each start code.
pub fn find_nal_units(data: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut i = 0;

    while i < data.len() {
        if i + 2 < data.len() && data[i] == 0 && data[i + 1] == 0 {
            if data[i + 2] == 1 {
                positions.push(i + 3);
                i += 3;
                continue;
            } else if i + 3 < data.len() && data[i + 2] == 0 && data[i + 3] == 1 {
                positions.push(i + 4);
                i += 4;
                continue;
            }
        }
        i += 1;
    }

    positions
}

/// Parse every NAL unit out of an Annex-B byte stream.
pub fn parse_nal_units(data: &[u8]) -> Result<Vec<NalUnit>> {
    let positions = find_nal_units(data);
    let mut nal_units = Vec::with_capacity(positions.len());

    for (idx, &start) in positions.iter().enumerate() {
        if start >= data.len() {
            continue;
        }

        let end = if idx + 1 < positions.len() {
            let next_start = positions[idx + 1];
            if next_start >= 4 && data[next_start - 4] == 0 {
                next_start - 4
            } else {
                next_start - 3
            }
        } else {
            data.len()
        };

        if start >= end {
            continue;
        }

        let header = parse_nal_header(data[start])?;
        let raw_payload = &data[start + 1..end];
        let payload = remove_emulation_prevention_bytes(raw_payload)?;

        let offset = if start >= 4 && data[start - 4] == 0 {
            start - 4
        } else {
            start - 3
        };

        nal_units.push(NalUnit {
            header,
            offset,
            size: end - offset,
            payload,
        });
    }

    Ok(nal_units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_start_codes() {
        let data = [0x00, 0x00, 0x01, 0x67, 0x00, 0x00, 0x00, 0x01, 0x68];
        let positions = find_nal_units(&data);
        assert_eq!(positions, vec![3, 8]);
    }

    #[test]
    fn parse_header_for_known_types() {
        let header = parse_nal_header(0x67).unwrap();
        assert_eq!(header.nal_ref_idc, 3);
        assert_eq!(header.nal_unit_type, NalUnitType::Sps);

        let header = parse_nal_header(0x65).unwrap();
        assert_eq!(header.nal_ref_idc, 3);
        assert_eq!(header.nal_unit_type, NalUnitType::IdrSlice);
    }

    #[test]
    fn rejects_forbidden_zero_bit() {
        assert!(parse_nal_header(0x80 | 0x67).is_err());
    }

    #[test]
    fn nal_type_is_vcl() {
        assert!(NalUnitType::NonIdrSlice.is_vcl());
        assert!(NalUnitType::IdrSlice.is_vcl());
        assert!(!NalUnitType::Sps.is_vcl());
    }
}
