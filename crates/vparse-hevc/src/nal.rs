//! H.265/HEVC NAL unit parsing (7.3.1.1/7.3.1.2): 2-byte header, Annex-B
//! framing, emulation-prevention removal.

use crate::error::{HevcError, Result};
use serde::{Deserialize, Serialize};
use vparse_core::{remove_emulation_prevention_bytes, BitReader};

/// HEVC NAL unit types (Table 7-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum NalUnitType {
    TrailN = 0,
    TrailR = 1,
    TsaN = 2,
    TsaR = 3,
    StsaN = 4,
    StsaR = 5,
    RadlN = 6,
    RadlR = 7,
    RaslN = 8,
    RaslR = 9,
    RsvVclN10 = 10,
    RsvVclR11 = 11,
    RsvVclN12 = 12,
    RsvVclR13 = 13,
    RsvVclN14 = 14,
    RsvVclR15 = 15,
    BlaWLp = 16,
    BlaWRadl = 17,
    BlaNLp = 18,
    IdrWRadl = 19,
    IdrNLp = 20,
    CraNut = 21,
    RsvIrapVcl22 = 22,
    RsvIrapVcl23 = 23,
    RsvVcl31 = 31,
    VpsNut = 32,
    SpsNut = 33,
    PpsNut = 34,
    AudNut = 35,
    EosNut = 36,
    EobNut = 37,
    FdNut = 38,
    PrefixSeiNut = 39,
    SuffixSeiNut = 40,
    RsvNvcl47 = 47,
    Unspec63 = 63,
}

impl NalUnitType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::TrailN,
            1 => Self::TrailR,
            2 => Self::TsaN,
            3 => Self::TsaR,
            4 => Self::StsaN,
            5 => Self::StsaR,
            6 => Self::RadlN,
            7 => Self::RadlR,
            8 => Self::RaslN,
            9 => Self::RaslR,
            10 => Self::RsvVclN10,
            11 => Self::RsvVclR11,
            12 => Self::RsvVclN12,
            13 => Self::RsvVclR13,
            14 => Self::RsvVclN14,
            15 => Self::RsvVclR15,
            16 => Self::BlaWLp,
            17 => Self::BlaWRadl,
            18 => Self::BlaNLp,
            19 => Self::IdrWRadl,
            20 => Self::IdrNLp,
            21 => Self::CraNut,
            22 => Self::RsvIrapVcl22,
            23 => Self::RsvIrapVcl23,
            32 => Self::VpsNut,
            33 => Self::SpsNut,
            34 => Self::PpsNut,
            35 => Self::AudNut,
            36 => Self::EosNut,
            37 => Self::EobNut,
            38 => Self::FdNut,
            39 => Self::PrefixSeiNut,
            40 => Self::SuffixSeiNut,
            24..=31 => Self::RsvVcl31,
            41..=47 => Self::RsvNvcl47,
            _ => Self::Unspec63,
        }
    }

    pub fn is_vcl(&self) -> bool {
        (*self as u8) <= 31
    }

    pub fn is_irap(&self) -> bool {
        matches!(
            self,
            Self::BlaWLp | Self::BlaWRadl | Self::BlaNLp | Self::IdrWRadl | Self::IdrNLp | Self::CraNut
        )
    }

    pub fn is_idr(&self) -> bool {
        matches!(self, Self::IdrWRadl | Self::IdrNLp)
    }

    pub fn is_bla(&self) -> bool {
        matches!(self, Self::BlaWLp | Self::BlaWRadl | Self::BlaNLp)
    }

    pub fn is_cra(&self) -> bool {
        matches!(self, Self::CraNut)
    }

    pub fn is_rasl(&self) -> bool {
        matches!(self, Self::RaslN | Self::RaslR)
    }

    pub fn is_radl(&self) -> bool {
        matches!(self, Self::RadlN | Self::RadlR)
    }

    pub fn is_leading(&self) -> bool {
        self.is_rasl() || self.is_radl()
    }

    pub fn is_sub_layer_non_reference(&self) -> bool {
        matches!(
            self,
            Self::TrailN
                | Self::TsaN
                | Self::StsaN
                | Self::RadlN
                | Self::RaslN
                | Self::RsvVclN10
                | Self::RsvVclN12
                | Self::RsvVclN14
        )
    }

    /// Whether this NAL's picture carries `NoRaslOutputFlag = 1`
    /// candidacy: BLA or IDR always do; CRA depends on session state
    /// (first picture / after EOS) tracked by the caller.
    pub fn is_bla_or_idr(&self) -> bool {
        self.is_bla() || self.is_idr()
    }
}

/// HEVC NAL unit header (2 bytes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NalUnitHeader {
    pub nal_unit_type: NalUnitType,
    pub nuh_layer_id: u8,
    pub nuh_temporal_id_plus1: u8,
}

impl NalUnitHeader {
    pub fn temporal_id(&self) -> u8 {
        self.nuh_temporal_id_plus1.saturating_sub(1)
    }
}

/// One NAL unit isolated from an Annex-B byte stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NalUnit {
    pub header: NalUnitHeader,
    pub offset: usize,
    pub size: usize,
    /// Payload after the 2-byte header, with emulation-prevention bytes removed.
    pub payload: Vec<u8>,
}

impl NalUnit {
    pub fn nal_type(&self) -> NalUnitType {
        self.header.nal_unit_type
    }

    pub fn is_vcl(&self) -> bool {
        self.header.nal_unit_type.is_vcl()
    }
}

/// Parse a 2-byte NAL unit header.
pub fn parse_nal_header(data: &[u8]) -> Result<NalUnitHeader> {
    if data.len() < 2 {
        return Err(HevcError::InvalidNalUnit("header needs 2 bytes".to_string()));
    }

    let mut reader = BitReader::new(data);
    let forbidden_zero_bit = reader.read_flag()?;
    if forbidden_zero_bit {
        return Err(HevcError::InvalidNalUnit(
            "forbidden_zero_bit is set".to_string(),
        ));
    }

    let nal_unit_type = NalUnitType::from_u8(reader.read_bits(6)? as u8);
    let nuh_layer_id = reader.read_bits(6)? as u8;
    let nuh_temporal_id_plus1 = reader.read_bits(3)? as u8;

    Ok(NalUnitHeader {
        nal_unit_type,
        nuh_layer_id,
        nuh_temporal_id_plus1,
    })
}

/// Scan for Annex-B start codes; returns offsets to the first byte after
/// each start code.
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
        if start + 2 > data.len() {
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

        let header = parse_nal_header(&data[start..start + 2])?;
        let raw_payload = &data[start + 2..end];
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
    fn parses_idr_header() {
        let data = [0x26, 0x01];
        let header = parse_nal_header(&data).unwrap();
        assert_eq!(header.nal_unit_type, NalUnitType::IdrWRadl);
        assert_eq!(header.nuh_layer_id, 0);
        assert_eq!(header.nuh_temporal_id_plus1, 1);
    }

    #[test]
    fn rejects_forbidden_zero_bit() {
        let data = [0x80 | 0x26, 0x01];
        assert!(parse_nal_header(&data).is_err());
    }

    #[test]
    fn type_classification() {
        assert!(NalUnitType::IdrWRadl.is_idr());
        assert!(NalUnitType::IdrWRadl.is_irap());
        assert!(NalUnitType::CraNut.is_cra());
        assert!(NalUnitType::CraNut.is_irap());
        assert!(!NalUnitType::SpsNut.is_vcl());
        assert!(NalUnitType::TrailR.is_vcl());
    }

    #[test]
    fn find_start_codes() {
        let data = [
            0x00, 0x00, 0x00, 0x01, 0x40, 0x01, 0xAA, 0xBB, 0x00, 0x00, 0x01, 0x42, 0x01, 0xCC, 0xDD,
        ];
        let positions = find_nal_units(&data);
        assert_eq!(positions, vec![4, 11]);
    }
}
