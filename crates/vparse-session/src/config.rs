//! `SessionConfig`: the in-process analogue of the host `create(params)`
//! contract (§6). No env vars or on-disk config live here; the session has
//! no ambient environment to read from, unlike `vparse-log`.

use crate::dpb::MAX_DPB_FRAMES;
use crate::error::{ParserError, Result};

/// Codec this session is locked to for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Avc,
    Hevc,
    Av1,
}

/// Mirrors the host `create(params)` input. `max_num_decode_surfaces` is a
/// request; the session raises it to at least `MAX_DPB_FRAMES +
/// max_display_delay` as the spec's `create()` contract requires.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub codec: Codec,
    pub max_num_decode_surfaces: u32,
    pub max_display_delay: u32,
    pub clock_rate: u32,
}

impl SessionConfig {
    pub fn validate(self) -> Result<Self> {
        if self.max_display_delay as usize > MAX_DPB_FRAMES {
            return Err(ParserError::InvalidParameter(format!(
                "max_display_delay {} exceeds {MAX_DPB_FRAMES}",
                self.max_display_delay
            )));
        }
        let floor = MAX_DPB_FRAMES as u32 + self.max_display_delay;
        Ok(Self {
            max_num_decode_surfaces: self.max_num_decode_surfaces.max(floor),
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_raises_surface_count_to_floor() {
        let cfg = SessionConfig {
            codec: Codec::Hevc,
            max_num_decode_surfaces: 1,
            max_display_delay: 4,
            clock_rate: 90_000,
        }
        .validate()
        .unwrap();
        assert_eq!(cfg.max_num_decode_surfaces, MAX_DPB_FRAMES as u32 + 4);
    }

    #[test]
    fn validate_rejects_display_delay_over_dpb_cap() {
        let cfg = SessionConfig {
            codec: Codec::Avc,
            max_num_decode_surfaces: 1,
            max_display_delay: 100,
            clock_rate: 90_000,
        };
        assert!(cfg.validate().is_err());
    }
}
