//! `ParserSession`: the host-facing handle (§6). Owns exactly one of the
//! three per-codec cores, picked at `create()` time and fixed for the
//! session's lifetime — there is no cross-codec aliasing (§5).

use crate::callbacks::{PacketFlags, ParserCallbacks};
use crate::config::{Codec, SessionConfig};
use crate::core::av1::Av1Core;
use crate::core::avc::AvcCore;
use crate::core::hevc::HevcCore;
use crate::error::Result;

enum Core {
    Avc(AvcCore),
    Hevc(HevcCore),
    Av1(Av1Core),
}

/// One decoding session bound to a single elementary stream of a single
/// codec. Mirrors the host's opaque handle; `destroy(handle)` (§6) is
/// just dropping the `ParserSession` since it holds no external resources.
pub struct ParserSession {
    core: Core,
}

impl ParserSession {
    /// `create(params)` (§6). Validates and normalizes `config` before
    /// allocating the DPB/decode pool/output reorder state.
    pub fn create(config: SessionConfig) -> Result<Self> {
        let config = config.validate()?;
        let core = match config.codec {
            Codec::Avc => Core::Avc(AvcCore::new(config)),
            Codec::Hevc => Core::Hevc(HevcCore::new(config)),
            Codec::Av1 => Core::Av1(Av1Core::new(config)),
        };
        Ok(Self { core })
    }

    /// `parse_video_data(handle, packet)` (§6). Feeds one packet's worth of
    /// bytes through the bound codec's core, synchronously invoking
    /// `callbacks` zero or more times before returning.
    pub fn parse_video_data(
        &mut self,
        payload: &[u8],
        flags: PacketFlags,
        pts: Option<i64>,
        callbacks: &mut dyn ParserCallbacks,
    ) -> Result<()> {
        match &mut self.core {
            Core::Avc(c) => c.process_packet(payload, flags, pts, callbacks),
            Core::Hevc(c) => c.process_packet(payload, flags, pts, callbacks),
            Core::Av1(c) => c.process_packet(payload, flags, pts, callbacks),
        }
    }

    /// `mark_frame_for_reuse(handle, pic_idx)` (§6): release a display
    /// surface back to the decode pool once the host is done with it.
    pub fn mark_frame_for_reuse(&mut self, surface_idx: u8) {
        match &mut self.core {
            Core::Avc(c) => c.mark_frame_for_reuse(surface_idx),
            Core::Hevc(c) => c.mark_frame_for_reuse(surface_idx),
            Core::Av1(c) => c.mark_frame_for_reuse(surface_idx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{DispInfo, SeiMessageInfo, VideoFormat};
    use crate::pic_params::PicParams;

    struct CountingCallbacks {
        sequences: u32,
        decodes: u32,
        displays: u32,
    }

    impl ParserCallbacks for CountingCallbacks {
        fn sequence(&mut self, _format: &VideoFormat) -> Option<Option<u32>> {
            self.sequences += 1;
            Some(None)
        }
        fn decode(&mut self, _pic: &PicParams) -> bool {
            self.decodes += 1;
            true
        }
        fn display(&mut self, _info: &DispInfo) -> bool {
            self.displays += 1;
            true
        }
        fn sei(&mut self, _info: &SeiMessageInfo) -> bool {
            true
        }
    }

    #[test]
    fn create_rejects_invalid_config() {
        let config = SessionConfig {
            codec: Codec::Hevc,
            max_num_decode_surfaces: 1,
            max_display_delay: 1000,
            clock_rate: 90_000,
        };
        assert!(ParserSession::create(config).is_err());
    }

    #[test]
    fn empty_payload_without_eos_is_an_error() {
        let config = SessionConfig {
            codec: Codec::Avc,
            max_num_decode_surfaces: 4,
            max_display_delay: 0,
            clock_rate: 90_000,
        }
        .validate()
        .unwrap();
        let mut session = ParserSession::create(config).unwrap();
        let mut cb = CountingCallbacks { sequences: 0, decodes: 0, displays: 0 };
        let result = session.parse_video_data(&[], PacketFlags::default(), None, &mut cb);
        assert!(result.is_err());
    }
}
