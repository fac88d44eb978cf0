//! AV1 `ParserCore`: OBU dispatch, `SeenFrameHeader` state machine, frame
//! header parsing with session-carried reference state, tile group
//! extraction, and `refresh_frame_flags`-driven DPB marking (§4.9).

use vparse_av1::{
    parse_frame_header, parse_frame_header_from_reader, parse_obu, parse_sequence_header,
    parse_tile_group, FrameType, ObuType, RefFrameContext, RefFrameState, SequenceHeader,
};

use crate::callbacks::{AspectRatio, DispInfo, ParserCallbacks, PacketFlags, VideoFormat};
use crate::config::{Codec, SessionConfig};
use crate::decode_pool::DecodePool;
use crate::dpb::{Dpb, ReferenceState};
use crate::error::{ParserError, Result};
use crate::output_reorder::OutputReorder;
use crate::pic_params::{Av1PicParams, CodecPicParams, PicParams, RefFrameEntry};

pub struct Av1Core {
    seq: Option<SequenceHeader>,
    ref_ctx: RefFrameContext,
    /// DPB slot currently assigned to each of the 8 AV1 reference frame
    /// slots (mirrors `ref_ctx`'s indexing).
    ref_dpb_slot: [Option<usize>; 8],
    dpb: Dpb,
    pool: DecodePool,
    reorder: OutputReorder,
    decode_order_count: u64,
    seen_frame_header: bool,
    last_frame_header_bytes: Vec<u8>,
    sequence_announced: bool,
    current_header: Option<vparse_av1::FrameHeader>,
    tile_bytes: Vec<u8>,
}

impl Av1Core {
    pub fn new(cfg: SessionConfig) -> Self {
        Self {
            seq: None,
            ref_ctx: RefFrameContext::default(),
            ref_dpb_slot: [None; 8],
            dpb: Dpb::new(),
            pool: DecodePool::new(cfg.max_num_decode_surfaces as usize),
            reorder: OutputReorder::new(cfg.max_display_delay),
            decode_order_count: 0,
            seen_frame_header: false,
            last_frame_header_bytes: Vec::new(),
            sequence_announced: false,
            current_header: None,
            tile_bytes: Vec::new(),
        }
    }

    pub fn process_packet(
        &mut self,
        payload: &[u8],
        flags: PacketFlags,
        pts: Option<i64>,
        callbacks: &mut dyn ParserCallbacks,
    ) -> Result<()> {
        if payload.is_empty() {
            if flags.end_of_stream {
                return self.flush(callbacks);
            }
            return Err(ParserError::EmptyPayload);
        }

        let mut offset = 0usize;
        while offset < payload.len() {
            let (obu, consumed) = parse_obu(payload, offset)?;
            offset += consumed;

            match obu.header.obu_type {
                ObuType::SequenceHeader => {
                    let seq = parse_sequence_header(obu.payload)?;
                    let changed = self
                        .seq
                        .as_ref()
                        .map(|old| (old.max_frame_width, old.max_frame_height) != (seq.max_frame_width, seq.max_frame_height))
                        .unwrap_or(true);
                    self.seq = Some(seq);
                    if changed {
                        self.sequence_announced = false;
                    }
                }
                ObuType::TemporalDelimiter => {
                    self.seen_frame_header = false;
                }
                ObuType::FrameHeader | ObuType::RedundantFrameHeader | ObuType::Frame => {
                    let seq = self.seq.clone().ok_or_else(|| {
                        ParserError::Av1(vparse_av1::Av1Error::InvalidFrameHeader(
                            "frame header before sequence header".to_string(),
                        ))
                    })?;

                    if obu.header.obu_type == ObuType::RedundantFrameHeader {
                        if !self.seen_frame_header || obu.payload != self.last_frame_header_bytes.as_slice() {
                            return Err(ParserError::Av1(vparse_av1::Av1Error::InvalidFrameHeader(
                                "redundant frame header does not match last seen header".to_string(),
                            )));
                        }
                        continue;
                    }

                    if obu.header.obu_type == ObuType::Frame {
                        // `frame_obu()` (§5.10): frame_header_obu(), then
                        // byte_alignment(), then tile_group_obu() in the same
                        // payload. Parse the header against a reader the
                        // caller holds so byte_position() after byte_align()
                        // gives the tile group's start.
                        let mut r = vparse_core::BitReader::new(obu.payload);
                        let header = parse_frame_header_from_reader(
                            &mut r,
                            &seq,
                            &self.ref_ctx,
                            obu.header.temporal_id,
                            obu.header.spatial_id,
                        )?;
                        r.byte_align();
                        let tile_group_data = r.remaining_data();
                        let tg = parse_tile_group(tile_group_data, &header.tile_info)?;
                        let num_tiles = header.tile_info.tile_cols * header.tile_info.tile_rows;

                        self.last_frame_header_bytes = obu.payload.to_vec();
                        self.announce_sequence(&seq, callbacks)?;
                        self.begin_frame(&header, callbacks)?;
                        self.tile_bytes.extend_from_slice(tile_group_data);
                        self.current_header = Some(header);
                        self.seen_frame_header = !tg.is_last_tile_group(num_tiles);
                        if tg.is_last_tile_group(num_tiles) {
                            self.finish_frame(callbacks, pts)?;
                        }
                        continue;
                    }

                    if !self.seen_frame_header {
                        let header = parse_frame_header(
                            obu.payload,
                            &seq,
                            &self.ref_ctx,
                            obu.header.temporal_id,
                            obu.header.spatial_id,
                        )?;
                        self.seen_frame_header = true;
                        self.last_frame_header_bytes = obu.payload.to_vec();
                        self.announce_sequence(&seq, callbacks)?;
                        self.begin_frame(&header, callbacks)?;
                        self.current_header = Some(header);
                    }
                }
                ObuType::TileGroup => {
                    let header = self.current_header.clone().ok_or_else(|| {
                        ParserError::Av1(vparse_av1::Av1Error::InvalidFrameHeader(
                            "tile group without a preceding frame header".to_string(),
                        ))
                    })?;
                    let tg = parse_tile_group(obu.payload, &header.tile_info)?;
                    let num_tiles = header.tile_info.tile_cols * header.tile_info.tile_rows;
                    self.tile_bytes.extend_from_slice(obu.payload);
                    if tg.is_last_tile_group(num_tiles) {
                        self.finish_frame(callbacks, pts)?;
                        self.seen_frame_header = false;
                    }
                }
                ObuType::Metadata => {
                    if !callbacks.sei(&crate::callbacks::SeiMessageInfo {
                        payload_type: 0,
                        payload: obu.payload.to_vec(),
                    }) {
                        return Err(ParserError::CallbackRejected("sei"));
                    }
                }
                _ => {}
            }
        }

        if flags.end_of_stream {
            self.flush(callbacks)?;
        }
        Ok(())
    }

    fn announce_sequence(&mut self, seq: &SequenceHeader, callbacks: &mut dyn ParserCallbacks) -> Result<()> {
        if self.sequence_announced {
            return Ok(());
        }
        let format = VideoFormat {
            codec: Codec::Av1,
            frame_rate_num: 0,
            frame_rate_den: 1,
            progressive: true,
            bit_depth_luma: seq.color_config.bit_depth,
            bit_depth_chroma: seq.color_config.bit_depth,
            min_num_decode_surfaces: 8,
            coded_width: seq.max_frame_width,
            coded_height: seq.max_frame_height,
            display_width: seq.max_frame_width,
            display_height: seq.max_frame_height,
            chroma_format_idc: seq.color_config.num_planes,
            bitrate: 0,
            aspect_ratio: AspectRatio { x: 1, y: 1 },
            sequence_header_bytes: Vec::new(),
        };
        if callbacks.sequence(&format).is_none() {
            return Err(ParserError::CallbackRejected("sequence"));
        }
        self.sequence_announced = true;
        Ok(())
    }

    fn begin_frame(&mut self, header: &vparse_av1::FrameHeader, _callbacks: &mut dyn ParserCallbacks) -> Result<()> {
        if header.frame_type == FrameType::Key && header.refresh_frame_flags == 0xFF {
            self.dpb.mark_all_unused_for_reference();
        }
        self.tile_bytes.clear();
        Ok(())
    }

    fn finish_frame(&mut self, callbacks: &mut dyn ParserCallbacks, pts: Option<i64>) -> Result<()> {
        let header = self.current_header.take().ok_or_else(|| {
            ParserError::Av1(vparse_av1::Av1Error::InvalidFrameHeader("no current frame header".to_string()))
        })?;

        let ref_frames = self.emit_ref_frames(&header);

        self.dpb.conditional_bump(8, 8);
        let free_slot = self.dpb.find_free_slot()?;
        let surface_idx = self.pool.acquire(header.order_hint as i32)?;
        self.pool.release_decode(surface_idx);
        let pic_idx =
            self.dpb.insert_current(free_slot, surface_idx, header.order_hint as i32, self.decode_order_count, 0, header.show_frame);
        self.decode_order_count += 1;

        let pic_params = PicParams {
            width: header.frame_width,
            height: header.frame_height,
            curr_pic_idx: surface_idx,
            field_pic_flag: false,
            bottom_field_flag: false,
            num_slices: 1,
            bitstream: std::mem::take(&mut self.tile_bytes),
            codec: CodecPicParams::Av1(Av1PicParams { ref_frames, frame_header: header.clone(), tile_data: Vec::new() }),
        };

        if !callbacks.decode(&pic_params) {
            return Err(ParserError::CallbackRejected("decode"));
        }

        // `refresh_frame_flags` (7.20): copy the current frame's state into
        // every reference slot the mask selects.
        let state = RefFrameState {
            valid: true,
            order_hint: header.order_hint,
            frame_id: header.current_frame_id.unwrap_or(0),
            upscaled_width: header.upscaled_width,
            frame_width: header.frame_width,
            frame_height: header.frame_height,
            render_width: header.render_width,
            render_height: header.render_height,
            gm_params: header.global_motion_params.gm_params,
            loop_filter_ref_deltas: header.loop_filter_params.ref_deltas,
            loop_filter_mode_deltas: header.loop_filter_params.mode_deltas,
            feature_enabled: header.segmentation_params.feature_enabled,
            feature_data: header.segmentation_params.feature_data,
        };
        for i in 0..8 {
            if header.refresh_frame_flags & (1 << i) != 0 {
                self.ref_ctx.refs[i] = state.clone();
                if let Some(old_slot) = self.ref_dpb_slot[i] {
                    if !self.ref_dpb_slot.iter().enumerate().any(|(j, s)| j != i && *s == Some(old_slot)) {
                        self.dpb.mark_reference(old_slot, ReferenceState::Unused);
                    }
                }
                self.ref_dpb_slot[i] = Some(free_slot);
                self.dpb.mark_reference(free_slot, ReferenceState::ShortTerm);
            }
        }
        let _ = pic_idx;

        self.dpb.conditional_bump(8, 8);
        for slot in self.dpb.take_output_order() {
            let surface = self.dpb.slot(slot).surface_idx;
            self.pool.mark_display_pending(surface);
            self.reorder.push(surface);
        }
        for released in self.reorder.release_ready() {
            emit_display(callbacks, released, pts)?;
        }
        Ok(())
    }

    fn emit_ref_frames(&self, header: &vparse_av1::FrameHeader) -> [RefFrameEntry; 8] {
        let mut out = [RefFrameEntry::EMPTY; 8];
        for (i, &idx) in header.ref_frame_idx.iter().enumerate() {
            if idx < 0 {
                continue;
            }
            if let Some(slot) = self.ref_dpb_slot[idx as usize] {
                let s = self.dpb.slot(slot);
                out[i] = RefFrameEntry {
                    pic_idx: s.pic_idx as u8,
                    surface_idx: s.surface_idx,
                    order_key: s.order_key,
                    long_term: false,
                };
            }
        }
        out
    }

    fn flush(&mut self, callbacks: &mut dyn ParserCallbacks) -> Result<()> {
        self.dpb.flush();
        for slot in self.dpb.take_output_order() {
            self.reorder.push(self.dpb.slot(slot).surface_idx);
        }
        for released in self.reorder.drain() {
            emit_display(callbacks, released, None)?;
        }
        self.seen_frame_header = false;
        Ok(())
    }

    /// `mark_frame_for_reuse(handle, pic_idx)` (§6): the host is done
    /// displaying this surface.
    pub fn mark_frame_for_reuse(&mut self, surface_idx: u8) {
        self.pool.release_display(surface_idx);
    }
}

fn emit_display(callbacks: &mut dyn ParserCallbacks, surface_idx: u8, pts: Option<i64>) -> Result<()> {
    let info = DispInfo {
        pic_idx: surface_idx,
        progressive_frame: true,
        top_field_first: true,
        repeat_first_field: false,
        pts,
    };
    if !callbacks.display(&info) {
        return Err(ParserError::CallbackRejected("display"));
    }
    Ok(())
}
