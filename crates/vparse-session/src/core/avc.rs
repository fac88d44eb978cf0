//! AVC `ParserCore`: NAL dispatch, POC derivation, sliding-window/MMCO
//! reference marking and list construction, DPB insertion and output
//! reordering (§4.9).

use std::collections::HashMap;

use vparse_avc::{
    assign_pic_nums, build_ref_pic_lists, parse_nal_units, parse_pps, parse_slice_header,
    parse_sps, NalUnitType, PicOrderCnt, PocState, Pps, RefFrame, Sps,
};

use crate::callbacks::{AspectRatio, DispInfo, ParserCallbacks, PacketFlags, VideoFormat};
use crate::config::{Codec, SessionConfig};
use crate::decode_pool::DecodePool;
use crate::dpb::{Dpb, ReferenceState};
use crate::error::{ParserError, Result};
use crate::output_reorder::OutputReorder;
use crate::pic_params::{AvcPicParams, AvcSliceParams, CodecPicParams, PicParams, RefFrameEntry};

/// Session-persistent state for one AVC stream (§4.9's state-machine field
/// list, AVC subset).
pub struct AvcCore {
    sps_map: HashMap<u8, Sps>,
    pps_map: HashMap<u8, Pps>,
    active_sps_id: Option<u8>,
    poc_state: PocState,
    dpb: Dpb,
    pool: DecodePool,
    reorder: OutputReorder,
    max_display_delay: u32,
    pic_count: u64,
    decode_order_count: u64,
    /// `surface_idx` keyed by DPB slot index, used for reference lookups
    /// across pictures.
    max_num_ref_frames: u32,
}

impl AvcCore {
    pub fn new(cfg: SessionConfig) -> Self {
        Self {
            sps_map: HashMap::new(),
            pps_map: HashMap::new(),
            active_sps_id: None,
            poc_state: PocState::new(),
            dpb: Dpb::new(),
            pool: DecodePool::new(cfg.max_num_decode_surfaces as usize),
            reorder: OutputReorder::new(cfg.max_display_delay),
            max_display_delay: cfg.max_display_delay,
            pic_count: 0,
            decode_order_count: 0,
            max_num_ref_frames: 4,
        }
    }

    fn reference_list(&self) -> Vec<RefFrame> {
        self.dpb
            .slots()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.reference_state != ReferenceState::Unused)
            .map(|(i, s)| RefFrame {
                dpb_index: i,
                frame_num: s.frame_num,
                is_long_term: s.reference_state == ReferenceState::LongTerm,
                long_term_frame_idx: s.long_term_frame_idx,
                pic_order_cnt: s.order_key,
                pic_num: 0,
                long_term_pic_num: 0,
            })
            .collect()
    }

    fn emit_ref_frames(&self, refs: &[RefFrame]) -> [RefFrameEntry; 16] {
        let mut out = [RefFrameEntry::EMPTY; 16];
        for (i, r) in refs.iter().take(16).enumerate() {
            out[i] = RefFrameEntry {
                pic_idx: self.dpb.slot(r.dpb_index).pic_idx as u8,
                surface_idx: self.dpb.slot(r.dpb_index).surface_idx,
                order_key: r.pic_order_cnt,
                long_term: r.is_long_term,
            };
        }
        out
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

        let nal_units = parse_nal_units(payload)?;
        let mut current: Vec<usize> = Vec::new();

        for (idx, nal) in nal_units.iter().enumerate() {
            match nal.header.nal_unit_type {
                NalUnitType::Sps => {
                    let sps = parse_sps(&nal.payload)?;
                    let new_dims = self
                        .sps_map
                        .get(&sps.seq_parameter_set_id)
                        .map(|old| (old.pic_width(), old.pic_height()) != (sps.pic_width(), sps.pic_height()))
                        .unwrap_or(true);
                    self.max_num_ref_frames = sps.max_num_ref_frames;
                    self.sps_map.insert(sps.seq_parameter_set_id, sps);
                    if new_dims {
                        self.active_sps_id = None; // force a sequence callback on next slice
                    }
                }
                NalUnitType::Pps => {
                    let pps = parse_pps(&nal.payload)?;
                    self.pps_map.insert(pps.pic_parameter_set_id, pps);
                }
                NalUnitType::IdrSlice | NalUnitType::NonIdrSlice => {
                    let is_first_in_pic = is_first_slice(&nal.payload);
                    if is_first_in_pic && !current.is_empty() {
                        self.finish_picture(payload, &nal_units, &current, pts, callbacks)?;
                        current.clear();
                    }
                    current.push(idx);
                }
                _ => {
                    if !current.is_empty() {
                        current.push(idx);
                    }
                }
            }
        }

        if !current.is_empty() && (flags.end_of_picture || flags.end_of_stream) {
            self.finish_picture(payload, &nal_units, &current, pts, callbacks)?;
        }

        if flags.end_of_stream {
            self.flush(callbacks)?;
        }
        Ok(())
    }

    fn finish_picture(
        &mut self,
        _payload: &[u8],
        nal_units: &[vparse_avc::NalUnit],
        indices: &[usize],
        pts: Option<i64>,
        callbacks: &mut dyn ParserCallbacks,
    ) -> Result<()> {
        let first_nal = &nal_units[indices[0]];
        let slice0 = parse_slice_header(
            &first_nal.payload,
            &self.sps_map,
            &self.pps_map,
            first_nal.header.nal_unit_type,
            first_nal.header.nal_ref_idc,
        )?;
        let Some(pps) = self.pps_map.get(&slice0.pic_parameter_set_id).cloned() else {
            tracing::warn!(pps_id = slice0.pic_parameter_set_id, "picture skipped: PPS not received");
            return Ok(());
        };
        let Some(sps) = self.sps_map.get(&pps.seq_parameter_set_id).cloned() else {
            tracing::warn!(sps_id = pps.seq_parameter_set_id, "picture skipped: SPS not received");
            return Ok(());
        };

        if self.active_sps_id != Some(sps.seq_parameter_set_id) {
            let format = VideoFormat {
                codec: Codec::Avc,
                frame_rate_num: 0,
                frame_rate_den: 1,
                progressive: sps.frame_mbs_only_flag,
                bit_depth_luma: sps.bit_depth_luma(),
                bit_depth_chroma: sps.bit_depth_chroma(),
                min_num_decode_surfaces: sps.dpb_size(),
                coded_width: sps.pic_width(),
                coded_height: sps.pic_height(),
                display_width: sps.display_width(),
                display_height: sps.display_height(),
                chroma_format_idc: sps.chroma_format_idc as u8,
                bitrate: 0,
                aspect_ratio: AspectRatio { x: 1, y: 1 },
                sequence_header_bytes: Vec::new(),
            };
            match callbacks.sequence(&format) {
                None => return Err(ParserError::CallbackRejected("sequence")),
                Some(_) => {}
            }
            self.active_sps_id = Some(sps.seq_parameter_set_id);
        }

        let poc: PicOrderCnt = self.poc_state.derive(&sps, &slice0);
        let is_idr = slice0.is_idr();
        let nal_ref_idc = first_nal.header.nal_ref_idc;

        if slice0.dec_ref_pic_marking.mmco_ops.iter().any(|op| op.op == 5) {
            self.poc_state.note_mmco5(slice0.bottom_field_flag, poc.top_field_order_cnt);
        } else {
            self.poc_state.clear_mmco5();
        }

        if is_idr && slice0.dec_ref_pic_marking.no_output_of_prior_pics_flag {
            self.dpb.empty();
        } else if is_idr {
            self.dpb.flush();
            for released in self.reorder.drain() {
                self.pool.mark_display_pending(released);
                emit_display(callbacks, released, pts)?;
            }
        }
        if is_idr {
            self.dpb.mark_all_unused_for_reference();
        }

        let refs = self.reference_list();
        let mut slices = Vec::with_capacity(indices.len());
        for (slot, &nal_idx) in indices.iter().enumerate() {
            let nal = &nal_units[nal_idx];
            let header = if slot == 0 {
                slice0.clone()
            } else {
                parse_slice_header(
                    &nal.payload,
                    &self.sps_map,
                    &self.pps_map,
                    nal.header.nal_unit_type,
                    nal.header.nal_ref_idc,
                )?
            };
            let mut ref_refs = refs.clone();
            assign_pic_nums(header.frame_num, sps.max_frame_num(), &mut ref_refs);
            let lists = build_ref_pic_lists(&header, poc.pic_order_cnt, &ref_refs)?;
            let to_surface = |r: &RefFrame| self.dpb.slot(r.dpb_index).surface_idx;
            slices.push(AvcSliceParams {
                header,
                ref_pic_list: [
                    lists.list0.iter().map(to_surface).collect(),
                    lists.list1.iter().map(to_surface).collect(),
                ],
            });
        }

        // 8.2.5: marking only applies to reference pictures, and only once
        // the IDR case (which already cleared every slot above) is ruled
        // out. Decisions are computed against the pre-marking snapshot
        // `refs` the slice headers above were also built from.
        let mut pending_long_term_idx: Option<u32> = None;
        if nal_ref_idc != 0 && !is_idr {
            let outcome = if slice0.dec_ref_pic_marking.adaptive_ref_pic_marking_mode_flag {
                vparse_avc::apply_mmco(slice0.frame_num, sps.max_frame_num(), &slice0.dec_ref_pic_marking, &refs)
            } else {
                vparse_avc::sliding_window(slice0.frame_num, sps.max_frame_num(), self.max_num_ref_frames, &refs)
            };
            if outcome.unused_all {
                self.dpb.mark_all_unused_for_reference();
            } else {
                for decision in &outcome.decisions {
                    match *decision {
                        vparse_avc::MarkingDecision::Unused(idx) => self.dpb.mark_reference(idx, ReferenceState::Unused),
                        vparse_avc::MarkingDecision::LongTerm(idx, lt_idx) => {
                            self.dpb.mark_reference(idx, ReferenceState::LongTerm);
                            self.dpb.set_long_term_frame_idx(idx, lt_idx);
                        }
                    }
                }
            }
            pending_long_term_idx = outcome.current_picture_long_term_frame_idx;
        }

        self.dpb.conditional_bump(self.max_num_ref_frames, self.max_num_ref_frames + 1);
        let free_slot = self.dpb.find_free_slot()?;
        let surface_idx = self.pool.acquire(poc.pic_order_cnt)?;
        self.pool.release_decode(surface_idx);

        let pic_idx = self.dpb.insert_current(
            free_slot,
            surface_idx,
            poc.pic_order_cnt,
            self.decode_order_count,
            slice0.frame_num,
            true, // pic_output_flag: AVC has no separate flag, always output
        );
        let _ = pic_idx;

        // The current picture's own reference status (8.2.5.1): a
        // non-reference picture is immediately unused; an IDR with
        // `long_term_reference_flag` or an MMCO 6 op makes it long-term;
        // otherwise `insert_current` already left it short-term.
        if nal_ref_idc == 0 {
            self.dpb.mark_reference(free_slot, ReferenceState::Unused);
        } else if is_idr && slice0.dec_ref_pic_marking.long_term_reference_flag {
            self.dpb.mark_reference(free_slot, ReferenceState::LongTerm);
            self.dpb.set_long_term_frame_idx(free_slot, 0);
        } else if let Some(lt_idx) = pending_long_term_idx {
            self.dpb.mark_reference(free_slot, ReferenceState::LongTerm);
            self.dpb.set_long_term_frame_idx(free_slot, lt_idx);
        }

        self.decode_order_count += 1;
        self.pic_count += 1;

        let bitstream = concat_nals(nal_units, indices);
        let pic_params = PicParams {
            width: sps.pic_width(),
            height: sps.pic_height(),
            curr_pic_idx: surface_idx,
            field_pic_flag: slice0.field_pic_flag,
            bottom_field_flag: slice0.bottom_field_flag,
            num_slices: slices.len() as u32,
            bitstream,
            codec: CodecPicParams::Avc(AvcPicParams {
                ref_frames: self.emit_ref_frames(&refs),
                sps,
                pps,
                frame_num: slice0.frame_num,
                field_pic_flag: slice0.field_pic_flag,
                bottom_field_flag: slice0.bottom_field_flag,
                ref_pic_flag: first_nal.header.nal_ref_idc != 0,
                intra_pic_flag: slice0.slice_type.is_intra(),
                slices,
            }),
        };

        if !callbacks.decode(&pic_params) {
            return Err(ParserError::CallbackRejected("decode"));
        }

        self.dpb.conditional_bump(self.max_num_ref_frames, self.max_num_ref_frames + 1);
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

    fn flush(&mut self, callbacks: &mut dyn ParserCallbacks) -> Result<()> {
        self.dpb.flush();
        for slot in self.dpb.take_output_order() {
            self.reorder.push(self.dpb.slot(slot).surface_idx);
        }
        for released in self.reorder.drain() {
            emit_display(callbacks, released, None)?;
        }
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

fn concat_nals(nal_units: &[vparse_avc::NalUnit], indices: &[usize]) -> Vec<u8> {
    let mut out = Vec::new();
    for &idx in indices {
        out.extend_from_slice(&nal_units[idx].payload);
    }
    out
}

/// Peek `first_mb_in_slice` via a fresh `ue(v)` decode without disturbing the
/// caller's own parse of the slice header (§4.2 picture-boundary rule).
fn is_first_slice(payload: &[u8]) -> bool {
    let mut reader = vparse_core::BitReader::new(payload);
    matches!(reader.read_ue(), Ok(0))
}
