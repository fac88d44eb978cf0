//! HEVC `ParserCore`: NAL dispatch, POC derivation, short/long-term RPS
//! marking (8.3.2), reference-list construction (8.3.4) and DPB management
//! (§4.9).

use std::collections::HashMap;

use vparse_hevc::{
    build_ref_pic_lists, derive_rps, parse_nal_header, parse_nal_units, parse_pps,
    parse_slice_header, parse_sps, NalUnitType, PocState, Pps, RefPicSetIndices, Sps,
};

use crate::callbacks::{AspectRatio, DispInfo, ParserCallbacks, PacketFlags, VideoFormat};
use crate::config::{Codec, SessionConfig};
use crate::decode_pool::DecodePool;
use crate::dpb::{Dpb, ReferenceState};
use crate::error::{ParserError, Result};
use crate::output_reorder::OutputReorder;
use crate::pic_params::{CodecPicParams, HevcPicParams, HevcSliceParams, PicParams, RefFrameEntry};

pub struct HevcCore {
    sps_map: HashMap<u8, Sps>,
    pps_map: HashMap<u8, Pps>,
    active_sps_id: Option<u8>,
    poc_state: PocState,
    dpb: Dpb,
    pool: DecodePool,
    reorder: OutputReorder,
    pic_count: u64,
    decode_order_count: u64,
    first_pic_in_stream: bool,
}

impl HevcCore {
    pub fn new(cfg: SessionConfig) -> Self {
        Self {
            sps_map: HashMap::new(),
            pps_map: HashMap::new(),
            active_sps_id: None,
            poc_state: PocState::new(),
            dpb: Dpb::new(),
            pool: DecodePool::new(cfg.max_num_decode_surfaces as usize),
            reorder: OutputReorder::new(cfg.max_display_delay),
            pic_count: 0,
            decode_order_count: 0,
            first_pic_in_stream: true,
        }
    }

    fn slot_for_poc(&self, poc: i32) -> Option<usize> {
        self.dpb
            .slots()
            .iter()
            .enumerate()
            .find(|(_, s)| s.use_status != crate::dpb::UseStatus::Empty && s.order_key == poc)
            .map(|(i, _)| i)
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
                NalUnitType::SpsNut => {
                    let sps = parse_sps(&nal.payload)?;
                    let new_dims = self
                        .sps_map
                        .get(&sps.sps_seq_parameter_set_id)
                        .map(|old| {
                            (old.pic_width_in_luma_samples, old.pic_height_in_luma_samples)
                                != (sps.pic_width_in_luma_samples, sps.pic_height_in_luma_samples)
                        })
                        .unwrap_or(true);
                    self.sps_map.insert(sps.sps_seq_parameter_set_id, sps);
                    if new_dims {
                        self.active_sps_id = None;
                    }
                }
                NalUnitType::PpsNut => {
                    let pps = parse_pps(&nal.payload)?;
                    self.pps_map.insert(pps.pps_pic_parameter_set_id, pps);
                }
                NalUnitType::EosNut => {
                    self.first_pic_in_stream = true;
                }
                t if is_vcl(t) => {
                    let is_first = first_slice_segment_flag(&nal.payload);
                    if is_first && !current.is_empty() {
                        self.finish_picture(&nal_units, &current, pts, callbacks)?;
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
            self.finish_picture(&nal_units, &current, pts, callbacks)?;
        }

        if flags.end_of_stream {
            self.flush(callbacks)?;
        }
        Ok(())
    }

    fn finish_picture(
        &mut self,
        nal_units: &[vparse_hevc::NalUnit],
        indices: &[usize],
        pts: Option<i64>,
        callbacks: &mut dyn ParserCallbacks,
    ) -> Result<()> {
        let first_nal = &nal_units[indices[0]];
        let nal_type = first_nal.header.nal_unit_type;
        let temporal_id = first_nal.header.temporal_id();
        let slice0 = parse_slice_header(&first_nal.payload, &self.sps_map, &self.pps_map, nal_type)?;

        let Some(pps) = self.pps_map.get(&slice0.slice_pic_parameter_set_id).cloned() else {
            tracing::warn!(pps_id = slice0.slice_pic_parameter_set_id, "picture skipped: PPS not received");
            return Ok(());
        };
        let Some(sps) = self.sps_map.get(&pps.pps_seq_parameter_set_id).cloned() else {
            tracing::warn!(sps_id = pps.pps_seq_parameter_set_id, "picture skipped: SPS not received");
            return Ok(());
        };

        if self.active_sps_id != Some(sps.sps_seq_parameter_set_id) {
            let format = VideoFormat {
                codec: Codec::Hevc,
                frame_rate_num: 0,
                frame_rate_den: 1,
                progressive: true,
                bit_depth_luma: sps.bit_depth_luma(),
                bit_depth_chroma: sps.bit_depth_chroma(),
                min_num_decode_surfaces: sps.dpb_size(),
                coded_width: sps.pic_width_in_luma_samples,
                coded_height: sps.pic_height_in_luma_samples,
                display_width: sps.display_width(),
                display_height: sps.display_height(),
                chroma_format_idc: sps.chroma_format_idc as u8,
                bitrate: 0,
                aspect_ratio: AspectRatio { x: 1, y: 1 },
                sequence_header_bytes: Vec::new(),
            };
            if callbacks.sequence(&format).is_none() {
                return Err(ParserError::CallbackRejected("sequence"));
            }
            self.active_sps_id = Some(sps.sps_seq_parameter_set_id);
        }

        let no_rasl_output_flag = nal_type.is_idr() || nal_type.is_bla() || self.first_pic_in_stream;
        self.first_pic_in_stream = false;

        let poc = self.poc_state.derive(
            &sps,
            nal_type,
            temporal_id,
            slice0.slice_pic_order_cnt_lsb,
            no_rasl_output_flag,
        );

        if nal_type.is_irap() && no_rasl_output_flag {
            if slice0.no_output_of_prior_pics_flag {
                self.dpb.empty();
            } else {
                self.dpb.flush();
                for slot in self.dpb.take_output_order() {
                    self.reorder.push(self.dpb.slot(slot).surface_idx);
                }
                for released in self.reorder.drain() {
                    emit_display(callbacks, released, pts)?;
                }
            }
            self.dpb.mark_all_unused_for_reference();
        }

        // Resolve the RPS subsets and their DPB-index mapping.
        let lt_pocs: Vec<(i32, bool, bool)> = slice0
            .long_term_ref_pic_set
            .poc_lsb_lt
            .iter()
            .enumerate()
            .map(|(i, &lsb)| {
                let msb_present = slice0
                    .long_term_ref_pic_set
                    .delta_poc_msb_present_flag
                    .get(i)
                    .copied()
                    .unwrap_or(false);
                (lsb as i32, msb_present, slice0.long_term_ref_pic_set.used_by_curr_pic_lt.get(i).copied().unwrap_or(false))
            })
            .filter(|&(_, _, used)| used)
            .collect();

        let derived = derive_rps(poc, &slice0.short_term_ref_pic_set, &lt_pocs);

        let mut rps_indices = RefPicSetIndices { st_curr_before: Vec::new(), st_curr_after: Vec::new(), lt_curr: Vec::new() };
        for p in &derived.poc_st_curr_before {
            if let Some(i) = self.slot_for_poc(*p) {
                self.dpb.mark_reference(i, ReferenceState::ShortTerm);
                rps_indices.st_curr_before.push(i);
            }
        }
        for p in &derived.poc_st_curr_after {
            if let Some(i) = self.slot_for_poc(*p) {
                self.dpb.mark_reference(i, ReferenceState::ShortTerm);
                rps_indices.st_curr_after.push(i);
            }
        }
        for p in &derived.poc_st_foll {
            if let Some(i) = self.slot_for_poc(*p) {
                self.dpb.mark_reference(i, ReferenceState::ShortTerm);
            }
        }
        for (p, _) in &derived.poc_lt_curr {
            if let Some(i) = self.slot_for_poc(*p) {
                self.dpb.mark_reference(i, ReferenceState::LongTerm);
                rps_indices.lt_curr.push(i);
            }
        }
        for (p, _) in &derived.poc_lt_foll {
            if let Some(i) = self.slot_for_poc(*p) {
                self.dpb.mark_reference(i, ReferenceState::LongTerm);
            }
        }
        // Anything not touched above that still claims a reference state is stale.
        let referenced: std::collections::HashSet<usize> = rps_indices
            .st_curr_before
            .iter()
            .chain(&rps_indices.st_curr_after)
            .chain(&rps_indices.lt_curr)
            .copied()
            .collect();
        for i in 0..self.dpb.slots().len() {
            if self.dpb.slot(i).use_status != crate::dpb::UseStatus::Empty
                && !referenced.contains(&i)
                && !derived.poc_st_foll.contains(&self.dpb.slot(i).order_key)
                && !derived.poc_lt_foll.iter().any(|(p, _)| *p == self.dpb.slot(i).order_key)
            {
                self.dpb.mark_reference(i, ReferenceState::Unused);
            }
        }

        let ref_frames = self.emit_ref_frames(&rps_indices, &derived.poc_st_foll, &derived.poc_lt_foll);

        let mut slices = Vec::with_capacity(indices.len());
        for (slot, &nal_idx) in indices.iter().enumerate() {
            let nal = &nal_units[nal_idx];
            let header = if slot == 0 {
                slice0.clone()
            } else {
                parse_slice_header(&nal.payload, &self.sps_map, &self.pps_map, nal.header.nal_unit_type)?
            };
            let list_entry_l0 = header.ref_pic_list_modification.as_ref().map(|m| m.list_entry_l0.as_slice());
            let list_entry_l1 = header.ref_pic_list_modification.as_ref().map(|m| m.list_entry_l1.as_slice());
            let is_b_slice = matches!(header.slice_type, vparse_hevc::SliceType::B);
            let lists = build_ref_pic_lists(
                &rps_indices,
                header.num_ref_idx_l0_active_minus1,
                header.num_ref_idx_l1_active_minus1,
                is_b_slice,
                list_entry_l0,
                list_entry_l1,
            );
            let remap = |dpb_idx: &usize| {
                ref_frames.iter().position(|e| e.pic_idx == self.dpb.slot(*dpb_idx).pic_idx as u8).unwrap_or(0xFF) as u8
            };
            slices.push(HevcSliceParams {
                header,
                ref_pic_list: [
                    lists.list0.iter().map(remap).collect(),
                    lists.list1.iter().map(remap).collect(),
                ],
            });
        }

        self.dpb.conditional_bump(sps.max_num_reorder_pics(), sps.dpb_size());
        let free_slot = self.dpb.find_free_slot()?;
        let surface_idx = self.pool.acquire(poc)?;
        self.pool.release_decode(surface_idx);
        self.dpb.insert_current(free_slot, surface_idx, poc, self.decode_order_count, 0, slice0.pic_output_flag);
        self.decode_order_count += 1;
        self.pic_count += 1;

        let bitstream = concat_nals(nal_units, indices);
        let pic_params = PicParams {
            width: sps.pic_width_in_luma_samples,
            height: sps.pic_height_in_luma_samples,
            curr_pic_idx: surface_idx,
            field_pic_flag: false,
            bottom_field_flag: false,
            num_slices: slices.len() as u32,
            bitstream,
            codec: CodecPicParams::Hevc(HevcPicParams {
                intra_pic_flag: nal_type.is_irap(),
                ref_frames,
                sps,
                pps,
                poc,
                slices,
            }),
        };

        if !callbacks.decode(&pic_params) {
            return Err(ParserError::CallbackRejected("decode"));
        }

        self.dpb.conditional_bump(1, 1); // re-drain point after RPS marking (§10 supplemented features)
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

    fn emit_ref_frames(
        &self,
        rps: &RefPicSetIndices,
        poc_st_foll: &[i32],
        poc_lt_foll: &[(i32, bool)],
    ) -> [RefFrameEntry; 15] {
        let mut out = [RefFrameEntry::EMPTY; 15];
        let mut n = 0;
        let mut push = |idx: usize, out: &mut [RefFrameEntry; 15], n: &mut usize, long_term: bool| {
            if *n < 15 {
                let slot = self.dpb.slot(idx);
                out[*n] = RefFrameEntry {
                    pic_idx: slot.pic_idx as u8,
                    surface_idx: slot.surface_idx,
                    order_key: slot.order_key,
                    long_term,
                };
                *n += 1;
            }
        };
        for &i in &rps.st_curr_before {
            push(i, &mut out, &mut n, false);
        }
        for &i in &rps.st_curr_after {
            push(i, &mut out, &mut n, false);
        }
        for &i in &rps.lt_curr {
            push(i, &mut out, &mut n, true);
        }
        for &poc in poc_st_foll {
            if let Some(i) = self.slot_for_poc(poc) {
                push(i, &mut out, &mut n, false);
            }
        }
        for &(poc, _) in poc_lt_foll {
            if let Some(i) = self.slot_for_poc(poc) {
                push(i, &mut out, &mut n, true);
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
        self.first_pic_in_stream = true;
        Ok(())
    }

    /// `mark_frame_for_reuse(handle, pic_idx)` (§6): the host is done
    /// displaying this surface.
    pub fn mark_frame_for_reuse(&mut self, surface_idx: u8) {
        self.pool.release_display(surface_idx);
    }
}

fn is_vcl(t: NalUnitType) -> bool {
    (t as u8) <= 31
}

fn first_slice_segment_flag(payload: &[u8]) -> bool {
    let mut reader = vparse_core::BitReader::new(payload);
    matches!(reader.read_flag(), Ok(true))
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

fn concat_nals(nal_units: &[vparse_hevc::NalUnit], indices: &[usize]) -> Vec<u8> {
    let mut out = Vec::new();
    for &idx in indices {
        out.extend_from_slice(&nal_units[idx].payload);
    }
    out
}
