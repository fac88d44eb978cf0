//! Generic decoded picture buffer shared by all three codec cores.
//!
//! Generalizes `vparse_hevc::dpb::Dpb` (POC-keyed, HEVC-only) to a single
//! abstraction keyed on a signed "order key" (POC for AVC/HEVC, order_hint
//! for AV1) that every codec's RpsEngine output can be expressed in terms
//! of, per the `DpbSlot` field list in the data model.

use crate::error::{ParserError, Result};

pub const MAX_DPB_FRAMES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceState {
    Unused,
    ShortTerm,
    LongTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseStatus {
    Empty,
    TopField,
    BottomField,
    Frame,
}

/// One DPB entry. `order_key` is POC for AVC/HEVC, order_hint for AV1;
/// `frame_num`/`long_term_frame_idx` are only meaningful for AVC/HEVC and
/// are left at their default for AV1 slots.
#[derive(Debug, Clone)]
pub struct DpbSlot {
    pub pic_idx: u64,
    pub surface_idx: u8,
    pub order_key: i32,
    pub decode_order_count: u64,
    pub frame_num: u32,
    pub long_term_frame_idx: u32,
    pub reference_state: ReferenceState,
    pub output_pending: bool,
    pub use_status: UseStatus,
}

impl Default for DpbSlot {
    fn default() -> Self {
        Self {
            pic_idx: 0,
            surface_idx: 0xFF,
            order_key: 0,
            decode_order_count: 0,
            frame_num: 0,
            long_term_frame_idx: 0,
            reference_state: ReferenceState::Unused,
            output_pending: false,
            use_status: UseStatus::Empty,
        }
    }
}

/// Fixed-size frame store (§4.6). Codec-agnostic: `ParserCore` for each
/// codec supplies the order key and reference-marking decisions; this type
/// only implements find-free / mark / bump / flush.
#[derive(Debug, Clone)]
pub struct Dpb {
    slots: Vec<DpbSlot>,
    fullness: u32,
    num_pics_needed_for_output: u32,
    output_order: Vec<usize>,
    next_pic_idx: u64,
}

impl Dpb {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_DPB_FRAMES).map(|_| DpbSlot::default()).collect(),
            fullness: 0,
            num_pics_needed_for_output: 0,
            output_order: Vec::new(),
            next_pic_idx: 0,
        }
    }

    pub fn fullness(&self) -> u32 {
        self.fullness
    }

    pub fn num_pics_needed_for_output(&self) -> u32 {
        self.num_pics_needed_for_output
    }

    pub fn slot(&self, index: usize) -> &DpbSlot {
        &self.slots[index]
    }

    pub fn slots(&self) -> &[DpbSlot] {
        &self.slots
    }

    /// Mark every slot `Unused` for reference; done on an IRAP/keyframe with
    /// `NoRaslOutputFlag == 1` (HEVC 8.3.2) or AV1 refresh semantics that
    /// clear the whole reference set.
    pub fn mark_all_unused_for_reference(&mut self) {
        for slot in &mut self.slots {
            slot.reference_state = ReferenceState::Unused;
        }
    }

    pub fn mark_reference(&mut self, index: usize, state: ReferenceState) {
        self.slots[index].reference_state = state;
    }

    /// Set by MMCO 3/6 (AVC 8.2.5.4.3/8.2.5.4.6) when a picture becomes
    /// long-term with an explicit index, rather than through HEVC/AV1's
    /// RPS-supplied index at `insert_current` time.
    pub fn set_long_term_frame_idx(&mut self, index: usize, long_term_frame_idx: u32) {
        self.slots[index].long_term_frame_idx = long_term_frame_idx;
    }

    /// `find_free_slot()`: the slot with `use_status == Empty` and the
    /// lowest `decode_order_count` (oldest-resident-first), matching
    /// `FindFreeBufAndMark`'s selection rule (§10 supplemented features).
    pub fn find_free_slot(&self) -> Result<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.use_status == UseStatus::Empty)
            .min_by_key(|(_, s)| s.decode_order_count)
            .map(|(i, _)| i)
            .ok_or_else(|| ParserError::DpbOverflow(format!("fullness = {}", self.fullness)))
    }

    /// Occupy `index` with the current picture (`insert_current`, §4.6).
    pub fn insert_current(
        &mut self,
        index: usize,
        surface_idx: u8,
        order_key: i32,
        decode_order_count: u64,
        frame_num: u32,
        output_pending: bool,
    ) -> u64 {
        let pic_idx = self.next_pic_idx;
        self.next_pic_idx += 1;
        self.slots[index] = DpbSlot {
            pic_idx,
            surface_idx,
            order_key,
            decode_order_count,
            frame_num,
            long_term_frame_idx: 0,
            reference_state: ReferenceState::ShortTerm,
            output_pending,
            use_status: UseStatus::Frame,
        };
        if output_pending {
            self.num_pics_needed_for_output += 1;
        }
        self.fullness += 1;
        pic_idx
    }

    /// Bump the output-pending slot with the minimum order key. Empties the
    /// slot if it is no longer referenced.
    pub fn bump_one(&mut self) -> Option<usize> {
        let index = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.output_pending && s.use_status != UseStatus::Empty)
            .min_by_key(|(_, s)| s.order_key)
            .map(|(i, _)| i)?;

        self.slots[index].output_pending = false;
        self.num_pics_needed_for_output = self.num_pics_needed_for_output.saturating_sub(1);

        if self.slots[index].reference_state == ReferenceState::Unused {
            self.slots[index].use_status = UseStatus::Empty;
            self.fullness = self.fullness.saturating_sub(1);
        }

        self.output_order.push(index);
        Some(index)
    }

    /// `conditional_bump`: drain while over capacity or more pictures are
    /// pending output than reordering allows. Called at both points §10
    /// names: right after a slot is claimed, and again after RPS marking.
    pub fn conditional_bump(&mut self, max_num_reorder: u32, max_dec_buf: u32) {
        while self.num_pics_needed_for_output > max_num_reorder || self.fullness >= max_dec_buf {
            if self.bump_one().is_none() {
                break;
            }
        }
    }

    /// Bump every pending slot, clearing it from the DPB afterward whether
    /// or not it was still referenced.
    pub fn flush(&mut self) {
        while self.num_pics_needed_for_output > 0 {
            if self.bump_one().is_none() {
                break;
            }
        }
    }

    /// `mark_for_output_on_irap_with_no_rasl`: silently empty the whole DPB,
    /// discarding any pending output.
    pub fn empty(&mut self) {
        for slot in &mut self.slots {
            *slot = DpbSlot::default();
        }
        self.fullness = 0;
        self.num_pics_needed_for_output = 0;
        self.output_order.clear();
    }

    pub fn take_output_order(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.output_order)
    }
}

impl Default for Dpb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_free_slot_picks_oldest_decode_order() {
        let mut dpb = Dpb::new();
        let idx = dpb.find_free_slot().unwrap();
        dpb.insert_current(idx, 0, 10, 0, 0, true);
        let next = dpb.find_free_slot().unwrap();
        assert_ne!(next, idx);
    }

    #[test]
    fn bump_picks_lowest_order_key_first() {
        let mut dpb = Dpb::new();
        let a = dpb.find_free_slot().unwrap();
        dpb.insert_current(a, 0, 30, 0, 0, true);
        let b = dpb.find_free_slot().unwrap();
        dpb.insert_current(b, 1, 10, 1, 0, true);
        let c = dpb.find_free_slot().unwrap();
        dpb.insert_current(c, 2, 20, 2, 0, true);

        let first = dpb.bump_one().unwrap();
        assert_eq!(dpb.slot(first).order_key, 10);
    }

    #[test]
    fn conditional_bump_respects_reorder_limit() {
        let mut dpb = Dpb::new();
        for key in [0, 1, 2] {
            let idx = dpb.find_free_slot().unwrap();
            dpb.insert_current(idx, key as u8, key, key as u64, 0, true);
        }
        dpb.conditional_bump(1, 16);
        assert_eq!(dpb.num_pics_needed_for_output(), 1);
    }

    #[test]
    fn overflow_when_every_slot_occupied() {
        let mut dpb = Dpb::new();
        for key in 0..MAX_DPB_FRAMES {
            let idx = dpb.find_free_slot().unwrap();
            dpb.insert_current(idx, key as u8, key as i32, key as u64, 0, false);
        }
        assert!(dpb.find_free_slot().is_err());
    }

    #[test]
    fn flush_drains_every_pending_slot() {
        let mut dpb = Dpb::new();
        for key in [5, 1, 3] {
            let idx = dpb.find_free_slot().unwrap();
            dpb.insert_current(idx, key as u8, key, key as u64, 0, true);
        }
        dpb.flush();
        assert_eq!(dpb.num_pics_needed_for_output(), 0);
        assert_eq!(dpb.take_output_order().len(), 3);
    }
}
