//! Decoded picture buffer management (C.5.2): free-slot selection, reference
//! marking, and the conditional/unconditional bumping process.

use crate::error::{HevcError, Result};

pub const MAX_DPB_FRAMES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceMarking {
    Unused,
    ShortTerm,
    LongTerm,
}

#[derive(Debug, Clone)]
pub struct DpbFrame {
    pub pic_order_cnt: i32,
    pub decode_order_count: u64,
    pub is_reference: ReferenceMarking,
    /// Slot holds a decoded picture awaiting reuse or output.
    pub in_use: bool,
    pub pic_output_flag: bool,
}

impl Default for DpbFrame {
    fn default() -> Self {
        Self {
            pic_order_cnt: 0,
            decode_order_count: 0,
            is_reference: ReferenceMarking::Unused,
            in_use: false,
            pic_output_flag: false,
        }
    }
}

/// Decoded picture buffer: a fixed pool of slots, the way hardware decoders
/// expose reference frame storage.
#[derive(Debug, Clone)]
pub struct Dpb {
    frames: Vec<DpbFrame>,
    dpb_fullness: u32,
    num_pics_needed_for_output: u32,
    output_order: Vec<usize>,
}

impl Dpb {
    pub fn new() -> Self {
        Self {
            frames: vec![DpbFrame::default(); MAX_DPB_FRAMES],
            dpb_fullness: 0,
            num_pics_needed_for_output: 0,
            output_order: Vec::new(),
        }
    }

    pub fn dpb_fullness(&self) -> u32 {
        self.dpb_fullness
    }

    pub fn num_pics_needed_for_output(&self) -> u32 {
        self.num_pics_needed_for_output
    }

    pub fn frame(&self, index: usize) -> &DpbFrame {
        &self.frames[index]
    }

    /// Mark every slot "unused for reference"; done when the current picture
    /// is an IRAP with `NoRaslOutputFlag == 1` (8.3.2).
    pub fn mark_all_unused_for_reference(&mut self) {
        for frame in &mut self.frames {
            frame.is_reference = ReferenceMarking::Unused;
        }
    }

    /// Find a free slot with the lowest decode order count, i.e. the
    /// longest-resident empty buffer, and occupy it with the current
    /// picture. Mirrors `FindFreeBufAndMark`'s scan, which looks for the
    /// *oldest* free slot rather than the first one found.
    pub fn find_free_and_mark(
        &mut self,
        pic_order_cnt: i32,
        decode_order_count: u64,
        pic_output_flag: bool,
    ) -> Result<usize> {
        let mut min_decode_order_count = u64::MAX;
        let mut index = None;
        for (i, frame) in self.frames.iter().enumerate() {
            if !frame.in_use && frame.decode_order_count < min_decode_order_count {
                min_decode_order_count = frame.decode_order_count;
                index = Some(i);
            }
        }
        let index = index.ok_or_else(|| {
            HevcError::DpbOverflow(format!("fullness = {}", self.dpb_fullness))
        })?;

        self.frames[index] = DpbFrame {
            pic_order_cnt,
            decode_order_count,
            is_reference: ReferenceMarking::ShortTerm,
            in_use: true,
            pic_output_flag,
        };
        if pic_output_flag {
            self.num_pics_needed_for_output += 1;
        }
        self.dpb_fullness += 1;

        Ok(index)
    }

    /// Bump the picture with the lowest POC that still needs output
    /// (C.5.2.4). Returns the slot index placed onto the output order, or
    /// `None` if nothing needs output.
    pub fn bump(&mut self) -> Option<usize> {
        let min_poc_idx = self
            .frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.pic_output_flag && f.in_use)
            .min_by_key(|(_, f)| f.pic_order_cnt)
            .map(|(i, _)| i)?;

        self.frames[min_poc_idx].pic_output_flag = false;
        self.num_pics_needed_for_output = self.num_pics_needed_for_output.saturating_sub(1);

        if self.frames[min_poc_idx].is_reference == ReferenceMarking::Unused {
            self.frames[min_poc_idx].in_use = false;
            self.dpb_fullness = self.dpb_fullness.saturating_sub(1);
        }

        self.output_order.push(min_poc_idx);
        Some(min_poc_idx)
    }

    /// Conditional bumping, called both right after a slot is claimed and
    /// again after RPS marking (C.5.2.2): drain while either the buffer is
    /// over capacity or more pictures are pending output than reordering
    /// allows.
    pub fn conditionally_bump(&mut self, max_dec_pic_buffering: u32, max_num_reorder_pics: u32) {
        while self.dpb_fullness >= max_dec_pic_buffering
            || self.num_pics_needed_for_output > max_num_reorder_pics
        {
            if self.bump().is_none() {
                break;
            }
        }
    }

    /// Bump every remaining picture; used on an IRAP with `NoRaslOutputFlag`
    /// and `no_output_of_prior_pics_flag == 0`, or at end of stream.
    pub fn flush(&mut self) {
        while self.num_pics_needed_for_output > 0 {
            if self.bump().is_none() {
                break;
            }
        }
    }

    /// Discard every slot's contents without emitting them for output; used
    /// when `no_output_of_prior_pics_flag == 1`.
    pub fn empty(&mut self) {
        for frame in &mut self.frames {
            *frame = DpbFrame::default();
        }
        self.dpb_fullness = 0;
        self.num_pics_needed_for_output = 0;
        self.output_order.clear();
    }

    /// Drain the accumulated output order (caller hands these to its output
    /// callback in this order).
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
    fn find_free_and_mark_picks_oldest_decode_order() {
        let mut dpb = Dpb::new();
        dpb.frames[2].decode_order_count = 0;
        dpb.frames[2].in_use = true;
        dpb.frames[5].decode_order_count = 0;
        dpb.frames[5].in_use = false;
        let idx = dpb.find_free_and_mark(10, 7, true).unwrap();
        assert_eq!(idx, 0);
    }

    #[test]
    fn bump_picks_lowest_poc_first() {
        let mut dpb = Dpb::new();
        dpb.find_free_and_mark(30, 0, true).unwrap();
        dpb.find_free_and_mark(10, 1, true).unwrap();
        dpb.find_free_and_mark(20, 2, true).unwrap();
        let first = dpb.bump().unwrap();
        assert_eq!(dpb.frame(first).pic_order_cnt, 10);
    }

    #[test]
    fn conditionally_bump_respects_reorder_limit() {
        let mut dpb = Dpb::new();
        for poc in [0, 1, 2] {
            dpb.find_free_and_mark(poc, poc as u64, true).unwrap();
        }
        dpb.conditionally_bump(16, 1);
        assert_eq!(dpb.num_pics_needed_for_output(), 1);
    }
}
