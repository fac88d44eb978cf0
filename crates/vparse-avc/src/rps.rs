//! Reference picture marking (8.2.5): the sliding-window process (8.2.5.3)
//! used when `adaptive_ref_pic_marking_mode_flag` is false, and the MMCO
//! process (8.2.5.4) used when it is true. Both decide which currently
//! "used for reference" pictures become "unused for reference", or gain a
//! `long_term_frame_idx`, once the current picture finishes decoding.
//!
//! Operates on `ref_list::RefFrame` so the session layer can reuse the same
//! reference snapshot it already builds for list construction.

use crate::ref_list::RefFrame;
use crate::slice::DecRefPicMarking;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkingDecision {
    /// The reference at `dpb_index` is no longer used for reference.
    Unused(usize),
    /// The reference at `dpb_index` becomes long-term with this index,
    /// converting a short-term picture (MMCO 3) or re-tagging a picture
    /// the current MMCO pass itself just inserted.
    LongTerm(usize, u32),
}

/// Result of one marking pass.
#[derive(Debug, Clone, Default)]
pub struct MarkingOutcome {
    pub decisions: Vec<MarkingDecision>,
    /// MMCO 5: every reference picture, including ones `decisions` already
    /// names, is marked unused and frame numbering resets. The POC side of
    /// this is handled separately by `PocState::note_mmco5`.
    pub unused_all: bool,
    /// MMCO 6: the picture currently being decoded (not yet a DPB resident
    /// at marking time) becomes long-term with this index once inserted.
    pub current_picture_long_term_frame_idx: Option<u32>,
}

/// `FrameNumWrap` (eq. 8-27): every short-term reference's frame number,
/// relative to the current picture's `frame_num`.
fn frame_num_wrap(ref_frame_num: u32, curr_frame_num: u32, max_frame_num: u32) -> i64 {
    if ref_frame_num > curr_frame_num {
        ref_frame_num as i64 - max_frame_num as i64
    } else {
        ref_frame_num as i64
    }
}

/// 8.2.5.3: once short-term + long-term references reach `max_num_ref_frames`
/// (or 1, whichever is greater), the short-term reference with the smallest
/// `FrameNumWrap` is marked unused for reference.
pub fn sliding_window(
    curr_frame_num: u32,
    max_frame_num: u32,
    max_num_ref_frames: u32,
    refs: &[RefFrame],
) -> MarkingOutcome {
    let mut outcome = MarkingOutcome::default();
    let num_short_term = refs.iter().filter(|r| !r.is_long_term).count();
    let num_long_term = refs.iter().filter(|r| r.is_long_term).count();
    let cap = max_num_ref_frames.max(1) as usize;

    if num_short_term == 0 || num_short_term + num_long_term < cap {
        return outcome;
    }

    if let Some(oldest) = refs
        .iter()
        .filter(|r| !r.is_long_term)
        .min_by_key(|r| frame_num_wrap(r.frame_num, curr_frame_num, max_frame_num))
    {
        outcome.decisions.push(MarkingDecision::Unused(oldest.dpb_index));
    }
    outcome
}

/// 8.2.5.4: apply `memory_management_control_operation` entries 1-6 in
/// order. MMCO 5 short-circuits the remaining ops, matching the "treat the
/// rest of the current picture as an IDR" semantics of 8.2.5.4.5.
pub fn apply_mmco(curr_frame_num: u32, max_frame_num: u32, marking: &DecRefPicMarking, refs: &[RefFrame]) -> MarkingOutcome {
    let mut outcome = MarkingOutcome::default();

    // Long-term assignments observed so far, including ones this loop makes
    // via op 3: op 4 and later op-3/op-6 invocations need to see them.
    let mut long_term: Vec<(usize, u32)> =
        refs.iter().filter(|r| r.is_long_term).map(|r| (r.dpb_index, r.long_term_frame_idx)).collect();

    for op in &marking.mmco_ops {
        match op.op {
            1 => {
                let pic_num_x = curr_frame_num as i64 - (op.difference_of_pic_nums_minus1 as i64 + 1);
                if let Some(r) = refs
                    .iter()
                    .filter(|r| !r.is_long_term)
                    .find(|r| frame_num_wrap(r.frame_num, curr_frame_num, max_frame_num) == pic_num_x)
                {
                    outcome.decisions.push(MarkingDecision::Unused(r.dpb_index));
                }
            }
            2 => {
                if let Some(pos) = long_term.iter().position(|&(_, idx)| idx == op.long_term_pic_num) {
                    let (dpb_index, _) = long_term.remove(pos);
                    outcome.decisions.push(MarkingDecision::Unused(dpb_index));
                }
            }
            3 => {
                // Any existing long-term picture holding this index is
                // displaced before the short-term picture takes it over.
                if let Some(pos) = long_term.iter().position(|&(_, idx)| idx == op.long_term_frame_idx) {
                    let (dpb_index, _) = long_term.remove(pos);
                    outcome.decisions.push(MarkingDecision::Unused(dpb_index));
                }
                let pic_num_x = curr_frame_num as i64 - (op.difference_of_pic_nums_minus1 as i64 + 1);
                if let Some(r) = refs
                    .iter()
                    .filter(|r| !r.is_long_term)
                    .find(|r| frame_num_wrap(r.frame_num, curr_frame_num, max_frame_num) == pic_num_x)
                {
                    outcome.decisions.push(MarkingDecision::LongTerm(r.dpb_index, op.long_term_frame_idx));
                    long_term.push((r.dpb_index, op.long_term_frame_idx));
                }
            }
            4 => {
                let max_long_term_frame_idx = op.max_long_term_frame_idx_plus1.checked_sub(1);
                long_term.retain(|&(dpb_index, idx)| {
                    let keep = max_long_term_frame_idx.is_some_and(|max| idx <= max);
                    if !keep {
                        outcome.decisions.push(MarkingDecision::Unused(dpb_index));
                    }
                    keep
                });
            }
            5 => {
                outcome.unused_all = true;
                outcome.decisions.clear();
                long_term.clear();
                break;
            }
            6 => {
                if let Some(pos) = long_term.iter().position(|&(_, idx)| idx == op.long_term_frame_idx) {
                    let (dpb_index, _) = long_term.remove(pos);
                    outcome.decisions.push(MarkingDecision::Unused(dpb_index));
                }
                outcome.current_picture_long_term_frame_idx = Some(op.long_term_frame_idx);
            }
            _ => {}
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::MmcoOp;

    fn short_term(dpb_index: usize, frame_num: u32) -> RefFrame {
        RefFrame { dpb_index, frame_num, is_long_term: false, long_term_frame_idx: 0, pic_order_cnt: 0, pic_num: 0, long_term_pic_num: 0 }
    }

    fn long_term(dpb_index: usize, long_term_frame_idx: u32) -> RefFrame {
        RefFrame { dpb_index, frame_num: 0, is_long_term: true, long_term_frame_idx, pic_order_cnt: 0, pic_num: 0, long_term_pic_num: 0 }
    }

    #[test]
    fn sliding_window_evicts_smallest_frame_num_wrap() {
        let refs = vec![short_term(0, 5), short_term(1, 2), short_term(2, 4)];
        let outcome = sliding_window(6, 16, 3, &refs);
        assert_eq!(outcome.decisions, vec![MarkingDecision::Unused(1)]);
    }

    #[test]
    fn sliding_window_does_nothing_below_capacity() {
        let refs = vec![short_term(0, 5)];
        let outcome = sliding_window(6, 16, 3, &refs);
        assert!(outcome.decisions.is_empty());
    }

    #[test]
    fn mmco1_marks_target_pic_num_unused() {
        let refs = vec![short_term(0, 5), short_term(1, 3)];
        let marking = DecRefPicMarking {
            no_output_of_prior_pics_flag: false,
            long_term_reference_flag: false,
            adaptive_ref_pic_marking_mode_flag: true,
            mmco_ops: vec![MmcoOp { op: 1, difference_of_pic_nums_minus1: 2, long_term_pic_num: 0, long_term_frame_idx: 0, max_long_term_frame_idx_plus1: 0 }],
        };
        // curr_frame_num = 6: difference_of_pic_nums_minus1=2 -> PicNumX = 6 - 3 = 3.
        let outcome = apply_mmco(6, 16, &marking, &refs);
        assert_eq!(outcome.decisions, vec![MarkingDecision::Unused(1)]);
    }

    #[test]
    fn mmco3_converts_short_term_to_long_term() {
        let refs = vec![short_term(0, 3)];
        let marking = DecRefPicMarking {
            no_output_of_prior_pics_flag: false,
            long_term_reference_flag: false,
            adaptive_ref_pic_marking_mode_flag: true,
            mmco_ops: vec![MmcoOp { op: 3, difference_of_pic_nums_minus1: 2, long_term_pic_num: 0, long_term_frame_idx: 7, max_long_term_frame_idx_plus1: 0 }],
        };
        let outcome = apply_mmco(6, 16, &marking, &refs);
        assert_eq!(outcome.decisions, vec![MarkingDecision::LongTerm(0, 7)]);
    }

    #[test]
    fn mmco4_evicts_long_term_above_new_max() {
        let refs = vec![long_term(0, 1), long_term(1, 4)];
        let marking = DecRefPicMarking {
            no_output_of_prior_pics_flag: false,
            long_term_reference_flag: false,
            adaptive_ref_pic_marking_mode_flag: true,
            mmco_ops: vec![MmcoOp { op: 4, difference_of_pic_nums_minus1: 0, long_term_pic_num: 0, long_term_frame_idx: 0, max_long_term_frame_idx_plus1: 2 }],
        };
        let outcome = apply_mmco(6, 16, &marking, &refs);
        assert_eq!(outcome.decisions, vec![MarkingDecision::Unused(1)]);
    }

    #[test]
    fn mmco5_marks_everything_unused_and_discards_other_ops() {
        let refs = vec![short_term(0, 3)];
        let marking = DecRefPicMarking {
            no_output_of_prior_pics_flag: false,
            long_term_reference_flag: false,
            adaptive_ref_pic_marking_mode_flag: true,
            mmco_ops: vec![
                MmcoOp { op: 1, difference_of_pic_nums_minus1: 0, long_term_pic_num: 0, long_term_frame_idx: 0, max_long_term_frame_idx_plus1: 0 },
                MmcoOp { op: 5, difference_of_pic_nums_minus1: 0, long_term_pic_num: 0, long_term_frame_idx: 0, max_long_term_frame_idx_plus1: 0 },
            ],
        };
        let outcome = apply_mmco(6, 16, &marking, &refs);
        assert!(outcome.unused_all);
        assert!(outcome.decisions.is_empty());
    }

    #[test]
    fn mmco6_marks_current_picture_long_term() {
        let marking = DecRefPicMarking {
            no_output_of_prior_pics_flag: false,
            long_term_reference_flag: false,
            adaptive_ref_pic_marking_mode_flag: true,
            mmco_ops: vec![MmcoOp { op: 6, difference_of_pic_nums_minus1: 0, long_term_pic_num: 0, long_term_frame_idx: 2, max_long_term_frame_idx_plus1: 0 }],
        };
        let outcome = apply_mmco(6, 16, &marking, &[]);
        assert_eq!(outcome.current_picture_long_term_frame_idx, Some(2));
    }
}
