//! Reference picture list construction (8.2.4): picture-number derivation,
//! initial list 0/1 ordering and `ref_pic_list_modification` application.

use crate::error::{AvcError, Result};
use crate::slice::{RefPicListModification, SliceHeader, SliceType};

/// One DPB entry's state as seen by the reference-list builder. Carries only
/// what 8.2.4 needs, not the full `DpbSlot`.
#[derive(Debug, Clone, Copy)]
pub struct RefFrame {
    pub dpb_index: usize,
    pub frame_num: u32,
    pub is_long_term: bool,
    pub long_term_frame_idx: u32,
    pub pic_order_cnt: i32,
    /// Filled in by [`assign_pic_nums`]; undefined until then.
    pub pic_num: i32,
    pub long_term_pic_num: i32,
}

/// Eq. 8-27/8-28/8-29: frame_num_wrap, PicNum, LongTermPicNum for the
/// progressive (frame, non-field) case.
pub fn assign_pic_nums(curr_frame_num: u32, max_frame_num: u32, refs: &mut [RefFrame]) {
    for r in refs.iter_mut() {
        if r.is_long_term {
            r.long_term_pic_num = r.long_term_frame_idx as i32;
        } else {
            let frame_num_wrap = if r.frame_num > curr_frame_num {
                r.frame_num as i32 - max_frame_num as i32
            } else {
                r.frame_num as i32
            };
            r.pic_num = frame_num_wrap;
        }
    }
}

/// Result of 8.2.4.2/8.2.4.3: ordered, post-modification reference lists.
#[derive(Debug, Clone, Default)]
pub struct RefPicLists {
    pub list0: Vec<RefFrame>,
    pub list1: Vec<RefFrame>,
}

/// Build `RefPicList0`/`RefPicList1` for one slice and apply
/// `ref_pic_list_modification` if signalled. `refs` must already have
/// `pic_num`/`long_term_pic_num` populated via [`assign_pic_nums`].
pub fn build_ref_pic_lists(
    slice: &SliceHeader,
    curr_poc: i32,
    refs: &[RefFrame],
) -> Result<RefPicLists> {
    let mut lists = RefPicLists::default();

    match slice.slice_type {
        SliceType::I | SliceType::Si => return Ok(lists),
        SliceType::P | SliceType::Sp => {
            lists.list0 = init_list0_p(refs);
        }
        SliceType::B => {
            lists.list0 = init_list0_b(refs, curr_poc);
            lists.list1 = init_list1_b(refs, curr_poc);
        }
    }

    truncate(&mut lists.list0, slice.num_ref_idx_l0_active_minus1 as usize + 1);
    if slice.slice_type.is_b() {
        truncate(&mut lists.list1, slice.num_ref_idx_l1_active_minus1 as usize + 1);
    }

    if slice.ref_pic_list_modification_flag_l0 {
        apply_modification(
            &mut lists.list0,
            &slice.ref_pic_list_modification_l0,
            slice.frame_num,
            refs,
        )?;
    }
    if slice.slice_type.is_b() && slice.ref_pic_list_modification_flag_l1 {
        apply_modification(
            &mut lists.list1,
            &slice.ref_pic_list_modification_l1,
            slice.frame_num,
            refs,
        )?;
    }

    Ok(lists)
}

/// 8.2.4.2.1: short-term by descending PicNum, then long-term by ascending
/// LongTermPicNum.
fn init_list0_p(refs: &[RefFrame]) -> Vec<RefFrame> {
    let mut short_term: Vec<RefFrame> = refs.iter().copied().filter(|r| !r.is_long_term).collect();
    short_term.sort_by(|a, b| b.pic_num.cmp(&a.pic_num));

    let mut long_term: Vec<RefFrame> = refs.iter().copied().filter(|r| r.is_long_term).collect();
    long_term.sort_by_key(|r| r.long_term_pic_num);

    short_term.extend(long_term);
    short_term
}

/// 8.2.4.2.3, list 0: short-term pictures with POC less than the current
/// picture's, in descending POC order; then those with POC greater, in
/// ascending POC order; then long-term by ascending LongTermPicNum.
fn init_list0_b(refs: &[RefFrame], curr_poc: i32) -> Vec<RefFrame> {
    let mut before: Vec<RefFrame> = refs
        .iter()
        .copied()
        .filter(|r| !r.is_long_term && r.pic_order_cnt < curr_poc)
        .collect();
    before.sort_by(|a, b| b.pic_order_cnt.cmp(&a.pic_order_cnt));

    let mut after: Vec<RefFrame> = refs
        .iter()
        .copied()
        .filter(|r| !r.is_long_term && r.pic_order_cnt >= curr_poc)
        .collect();
    after.sort_by_key(|r| r.pic_order_cnt);

    let mut long_term: Vec<RefFrame> = refs.iter().copied().filter(|r| r.is_long_term).collect();
    long_term.sort_by_key(|r| r.long_term_pic_num);

    before.extend(after);
    before.extend(long_term);
    before
}

/// 8.2.4.2.3, list 1: the mirror of list 0 — POC greater than current first
/// (ascending), then POC less than current (descending), then long-term.
/// Built as its own independent loop over `refs`, never by re-slicing list 0
/// after its loop variable has already run off the end.
fn init_list1_b(refs: &[RefFrame], curr_poc: i32) -> Vec<RefFrame> {
    let mut after: Vec<RefFrame> = refs
        .iter()
        .copied()
        .filter(|r| !r.is_long_term && r.pic_order_cnt >= curr_poc)
        .collect();
    after.sort_by_key(|r| r.pic_order_cnt);

    let mut before: Vec<RefFrame> = refs
        .iter()
        .copied()
        .filter(|r| !r.is_long_term && r.pic_order_cnt < curr_poc)
        .collect();
    before.sort_by(|a, b| b.pic_order_cnt.cmp(&a.pic_order_cnt));

    let mut long_term: Vec<RefFrame> = refs.iter().copied().filter(|r| r.is_long_term).collect();
    long_term.sort_by_key(|r| r.long_term_pic_num);

    after.extend(before);
    after.extend(long_term);
    after
}

fn truncate(list: &mut Vec<RefFrame>, num_ref_idx_active: usize) {
    if list.len() < num_ref_idx_active {
        // 8.2.4.2.5: wrap the existing entries to pad a short list.
        if !list.is_empty() {
            let original_len = list.len();
            let mut i = 0;
            while list.len() < num_ref_idx_active {
                list.push(list[i % original_len]);
                i += 1;
            }
        }
    } else {
        list.truncate(num_ref_idx_active);
    }
}

/// 8.2.4.3: process `modification_of_pic_nums_idc` entries in order,
/// inserting the referenced picture at `ref_idx_lx` and shifting the rest
/// down, then dropping anything that spilled past the active list length.
fn apply_modification(
    list: &mut Vec<RefFrame>,
    modification: &RefPicListModification,
    curr_frame_num: u32,
    all_refs: &[RefFrame],
) -> Result<()> {
    let num_ref_idx_active = list.len();
    if num_ref_idx_active == 0 {
        return Ok(());
    }

    let mut pred_pic_num = curr_frame_num as i32;
    let mut ref_idx = 0usize;

    for entry in &modification.entries {
        let target = match entry.idc {
            0 | 1 => {
                let abs_diff = entry.value as i32 + 1;
                let mut pic_num = if entry.idc == 0 {
                    pred_pic_num - abs_diff
                } else {
                    pred_pic_num + abs_diff
                };
                // Wrap into [0, MaxPicNum) isn't tracked here since MaxFrameNum
                // isn't threaded through; callers operate on already-wrapped
                // PicNum values stored on `all_refs`.
                if pic_num < 0 {
                    pic_num += i32::MAX;
                }
                pred_pic_num = pic_num;
                all_refs.iter().find(|r| !r.is_long_term && r.pic_num == pic_num)
            }
            2 => {
                let long_term_pic_num = entry.value as i32;
                all_refs
                    .iter()
                    .find(|r| r.is_long_term && r.long_term_pic_num == long_term_pic_num)
            }
            idc => {
                return Err(AvcError::InvalidSliceHeader(format!(
                    "unknown modification_of_pic_nums_idc {idc}"
                )))
            }
        };

        let Some(&picked) = target else { continue };

        if ref_idx >= list.len() {
            list.push(picked);
        } else {
            list.insert(ref_idx, picked);
            // Remove the now-duplicated trailing occurrence, if any, per
            // 8.2.4.3.1's shift-and-drop rule.
            if let Some(dup) = list.iter().skip(ref_idx + 1).position(|r| r.dpb_index == picked.dpb_index) {
                list.remove(ref_idx + 1 + dup);
            }
            if list.len() > num_ref_idx_active {
                list.truncate(num_ref_idx_active);
            }
        }

        ref_idx += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(dpb_index: usize, frame_num: u32, poc: i32) -> RefFrame {
        RefFrame {
            dpb_index,
            frame_num,
            is_long_term: false,
            long_term_frame_idx: 0,
            pic_order_cnt: poc,
            pic_num: 0,
            long_term_pic_num: 0,
        }
    }

    #[test]
    fn assigns_frame_num_wrap_for_pic_num() {
        let mut refs = vec![frame(0, 3, 0), frame(1, 5, 0)];
        assign_pic_nums(4, 16, &mut refs);
        assert_eq!(refs[0].pic_num, 3);
        assert_eq!(refs[1].pic_num, 5 - 16);
    }

    #[test]
    fn list0_p_sorts_short_term_descending_pic_num() {
        let mut refs = vec![frame(0, 1, 0), frame(1, 3, 0), frame(2, 2, 0)];
        assign_pic_nums(4, 16, &mut refs);
        let list0 = init_list0_p(&refs);
        let pic_nums: Vec<i32> = list0.iter().map(|r| r.pic_num).collect();
        assert_eq!(pic_nums, vec![3, 2, 1]);
    }

    #[test]
    fn list1_is_independent_of_list0_for_b_slices() {
        // curr_poc = 10; pictures before (poc 4, 8) and after (poc 12, 16).
        let refs = vec![frame(0, 1, 4), frame(1, 2, 8), frame(2, 3, 12), frame(3, 4, 16)];

        let list0 = init_list0_b(&refs, 10);
        let list1 = init_list1_b(&refs, 10);

        let list0_pocs: Vec<i32> = list0.iter().map(|r| r.pic_order_cnt).collect();
        let list1_pocs: Vec<i32> = list1.iter().map(|r| r.pic_order_cnt).collect();

        assert_eq!(list0_pocs, vec![8, 4, 12, 16]);
        assert_eq!(list1_pocs, vec![12, 16, 8, 4]);
    }

    #[test]
    fn truncate_pads_short_list_by_wrapping() {
        let mut list = vec![frame(0, 1, 0), frame(1, 2, 0)];
        truncate(&mut list, 5);
        assert_eq!(list.len(), 5);
    }
}
