//! Reference-list construction properties (§8), exercised directly against
//! the per-codec `RefListBuilder` functions the session cores call.

use vparse_avc::{assign_pic_nums, RefFrame as AvcRefFrame};
use vparse_hevc::{build_ref_pic_lists, RefPicSetIndices};

#[test]
fn avc_pic_num_wraps_when_frame_num_exceeds_current() {
    let mut refs = vec![
        AvcRefFrame {
            dpb_index: 0,
            frame_num: 14,
            is_long_term: false,
            long_term_frame_idx: 0,
            pic_order_cnt: 0,
            pic_num: 0,
            long_term_pic_num: 0,
        },
        AvcRefFrame {
            dpb_index: 1,
            frame_num: 2,
            is_long_term: false,
            long_term_frame_idx: 0,
            pic_order_cnt: 0,
            pic_num: 0,
            long_term_pic_num: 0,
        },
    ];
    // curr_frame_num = 3, max_frame_num = 16: frame_num 14 is "ahead" of the
    // current picture, so it wraps to 14 - 16 = -2 (eq. 8-27).
    assign_pic_nums(3, 16, &mut refs);
    assert_eq!(refs[0].pic_num, -2);
    assert_eq!(refs[1].pic_num, 2);
}

#[test]
fn avc_long_term_pic_num_mirrors_long_term_frame_idx() {
    let mut refs = vec![AvcRefFrame {
        dpb_index: 0,
        frame_num: 0,
        is_long_term: true,
        long_term_frame_idx: 5,
        pic_order_cnt: 0,
        pic_num: 0,
        long_term_pic_num: 0,
    }];
    assign_pic_nums(1, 16, &mut refs);
    assert_eq!(refs[0].long_term_pic_num, 5);
}

#[test]
fn hevc_list0_orders_before_then_after_then_long_term() {
    let rps = RefPicSetIndices { st_curr_before: vec![2, 4], st_curr_after: vec![1], lt_curr: vec![9] };
    let lists = build_ref_pic_lists(&rps, 2, 0, false, None, None);
    assert_eq!(lists.list0, vec![2, 4, 1]);
    assert!(lists.list1.is_empty());
}

#[test]
fn hevc_list0_cycles_when_active_count_exceeds_total_curr() {
    let rps = RefPicSetIndices { st_curr_before: vec![2], st_curr_after: vec![], lt_curr: vec![] };
    // num_ref_idx_l0_active_minus1 = 2 means 3 active entries but only one
    // candidate reference; 8.3.4's temp list cycles to fill the request.
    let lists = build_ref_pic_lists(&rps, 2, 0, false, None, None);
    assert_eq!(lists.list0, vec![2, 2, 2]);
}

#[test]
fn hevc_list_entry_modification_overrides_temp_list_order() {
    let rps = RefPicSetIndices { st_curr_before: vec![2, 4], st_curr_after: vec![1], lt_curr: vec![] };
    let lists = build_ref_pic_lists(&rps, 2, 0, false, Some(&[2, 0, 1]), None);
    assert_eq!(lists.list0, vec![1, 2, 4]);
}

#[test]
fn hevc_list1_is_empty_for_non_b_slices() {
    let rps = RefPicSetIndices { st_curr_before: vec![0], st_curr_after: vec![1], lt_curr: vec![] };
    let lists = build_ref_pic_lists(&rps, 0, 0, false, None, None);
    assert!(lists.list1.is_empty());
}
