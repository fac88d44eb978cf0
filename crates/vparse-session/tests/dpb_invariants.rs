//! Cross-module invariant checks for the generic `Dpb`/`OutputReorder` pair
//! (I2: fullness never exceeds capacity, I5: reorder queue never exceeds
//! the configured display delay outside a flush).

use proptest::prelude::*;
use vparse_session::{Dpb, OutputReorder, ReferenceState, MAX_DPB_FRAMES};

proptest! {
    #[test]
    fn fullness_never_exceeds_capacity_under_arbitrary_order_keys(keys in proptest::collection::vec(-1000i32..1000, 1..60)) {
        let mut dpb = Dpb::new();
        for (i, key) in keys.into_iter().enumerate() {
            dpb.conditional_bump(4, MAX_DPB_FRAMES as u32);
            let slot = dpb.find_free_slot().expect("conditional_bump keeps a slot free");
            dpb.insert_current(slot, (i % 16) as u8, key, i as u64, 0, true);
            // Simulate an all-non-reference stream so slots free up once
            // bumped, matching a real core's reference-state update for
            // pictures no RPS/ref-list ever selects.
            dpb.mark_reference(slot, ReferenceState::Unused);
            prop_assert!(dpb.fullness() <= MAX_DPB_FRAMES as u32);
        }
    }

    #[test]
    fn reorder_queue_stays_within_display_delay_outside_flush(keys in proptest::collection::vec(-1000i32..1000, 1..60)) {
        let mut dpb = Dpb::new();
        let mut reorder = OutputReorder::new(2);

        for (i, key) in keys.into_iter().enumerate() {
            dpb.conditional_bump(4, MAX_DPB_FRAMES as u32);
            let slot = dpb.find_free_slot().unwrap();
            dpb.insert_current(slot, (i % 16) as u8, key, i as u64, 0, true);
            dpb.mark_reference(slot, ReferenceState::Unused);
            dpb.conditional_bump(4, MAX_DPB_FRAMES as u32);
            for bumped in dpb.take_output_order() {
                reorder.push(dpb.slot(bumped).surface_idx);
            }
            reorder.release_ready();
            prop_assert!(reorder.len() <= 2);
        }
        reorder.drain();
        prop_assert!(reorder.is_empty());
    }
}

#[test]
fn flush_releases_every_pending_picture_regardless_of_delay() {
    let mut dpb = Dpb::new();
    let mut reorder = OutputReorder::new(1);

    for key in 0..5i32 {
        let slot = dpb.find_free_slot().unwrap();
        dpb.insert_current(slot, key as u8, key, key as u64, 0, true);
    }
    dpb.flush();
    for bumped in dpb.take_output_order() {
        reorder.push(dpb.slot(bumped).surface_idx);
    }
    assert_eq!(reorder.drain().len(), 5);
}
