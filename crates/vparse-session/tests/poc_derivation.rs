//! `GetRelativeDist` antisymmetry (§8: `get_relative_dist(a, b) ==
//! -get_relative_dist(b, a)` for every `a`, `b` within the order-hint
//! range), exercised as a cross-module property the `ParserCore`
//! reference-selection logic in `core::av1` depends on.

use proptest::prelude::*;
use vparse_av1::get_relative_dist;

const ORDER_HINT_BITS: u8 = 5;

proptest! {
    // Exact half-range pairs (diff == +/- 2^(bits-1)) are the one boundary
    // the spec formula resolves asymmetrically on purpose (both directions
    // fold to the same negative value); every other pair must be
    // antisymmetric.
    #[test]
    fn relative_dist_is_antisymmetric(a in 0u32..32, b in 0u32..32) {
        let half = 1i32 << (ORDER_HINT_BITS - 1);
        let diff = a as i32 - b as i32;
        prop_assume!(diff != half && diff != -half);
        prop_assert_eq!(
            get_relative_dist(a, b, ORDER_HINT_BITS),
            -get_relative_dist(b, a, ORDER_HINT_BITS)
        );
    }

    #[test]
    fn relative_dist_is_zero_for_equal_hints(hint in 0u32..32) {
        prop_assert_eq!(get_relative_dist(hint, hint, ORDER_HINT_BITS), 0);
    }
}

#[test]
fn relative_dist_wraps_around_order_hint_range() {
    let bits = 3u8; // order hints modulo 8
    // 7 is "one behind" 0 when wrapping, not "seven ahead".
    assert_eq!(get_relative_dist(0, 7, bits), 1);
    assert_eq!(get_relative_dist(7, 0, bits), -1);
}
