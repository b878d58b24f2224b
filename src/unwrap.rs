//! Extends a 16-bit wrapping sequence number into a monotone `u64`,
//! using a 10%/90% heuristic to tell a small forward gap from a wrap.

const PERIOD: u64 = 65536;
const LOW_ZONE: u64 = 6553; // 0.10 * 65535, truncated
const HIGH_ZONE: u64 = 58981; // 0.90 * 65535, truncated

/// `prev_unwrapped` is the unwrapped key of the most recently accepted
/// fragment; `this_raw` is the next packet's raw 16-bit sequence number.
///
/// Only when the previous key is near the top of its epoch *and* the new
/// raw value is near the bottom do we infer a wrap; otherwise we assume
/// the same epoch, tolerating gaps of up to ~6500 packets near the
/// boundary without misclassifying direction.
pub fn unwrap_seq(prev_unwrapped: u64, this_raw: u16) -> u64 {
    let this_raw = this_raw as u64;
    let prev_mod = prev_unwrapped % PERIOD;
    let prev_offset = prev_unwrapped - prev_mod;

    if this_raw > LOW_ZONE || prev_mod < HIGH_ZONE {
        this_raw + prev_offset
    } else {
        this_raw + PERIOD + prev_offset
    }
}
