//! Level -> drop-rate table and tick -> interval conversion.
//!
//! The curve matches the NES game logic:
//! <https://meatfighter.com/nintendotetrisai/#Dropping_Tetriminos>

use crate::types::{INITIAL_DROP_RATE_TICKS, MS_PER_SECOND, REFERENCE_FPS};

/// Number of 60 Hz reference frames between automatic drops at `level`.
///
/// Starts at 48 ticks and applies a cumulative decrement per level:
/// -5 for levels 1-8, -2 at 9, -1 at each of 10, 13, 16, 19 and 29.
/// Non-increasing in `level`; bottoms out at 1 tick from level 29 on.
pub fn drop_rate_ticks(level: u32) -> u32 {
    let mut ticks = INITIAL_DROP_RATE_TICKS;
    for i in 1..=level {
        ticks -= match i {
            1..=8 => 5,
            9 => 2,
            10 | 13 | 16 | 19 | 29 => 1,
            _ => 0,
        };
    }
    ticks
}

/// Converts a tick count into a millisecond interval at the reference FPS.
///
/// No rounding: fractional milliseconds are part of the contract and are
/// passed through to the timer as-is.
pub fn ticks_to_ms(ticks: u32) -> f64 {
    f64::from(ticks) * (MS_PER_SECOND / f64::from(REFERENCE_FPS))
}
