//! Shared constants for the drop clock.

/// Drop rate at level 0, in 60 Hz reference frames.
pub const INITIAL_DROP_RATE_TICKS: u32 = 48;

/// Frames per second of the reference clock the drop curve is defined against.
pub const REFERENCE_FPS: u32 = 60;

/// Multiplier to convert seconds into milliseconds.
pub const MS_PER_SECOND: f64 = 1000.0;
