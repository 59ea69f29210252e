//! Level-driven drop clock for NES-style Tetris gravity.
//!
//! The clock maps a level onto a drop rate (in 60 Hz reference frames),
//! converts it into a millisecond interval, and drives an injected drop
//! sink at that interval through an injected [`timer::Timer`]. Drivers
//! install a hook at construction and call `start`/`pause`/`set_level`;
//! board logic, rendering and input stay outside.

pub mod clock;
pub mod rate;
pub mod timer;
pub mod types;

pub use clock::{DropClock, DropSink};
pub use rate::{drop_rate_ticks, ticks_to_ms};
pub use timer::{ManualTimer, Timer, TimerId, WallTimer};
