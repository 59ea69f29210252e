//! The drop clock: level-driven periodic scheduler for piece gravity.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::rate::{drop_rate_ticks, ticks_to_ms};
use crate::timer::Timer;

/// Receiver of drop ticks, installed by the driver at construction.
///
/// Blanket-implemented for closures, so `DropClock::new(timer, || { .. })`
/// works without a dedicated sink type.
pub trait DropSink {
    fn on_drop(&mut self);
}

impl<F: FnMut()> DropSink for F {
    fn on_drop(&mut self) {
        self();
    }
}

/// State shared with the scheduled tick closure.
struct Shared {
    running: Cell<bool>,
    sink: RefCell<Box<dyn DropSink>>,
}

/// Maps level -> drop rate -> interval and runs a repeating timer that
/// invokes the drop sink once per interval while running.
///
/// Two states: Stopped (initial) and Running. `start` and `pause` are
/// idempotent; `set_level` while running re-arms the timer at the new
/// interval without firing stale-interval ticks. The armed timer handle
/// exists iff the clock is running.
pub struct DropClock<T: Timer> {
    level: u32,
    timer: T,
    handle: Option<T::Handle>,
    shared: Rc<Shared>,
}

impl<T: Timer> DropClock<T> {
    /// Creates a stopped clock at level 0.
    pub fn new(timer: T, sink: impl DropSink + 'static) -> Self {
        Self {
            level: 0,
            timer,
            handle: None,
            shared: Rc::new(Shared {
                running: Cell::new(false),
                sink: RefCell::new(Box::new(sink)),
            }),
        }
    }

    /// Arms the repeating timer at the current level's interval.
    /// No-op while already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.shared.running.set(true);

        let shared = Rc::clone(&self.shared);
        let tick = Box::new(move || {
            // A stale fire must observe "not running" and skip the sink.
            if shared.running.get() {
                shared.sink.borrow_mut().on_drop();
            }
        });

        let interval = Duration::from_secs_f64(self.interval_ms() / 1000.0);
        self.handle = Some(self.timer.schedule(interval, tick));
    }

    /// Disarms the timer. No-op while stopped. Once this returns, no
    /// further sink invocation can occur: cancellation discards queued
    /// fires, and the cleared running flag guards the rest.
    pub fn pause(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.shared.running.set(false);
        self.timer.cancel(handle);
    }

    /// Sets the current level. While running, restarts the timer so the
    /// new interval takes effect immediately.
    pub fn set_level(&mut self, level: u32) {
        self.level = level;
        if self.is_running() {
            self.pause();
            self.start();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Reference frames between drops at the current level.
    pub fn drop_rate_ticks(&self) -> u32 {
        drop_rate_ticks(self.level)
    }

    /// Milliseconds between drops at the current level.
    pub fn interval_ms(&self) -> f64 {
        ticks_to_ms(self.drop_rate_ticks())
    }
}

impl<T: Timer> Drop for DropClock<T> {
    fn drop(&mut self) {
        self.pause();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualTimer;

    type SharedTimer = Rc<RefCell<ManualTimer>>;

    fn clock_with_counter() -> (DropClock<SharedTimer>, SharedTimer, Rc<Cell<u32>>) {
        let timer: SharedTimer = Rc::new(RefCell::new(ManualTimer::new()));
        let drops = Rc::new(Cell::new(0u32));
        let sink_drops = Rc::clone(&drops);
        let clock = DropClock::new(Rc::clone(&timer), move || {
            sink_drops.set(sink_drops.get() + 1);
        });
        (clock, timer, drops)
    }

    fn interval(clock: &DropClock<SharedTimer>) -> Duration {
        Duration::from_secs_f64(clock.interval_ms() / 1000.0)
    }

    #[test]
    fn starts_stopped_at_level_0() {
        let (clock, timer, _) = clock_with_counter();
        assert!(!clock.is_running());
        assert_eq!(clock.level(), 0);
        assert_eq!(clock.drop_rate_ticks(), 48);
        assert_eq!(timer.borrow().scheduled(), 0);
    }

    #[test]
    fn fires_once_per_interval_while_running() {
        let (mut clock, timer, drops) = clock_with_counter();
        clock.set_level(30);
        clock.start();

        let interval = interval(&clock);
        timer.borrow_mut().advance(interval);
        assert_eq!(drops.get(), 1);

        timer.borrow_mut().advance(interval * 3);
        assert_eq!(drops.get(), 4);
    }

    #[test]
    fn pause_suppresses_queued_fires() {
        let (mut clock, timer, drops) = clock_with_counter();
        clock.set_level(30);
        clock.start();
        clock.pause();

        // Wait past the interval: the fire queued before pause must not land.
        timer.borrow_mut().advance(interval(&clock) * 2);
        assert_eq!(drops.get(), 0);
        assert!(!clock.is_running());
    }

    #[test]
    fn stale_fire_observes_not_running() {
        // Even a fire the timer failed to discard is gated on the running
        // flag before it can reach the sink.
        let (mut clock, timer, drops) = clock_with_counter();
        clock.start();
        let step = interval(&clock);

        // Forge a stale fire by advancing right after a pause/start cycle
        // where only the flag is down.
        clock.pause();
        clock.start();
        clock.shared.running.set(false);
        timer.borrow_mut().advance(step);
        assert_eq!(drops.get(), 0);
        clock.shared.running.set(true);
        timer.borrow_mut().advance(step);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn start_is_idempotent() {
        let (mut clock, timer, drops) = clock_with_counter();
        clock.start();
        clock.start();

        assert!(clock.is_running());
        // No double timers: a second start must not arm a second entry.
        assert_eq!(timer.borrow().scheduled(), 1);

        timer.borrow_mut().advance(interval(&clock));
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn pause_is_idempotent() {
        let (mut clock, timer, _) = clock_with_counter();
        clock.start();
        clock.pause();
        clock.pause();

        assert!(!clock.is_running());
        assert_eq!(timer.borrow().scheduled(), 0);
    }

    #[test]
    fn set_level_while_stopped_does_not_arm_timer() {
        let (mut clock, timer, _) = clock_with_counter();
        clock.set_level(12);

        assert_eq!(clock.level(), 12);
        assert!(!clock.is_running());
        assert_eq!(timer.borrow().scheduled(), 0);
    }

    #[test]
    fn set_level_while_running_rearms_at_new_interval() {
        let (mut clock, timer, drops) = clock_with_counter();
        clock.start();
        let old_interval = interval(&clock); // level 0: 48 ticks, 800ms

        // Burn most of the old interval, then switch levels.
        timer.borrow_mut().advance(old_interval - Duration::from_millis(100));
        clock.set_level(8); // 8 ticks, ~133ms
        assert!(clock.is_running());

        let new_interval = interval(&clock);
        assert!(new_interval < old_interval);

        // The old deadline (100ms away) must not fire.
        timer.borrow_mut().advance(Duration::from_millis(100));
        assert_eq!(drops.get(), 0);

        // The next fire is one full new interval after the restart.
        timer.borrow_mut().advance(new_interval);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn restart_resets_the_interval_phase() {
        let (mut clock, timer, drops) = clock_with_counter();
        clock.set_level(8); // 8 ticks, ~133ms
        clock.start();
        let step = interval(&clock);

        timer.borrow_mut().advance(step - Duration::from_millis(1));
        clock.set_level(8); // same level, still a pause/start cycle

        timer.borrow_mut().advance(Duration::from_millis(1));
        assert_eq!(drops.get(), 0, "old deadline must be gone");

        timer.borrow_mut().advance(step);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn interval_tracks_level() {
        let (mut clock, _, _) = clock_with_counter();
        assert_eq!(clock.interval_ms(), 48.0 * (1000.0 / 60.0));

        clock.set_level(29);
        assert_eq!(clock.interval_ms(), 1000.0 / 60.0);
    }

    #[test]
    fn dropping_the_clock_disarms_its_timer() {
        let timer: SharedTimer = Rc::new(RefCell::new(ManualTimer::new()));
        {
            let mut clock = DropClock::new(Rc::clone(&timer), || {});
            clock.start();
            assert_eq!(timer.borrow().scheduled(), 1);
        }
        assert_eq!(timer.borrow().scheduled(), 0);
    }

    #[test]
    fn struct_sink_receives_drops() {
        struct Recorder(Rc<Cell<u32>>);
        impl DropSink for Recorder {
            fn on_drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let timer: SharedTimer = Rc::new(RefCell::new(ManualTimer::new()));
        let count = Rc::new(Cell::new(0u32));
        let mut clock = DropClock::new(Rc::clone(&timer), Recorder(Rc::clone(&count)));
        clock.set_level(30);
        clock.start();

        timer.borrow_mut().advance(interval(&clock));
        assert_eq!(count.get(), 1);
    }
}
