//! Injected timer capability.
//!
//! The clock never touches wall time directly; it schedules against a
//! [`Timer`] so tests can drive a virtual clock ([`ManualTimer`]) while the
//! real driver pumps an [`Instant`]-based one ([`WallTimer`]) from its loop.
//!
//! Everything here is single-threaded and cooperative: fires are delivered
//! synchronously from `advance`/`pump`, and `cancel` removes the entry
//! outright, so a fire that was queued before a cancel can never be
//! delivered after it. Tick callbacks must not re-enter the timer.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Callback invoked once per elapsed interval.
pub type TickFn = Box<dyn FnMut()>;

/// Identifies a scheduled entry for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimerId(u64);

/// A repeating-timer source with synchronous cancellation.
pub trait Timer {
    type Handle;

    /// Arms a repeating timer; `tick` fires once per elapsed `interval`.
    ///
    /// # Panics
    ///
    /// Implementations reject a zero `interval`: a zero-period entry can
    /// never catch up to its deadline.
    fn schedule(&mut self, interval: Duration, tick: TickFn) -> Self::Handle;

    /// Disarms the entry. Any queued, undelivered fire is discarded.
    fn cancel(&mut self, handle: Self::Handle);
}

/// Lets a driver and a clock share one timer on the same loop.
impl<T: Timer> Timer for Rc<RefCell<T>> {
    type Handle = T::Handle;

    fn schedule(&mut self, interval: Duration, tick: TickFn) -> Self::Handle {
        self.borrow_mut().schedule(interval, tick)
    }

    fn cancel(&mut self, handle: Self::Handle) {
        self.borrow_mut().cancel(handle);
    }
}

struct Entry {
    id: TimerId,
    interval: Duration,
    next_due: Duration,
    tick: TickFn,
}

/// Virtual-clock timer for deterministic tests.
///
/// Time only moves when [`advance`](ManualTimer::advance) is called; every
/// fire that became due during the advance is delivered in chronological
/// order, one per elapsed interval (`setInterval`-style catch-up). Equal
/// deadlines deliver in schedule order.
#[derive(Default)]
pub struct ManualTimer {
    now: Duration,
    next_id: u64,
    entries: Vec<Entry>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of armed entries.
    pub fn scheduled(&self) -> usize {
        self.entries.len()
    }

    /// Moves virtual time forward, delivering every fire that comes due.
    pub fn advance(&mut self, elapsed: Duration) {
        let target = self.now + elapsed;
        loop {
            let due = self
                .entries
                .iter_mut()
                .filter(|e| e.next_due <= target)
                .min_by_key(|e| (e.next_due, e.id));
            let Some(entry) = due else { break };
            entry.next_due += entry.interval;
            (entry.tick)();
        }
        self.now = target;
    }
}

impl Timer for ManualTimer {
    type Handle = TimerId;

    fn schedule(&mut self, interval: Duration, tick: TickFn) -> TimerId {
        assert!(!interval.is_zero(), "timer interval must be non-zero");
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            interval,
            next_due: self.now + interval,
            tick,
        });
        id
    }

    fn cancel(&mut self, handle: TimerId) {
        self.entries.retain(|e| e.id != handle);
    }
}

struct WallEntry {
    id: TimerId,
    interval: Duration,
    next_due: Instant,
    tick: TickFn,
}

/// Wall-clock timer pumped cooperatively by the driver loop.
pub struct WallTimer {
    next_id: u64,
    entries: Vec<WallEntry>,
}

impl WallTimer {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Number of armed entries.
    pub fn scheduled(&self) -> usize {
        self.entries.len()
    }

    /// Delivers every fire whose deadline has passed and returns the time
    /// until the next deadline, suitable as a poll timeout.
    pub fn pump(&mut self) -> Option<Duration> {
        let now = Instant::now();
        for entry in &mut self.entries {
            while entry.next_due <= now {
                entry.next_due += entry.interval;
                (entry.tick)();
            }
        }
        self.entries
            .iter()
            .map(|e| e.next_due.saturating_duration_since(now))
            .min()
    }
}

impl Default for WallTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for WallTimer {
    type Handle = TimerId;

    fn schedule(&mut self, interval: Duration, tick: TickFn) -> TimerId {
        assert!(!interval.is_zero(), "timer interval must be non-zero");
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(WallEntry {
            id,
            interval,
            next_due: Instant::now() + interval,
            tick,
        });
        id
    }

    fn cancel(&mut self, handle: TimerId) {
        self.entries.retain(|e| e.id != handle);
    }
}
