//! Time sources and the virtual clock.
//!
//! - [`Ticks`]: a millisecond counter, real ([`SystemTicks`]) or simulated
//!   ([`ManualTicks`])
//! - [`ScaledTicksValue`]: virtual time derived from a base counter, shifted
//!   and scaled by writes
//! - [`VirtualClock`]: the shared handle the control loop and time-derived
//!   values read from
//!
//! All counters are `u32` milliseconds and wrap after about 49 days. Use
//! [`time_since`] (or wrapping arithmetic) to compare timestamps.

mod scaled;
mod values;

pub use scaled::{ScaledTicksValue, VirtualClock, SCALED_TICKS_STREAM_SIZE};
pub use values::{CurrentCycleTicksValue, CurrentTicksValue};

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Milliseconds since an arbitrary starting point.
pub type TicksMillis = u32;

/// Whole seconds since an arbitrary starting point.
pub type TicksSeconds = u32;

// Use a lazy static to get a consistent monotonic reference point
lazy_static::lazy_static! {
    static ref MONOTONIC_START: Instant = Instant::now();
}

/// A millisecond counter.
pub trait Ticks {
    fn millis(&self) -> TicksMillis;
}

/// A counter shared by every clock derived from it.
pub type SharedTicks = Rc<dyn Ticks>;

impl<T: Ticks + ?Sized> Ticks for Rc<T> {
    fn millis(&self) -> TicksMillis {
        (**self).millis()
    }
}

impl<T: Ticks + ?Sized> Ticks for &T {
    fn millis(&self) -> TicksMillis {
        (**self).millis()
    }
}

/// Monotonic milliseconds since the first `SystemTicks` was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemTicks;

impl SystemTicks {
    pub fn new() -> Self {
        // Touch the lazy static to initialize it
        let _ = *MONOTONIC_START;
        Self
    }
}

impl Default for SystemTicks {
    fn default() -> Self {
        Self::new()
    }
}

impl Ticks for SystemTicks {
    fn millis(&self) -> TicksMillis {
        // truncation is the wrap-around
        MONOTONIC_START.elapsed().as_millis() as TicksMillis
    }
}

/// A counter that only moves when told to. For simulation and tests.
#[derive(Debug, Default)]
pub struct ManualTicks {
    now: Cell<TicksMillis>,
}

impl ManualTicks {
    pub fn new(start: TicksMillis) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, millis: TicksMillis) {
        self.now.set(millis);
    }

    /// Move forward by `millis`, wrapping at the end of the range.
    pub fn advance(&self, millis: TicksMillis) {
        self.now.set(self.now.get().wrapping_add(millis));
    }
}

impl Ticks for ManualTicks {
    fn millis(&self) -> TicksMillis {
        self.now.get()
    }
}

/// Time from `previous` to `current`, correct across one wrap of the counter.
pub const fn time_since(current: TicksSeconds, previous: TicksSeconds) -> TicksSeconds {
    current.wrapping_sub(previous)
}
