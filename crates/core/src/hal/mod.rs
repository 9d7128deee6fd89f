//! Hardware capability traits.
//!
//! The sensors and the deck controller are written against these narrow
//! traits so that the same logic runs on real pins and on the in-memory
//! doubles in [`sim`]. Real GPIO/ADC backends live outside this crate and
//! only need to satisfy these signatures.

pub mod sim;

use std::time::{Duration, Instant};

/// Single digital line driven by this software.
pub trait DigitalOutput {
    fn set(&mut self, level: bool);
}

/// Single digital line observed by this software.
pub trait DigitalInput {
    fn get(&self) -> bool;
}

/// One ADC channel.
///
/// `read` takes a single raw sample; `read_block` takes a timed burst at the
/// channel's native sample rate. The default block implementation just loops
/// `read`, which is what the simulated channels want.
pub trait AnalogInput {
    fn read(&mut self) -> i32;

    fn read_block(&mut self, count: usize) -> Vec<i32> {
        (0..count).map(|_| self.read()).collect()
    }
}

/// Intensity-settable indicator lamp (0 = off, 255 = full brightness).
pub trait IntensityOutput {
    fn set_intensity(&mut self, level: u8);
}

/// Monotonic time source paired with a blocking sleep.
///
/// All timeout arithmetic in the crate goes through `now`; wall-clock time is
/// never consulted, so clock adjustments cannot move an onset backwards.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Clock backed by [`Instant::now`] and [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
