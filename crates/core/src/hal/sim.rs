//! In-memory implementations of the hardware traits.
//!
//! These back the unit tests and the `simulate` mode of the application
//! binary; nothing here touches real pins. Everything is `Rc`-shared because
//! the control loop is single-threaded.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::{AnalogInput, Clock, DigitalInput, DigitalOutput, IntensityOutput};
use crate::deck::{DeckCommand, DeckLines, DeckState};

/// Digital line whose level is shared between a driver and any observers.
#[derive(Debug, Clone)]
pub struct SharedLine {
    level: Rc<Cell<bool>>,
}

impl SharedLine {
    pub fn high() -> Self {
        Self {
            level: Rc::new(Cell::new(true)),
        }
    }

    pub fn low() -> Self {
        Self {
            level: Rc::new(Cell::new(false)),
        }
    }

    /// Current level, readable from any clone.
    pub fn level(&self) -> bool {
        self.level.get()
    }

    /// Forces the level from the test side, bypassing the output trait.
    pub fn force(&self, level: bool) {
        self.level.set(level);
    }
}

impl DigitalOutput for SharedLine {
    fn set(&mut self, level: bool) {
        self.level.set(level);
    }
}

impl DigitalInput for SharedLine {
    fn get(&self) -> bool {
        self.level.get()
    }
}

/// Deterministic clock for tests and simulation.
///
/// `sleep` advances simulated time instead of blocking, so pulse timing and
/// hysteresis windows can be exercised without real delays.
#[derive(Debug, Clone)]
pub struct ManualClock {
    start: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, delta: Duration) {
        self.offset.set(self.offset.get() + delta);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// ADC channel that replays a scripted sample queue.
///
/// Once the queue is exhausted the channel cycles the tail sequence, or reads
/// zero when no tail was given.
#[derive(Debug, Default)]
pub struct ScriptedAdc {
    samples: VecDeque<i32>,
    tail: Vec<i32>,
    tail_index: usize,
}

impl ScriptedAdc {
    pub fn new(samples: impl IntoIterator<Item = i32>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            tail: Vec::new(),
            tail_index: 0,
        }
    }

    /// Samples cycled forever after the scripted queue runs out.
    pub fn with_tail(mut self, tail: impl IntoIterator<Item = i32>) -> Self {
        self.tail = tail.into_iter().collect();
        self
    }

    /// Channel that reads the same value forever.
    pub fn steady(value: i32) -> Self {
        Self::new([]).with_tail([value])
    }
}

impl AnalogInput for ScriptedAdc {
    fn read(&mut self) -> i32 {
        if let Some(sample) = self.samples.pop_front() {
            return sample;
        }
        if self.tail.is_empty() {
            return 0;
        }
        let sample = self.tail[self.tail_index % self.tail.len()];
        self.tail_index += 1;
        sample
    }
}

/// Indicator lamp that records the last intensity written to it.
#[derive(Debug, Clone, Default)]
pub struct SimLamp {
    level: Rc<Cell<u8>>,
}

impl SimLamp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> u8 {
        self.level.get()
    }
}

impl IntensityOutput for SimLamp {
    fn set_intensity(&mut self, level: u8) {
        self.level.set(level);
    }
}

#[derive(Debug)]
struct SimDeckInner {
    mode: DeckState,
    ignore: u32,
    pulses: u32,
}

/// Behavioural model of the tape transport.
///
/// Command lines are momentary active-low buttons: a falling edge is one
/// press. Status lines are active-low and track the current mode. A
/// configurable number of leading presses can be ignored to model missed
/// pulses, and `DeckState::Unknown` models a deck asserting no status line.
#[derive(Debug, Clone)]
pub struct SimDeck {
    inner: Rc<RefCell<SimDeckInner>>,
}

impl SimDeck {
    pub fn new(mode: DeckState) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SimDeckInner {
                mode,
                ignore: 0,
                pulses: 0,
            })),
        }
    }

    /// Drops the next `count` presses before responding again.
    pub fn ignore_pulses(&self, count: u32) {
        self.inner.borrow_mut().ignore = count;
    }

    pub fn mode(&self) -> DeckState {
        self.inner.borrow().mode
    }

    /// Total presses observed, including ignored ones.
    pub fn pulse_count(&self) -> u32 {
        self.inner.borrow().pulses
    }

    pub fn command_line(&self, command: DeckCommand) -> SimCommandLine {
        SimCommandLine {
            inner: self.inner.clone(),
            command,
            last_level: true,
        }
    }

    pub fn status_line(&self, mode: DeckState) -> SimStatusLine {
        SimStatusLine {
            inner: self.inner.clone(),
            mode,
        }
    }

    /// Full six-line bundle wired to this deck.
    pub fn lines(&self) -> DeckLines<SimCommandLine, SimStatusLine> {
        DeckLines {
            stop_cmd: self.command_line(DeckCommand::Stop),
            record_cmd: self.command_line(DeckCommand::Record),
            play_cmd: self.command_line(DeckCommand::Play),
            stop_status: self.status_line(DeckState::Stopped),
            record_status: self.status_line(DeckState::Recording),
            play_status: self.status_line(DeckState::Playing),
        }
    }
}

/// One momentary command button on a [`SimDeck`].
#[derive(Debug)]
pub struct SimCommandLine {
    inner: Rc<RefCell<SimDeckInner>>,
    command: DeckCommand,
    last_level: bool,
}

impl DigitalOutput for SimCommandLine {
    fn set(&mut self, level: bool) {
        if self.last_level && !level {
            let mut inner = self.inner.borrow_mut();
            inner.pulses += 1;
            if inner.ignore > 0 {
                inner.ignore -= 1;
            } else {
                inner.mode = self.command.target();
            }
        }
        self.last_level = level;
    }
}

/// One active-low status line on a [`SimDeck`].
#[derive(Debug)]
pub struct SimStatusLine {
    inner: Rc<RefCell<SimDeckInner>>,
    mode: DeckState,
}

impl DigitalInput for SimStatusLine {
    fn get(&self) -> bool {
        // Active-low: the line sits high unless the deck is in this mode.
        self.inner.borrow().mode != self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_adc_replays_then_cycles_tail() {
        let mut adc = ScriptedAdc::new([1, 2]).with_tail([7, 8]);
        assert_eq!(adc.read(), 1);
        assert_eq!(adc.read(), 2);
        assert_eq!(adc.read(), 7);
        assert_eq!(adc.read(), 8);
        assert_eq!(adc.read(), 7);
    }

    #[test]
    fn manual_clock_sleep_advances_time() {
        let clock = ManualClock::new();
        let before = clock.now();
        clock.sleep(Duration::from_millis(250));
        assert_eq!(clock.now() - before, Duration::from_millis(250));
    }

    #[test]
    fn sim_deck_switches_mode_on_falling_edge() {
        let deck = SimDeck::new(DeckState::Stopped);
        let mut button = deck.command_line(DeckCommand::Record);
        button.set(false);
        button.set(true);
        assert_eq!(deck.mode(), DeckState::Recording);
        assert_eq!(deck.pulse_count(), 1);
        // Status lines are active-low.
        assert!(!deck.status_line(DeckState::Recording).get());
        assert!(deck.status_line(DeckState::Stopped).get());
    }

    #[test]
    fn sim_deck_ignores_requested_pulses() {
        let deck = SimDeck::new(DeckState::Stopped);
        deck.ignore_pulses(1);
        let mut button = deck.command_line(DeckCommand::Play);
        button.set(false);
        button.set(true);
        assert_eq!(deck.mode(), DeckState::Stopped);
        button.set(false);
        button.set(true);
        assert_eq!(deck.mode(), DeckState::Playing);
        assert_eq!(deck.pulse_count(), 2);
    }
}
