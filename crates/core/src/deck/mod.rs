//! Remote control for the tape transport.
//!
//! The deck accepts momentary button presses on three command lines and
//! reports its current mode on three independent active-low status lines.
//! Commanding a mode is therefore request-verify-retry: drive the line low
//! for one pulse width, release it, and re-read the status. Presses the deck
//! fails to register are retried up to a configured budget, after which the
//! caller gets a [`RecorderError::DeckUnresponsive`] rather than an
//! indefinitely blocked loop.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, Result};
use crate::hal::{Clock, DigitalInput, DigitalOutput};
use crate::orchestrator::Transport;

/// Transport mode as derived from the three status lines.
///
/// The deck owns this state; the controller only observes it. `Unknown`
/// covers the wiring-level ambiguity of none or several lines asserting at
/// once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckState {
    Stopped,
    Recording,
    Playing,
    Unknown,
}

impl fmt::Display for DeckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeckState::Stopped => "stopped",
            DeckState::Recording => "recording",
            DeckState::Playing => "playing",
            DeckState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// The three momentary buttons on the deck remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckCommand {
    Stop,
    Record,
    Play,
}

impl DeckCommand {
    /// Mode the deck settles in once the press registers.
    pub fn target(self) -> DeckState {
        match self {
            DeckCommand::Stop => DeckState::Stopped,
            DeckCommand::Record => DeckState::Recording,
            DeckCommand::Play => DeckState::Playing,
        }
    }
}

impl fmt::Display for DeckCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeckCommand::Stop => "stop",
            DeckCommand::Record => "record",
            DeckCommand::Play => "play",
        };
        f.write_str(name)
    }
}

/// Pulse timing and retry budget for deck commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    /// How long a command line is held low per press.
    pub pulse_width_ms: u64,
    /// Settle time after releasing the line, before the status re-read.
    pub settle_ms: u64,
    /// Presses attempted before giving up on the deck.
    pub max_attempts: u32,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            pulse_width_ms: 200,
            settle_ms: 200,
            max_attempts: 25,
        }
    }
}

impl DeckConfig {
    pub fn pulse_width(&self) -> Duration {
        Duration::from_millis(self.pulse_width_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// The six physical lines wired to the deck.
#[derive(Debug)]
pub struct DeckLines<O, I> {
    pub stop_cmd: O,
    pub record_cmd: O,
    pub play_cmd: O,
    pub stop_status: I,
    pub record_status: I,
    pub play_status: I,
}

/// Driver for the deck's pulse-and-verify command protocol.
///
/// Owns all six lines exclusively; nothing else may drive the command pins.
#[derive(Debug)]
pub struct DeckController<O, I, C> {
    lines: DeckLines<O, I>,
    clock: C,
    config: DeckConfig,
}

impl<O, I, C> DeckController<O, I, C>
where
    O: DigitalOutput,
    I: DigitalInput,
    C: Clock,
{
    /// Takes ownership of the lines and parks all command outputs high
    /// (buttons released).
    pub fn new(mut lines: DeckLines<O, I>, clock: C, config: DeckConfig) -> Self {
        lines.stop_cmd.set(true);
        lines.record_cmd.set(true);
        lines.play_cmd.set(true);
        Self {
            lines,
            clock,
            config,
        }
    }

    // Status lines are active-low in the deck wiring: logic false on the
    // line means the mode is engaged. The inversion lives here and nowhere
    // else.

    pub fn is_stopped(&self) -> bool {
        !self.lines.stop_status.get()
    }

    pub fn is_recording(&self) -> bool {
        !self.lines.record_status.get()
    }

    pub fn is_playing(&self) -> bool {
        !self.lines.play_status.get()
    }

    /// Tri-state view over the three status lines. Exactly one asserted line
    /// maps to its mode; none or several map to [`DeckState::Unknown`].
    pub fn state(&self) -> DeckState {
        match (self.is_stopped(), self.is_recording(), self.is_playing()) {
            (true, false, false) => DeckState::Stopped,
            (false, true, false) => DeckState::Recording,
            (false, false, true) => DeckState::Playing,
            _ => DeckState::Unknown,
        }
    }

    pub fn stop(&mut self) -> Result<()> {
        self.command(DeckCommand::Stop)
    }

    pub fn record(&mut self) -> Result<()> {
        self.command(DeckCommand::Record)
    }

    pub fn play(&mut self) -> Result<()> {
        self.command(DeckCommand::Play)
    }

    /// Pulses the command line until its own status line reports the target
    /// mode. Already being in the target mode issues zero pulses.
    ///
    /// The controller does not sequence transitions: callers route between
    /// recording and playback through `stop` themselves.
    fn command(&mut self, command: DeckCommand) -> Result<()> {
        if self.reached(command) {
            return Ok(());
        }
        if self.state() == DeckState::Unknown {
            // Could be a deck mid-transition; pulses are harmless, so try
            // anyway and let the retry budget decide.
            tracing::warn!(%command, "deck status ambiguous before command");
        }
        for attempt in 1..=self.config.max_attempts {
            self.pulse(command);
            if self.reached(command) {
                if attempt > 1 {
                    tracing::debug!(%command, attempt, "deck acknowledged after retries");
                }
                return Ok(());
            }
            tracing::warn!(%command, attempt, "deck ignored command pulse");
        }
        Err(RecorderError::DeckUnresponsive {
            target: command.target(),
            attempts: self.config.max_attempts,
            observed: self.state(),
        })
    }

    fn reached(&self, command: DeckCommand) -> bool {
        match command {
            DeckCommand::Stop => self.is_stopped(),
            DeckCommand::Record => self.is_recording(),
            DeckCommand::Play => self.is_playing(),
        }
    }

    /// One momentary press: low for the pulse width, released high, then a
    /// settle interval before the caller re-reads status.
    fn pulse(&mut self, command: DeckCommand) {
        self.drive(command, false);
        self.clock.sleep(self.config.pulse_width());
        self.drive(command, true);
        self.clock.sleep(self.config.settle());
    }

    fn drive(&mut self, command: DeckCommand, level: bool) {
        let line = match command {
            DeckCommand::Stop => &mut self.lines.stop_cmd,
            DeckCommand::Record => &mut self.lines.record_cmd,
            DeckCommand::Play => &mut self.lines.play_cmd,
        };
        line.set(level);
    }
}

impl<O, I, C> Transport for DeckController<O, I, C>
where
    O: DigitalOutput,
    I: DigitalInput,
    C: Clock,
{
    fn state(&self) -> DeckState {
        DeckController::state(self)
    }

    fn is_recording(&self) -> bool {
        DeckController::is_recording(self)
    }

    fn record(&mut self) -> Result<()> {
        DeckController::record(self)
    }

    fn stop(&mut self) -> Result<()> {
        DeckController::stop(self)
    }
}
