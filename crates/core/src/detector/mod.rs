//! Decides whether the piano is currently being played.
//!
//! The detector turns noisy beam pings into a stable activity signal: the
//! debounce lives in [`crate::sensor::BeamSensor`], the trailing hysteresis
//! lives here. After an onset the detector keeps reporting "playing" for the
//! inter-note timeout, so ordinary silence between notes never flickers the
//! state to inactive.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::hal::{AnalogInput, Clock, DigitalOutput};
use crate::orchestrator::ActivitySource;
use crate::sensor::{BeamCalibration, BeamSensor, MicCalibration, Microphone};

/// Detector configuration with the reference calibration as defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub beam: BeamCalibration,
    pub mic: MicCalibration,
    /// How long activity persists after the last detected onset.
    pub internote_timeout_secs: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            beam: BeamCalibration::default(),
            mic: MicCalibration::default(),
            internote_timeout_secs: 30,
        }
    }
}

impl DetectorConfig {
    pub fn internote_timeout(&self) -> Duration {
        Duration::from_secs(self.internote_timeout_secs)
    }
}

/// Activity detector over a beam sensor and an optional microphone.
///
/// `last_onset` doubles as the ever-triggered flag: it is `Some` exactly when
/// at least one interruption has been seen, and it only ever moves forward
/// because it is overwritten with the monotonic `now` of a later poll.
#[derive(Debug)]
pub struct ActivityDetector<O, A, M, C> {
    beam: BeamSensor<O, A>,
    mic: Option<Microphone<M>>,
    clock: C,
    internote_timeout: Duration,
    last_onset: Option<Instant>,
}

impl<O, A, M, C> ActivityDetector<O, A, M, C>
where
    O: DigitalOutput,
    A: AnalogInput,
    M: AnalogInput,
    C: Clock,
{
    pub fn new(beam: BeamSensor<O, A>, clock: C, internote_timeout: Duration) -> Self {
        Self {
            beam,
            mic: None,
            clock,
            internote_timeout,
            last_onset: None,
        }
    }

    /// Adds the secondary sound sensor.
    pub fn with_microphone(mut self, mic: Microphone<M>) -> Self {
        self.mic = Some(mic);
        self
    }

    /// One debounced beam poll. Records the onset time on detection and
    /// returns whether this poll itself saw an interruption.
    pub fn poll_primary(&mut self) -> bool {
        if self.beam.interrupted() {
            self.last_onset = Some(self.clock.now());
            true
        } else {
            false
        }
    }

    /// One microphone poll.
    ///
    /// This is a corroborating signal only; it never feeds the playing
    /// decision. Returns false when no microphone is fitted.
    pub fn poll_secondary(&mut self) -> bool {
        match self.mic.as_mut() {
            Some(mic) => mic.excited(),
            None => false,
        }
    }

    /// Playing decision with trailing hysteresis: true if this poll detects
    /// an interruption, or if one was detected less than the inter-note
    /// timeout ago. With no onset recorded yet this reduces to the poll
    /// itself.
    pub fn is_playing(&mut self) -> bool {
        if self.poll_primary() {
            return true;
        }
        match self.last_onset {
            Some(onset) => self.clock.now().duration_since(onset) < self.internote_timeout,
            None => false,
        }
    }

    pub fn ever_triggered(&self) -> bool {
        self.last_onset.is_some()
    }

    pub fn last_onset(&self) -> Option<Instant> {
        self.last_onset
    }

    /// Raw beam intensity for the indicator.
    pub fn beam_intensity(&mut self) -> i32 {
        self.beam.ping()
    }

    /// Cached microphone level for the indicator; zero without a microphone.
    pub fn sound_level(&self) -> f64 {
        self.mic.as_ref().map_or(0.0, Microphone::normalized_level)
    }
}

impl<O, A, M, C> ActivitySource for ActivityDetector<O, A, M, C>
where
    O: DigitalOutput,
    A: AnalogInput,
    M: AnalogInput,
    C: Clock,
{
    fn is_playing(&mut self) -> bool {
        ActivityDetector::is_playing(self)
    }

    fn beam_intensity(&mut self) -> i32 {
        ActivityDetector::beam_intensity(self)
    }

    fn sound_level(&self) -> f64 {
        ActivityDetector::sound_level(self)
    }
}
