//! Sensor front ends: optical beam break and microphone energy.
//!
//! Both sensors are pure measurement: the playing decision built on top of
//! them lives in [`crate::detector`].

use serde::{Deserialize, Serialize};

use crate::hal::{AnalogInput, DigitalOutput};

/// Calibration for the beam interruption check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamCalibration {
    /// Intensity delta below which a single ping counts as occluded.
    pub threshold: i32,
    /// Number of follow-up pings that must stay low in aggregate before an
    /// interruption is declared.
    pub debounce_samples: u32,
}

impl Default for BeamCalibration {
    fn default() -> Self {
        Self {
            threshold: 100,
            debounce_samples: 10,
        }
    }
}

/// Laser-and-photodiode beam spanning the keyboard.
///
/// The emitter is wired open-drain: driving the line low turns the laser on,
/// releasing it high lets it float off. One `ping` measures received
/// intensity as the lit reading minus the dark reading, so ambient light
/// cancels out of the delta.
#[derive(Debug)]
pub struct BeamSensor<O, A> {
    emitter: O,
    photodiode: A,
    calibration: BeamCalibration,
}

impl<O: DigitalOutput, A: AnalogInput> BeamSensor<O, A> {
    pub fn new(emitter: O, photodiode: A, calibration: BeamCalibration) -> Self {
        Self {
            emitter,
            photodiode,
            calibration,
        }
    }

    /// Single intensity-delta sample.
    pub fn ping(&mut self) -> i32 {
        let dark = self.photodiode.read();
        self.emitter.set(false); // pull down to on
        let light = self.photodiode.read();
        self.emitter.set(true); // float to off
        light - dark
    }

    /// Debounced occlusion check.
    ///
    /// One low ping is not enough; the next `debounce_samples` pings must
    /// also stay below the threshold in aggregate. A single-sample noise dip
    /// on the photodiode therefore never reads as an interruption. The check
    /// short-circuits on the first ping, so the unoccluded fast path costs
    /// one sample.
    pub fn interrupted(&mut self) -> bool {
        if self.ping() >= self.calibration.threshold {
            return false;
        }
        let follow_up: i64 = (0..self.calibration.debounce_samples)
            .map(|_| i64::from(self.ping()))
            .sum();
        follow_up < i64::from(self.calibration.debounce_samples) * i64::from(self.calibration.threshold)
    }
}

/// Calibration for the microphone energy estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MicCalibration {
    /// Samples per timed block (100 ms at the reference 48 kHz rate).
    pub block_size: usize,
    /// Block energy that maps to a normalized level of 1.0.
    pub full_scale_energy: f64,
    /// Normalized level above which the room counts as excited.
    pub excited_threshold: f64,
}

impl Default for MicCalibration {
    fn default() -> Self {
        Self {
            block_size: 4800,
            full_scale_energy: 2_278_619.0,
            excited_threshold: 0.01,
        }
    }
}

/// Electret microphone sampled in timed blocks.
#[derive(Debug)]
pub struct Microphone<A> {
    adc: A,
    calibration: MicCalibration,
    normalized_level: f64,
}

impl<A: AnalogInput> Microphone<A> {
    pub fn new(adc: A, calibration: MicCalibration) -> Self {
        Self {
            adc,
            calibration,
            normalized_level: 0.0,
        }
    }

    /// Takes one block and returns its normalized energy.
    ///
    /// Energy is the mean squared deviation from the block mean, scaled by
    /// the full-scale calibration constant and clamped to `[0, 1]`.
    pub fn level(&mut self) -> f64 {
        let samples = self.adc.read_block(self.calibration.block_size);
        if samples.is_empty() {
            self.normalized_level = 0.0;
            return 0.0;
        }
        let mean = samples.iter().copied().map(f64::from).sum::<f64>() / samples.len() as f64;
        let energy = samples
            .iter()
            .copied()
            .map(|v| {
                let d = f64::from(v) - mean;
                d * d
            })
            .sum::<f64>()
            / samples.len() as f64;
        self.normalized_level = (energy / self.calibration.full_scale_energy).min(1.0);
        self.normalized_level
    }

    pub fn excited(&mut self) -> bool {
        self.level() > self.calibration.excited_threshold
    }

    /// Most recent normalized level without taking a new block.
    pub fn normalized_level(&self) -> f64 {
        self.normalized_level
    }
}
