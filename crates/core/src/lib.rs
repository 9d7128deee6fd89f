//! Core library for the unattended piano recorder.
//!
//! The system watches an acoustic piano through an optical beam across the
//! keyboard (plus an optional microphone) and drives an external tape deck
//! that only exposes momentary push buttons and three status lines. The two
//! non-trivial pieces are the activity detector, which turns noisy beam
//! samples into a debounced playing/not-playing signal with trailing
//! hysteresis, and the deck controller, which runs a pulse-and-verify
//! command protocol with a bounded retry budget. Everything talks to
//! hardware through the narrow traits in [`hal`], so the whole stack runs
//! unchanged against the in-memory simulation used by the tests and the
//! `simulate` mode of the application binary.

pub mod config;
pub mod deck;
pub mod detector;
pub mod error;
pub mod hal;
pub mod indicator;
pub mod orchestrator;
pub mod sensor;

pub use config::AppConfig;
pub use deck::{DeckCommand, DeckConfig, DeckController, DeckLines, DeckState};
pub use detector::{ActivityDetector, DetectorConfig};
pub use error::{RecorderError, Result};
pub use indicator::{StatusIndicator, StatusSnapshot};
pub use orchestrator::{ActivitySource, ControlEvent, Orchestrator, Transport};
pub use sensor::{BeamCalibration, BeamSensor, MicCalibration, Microphone};
