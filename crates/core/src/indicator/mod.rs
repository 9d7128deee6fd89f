//! Front-panel status lamps.

use crate::deck::DeckState;
use crate::hal::IntensityOutput;

/// Read-only view rendered by the indicator. Assembled by the orchestrator
/// from the core components each control pass; the indicator never touches
/// them directly.
#[derive(Debug, Clone, Copy)]
pub struct StatusSnapshot {
    pub deck: DeckState,
    pub beam_intensity: i32,
    pub sound_level: f64,
}

/// Four-lamp panel: recording, playback, beam brightness, sound level.
#[derive(Debug)]
pub struct StatusIndicator<L> {
    recording_lamp: L,
    playback_lamp: L,
    beam_lamp: L,
    sound_lamp: L,
}

impl<L: IntensityOutput> StatusIndicator<L> {
    pub fn new(recording_lamp: L, playback_lamp: L, beam_lamp: L, sound_lamp: L) -> Self {
        Self {
            recording_lamp,
            playback_lamp,
            beam_lamp,
            sound_lamp,
        }
    }

    pub fn render(&mut self, snapshot: &StatusSnapshot) {
        let on_off = |engaged: bool| if engaged { u8::MAX } else { 0 };
        self.recording_lamp
            .set_intensity(on_off(snapshot.deck == DeckState::Recording));
        self.playback_lamp
            .set_intensity(on_off(snapshot.deck == DeckState::Playing));
        self.beam_lamp
            .set_intensity((snapshot.beam_intensity >> 4).clamp(0, 255) as u8);
        self.sound_lamp
            .set_intensity((snapshot.sound_level.clamp(0.0, 1.0) * 255.0) as u8);
    }
}
