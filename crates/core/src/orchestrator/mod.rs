//! Control loop gluing the activity detector to the deck transport.
//!
//! This is the only place the two core components meet: start the recorder
//! on activity onset, stop it once activity has timed out. The seams are
//! traits so the loop can be tested with lightweight doubles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::deck::DeckState;
use crate::error::Result;
use crate::hal::{Clock, IntensityOutput};
use crate::indicator::{StatusIndicator, StatusSnapshot};

/// Activity side of the control loop, implemented by
/// [`crate::detector::ActivityDetector`].
pub trait ActivitySource {
    /// Polls the sensors and applies the hysteresis policy.
    fn is_playing(&mut self) -> bool;
    /// Raw beam intensity for the indicator.
    fn beam_intensity(&mut self) -> i32;
    /// Latest normalized sound level in `[0, 1]`.
    fn sound_level(&self) -> f64;
}

/// Transport side of the control loop, implemented by
/// [`crate::deck::DeckController`].
pub trait Transport {
    fn state(&self) -> DeckState;
    fn is_recording(&self) -> bool;
    fn record(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
}

/// What a single control pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Idle,
    RecordingStarted,
    RecordingStopped,
}

/// Sequential polling loop. Single-threaded by design: the only blocking is
/// the deck pulse timing and the poll-interval sleep.
#[derive(Debug)]
pub struct Orchestrator<S, T, C, L> {
    activity: S,
    transport: T,
    clock: C,
    indicator: Option<StatusIndicator<L>>,
    poll_interval: Duration,
}

impl<S, T, C, L> Orchestrator<S, T, C, L>
where
    S: ActivitySource,
    T: Transport,
    C: Clock,
    L: IntensityOutput,
{
    pub fn new(activity: S, transport: T, clock: C, poll_interval: Duration) -> Self {
        Self {
            activity,
            transport,
            clock,
            indicator: None,
            poll_interval,
        }
    }

    pub fn with_indicator(mut self, indicator: StatusIndicator<L>) -> Self {
        self.indicator = Some(indicator);
        self
    }

    /// One pass of the control loop.
    ///
    /// Deck failures propagate to the caller instead of being retried here;
    /// the controller has already exhausted its own budget by then.
    pub fn step(&mut self) -> Result<ControlEvent> {
        let playing = self.activity.is_playing();
        let event = match (playing, self.transport.is_recording()) {
            (true, false) => {
                tracing::info!("performance detected, starting recorder");
                self.transport.record()?;
                ControlEvent::RecordingStarted
            }
            (false, true) => {
                tracing::info!("performance over, stopping recorder");
                self.transport.stop()?;
                ControlEvent::RecordingStopped
            }
            _ => ControlEvent::Idle,
        };
        self.refresh_indicator();
        Ok(event)
    }

    /// Runs until `cancel` is raised, then leaves the deck stopped.
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<()> {
        while !cancel.load(Ordering::Relaxed) {
            self.step()?;
            self.clock.sleep(self.poll_interval);
        }
        if self.transport.is_recording() {
            tracing::info!("shutting down while recording, stopping deck");
            self.transport.stop()?;
        }
        Ok(())
    }

    fn refresh_indicator(&mut self) {
        if let Some(indicator) = self.indicator.as_mut() {
            let snapshot = StatusSnapshot {
                deck: self.transport.state(),
                beam_intensity: self.activity.beam_intensity(),
                sound_level: self.activity.sound_level(),
            };
            indicator.render(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    use crate::error::RecorderError;
    use crate::hal::sim::{ManualClock, SimLamp};

    struct FakeActivity {
        playing: VecDeque<bool>,
    }

    impl FakeActivity {
        fn new(playing: impl IntoIterator<Item = bool>) -> Self {
            Self {
                playing: playing.into_iter().collect(),
            }
        }
    }

    impl ActivitySource for FakeActivity {
        fn is_playing(&mut self) -> bool {
            self.playing.pop_front().unwrap_or(false)
        }

        fn beam_intensity(&mut self) -> i32 {
            400
        }

        fn sound_level(&self) -> f64 {
            0.0
        }
    }

    struct FakeTransport {
        state: DeckState,
        fail_next: bool,
        records: u32,
        stops: u32,
    }

    impl FakeTransport {
        fn stopped() -> Self {
            Self {
                state: DeckState::Stopped,
                fail_next: false,
                records: 0,
                stops: 0,
            }
        }
    }

    impl Transport for FakeTransport {
        fn state(&self) -> DeckState {
            self.state
        }

        fn is_recording(&self) -> bool {
            self.state == DeckState::Recording
        }

        fn record(&mut self) -> Result<()> {
            if self.fail_next {
                return Err(RecorderError::DeckUnresponsive {
                    target: DeckState::Recording,
                    attempts: 1,
                    observed: self.state,
                });
            }
            self.records += 1;
            self.state = DeckState::Recording;
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.stops += 1;
            self.state = DeckState::Stopped;
            Ok(())
        }
    }

    fn orchestrator(
        activity: FakeActivity,
        transport: FakeTransport,
    ) -> Orchestrator<FakeActivity, FakeTransport, ManualClock, SimLamp> {
        Orchestrator::new(
            activity,
            transport,
            ManualClock::new(),
            Duration::from_millis(100),
        )
    }

    #[test]
    fn starts_recording_on_activity_onset() {
        let mut orch = orchestrator(FakeActivity::new([true]), FakeTransport::stopped());
        assert_eq!(orch.step().unwrap(), ControlEvent::RecordingStarted);
        assert_eq!(orch.transport.records, 1);
    }

    #[test]
    fn stops_recording_once_activity_ends() {
        let mut orch = orchestrator(
            FakeActivity::new([true, true, false]),
            FakeTransport::stopped(),
        );
        assert_eq!(orch.step().unwrap(), ControlEvent::RecordingStarted);
        assert_eq!(orch.step().unwrap(), ControlEvent::Idle);
        assert_eq!(orch.step().unwrap(), ControlEvent::RecordingStopped);
        assert_eq!(orch.transport.stops, 1);
    }

    #[test]
    fn idle_when_nothing_changes() {
        let mut orch = orchestrator(FakeActivity::new([false]), FakeTransport::stopped());
        assert_eq!(orch.step().unwrap(), ControlEvent::Idle);
        assert_eq!(orch.transport.records, 0);
        assert_eq!(orch.transport.stops, 0);
    }

    #[test]
    fn deck_failures_propagate() {
        let mut transport = FakeTransport::stopped();
        transport.fail_next = true;
        let mut orch = orchestrator(FakeActivity::new([true]), transport);
        assert!(matches!(
            orch.step(),
            Err(RecorderError::DeckUnresponsive { .. })
        ));
    }

    #[test]
    fn run_honours_cancellation_and_stops_deck() {
        let mut transport = FakeTransport::stopped();
        transport.state = DeckState::Recording;
        let mut orch = orchestrator(FakeActivity::new([]), transport);
        let cancel = AtomicBool::new(true);
        orch.run(&cancel).unwrap();
        assert_eq!(orch.transport.state, DeckState::Stopped);
    }

    #[test]
    fn full_session_with_real_components() {
        use crate::deck::{DeckConfig, DeckController};
        use crate::detector::ActivityDetector;
        use crate::hal::sim::{ScriptedAdc, SharedLine, SimDeck};
        use crate::sensor::{BeamCalibration, BeamSensor};

        let clock = ManualClock::new();
        // One occlusion burst, then the beam reads clear forever.
        let occlusion: Vec<i32> = [50, 20, 15, 10, 12, 11, 9, 14, 13, 16, 10]
            .iter()
            .flat_map(|d| [0, *d])
            .collect();
        let beam = BeamSensor::new(
            SharedLine::high(),
            ScriptedAdc::new(occlusion).with_tail([0, 400]),
            BeamCalibration::default(),
        );
        let detector: ActivityDetector<_, _, ScriptedAdc, _> =
            ActivityDetector::new(beam, clock.clone(), Duration::from_secs(30));
        let sim = SimDeck::new(DeckState::Stopped);
        let deck = DeckController::new(sim.lines(), clock.clone(), DeckConfig::default());
        let mut orch = Orchestrator::<_, _, _, SimLamp>::new(
            detector,
            deck,
            clock.clone(),
            Duration::from_millis(100),
        );

        assert_eq!(orch.step().unwrap(), ControlEvent::RecordingStarted);
        assert_eq!(sim.mode(), DeckState::Recording);
        assert_eq!(orch.step().unwrap(), ControlEvent::Idle);
        clock.advance(Duration::from_secs(31));
        assert_eq!(orch.step().unwrap(), ControlEvent::RecordingStopped);
        assert_eq!(sim.mode(), DeckState::Stopped);
    }

    #[test]
    fn indicator_is_refreshed_each_step() {
        let lamps = [SimLamp::new(), SimLamp::new(), SimLamp::new(), SimLamp::new()];
        let indicator = StatusIndicator::new(
            lamps[0].clone(),
            lamps[1].clone(),
            lamps[2].clone(),
            lamps[3].clone(),
        );
        let mut orch = orchestrator(FakeActivity::new([true]), FakeTransport::stopped())
            .with_indicator(indicator);
        orch.step().unwrap();
        assert_eq!(lamps[0].last(), u8::MAX); // recording lamp
        assert_eq!(lamps[2].last(), (400u16 >> 4) as u8); // beam brightness
    }
}
