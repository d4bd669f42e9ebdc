use std::fmt;
use std::time::Duration;

use tracing::{debug, info};

use crate::clock::SessionClock;
use crate::error::InvalidConfigError;
use crate::feedback::{Cue, FeedbackEmitter};
use crate::phase::{circle_scale, Phase, PhaseMachine, Transition};
use crate::scoring::{AttemptRecord, ScoreState, ScoringWindows};
use crate::session::SessionConfig;

/// What to do with an action that arrives before any session is running.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum IdleActionPolicy {
    /// start a session with the default config; nothing is scored
    #[default]
    AutoStart,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionOutcome {
    Started,
    Scored(AttemptRecord),
    Ignored,
}

type CompletionCallback = Box<dyn FnMut(u8) + Send>;

/// A paced breathing session: phase timing, action scoring and cues.
///
/// Every mutation goes through `&mut self`, so a host that drives ticks and
/// input from different threads has to put the engine behind one lock.
pub struct Breather {
    default_config: SessionConfig,
    machine: PhaseMachine,
    clock: SessionClock,
    score: ScoreState,
    windows: ScoringWindows,
    feedback: FeedbackEmitter,
    idle_policy: IdleActionPolicy,
    final_score: Option<u8>,
    on_complete: Option<CompletionCallback>,
}

impl Breather {
    pub fn new(default_config: SessionConfig) -> Result<Self, InvalidConfigError> {
        default_config.validate()?;
        Ok(Self {
            default_config,
            machine: PhaseMachine::new(),
            clock: SessionClock::new(),
            score: ScoreState::new(),
            windows: ScoringWindows::default(),
            feedback: FeedbackEmitter::silent(),
            idle_policy: IdleActionPolicy::default(),
            final_score: None,
            on_complete: None,
        })
    }

    pub fn with_feedback(mut self, feedback: FeedbackEmitter) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_clock(mut self, clock: SessionClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_windows(mut self, windows: ScoringWindows) -> Self {
        self.windows = windows;
        self
    }

    pub fn set_idle_action_policy(&mut self, policy: IdleActionPolicy) {
        self.idle_policy = policy;
    }

    /// Config used when an idle action starts a session.
    pub fn set_default_config(&mut self, config: SessionConfig) -> Result<(), InvalidConfigError> {
        config.validate()?;
        self.default_config = config;
        Ok(())
    }

    /// Called with the final score once per completed session.
    pub fn on_complete<F>(&mut self, callback: F)
    where
        F: FnMut(u8) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
    }

    pub fn feedback_mut(&mut self) -> &mut FeedbackEmitter {
        &mut self.feedback
    }

    pub fn feedback(&self) -> &FeedbackEmitter {
        &self.feedback
    }

    pub fn start(&mut self, config: SessionConfig) -> Result<(), InvalidConfigError> {
        self.machine.start(config)?;
        self.score = ScoreState::new();
        self.final_score = None;
        self.clock.rebase();
        info!(
            cycles = config.target_cycles,
            cycle_secs = config.durations.cycle_secs(),
            "breathing session started"
        );
        self.feedback.emit(Cue::SessionStarted);
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.machine.is_running() && !self.machine.is_paused() {
            debug!(phase = %self.machine.phase(), "paused");
        }
        self.machine.pause();
    }

    pub fn resume(&mut self) {
        if self.machine.is_paused() {
            debug!(phase = %self.machine.phase(), "resumed");
            self.clock.rebase();
        }
        self.machine.resume();
    }

    pub fn toggle_pause(&mut self) {
        if self.machine.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }

    pub fn reset(&mut self) {
        self.machine.reset();
        self.score = ScoreState::new();
        self.final_score = None;
        self.clock.rebase();
    }

    /// Feed the current time in. Returns the phase transitions it caused.
    pub fn tick(&mut self, now: Duration) -> Vec<Transition> {
        if !self.machine.is_running() || self.machine.is_paused() {
            return Vec::new();
        }
        let Some(delta) = self.clock.tick(now) else {
            return Vec::new();
        };

        let transitions = self.machine.advance(delta);
        for transition in &transitions {
            self.feedback.emit(Cue::PhaseEntered(transition.to));
        }
        if self.machine.is_complete() {
            self.finish();
        }
        transitions
    }

    /// Player pressed the action key.
    pub fn register_action(&mut self) -> ActionOutcome {
        if self.machine.is_complete() || self.machine.is_paused() {
            return ActionOutcome::Ignored;
        }
        if !self.machine.is_running() {
            return match self.idle_policy {
                IdleActionPolicy::AutoStart => match self.start(self.default_config) {
                    Ok(()) => ActionOutcome::Started,
                    Err(_) => ActionOutcome::Ignored,
                },
                IdleActionPolicy::Ignore => ActionOutcome::Ignored,
            };
        }

        let state = self.machine.state();
        let record = self.score.record(
            state.session_elapsed,
            state.phase,
            state.elapsed_in_phase,
            &self.windows,
        );
        debug!(
            phase = %record.phase,
            deviation = record.deviation_secs,
            points = record.points_awarded,
            "action scored"
        );
        self.feedback.emit(Cue::ActionScored(record.points_awarded));
        ActionOutcome::Scored(record)
    }

    fn finish(&mut self) {
        if self.final_score.is_some() {
            return;
        }
        let final_score = self.score.final_score();
        self.final_score = Some(final_score);
        info!(
            final_score,
            attempts = self.score.attempts().len(),
            raw_points = self.score.raw_points(),
            "breathing session complete"
        );
        if let Some(callback) = self.on_complete.as_mut() {
            callback(final_score);
        }
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.machine.config()
    }

    pub fn default_config(&self) -> &SessionConfig {
        &self.default_config
    }

    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    pub fn elapsed_in_phase(&self) -> f64 {
        self.machine.elapsed_in_phase()
    }

    pub fn remaining_in_phase(&self) -> f64 {
        self.machine.remaining_in_phase()
    }

    pub fn completed_cycles(&self) -> u32 {
        self.machine.completed_cycles()
    }

    pub fn current_cycle(&self) -> u32 {
        self.machine.current_cycle()
    }

    pub fn target_cycles(&self) -> u32 {
        self.config()
            .unwrap_or(&self.default_config)
            .target_cycles
    }

    /// Running score, or the final score once the session has completed.
    pub fn score(&self) -> u32 {
        self.final_score
            .map_or_else(|| self.score.points(), u32::from)
    }

    pub fn raw_points(&self) -> u32 {
        self.score.raw_points()
    }

    pub fn engagement_bonus(&self) -> u32 {
        self.score.engagement_bonus()
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        self.score.attempts()
    }

    pub fn intensity(&self) -> f64 {
        self.machine.intensity()
    }

    pub fn circle_scale(&self) -> f64 {
        circle_scale(self.intensity())
    }

    pub fn progress(&self) -> f64 {
        self.machine.progress()
    }

    pub fn final_score(&self) -> Option<u8> {
        self.final_score
    }

    pub fn is_running(&self) -> bool {
        self.machine.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.machine.is_paused()
    }

    pub fn is_complete(&self) -> bool {
        self.machine.is_complete()
    }

    pub fn is_idle(&self) -> bool {
        self.machine.phase() == Phase::Idle
    }
}

impl fmt::Debug for Breather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Breather")
            .field("default_config", &self.default_config)
            .field("machine", &self.machine)
            .field("score", &self.score)
            .field("feedback", &self.feedback)
            .field("idle_policy", &self.idle_policy)
            .field("final_score", &self.final_score)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{Emission, RecordingSink};
    use crate::session::{PhaseDurations, Preset};
    use assert_matches::assert_matches;
    use std::sync::{Arc, Mutex};

    fn relax_once() -> SessionConfig {
        SessionConfig::new(PhaseDurations::new(4.0, 2.0, 6.0, 2.0), 1)
    }

    fn secs(v: f64) -> Duration {
        Duration::from_secs_f64(v)
    }

    /// Ticks from `from` to `to` seconds in `step` increments, the first tick
    /// only establishing the clock reference.
    fn run(b: &mut Breather, from: f64, to: f64, step: f64) -> Vec<Transition> {
        let mut out = Vec::new();
        let mut t = from;
        while t <= to {
            out.extend(b.tick(secs(t)));
            t += step;
        }
        out
    }

    #[test]
    fn test_new_rejects_invalid_default() {
        let bad = SessionConfig::new(PhaseDurations::new(4.0, 2.0, 6.0, 2.0), 0);
        assert_matches!(Breather::new(bad), Err(InvalidConfigError::ZeroCycles));
    }

    #[test]
    fn test_start_invalid_keeps_previous_session() {
        let mut b = Breather::new(relax_once()).unwrap();
        b.start(relax_once()).unwrap();
        b.tick(secs(0.0));
        b.tick(secs(0.5));

        let bad = SessionConfig::new(PhaseDurations::new(-1.0, 2.0, 6.0, 2.0), 1);
        assert!(b.start(bad).is_err());
        assert_eq!(b.phase(), Phase::Inhale);
        assert_eq!(b.elapsed_in_phase(), 0.5);
    }

    #[test]
    fn test_first_tick_applies_no_delta() {
        let mut b = Breather::new(relax_once()).unwrap();
        b.start(relax_once()).unwrap();
        assert!(b.tick(secs(100.0)).is_empty());
        assert_eq!(b.elapsed_in_phase(), 0.0);
        b.tick(secs(100.5));
        assert_eq!(b.elapsed_in_phase(), 0.5);
    }

    #[test]
    fn test_tick_ignored_when_idle() {
        let mut b = Breather::new(relax_once()).unwrap();
        assert!(b.tick(secs(0.0)).is_empty());
        assert!(b.tick(secs(1.0)).is_empty());
        assert_eq!(b.phase(), Phase::Idle);
    }

    #[test]
    fn test_resume_rebases_clock() {
        let mut b = Breather::new(relax_once()).unwrap();
        b.start(relax_once()).unwrap();
        b.tick(secs(0.0));
        b.tick(secs(1.0));
        b.pause();
        b.tick(secs(1.5));
        b.resume();
        // the paused span must not count
        b.tick(secs(1.8));
        b.tick(secs(2.0));
        assert!((b.elapsed_in_phase() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_idle_action_auto_starts() {
        let mut b = Breather::new(relax_once()).unwrap();
        assert_eq!(b.register_action(), ActionOutcome::Started);
        assert!(b.is_running());
        assert_eq!(b.phase(), Phase::Inhale);
        assert!(b.attempts().is_empty());
        assert_eq!(b.score(), 0);
    }

    #[test]
    fn test_idle_action_ignored_by_policy() {
        let mut b = Breather::new(relax_once()).unwrap();
        b.set_idle_action_policy(IdleActionPolicy::Ignore);
        assert_eq!(b.register_action(), ActionOutcome::Ignored);
        assert!(!b.is_running());
    }

    #[test]
    fn test_paused_action_is_noop() {
        let mut b = Breather::new(relax_once()).unwrap();
        b.start(relax_once()).unwrap();
        b.pause();
        assert_eq!(b.register_action(), ActionOutcome::Ignored);
        assert!(b.attempts().is_empty());
    }

    #[test]
    fn test_action_scores_current_phase() {
        let mut b = Breather::new(relax_once()).unwrap();
        b.start(relax_once()).unwrap();
        b.tick(secs(0.0));
        b.tick(secs(1.0));
        let outcome = b.register_action();
        assert_matches!(outcome, ActionOutcome::Scored(rec) => {
            assert_eq!(rec.phase, Phase::Inhale);
            assert_eq!(rec.deviation_secs, 1.0);
            assert_eq!(rec.points_awarded, 6);
            assert_eq!(rec.timestamp_offset, 1.0);
        });
        assert_eq!(b.score(), 6);
    }

    #[test]
    fn test_completion_reports_once() {
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reported);

        let mut b = Breather::new(relax_once()).unwrap();
        b.on_complete(move |score| sink.lock().unwrap().push(score));
        b.start(relax_once()).unwrap();
        run(&mut b, 0.0, 20.0, 0.5);

        assert!(b.is_complete());
        assert_eq!(b.final_score(), Some(0));
        assert_eq!(*reported.lock().unwrap(), vec![0]);

        // no further scoring or reporting after completion
        assert_eq!(b.register_action(), ActionOutcome::Ignored);
        run(&mut b, 20.5, 30.0, 0.5);
        assert_eq!(reported.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_each_session_reports_once() {
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        let cfg = SessionConfig::from_preset(Preset::Energize, 1);

        let mut b = Breather::new(cfg).unwrap();
        b.on_complete(move |_| *counter.lock().unwrap() += 1);

        b.start(cfg).unwrap();
        b.tick(secs(0.0));
        for i in 1..=8 {
            b.tick(secs(i as f64));
        }
        b.reset();
        assert_eq!(b.final_score(), None);
        b.start(cfg).unwrap();
        b.tick(secs(50.0));
        for i in 1..=8 {
            b.tick(secs(50.0 + i as f64));
        }
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut b = Breather::new(relax_once()).unwrap();
        b.start(relax_once()).unwrap();
        b.tick(secs(0.0));
        b.tick(secs(0.5));
        b.register_action();
        b.reset();
        assert_eq!(b.phase(), Phase::Idle);
        assert!(b.attempts().is_empty());
        assert_eq!(b.score(), 0);
        assert_eq!(b.completed_cycles(), 0);
        assert!(b.config().is_none());
    }

    #[test]
    fn test_feedback_per_transition() {
        let sink = RecordingSink::new();
        let mut emitter = FeedbackEmitter::new(Box::new(sink.clone()));
        emitter.haptics_enabled = false;

        let cfg = SessionConfig::from_preset(Preset::Box, 1);
        let mut b = Breather::new(cfg).unwrap().with_feedback(emitter);
        b.start(cfg).unwrap();
        b.tick(secs(0.0));
        // 1s steps across 16s: start cue plus four transitions
        for i in 1..=16 {
            b.tick(secs(i as f64));
        }
        let tones: Vec<f64> = sink
            .emissions()
            .into_iter()
            .filter_map(|e| match e {
                Emission::Tone(t) => Some(t.frequency_hz),
                Emission::Pulse(_) => None,
            })
            .collect();
        assert_eq!(tones, vec![680.0, 480.0, 420.0, 480.0, 540.0]);
    }

    #[test]
    fn test_observers_before_start() {
        let b = Breather::new(relax_once()).unwrap();
        assert!(b.is_idle());
        assert_eq!(b.target_cycles(), 1);
        assert_eq!(b.intensity(), 0.0);
        assert_eq!(b.progress(), 0.0);
        assert_eq!(b.remaining_in_phase(), 0.0);
    }
}
