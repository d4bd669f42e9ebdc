use serde::{Deserialize, Serialize};

use crate::error::InvalidConfigError;
use crate::session::SessionConfig;

/// Smallest and largest breathing circle scale shown by the front end.
pub const MIN_CIRCLE_SCALE: f64 = 0.72;
pub const MAX_CIRCLE_SCALE: f64 = 1.18;

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Inhale,
    Hold1,
    Exhale,
    Hold2,
    Complete,
}

impl Phase {
    /// The four phases of a cycle, in order.
    pub const ACTIVE: [Phase; 4] = [Phase::Inhale, Phase::Hold1, Phase::Exhale, Phase::Hold2];

    /// Position within the cycle, `None` for Idle and Complete.
    pub fn index(&self) -> Option<usize> {
        Self::ACTIVE.iter().position(|p| p == self)
    }

    /// Successor within the breathing cycle. Hold2 wraps to Inhale; the
    /// machine decides separately whether the session is complete instead.
    pub fn next(&self) -> Phase {
        match self {
            Phase::Idle => Phase::Inhale,
            Phase::Inhale => Phase::Hold1,
            Phase::Hold1 => Phase::Exhale,
            Phase::Exhale => Phase::Hold2,
            Phase::Hold2 => Phase::Inhale,
            Phase::Complete => Phase::Complete,
        }
    }

    /// Inhale and Exhale are the phases where breathing direction changes.
    pub fn is_breathing(&self) -> bool {
        matches!(self, Phase::Inhale | Phase::Exhale)
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Phase::Hold1 | Phase::Hold2)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "Ready",
            Phase::Inhale => "Inhale",
            Phase::Hold1 | Phase::Hold2 => "Hold",
            Phase::Exhale => "Exhale",
            Phase::Complete => "Complete",
        }
    }
}

/// A single phase change crossed during `advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
    pub cycle_completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    /// seconds since the current phase began
    pub elapsed_in_phase: f64,
    pub completed_cycles: u32,
    pub running: bool,
    pub paused: bool,
    /// seconds advanced since the session started
    pub session_elapsed: f64,
}

/// Cycles a session through inhale, hold, exhale, hold until the target
/// cycle count is reached.
#[derive(Debug, Clone, Default)]
pub struct PhaseMachine {
    config: Option<SessionConfig>,
    state: SessionState,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, config: SessionConfig) -> Result<(), InvalidConfigError> {
        config.validate()?;
        self.config = Some(config);
        self.state = SessionState {
            phase: Phase::Inhale,
            running: true,
            ..SessionState::default()
        };
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state.running {
            self.state.paused = true;
        }
    }

    pub fn resume(&mut self) {
        if self.state.running {
            self.state.paused = false;
        }
    }

    pub fn reset(&mut self) {
        self.config = None;
        self.state = SessionState::default();
    }

    /// Move time forward by `delta` seconds.
    ///
    /// Every boundary the delta crosses yields its own [`Transition`]; the
    /// overshoot carries into the next phase. Non-finite or negative deltas
    /// count as zero. Does nothing while idle, paused or complete.
    pub fn advance(&mut self, delta: f64) -> Vec<Transition> {
        let mut transitions = Vec::new();
        let Some(config) = self.config else {
            return transitions;
        };
        if !self.is_advancing() {
            return transitions;
        }

        let delta = if delta.is_finite() && delta > 0.0 {
            delta
        } else {
            0.0
        };
        self.state.elapsed_in_phase += delta;
        self.state.session_elapsed += delta;

        let mut budget = self.remaining_phases();
        while budget > 0 && self.state.running {
            let Some(duration) = config.durations.get(self.state.phase) else {
                break;
            };
            if self.state.elapsed_in_phase < duration {
                break;
            }
            self.state.elapsed_in_phase -= duration;
            transitions.push(self.transition(config.target_cycles));
            budget -= 1;
        }

        transitions
    }

    fn transition(&mut self, target_cycles: u32) -> Transition {
        let from = self.state.phase;
        let mut cycle_completed = false;
        let to = if from == Phase::Hold2 {
            self.state.completed_cycles += 1;
            cycle_completed = true;
            if self.state.completed_cycles >= target_cycles {
                Phase::Complete
            } else {
                Phase::Inhale
            }
        } else {
            from.next()
        };

        self.state.phase = to;
        if to == Phase::Complete {
            // overshoot past the last boundary is not part of the session
            self.state.session_elapsed -= self.state.elapsed_in_phase;
            self.state.elapsed_in_phase = 0.0;
            self.state.running = false;
            self.state.paused = false;
        }

        Transition {
            from,
            to,
            cycle_completed,
        }
    }

    /// Phase boundaries left before the session completes.
    fn remaining_phases(&self) -> u32 {
        let (Some(config), Some(idx)) = (self.config, self.state.phase.index()) else {
            return 0;
        };
        let cycles_left = config.target_cycles.saturating_sub(self.state.completed_cycles);
        (cycles_left * Phase::ACTIVE.len() as u32).saturating_sub(idx as u32)
    }

    fn is_advancing(&self) -> bool {
        self.state.running && !self.state.paused
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn elapsed_in_phase(&self) -> f64 {
        self.state.elapsed_in_phase
    }

    pub fn completed_cycles(&self) -> u32 {
        self.state.completed_cycles
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn is_complete(&self) -> bool {
        self.state.phase == Phase::Complete
    }

    pub fn phase_duration(&self) -> Option<f64> {
        self.config
            .and_then(|config| config.durations.get(self.state.phase))
    }

    pub fn remaining_in_phase(&self) -> f64 {
        self.phase_duration()
            .map_or(0.0, |d| (d - self.state.elapsed_in_phase).max(0.0))
    }

    /// 1-based cycle currently being breathed, capped at the target.
    pub fn current_cycle(&self) -> u32 {
        match self.config {
            Some(config) => (self.state.completed_cycles + 1).min(config.target_cycles),
            None => 0,
        }
    }

    /// Fraction of the session covered, by whole phases.
    pub fn progress(&self) -> f64 {
        if self.is_complete() {
            return 1.0;
        }
        match (self.config, self.state.phase.index()) {
            (Some(config), Some(idx)) => {
                let done = self.state.completed_cycles as f64 + idx as f64 / 4.0;
                (done / config.target_cycles as f64).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    pub fn intensity(&self) -> f64 {
        intensity(
            self.state.phase,
            self.state.elapsed_in_phase,
            self.phase_duration().unwrap_or_default(),
        )
    }
}

/// How far the breathing circle should be expanded, in `[0, 1]`.
///
/// Inhale eases out towards 1, exhale eases back down to 0 and the holds
/// keep whatever value the preceding breath ended on.
pub fn intensity(phase: Phase, elapsed_in_phase: f64, phase_duration: f64) -> f64 {
    let p = if phase_duration > 0.0 {
        (elapsed_in_phase / phase_duration).clamp(0.0, 1.0)
    } else {
        1.0
    };
    match phase {
        Phase::Inhale => 1.0 - (1.0 - p).powi(3),
        Phase::Exhale => (1.0 - p).powi(3),
        Phase::Hold1 => 1.0,
        Phase::Hold2 | Phase::Idle | Phase::Complete => 0.0,
    }
}

pub fn circle_scale(intensity: f64) -> f64 {
    MIN_CIRCLE_SCALE + (MAX_CIRCLE_SCALE - MIN_CIRCLE_SCALE) * intensity.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{PhaseDurations, Preset};

    fn relax_once() -> SessionConfig {
        SessionConfig::new(PhaseDurations::new(4.0, 2.0, 6.0, 2.0), 1)
    }

    fn started(config: SessionConfig) -> PhaseMachine {
        let mut pm = PhaseMachine::new();
        pm.start(config).unwrap();
        pm
    }

    #[test]
    fn test_new_machine_is_idle() {
        let pm = PhaseMachine::new();
        assert_eq!(pm.phase(), Phase::Idle);
        assert!(!pm.is_running());
        assert!(!pm.is_paused());
        assert_eq!(pm.current_cycle(), 0);
        assert_eq!(pm.progress(), 0.0);
    }

    #[test]
    fn test_start_enters_inhale() {
        let pm = started(relax_once());
        assert_eq!(pm.phase(), Phase::Inhale);
        assert!(pm.is_running());
        assert_eq!(pm.elapsed_in_phase(), 0.0);
        assert_eq!(pm.completed_cycles(), 0);
        assert_eq!(pm.current_cycle(), 1);
    }

    #[test]
    fn test_start_with_invalid_config_leaves_state_untouched() {
        let mut pm = started(relax_once());
        pm.advance(1.0);
        let before = pm.state().clone();

        let bad = SessionConfig::new(PhaseDurations::new(0.0, 2.0, 6.0, 2.0), 1);
        assert!(pm.start(bad).is_err());
        assert_eq!(pm.state(), &before);
        assert_eq!(pm.config(), Some(&relax_once()));
    }

    #[test]
    fn test_advance_within_phase() {
        let mut pm = started(relax_once());
        let transitions = pm.advance(1.5);
        assert!(transitions.is_empty());
        assert_eq!(pm.phase(), Phase::Inhale);
        assert_eq!(pm.elapsed_in_phase(), 1.5);
        assert_eq!(pm.remaining_in_phase(), 2.5);
    }

    #[test]
    fn test_advance_carries_overshoot() {
        let mut pm = started(relax_once());
        let transitions = pm.advance(4.5);
        assert_eq!(
            transitions,
            vec![Transition {
                from: Phase::Inhale,
                to: Phase::Hold1,
                cycle_completed: false
            }]
        );
        assert_eq!(pm.elapsed_in_phase(), 0.5);
    }

    #[test]
    fn test_large_delta_yields_each_transition() {
        // box breathing: every phase is 4s, so 12s crosses three boundaries
        let mut pm = started(SessionConfig::from_preset(Preset::Box, 2));
        let transitions = pm.advance(12.0);
        let entered: Vec<Phase> = transitions.iter().map(|t| t.to).collect();
        assert_eq!(entered, vec![Phase::Hold1, Phase::Exhale, Phase::Hold2]);
        assert_eq!(pm.phase(), Phase::Hold2);
        assert_eq!(pm.elapsed_in_phase(), 0.0);
    }

    #[test]
    fn test_huge_delta_bounded_by_session() {
        let mut pm = started(SessionConfig::from_preset(Preset::Box, 2));
        let transitions = pm.advance(1_000.0);
        assert_eq!(transitions.len(), 8);
        assert_eq!(transitions.iter().filter(|t| t.cycle_completed).count(), 2);
        assert_eq!(transitions.last().map(|t| t.to), Some(Phase::Complete));
        assert!(pm.is_complete());
        assert!(!pm.is_running());
        assert_eq!(pm.completed_cycles(), 2);
        assert_eq!(pm.state().session_elapsed, 32.0);
    }

    #[test]
    fn test_phase_order_over_several_cycles() {
        let mut pm = started(SessionConfig::from_preset(Preset::Energize, 3));
        let mut entered = vec![pm.phase()];
        for _ in 0..200 {
            for t in pm.advance(0.25) {
                assert_eq!(t.from, *entered.last().unwrap());
                entered.push(t.to);
            }
        }
        let expected: Vec<Phase> = std::iter::once(Phase::Inhale)
            .chain(
                (0..3)
                    .flat_map(|_| [Phase::Hold1, Phase::Exhale, Phase::Hold2, Phase::Inhale])
                    .take(11),
            )
            .chain(std::iter::once(Phase::Complete))
            .collect();
        assert_eq!(entered, expected);
    }

    #[test]
    fn test_hold2_wraps_and_counts_cycle() {
        let mut pm = started(SessionConfig::from_preset(Preset::Relax, 2));
        let transitions = pm.advance(14.0);
        let last = transitions.last().copied().unwrap();
        assert_eq!(last.from, Phase::Hold2);
        assert_eq!(last.to, Phase::Inhale);
        assert!(last.cycle_completed);
        assert_eq!(pm.completed_cycles(), 1);
        assert_eq!(pm.current_cycle(), 2);
        assert!(pm.is_running());
    }

    #[test]
    fn test_complete_is_terminal() {
        let mut pm = started(relax_once());
        pm.advance(14.0);
        assert!(pm.is_complete());
        assert!(pm.advance(100.0).is_empty());
        assert_eq!(pm.phase(), Phase::Complete);
        assert_eq!(pm.current_cycle(), 1);
        assert_eq!(pm.progress(), 1.0);
    }

    #[test]
    fn test_paused_does_not_advance() {
        let mut pm = started(relax_once());
        pm.advance(1.0);
        pm.pause();
        assert!(pm.advance(10.0).is_empty());
        assert_eq!(pm.elapsed_in_phase(), 1.0);
        pm.resume();
        pm.advance(1.0);
        assert_eq!(pm.elapsed_in_phase(), 2.0);
    }

    #[test]
    fn test_pause_resume_idempotent() {
        let mut pm = started(relax_once());
        pm.pause();
        let once = pm.state().clone();
        pm.pause();
        assert_eq!(pm.state(), &once);

        pm.resume();
        let resumed = pm.state().clone();
        pm.resume();
        assert_eq!(pm.state(), &resumed);
    }

    #[test]
    fn test_pause_ignored_when_idle() {
        let mut pm = PhaseMachine::new();
        pm.pause();
        assert!(!pm.is_paused());
    }

    #[test]
    fn test_negative_and_nan_delta_ignored() {
        let mut pm = started(relax_once());
        assert!(pm.advance(-3.0).is_empty());
        assert!(pm.advance(f64::NAN).is_empty());
        assert_eq!(pm.elapsed_in_phase(), 0.0);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut pm = started(relax_once());
        pm.advance(7.0);
        pm.reset();
        assert_eq!(pm.phase(), Phase::Idle);
        assert_eq!(pm.completed_cycles(), 0);
        assert_eq!(pm.elapsed_in_phase(), 0.0);
        assert!(pm.config().is_none());
    }

    #[test]
    fn test_progress_by_phase() {
        let mut pm = started(SessionConfig::from_preset(Preset::Box, 2));
        pm.advance(8.0);
        assert_eq!(pm.phase(), Phase::Exhale);
        assert_eq!(pm.progress(), 0.25);
    }

    #[test]
    fn test_intensity_inhale_rises_concave() {
        let a = intensity(Phase::Inhale, 1.0, 4.0);
        let b = intensity(Phase::Inhale, 2.0, 4.0);
        let c = intensity(Phase::Inhale, 3.0, 4.0);
        assert_eq!(intensity(Phase::Inhale, 0.0, 4.0), 0.0);
        assert_eq!(intensity(Phase::Inhale, 4.0, 4.0), 1.0);
        assert!(a < b && b < c);
        // concave: early gains are larger than later ones
        assert!(b - a > c - b);
    }

    #[test]
    fn test_intensity_exhale_falls_convex() {
        let a = intensity(Phase::Exhale, 1.0, 4.0);
        let b = intensity(Phase::Exhale, 2.0, 4.0);
        let c = intensity(Phase::Exhale, 3.0, 4.0);
        assert_eq!(intensity(Phase::Exhale, 0.0, 4.0), 1.0);
        assert_eq!(intensity(Phase::Exhale, 4.0, 4.0), 0.0);
        assert!(a > b && b > c);
        assert!(a - b > b - c);
    }

    #[test]
    fn test_intensity_holds_pinned() {
        assert_eq!(intensity(Phase::Hold1, 0.3, 2.0), 1.0);
        assert_eq!(intensity(Phase::Hold2, 1.7, 2.0), 0.0);
        assert_eq!(intensity(Phase::Idle, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_circle_scale_range() {
        assert_eq!(circle_scale(0.0), MIN_CIRCLE_SCALE);
        assert_eq!(circle_scale(1.0), MAX_CIRCLE_SCALE);
        assert_eq!(circle_scale(7.0), MAX_CIRCLE_SCALE);
    }

    #[test]
    fn test_phase_helpers() {
        assert_eq!(Phase::Exhale.index(), Some(2));
        assert_eq!(Phase::Complete.index(), None);
        assert!(Phase::Inhale.is_breathing());
        assert!(!Phase::Hold1.is_breathing());
        assert!(Phase::Hold2.is_hold());
        assert_eq!(Phase::Hold1.label(), "Hold");
        assert_eq!(Phase::Hold1.to_string(), "hold1");
    }
}
