use serde::Serialize;

use crate::phase::Phase;

pub const MAX_SCORE: u32 = 100;
pub const PERFECT_POINTS: u32 = 10;
pub const GOOD_POINTS: u32 = 6;
pub const FAIR_POINTS: u32 = 3;
pub const TRANSITION_BONUS: u32 = 4;
pub const MAX_ENGAGEMENT_BONUS: u32 = 10;

/// Timing tolerances, in seconds after a phase starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWindows {
    pub perfect: f64,
    pub good: f64,
    /// catching the instant breathing direction flips
    pub transition: f64,
}

impl Default for ScoringWindows {
    fn default() -> Self {
        Self {
            perfect: 0.6,
            good: 1.2,
            transition: 0.12,
        }
    }
}

/// Points for an action taken `deviation` seconds into `phase`.
pub fn award(phase: Phase, deviation: f64, windows: &ScoringWindows) -> u32 {
    let base = if deviation <= windows.perfect {
        PERFECT_POINTS
    } else if deviation <= windows.good {
        GOOD_POINTS
    } else if deviation <= windows.good * 2.0 {
        FAIR_POINTS
    } else {
        0
    };

    if phase.is_breathing() && deviation <= windows.transition {
        base + TRANSITION_BONUS
    } else {
        base
    }
}

/// One scored user action. Never modified once logged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttemptRecord {
    /// seconds since session start
    pub timestamp_offset: f64,
    pub phase: Phase,
    pub deviation_secs: f64,
    pub points_awarded: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreState {
    raw_points: u32,
    attempts: Vec<AttemptRecord>,
}

impl ScoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score an action and append it to the attempt log.
    pub fn record(
        &mut self,
        timestamp_offset: f64,
        phase: Phase,
        elapsed_in_phase: f64,
        windows: &ScoringWindows,
    ) -> AttemptRecord {
        let deviation_secs = elapsed_in_phase.max(0.0);
        let record = AttemptRecord {
            timestamp_offset,
            phase,
            deviation_secs,
            points_awarded: award(phase, deviation_secs, windows),
        };
        self.raw_points = self.raw_points.saturating_add(record.points_awarded);
        self.attempts.push(record);
        record
    }

    /// Running total as shown to the player.
    pub fn points(&self) -> u32 {
        self.raw_points.min(MAX_SCORE)
    }

    /// Unclamped accumulated points.
    pub fn raw_points(&self) -> u32 {
        self.raw_points
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    pub fn engagement_bonus(&self) -> u32 {
        MAX_ENGAGEMENT_BONUS.min(self.attempts.len() as u32 / 2)
    }

    pub fn final_score(&self) -> u8 {
        let total = self.raw_points.saturating_add(self.engagement_bonus());
        total.min(MAX_SCORE) as u8
    }
}
