use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::InvalidConfigError;
use crate::phase::Phase;

pub const DEFAULT_CYCLES: u32 = 6;

/// Seconds spent in each phase of one breathing cycle, in cycle order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub inhale: f64,
    pub hold1: f64,
    pub exhale: f64,
    pub hold2: f64,
}

impl PhaseDurations {
    pub fn new(inhale: f64, hold1: f64, exhale: f64, hold2: f64) -> Self {
        Self {
            inhale,
            hold1,
            exhale,
            hold2,
        }
    }

    /// Configured duration of an active phase. Idle and Complete have none.
    pub fn get(&self, phase: Phase) -> Option<f64> {
        match phase {
            Phase::Inhale => Some(self.inhale),
            Phase::Hold1 => Some(self.hold1),
            Phase::Exhale => Some(self.exhale),
            Phase::Hold2 => Some(self.hold2),
            Phase::Idle | Phase::Complete => None,
        }
    }

    pub fn cycle_secs(&self) -> f64 {
        self.inhale + self.hold1 + self.exhale + self.hold2
    }
}

/// Named breathing patterns
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    ValueEnum,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Preset {
    /// calming long exhale
    #[default]
    Relax,
    /// equal four-count box breathing
    Box,
    /// faster, shorter holds
    Energize,
}

impl Preset {
    pub fn durations(&self) -> PhaseDurations {
        match self {
            Preset::Relax => PhaseDurations::new(4.0, 2.0, 6.0, 2.0),
            Preset::Box => PhaseDurations::new(4.0, 4.0, 4.0, 4.0),
            Preset::Energize => PhaseDurations::new(2.5, 1.0, 2.5, 1.0),
        }
    }
}

/// Parameters fixed for the lifetime of one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub durations: PhaseDurations,
    pub target_cycles: u32,
}

impl SessionConfig {
    pub fn new(durations: PhaseDurations, target_cycles: u32) -> Self {
        Self {
            durations,
            target_cycles,
        }
    }

    pub fn from_preset(preset: Preset, target_cycles: u32) -> Self {
        Self::new(preset.durations(), target_cycles)
    }

    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        for phase in Phase::ACTIVE {
            let secs = self.durations.get(phase).unwrap_or_default();
            // written so that NaN is rejected too
            if !(secs.is_finite() && secs > 0.0) {
                return Err(InvalidConfigError::NonPositiveDuration { phase, secs });
            }
        }
        if self.target_cycles == 0 {
            return Err(InvalidConfigError::ZeroCycles);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_preset(Preset::default(), DEFAULT_CYCLES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_preset_durations() {
        assert_eq!(Preset::Relax.durations(), PhaseDurations::new(4.0, 2.0, 6.0, 2.0));
        assert_eq!(Preset::Box.durations().cycle_secs(), 16.0);
        assert_eq!(Preset::Energize.durations().cycle_secs(), 7.0);
    }

    #[test]
    fn test_preset_display() {
        assert_eq!(Preset::Relax.to_string(), "relax");
        assert_eq!(Preset::Box.to_string(), "box");
        assert_eq!(Preset::Energize.to_string(), "energize");
    }

    #[test]
    fn test_default_config_is_valid() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.target_cycles, DEFAULT_CYCLES);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_durations_get() {
        let d = Preset::Relax.durations();
        assert_eq!(d.get(Phase::Exhale), Some(6.0));
        assert_eq!(d.get(Phase::Idle), None);
        assert_eq!(d.get(Phase::Complete), None);
    }

    #[test]
    fn test_validate_rejects_non_positive_duration() {
        let cfg = SessionConfig::new(PhaseDurations::new(4.0, 0.0, 6.0, 2.0), 1);
        assert_matches!(
            cfg.validate(),
            Err(InvalidConfigError::NonPositiveDuration { phase: Phase::Hold1, .. })
        );

        let cfg = SessionConfig::new(PhaseDurations::new(4.0, 2.0, -1.0, 2.0), 1);
        assert_matches!(
            cfg.validate(),
            Err(InvalidConfigError::NonPositiveDuration { phase: Phase::Exhale, .. })
        );
    }

    #[test]
    fn test_validate_rejects_nan_and_infinite() {
        let cfg = SessionConfig::new(PhaseDurations::new(f64::NAN, 2.0, 6.0, 2.0), 1);
        assert!(cfg.validate().is_err());

        let cfg = SessionConfig::new(PhaseDurations::new(4.0, 2.0, 6.0, f64::INFINITY), 1);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_cycles() {
        let cfg = SessionConfig::from_preset(Preset::Box, 0);
        assert_eq!(cfg.validate(), Err(InvalidConfigError::ZeroCycles));
    }
}
