use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::error::FeedbackError;
use crate::phase::Phase;

/// Something worth signalling to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    SessionStarted,
    PhaseEntered(Phase),
    ActionScored(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f64,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub duration: Duration,
}

impl Cue {
    pub fn tone(&self) -> Tone {
        let (frequency_hz, ms) = match self {
            Cue::SessionStarted => (680.0, 80),
            Cue::PhaseEntered(Phase::Exhale) => (420.0, 80),
            Cue::PhaseEntered(phase) if phase.is_hold() => (480.0, 80),
            Cue::PhaseEntered(_) => (540.0, 80),
            Cue::ActionScored(points) => (440.0 + f64::from(*points) * 30.0, 120),
        };
        Tone {
            frequency_hz,
            duration: Duration::from_millis(ms),
        }
    }

    pub fn pulse(&self) -> Pulse {
        let ms = match self {
            Cue::SessionStarted => 30,
            Cue::PhaseEntered(_) => 20,
            Cue::ActionScored(0) => 18,
            Cue::ActionScored(_) => 40,
        };
        Pulse {
            duration: Duration::from_millis(ms),
        }
    }
}

/// Output device for tones and haptic pulses.
pub trait FeedbackSink: Send {
    fn tone(&mut self, tone: Tone) -> Result<(), FeedbackError>;
    fn pulse(&mut self, pulse: Pulse) -> Result<(), FeedbackError>;
}

/// Best-effort cue emission gated by the player's sound and haptics toggles.
pub struct FeedbackEmitter {
    sink: Box<dyn FeedbackSink>,
    pub sound_enabled: bool,
    pub haptics_enabled: bool,
}

impl FeedbackEmitter {
    pub fn new(sink: Box<dyn FeedbackSink>) -> Self {
        Self {
            sink,
            sound_enabled: true,
            haptics_enabled: true,
        }
    }

    pub fn silent() -> Self {
        Self::new(Box::new(NullSink))
    }

    pub fn toggle_sound(&mut self) -> bool {
        self.sound_enabled = !self.sound_enabled;
        self.sound_enabled
    }

    pub fn toggle_haptics(&mut self) -> bool {
        self.haptics_enabled = !self.haptics_enabled;
        self.haptics_enabled
    }

    /// Failures are logged and dropped; feedback never affects the session.
    pub fn emit(&mut self, cue: Cue) {
        if self.sound_enabled {
            if let Err(err) = self.sink.tone(cue.tone()) {
                debug!(error = %err, ?cue, "tone dropped");
            }
        }
        if self.haptics_enabled {
            if let Err(err) = self.sink.pulse(cue.pulse()) {
                debug!(error = %err, ?cue, "haptic pulse dropped");
            }
        }
    }
}

impl Default for FeedbackEmitter {
    fn default() -> Self {
        Self::silent()
    }
}

impl fmt::Debug for FeedbackEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackEmitter")
            .field("sound_enabled", &self.sound_enabled)
            .field("haptics_enabled", &self.haptics_enabled)
            .finish_non_exhaustive()
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FeedbackSink for NullSink {
    fn tone(&mut self, _tone: Tone) -> Result<(), FeedbackError> {
        Ok(())
    }

    fn pulse(&mut self, _pulse: Pulse) -> Result<(), FeedbackError> {
        Ok(())
    }
}

/// Rings the terminal bell for tones. Terminals have no vibration motor, so
/// pulses report the device as unavailable.
pub struct TerminalBell<W: Write + Send> {
    out: W,
}

impl TerminalBell<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> FeedbackSink for TerminalBell<W> {
    fn tone(&mut self, _tone: Tone) -> Result<(), FeedbackError> {
        self.out.write_all(b"\x07")?;
        self.out.flush()?;
        Ok(())
    }

    fn pulse(&mut self, _pulse: Pulse) -> Result<(), FeedbackError> {
        Err(FeedbackError::Unavailable("no haptics on a terminal".into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Emission {
    Tone(Tone),
    Pulse(Pulse),
}

/// Keeps every emission in a shared log; lets a caller observe what an
/// engine signalled after handing the sink over.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    log: Arc<Mutex<Vec<Emission>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emissions(&self) -> Vec<Emission> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn push(&self, emission: Emission) -> Result<(), FeedbackError> {
        self.log
            .lock()
            .map_err(|_| FeedbackError::Unavailable("recording log poisoned".into()))?
            .push(emission);
        Ok(())
    }
}

impl FeedbackSink for RecordingSink {
    fn tone(&mut self, tone: Tone) -> Result<(), FeedbackError> {
        self.push(Emission::Tone(tone))
    }

    fn pulse(&mut self, pulse: Pulse) -> Result<(), FeedbackError> {
        self.push(Emission::Pulse(pulse))
    }
}
