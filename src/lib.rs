// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod breather;
pub mod clock;
pub mod config;
pub mod error;
pub mod feedback;
pub mod phase;
pub mod progress;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod telemetry;
pub mod util;

pub use breather::{ActionOutcome, Breather, IdleActionPolicy};
pub use error::InvalidConfigError;
pub use phase::{Phase, Transition};
pub use session::{PhaseDurations, Preset, SessionConfig};
