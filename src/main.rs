pub mod ui;

use breathr::{
    app_dirs::AppDirs,
    error::TelemetryError,
    config::{Config, ConfigStore, FileConfigStore},
    feedback::{FeedbackEmitter, TerminalBell},
    progress::{record_best_effort, CompletedSession, GameProgress, ProgressDb},
    runtime::{BreatheEvent, CrosstermEventSource, FixedTicker, Runner},
    telemetry, ActionOutcome, Breather, InvalidConfigError, PhaseDurations, Preset, SessionConfig,
};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use rand::seq::SliceRandom;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{info, warn};

const CLOSING_WORDS: [&str; 5] = [
    "Well breathed.",
    "Calm and steady.",
    "Nicely paced.",
    "Centered.",
    "Slow and easy.",
];

/// calm breathing trainer tui with paced phases and timing scores
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A calm breathing trainer for the terminal. Follow the inhale, hold, exhale, hold rhythm and press space right as each phase begins to score points."
)]
pub struct Cli {
    /// number of breathing cycles per session
    #[clap(short = 'c', long)]
    cycles: Option<u32>,

    /// breathing pattern to follow
    #[clap(short = 'p', long, value_enum)]
    preset: Option<Preset>,

    /// seconds to inhale, overriding the preset
    #[clap(long)]
    inhale: Option<f64>,

    /// seconds to hold after inhaling, overriding the preset
    #[clap(long)]
    hold1: Option<f64>,

    /// seconds to exhale, overriding the preset
    #[clap(long)]
    exhale: Option<f64>,

    /// seconds to hold after exhaling, overriding the preset
    #[clap(long)]
    hold2: Option<f64>,

    /// disable sound cues
    #[clap(long)]
    no_sound: bool,

    /// disable haptic cues
    #[clap(long)]
    no_haptics: bool,

    /// write the session history as CSV to PATH and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

/// Per-phase overrides on top of the selected preset
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    pub inhale: Option<f64>,
    pub hold1: Option<f64>,
    pub exhale: Option<f64>,
    pub hold2: Option<f64>,
}

impl Overrides {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply(&self, base: PhaseDurations) -> PhaseDurations {
        PhaseDurations {
            inhale: self.inhale.unwrap_or(base.inhale),
            hold1: self.hold1.unwrap_or(base.hold1),
            exhale: self.exhale.unwrap_or(base.exhale),
            hold2: self.hold2.unwrap_or(base.hold2),
        }
    }
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            inhale: self.inhale,
            hold1: self.hold1,
            exhale: self.exhale,
            hold2: self.hold2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Session,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct App {
    pub breather: Breather,
    pub state: AppState,
    pub preset: Preset,
    pub overrides: Overrides,
    pub cycles: u32,
    pub progress: GameProgress,
    pub closing_word: &'static str,
    completed: Arc<Mutex<Option<u8>>>,
    progress_db: Option<ProgressDb>,
    config_store: Option<FileConfigStore>,
}

impl App {
    pub fn new(
        cli: &Cli,
        config: Config,
        feedback: FeedbackEmitter,
    ) -> Result<Self, InvalidConfigError> {
        let preset = cli.preset.unwrap_or(config.preset);
        let cycles = cli.cycles.unwrap_or(config.cycles);
        let overrides = cli.overrides();

        let session_config = SessionConfig::new(overrides.apply(preset.durations()), cycles);
        let mut feedback = feedback;
        feedback.sound_enabled = config.sound_enabled && !cli.no_sound;
        feedback.haptics_enabled = config.haptics_enabled && !cli.no_haptics;

        let mut breather = Breather::new(session_config)?.with_feedback(feedback);
        let completed = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&completed);
        breather.on_complete(move |score| {
            if let Ok(mut slot) = slot.lock() {
                *slot = Some(score);
            }
        });

        Ok(Self {
            breather,
            state: AppState::Session,
            preset,
            overrides,
            cycles,
            progress: GameProgress::default(),
            closing_word: CLOSING_WORDS[0],
            completed,
            progress_db: None,
            config_store: None,
        })
    }

    pub fn with_progress_db(mut self, db: ProgressDb) -> Self {
        self.progress = db.summary().unwrap_or_else(|err| {
            warn!(error = %err, "could not read progress summary");
            GameProgress::default()
        });
        self.progress_db = Some(db);
        self
    }

    pub fn with_config_store(mut self, store: FileConfigStore) -> Self {
        self.config_store = Some(store);
        self
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.overrides.apply(self.preset.durations()), self.cycles)
    }

    pub fn is_custom(&self) -> bool {
        !self.overrides.is_empty()
    }

    pub fn to_config(&self) -> Config {
        Config {
            preset: self.preset,
            cycles: self.cycles,
            sound_enabled: self.breather.feedback().sound_enabled,
            haptics_enabled: self.breather.feedback().haptics_enabled,
        }
    }

    fn persist_config(&self) {
        if let Some(store) = &self.config_store {
            if let Err(err) = store.save(&self.to_config()) {
                warn!(error = %err, "failed to save preferences");
            }
        }
    }

    /// Switch preset; only allowed before a session starts.
    pub fn select_preset(&mut self, preset: Preset) {
        if !self.breather.is_idle() {
            return;
        }
        self.preset = preset;
        self.overrides = Overrides::default();
        if let Err(err) = self.breather.set_default_config(self.session_config()) {
            warn!(error = %err, "preset produced an invalid session");
        }
        self.persist_config();
    }

    pub fn on_tick(&mut self, now: Duration) {
        self.breather.tick(now);

        let finished = self.completed.lock().ok().and_then(|mut slot| slot.take());
        if let Some(final_score) = finished {
            self.finish(final_score);
        }
    }

    fn finish(&mut self, final_score: u8) {
        let session = CompletedSession::new(
            (!self.is_custom()).then_some(self.preset),
            self.breather.target_cycles(),
            final_score,
            self.breather.attempts().len() as u32,
            self.breather.raw_points(),
        );
        record_best_effort(self.progress_db.as_ref(), &session);
        if let Some(db) = &self.progress_db {
            match db.summary() {
                Ok(summary) => self.progress = summary,
                Err(err) => warn!(error = %err, "could not refresh progress"),
            }
        } else {
            self.progress.high_score = self.progress.high_score.max(final_score);
            self.progress.times_played += 1;
        }
        self.closing_word = CLOSING_WORDS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(CLOSING_WORDS[0]);
        self.state = AppState::Results;
    }

    pub fn restart(&mut self) {
        self.breather.reset();
        self.state = AppState::Session;
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Control {
        if key.kind != KeyEventKind::Press {
            return Control::Continue;
        }
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return Control::Quit;
        }

        match (self.state, key.code) {
            (AppState::Session, KeyCode::Char(' ') | KeyCode::Enter) => {
                if let ActionOutcome::Started = self.breather.register_action() {
                    info!(
                        preset = %self.preset,
                        cycles = self.cycles,
                        "session started from keyboard"
                    );
                }
            }
            (AppState::Results, KeyCode::Char(' ') | KeyCode::Enter) => {
                self.restart();
                self.breather.register_action();
            }
            (AppState::Session, KeyCode::Char('p')) => self.breather.toggle_pause(),
            (_, KeyCode::Char('r')) => self.restart(),
            (AppState::Session, KeyCode::Char('1')) => self.select_preset(Preset::Relax),
            (AppState::Session, KeyCode::Char('2')) => self.select_preset(Preset::Box),
            (AppState::Session, KeyCode::Char('3')) => self.select_preset(Preset::Energize),
            (_, KeyCode::Char('s')) => {
                self.breather.feedback_mut().toggle_sound();
                self.persist_config();
            }
            (_, KeyCode::Char('v')) => {
                self.breather.feedback_mut().toggle_haptics();
                self.persist_config();
            }
            _ => {}
        }
        Control::Continue
    }
}

fn init_logging(log_path: Option<PathBuf>) -> Result<(), TelemetryError> {
    match log_path {
        Some(path) => telemetry::init_tracing(&path),
        None => Ok(()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Err(err) = init_logging(AppDirs::log_path()) {
        eprintln!("breathr: logging disabled: {err}");
    }

    if let Some(path) = &cli.export {
        let db = ProgressDb::new()?;
        let rows = db.export_csv(path)?;
        println!("exported {} sessions to {}", rows, path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let config = store.load();
    let feedback = FeedbackEmitter::new(Box::new(TerminalBell::stdout()));
    let app = match App::new(&cli, config, feedback) {
        Ok(app) => app,
        Err(err) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, err).exit();
        }
    };
    let mut app = app.with_config_store(store);
    match ProgressDb::new() {
        Ok(db) => app = app.with_progress_db(db),
        Err(err) => warn!(error = %err, "progress tracking disabled"),
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());

    terminal.draw(|f| ui(app, f))?;
    loop {
        match runner.step() {
            BreatheEvent::Tick => app.on_tick(runner.now()),
            BreatheEvent::Resize => {}
            BreatheEvent::Key(key) => {
                if app.on_key(key) == Control::Quit {
                    break;
                }
            }
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    let screen = ui::screen::current_screen(&app.state);
    screen.render(app, f);
}
