mod ui;

use accrue::{
    app_dirs::AppDirs,
    config::{AppConfig, ConfigStore, FileConfigStore},
    history::{compute_stats, personal_records, PersonalRecords, PresetStats, SessionHistory},
    preset::{defaults_for, Preset},
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, RestScheduler, Runner},
    session::{Configuration, Cue, Phase, RestToken, SessionEngine, SessionError, TrainingMode},
    store::{export_csv, open_repository, record_completed, StorageKind, StoreError, TrainingRepository},
    util,
};
use anyhow::{bail, Context};
use clap::{error::ErrorKind, ArgGroup, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use log::{debug, info, warn, LevelFilter};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    fs::{self, OpenOptions},
    io::{self, stdin, Write},
    path::{Path, PathBuf},
    sync::mpsc::Sender,
    time::Duration,
};

const MAX_REPS_DIGITS: usize = 4;

/// accumulation training timer for holds and rep sets
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal timer for accumulation training: bank hold time or reps across attempts with adjusted rest in between until the target is reached."
)]
#[clap(group(
    ArgGroup::new("adhoc")
        .args(["mode", "target", "rest", "adjustment"])
        .multiple(true)
))]
pub struct Cli {
    /// start the preset with this name right away
    #[clap(short = 'p', long)]
    preset: Option<String>,

    /// training mode for a session without a preset
    #[clap(short = 'm', long, value_enum, conflicts_with = "preset")]
    mode: Option<ModeArg>,

    /// target seconds (time mode) or reps (reps mode)
    #[clap(short = 't', long)]
    target: Option<f64>,

    /// rest between attempts, in seconds
    #[clap(short = 'r', long)]
    rest: Option<i64>,

    /// seconds subtracted from each hold, or reps added to each set
    #[clap(short = 'a', long)]
    adjustment: Option<f64>,

    /// keep the ad-hoc configuration as a preset with this name so the session is recorded
    #[clap(long, requires = "adhoc", conflicts_with = "preset")]
    save_as: Option<String>,

    /// storage backend for presets and history
    #[clap(long, value_enum)]
    storage: Option<StorageArg>,

    /// directory holding presets, history and the log file
    #[clap(long)]
    data_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// list presets
    Presets,
    /// add, edit or delete a preset
    Preset {
        #[clap(subcommand)]
        action: PresetAction,
    },
    /// show completed sessions and statistics, for one preset or all
    #[clap(args_conflicts_with_subcommands = true)]
    History {
        /// preset name
        preset: Option<String>,

        #[clap(subcommand)]
        action: Option<HistoryAction>,
    },
    /// write sessions.csv and attempts.csv into a directory
    Export {
        /// target directory
        dir: PathBuf,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum PresetAction {
    /// create a preset, starting from the mode defaults
    Add {
        name: String,
        #[clap(short = 'm', long, value_enum)]
        mode: ModeArg,
        #[clap(flatten)]
        values: PresetValues,
    },
    /// change the values or name of a preset
    Edit {
        name: String,
        /// new name
        #[clap(long)]
        rename: Option<String>,
        #[clap(short = 'm', long, value_enum)]
        mode: Option<ModeArg>,
        #[clap(flatten)]
        values: PresetValues,
    },
    /// delete a preset together with its history
    Delete { name: String },
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct PresetValues {
    /// target seconds (time mode) or reps (reps mode)
    #[clap(short = 't', long)]
    target: Option<f64>,
    /// rest between attempts, in seconds
    #[clap(short = 'r', long)]
    rest: Option<i64>,
    /// seconds subtracted from each hold, or reps added to each set
    #[clap(short = 'a', long)]
    adjustment: Option<f64>,
}

impl PresetValues {
    fn apply(&self, mode: TrainingMode, base: Configuration) -> Configuration {
        Configuration::new(
            mode,
            self.target.unwrap_or(base.target),
            self.rest.unwrap_or(base.rest_seconds),
            self.adjustment.unwrap_or(base.adjustment),
        )
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum HistoryAction {
    /// delete one session, by id or a unique id prefix
    Delete { id: String },
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum, strum_macros::Display)]
pub enum ModeArg {
    Time,
    Reps,
}

impl From<ModeArg> for TrainingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Time => TrainingMode::Time,
            ModeArg::Reps => TrainingMode::Reps,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum, strum_macros::Display)]
pub enum StorageArg {
    Json,
    Sqlite,
}

impl From<StorageArg> for StorageKind {
    fn from(storage: StorageArg) -> Self {
        match storage {
            StorageArg::Json => StorageKind::Json,
            StorageArg::Sqlite => StorageKind::Sqlite,
        }
    }
}

impl Cli {
    /// Flags take precedence over the config file
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(storage) = self.storage {
            config.storage = storage.into();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
    }

    fn has_adhoc_settings(&self) -> bool {
        self.mode.is_some()
            || self.target.is_some()
            || self.rest.is_some()
            || self.adjustment.is_some()
    }

    fn override_config(&self, base: Configuration) -> Configuration {
        Configuration::new(
            base.mode,
            self.target.unwrap_or(base.target),
            self.rest.unwrap_or(base.rest_seconds),
            self.adjustment.unwrap_or(base.adjustment),
        )
    }

    /// The session to start on launch, if the flags ask for one
    fn initial_session(
        &self,
        repo: &mut dyn TrainingRepository,
    ) -> anyhow::Result<Option<(Configuration, Option<Preset>)>> {
        if let Some(name) = &self.preset {
            let Some(preset) = repo.preset_by_name(name)? else {
                bail!("no preset named '{name}'");
            };
            let config = self.override_config(preset.configuration());
            return Ok(Some((config, Some(preset.with_configuration(config)))));
        }

        if !self.has_adhoc_settings() {
            return Ok(None);
        }

        let mode = self.mode.map(TrainingMode::from).unwrap_or(TrainingMode::Time);
        let config = self.override_config(defaults_for(mode));
        config.validate()?;

        let preset = match &self.save_as {
            Some(name) => {
                let preset = match repo.preset_by_name(name)? {
                    Some(existing) => existing.with_configuration(config),
                    None => Preset::new(name.trim(), config),
                };
                repo.save_preset(&preset)?;
                info!("saved preset '{}'", preset.name);
                Some(preset)
            }
            None => None,
        };
        Ok(Some((config, preset)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Setup,
    Training,
    Resting,
    Complete,
    History,
}

/// Outcome of recording the finished session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Pending,
    Saved,
    Failed,
    /// Session was not started from a preset
    Skipped,
}

#[derive(Debug, Clone)]
pub struct HistoryView {
    pub preset_name: String,
    pub stats: Option<PresetStats>,
    /// Newest first
    pub sessions: Vec<SessionHistory>,
    pub scroll_offset: usize,
}

pub struct App {
    pub engine: SessionEngine,
    pub repo: Box<dyn TrainingRepository>,
    pub config: AppConfig,
    pub presets: Vec<Preset>,
    pub selected: usize,
    pub active_preset: Option<Preset>,
    pub reps_input: String,
    pub history: Option<HistoryView>,
    pub confirm_reset: bool,
    pub confirm_delete: bool,
    pub message: Option<String>,
    pub last_cue: Option<Cue>,
    pub save_status: SaveStatus,
    /// Set when a preset session completes
    pub records: Option<PersonalRecords>,
    pending_bell: bool,
    rest_scheduler: Option<RestScheduler>,
    events_tx: Option<Sender<AppEvent>>,
}

impl App {
    pub fn new(
        engine: SessionEngine,
        repo: Box<dyn TrainingRepository>,
        config: AppConfig,
    ) -> Result<Self, StoreError> {
        let presets = repo.presets()?;
        Ok(Self {
            engine,
            repo,
            config,
            presets,
            selected: 0,
            active_preset: None,
            reps_input: String::new(),
            history: None,
            confirm_reset: false,
            confirm_delete: false,
            message: None,
            last_cue: None,
            save_status: SaveStatus::Pending,
            records: None,
            pending_bell: false,
            rest_scheduler: None,
            events_tx: None,
        })
    }

    /// Rest ticks are delivered through `tx`
    pub fn with_events(mut self, tx: Sender<AppEvent>) -> Self {
        self.events_tx = Some(tx);
        self
    }

    pub fn state(&self) -> AppState {
        if self.history.is_some() {
            return AppState::History;
        }
        match self.engine.phase() {
            Phase::Setup => AppState::Setup,
            Phase::Training => AppState::Training,
            Phase::Resting => AppState::Resting,
            Phase::Complete => AppState::Complete,
        }
    }

    pub fn selected_preset(&self) -> Option<&Preset> {
        self.presets.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.presets.is_empty() {
            self.selected = (self.selected + 1) % self.presets.len();
        }
    }

    pub fn select_previous(&mut self) {
        if !self.presets.is_empty() {
            self.selected = (self.selected + self.presets.len() - 1) % self.presets.len();
        }
    }

    pub fn start_selected(&mut self) {
        if let Some(preset) = self.selected_preset().cloned() {
            self.start_with(preset.configuration(), Some(preset));
        }
    }

    pub fn start_with(&mut self, config: Configuration, preset: Option<Preset>) {
        match self.engine.start_session(config) {
            Ok(_) => {
                self.active_preset = preset;
                self.save_status = SaveStatus::Pending;
                self.records = None;
                self.reps_input.clear();
                self.last_cue = None;
                self.message = None;
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    pub fn bail_out(&mut self) {
        let held = self.engine.current_hold_seconds();
        let result = self.engine.bail_out(held);
        self.apply(result);
    }

    pub fn stop(&mut self) {
        let held = self.engine.current_hold_seconds();
        let result = self.engine.stop(held);
        self.apply(result);
    }

    pub fn push_digit(&mut self, c: char) {
        if c.is_ascii_digit() && self.reps_input.len() < MAX_REPS_DIGITS {
            self.reps_input.push(c);
        }
    }

    pub fn submit_reps(&mut self) {
        let Ok(reps) = self.reps_input.parse::<u32>() else {
            self.message = Some("enter the number of reps first".to_string());
            return;
        };
        let result = self.engine.done_with_set(reps as f64);
        if result.is_ok() {
            self.reps_input.clear();
        }
        self.apply(result);
    }

    pub fn skip_rest(&mut self) {
        let result = self.engine.skip_rest();
        self.apply(result);
    }

    pub fn on_rest_tick(&mut self, token: RestToken) {
        match self.engine.rest_tick(token) {
            Ok(tick) => {
                if let Some(cue) = tick.cue {
                    self.last_cue = Some(cue);
                    self.pending_bell |= self.config.bell;
                }
                self.after_transition();
            }
            Err(SessionError::StaleTick) => debug!("ignored stale rest tick"),
            Err(e) => debug!("ignored rest tick: {e}"),
        }
    }

    /// First press asks for confirmation, the second discards the session
    pub fn request_reset(&mut self) {
        if self.engine.phase() == Phase::Setup {
            return;
        }
        if self.confirm_reset {
            self.reset();
        } else {
            self.confirm_reset = true;
            self.message = Some("press r again to discard this session".to_string());
        }
    }

    /// First press asks for confirmation, the second deletes the selected preset and its history
    pub fn request_delete_preset(&mut self) {
        let Some(preset) = self.selected_preset().cloned() else {
            return;
        };
        if !self.confirm_delete {
            self.confirm_delete = true;
            self.message = Some(format!(
                "press d again to delete '{}' and its history",
                preset.name
            ));
            return;
        }

        self.confirm_delete = false;
        match self.repo.delete_preset(preset.id) {
            Ok(()) => {
                info!("deleted preset '{}'", preset.name);
                self.message = Some(format!("deleted '{}'", preset.name));
            }
            Err(e) => {
                warn!("could not delete preset '{}': {e}", preset.name);
                self.message = Some(format!("could not delete '{}': {e}", preset.name));
            }
        }
        self.reload_presets();
    }

    pub fn reset(&mut self) {
        self.engine.reset();
        self.active_preset = None;
        self.history = None;
        self.reps_input.clear();
        self.confirm_reset = false;
        self.last_cue = None;
        self.message = None;
        self.save_status = SaveStatus::Pending;
        self.records = None;
        self.after_transition();
        self.reload_presets();
    }

    pub fn open_history(&mut self) {
        let preset = match self.engine.phase() {
            Phase::Complete => self.active_preset.clone(),
            _ => self.selected_preset().cloned(),
        };
        let Some(preset) = preset else {
            self.message = Some("this session has no preset, so there is no history".to_string());
            return;
        };

        let sessions = match self.repo.histories(preset.id) {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!("could not load history for '{}': {e}", preset.name);
                Vec::new()
            }
        };
        self.history = Some(HistoryView {
            preset_name: preset.name,
            stats: compute_stats(&sessions),
            sessions,
            scroll_offset: 0,
        });
    }

    pub fn close_history(&mut self) {
        self.history = None;
    }

    /// Whether a cue asked for the bell since the last call
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.pending_bell)
    }

    pub fn is_rest_scheduled(&self) -> bool {
        self.rest_scheduler.is_some()
    }

    /// Returns true when the app should quit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return true;
        }

        self.message = None;
        if key.code != KeyCode::Char('d') {
            self.confirm_delete = false;
        }
        if key.code == KeyCode::Char('r') {
            self.request_reset();
            return false;
        }
        self.confirm_reset = false;

        match self.state() {
            AppState::Setup => match key.code {
                KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
                KeyCode::Down | KeyCode::Char('j') => self.select_next(),
                KeyCode::Enter => self.start_selected(),
                KeyCode::Char('h') => self.open_history(),
                KeyCode::Char('d') => self.request_delete_preset(),
                _ => {}
            },
            AppState::Training => {
                let mode = self.engine.configuration().map(|c| c.mode);
                match (mode, key.code) {
                    (Some(TrainingMode::Time), KeyCode::Char('b')) => self.bail_out(),
                    (Some(TrainingMode::Time), KeyCode::Char('s')) => self.stop(),
                    (Some(TrainingMode::Reps), KeyCode::Char(c)) => self.push_digit(c),
                    (Some(TrainingMode::Reps), KeyCode::Backspace) => {
                        self.reps_input.pop();
                    }
                    (Some(TrainingMode::Reps), KeyCode::Enter) => self.submit_reps(),
                    _ => {}
                }
            }
            AppState::Resting => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                    self.skip_rest();
                }
            }
            AppState::Complete => match key.code {
                KeyCode::Char('n') => self.reset(),
                KeyCode::Char('h') => self.open_history(),
                _ => {}
            },
            AppState::History => {
                if let Some(view) = self.history.as_mut() {
                    match key.code {
                        KeyCode::Char('b') | KeyCode::Backspace => self.history = None,
                        KeyCode::Up => view.scroll_offset = view.scroll_offset.saturating_sub(1),
                        KeyCode::Down => view.scroll_offset += 1,
                        KeyCode::Home => view.scroll_offset = 0,
                        _ => {}
                    }
                }
            }
        }
        false
    }

    fn apply(&mut self, result: Result<Phase, SessionError>) {
        match result {
            Ok(_) => self.after_transition(),
            Err(SessionError::NotArmed { .. }) => {
                self.message = Some("Get ready…".to_string());
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    /// Keep the rest scheduler and persistence in step with the engine phase
    fn after_transition(&mut self) {
        match self.engine.phase() {
            Phase::Resting => self.ensure_rest_scheduler(),
            Phase::Complete => {
                self.rest_scheduler = None;
                self.record_if_needed();
            }
            Phase::Setup | Phase::Training => self.rest_scheduler = None,
        }
    }

    fn ensure_rest_scheduler(&mut self) {
        let (Some(token), Some(tx)) = (self.engine.rest_token(), self.events_tx.as_ref()) else {
            return;
        };
        if self
            .rest_scheduler
            .as_ref()
            .is_some_and(|scheduler| scheduler.token() == token)
        {
            return;
        }
        self.rest_scheduler = Some(RestScheduler::start(
            token,
            Duration::from_secs(1),
            tx.clone(),
        ));
    }

    fn record_if_needed(&mut self) {
        if self.save_status != SaveStatus::Pending {
            return;
        }
        let history = self
            .active_preset
            .as_ref()
            .and_then(|preset| self.engine.history(preset));
        self.save_status = match history {
            Some(history) => {
                self.records = match self.repo.histories(history.preset_id) {
                    Ok(previous) => Some(personal_records(&history, &previous)),
                    Err(e) => {
                        warn!("could not load previous sessions for records: {e}");
                        None
                    }
                };
                if record_completed(self.repo.as_mut(), &history) {
                    SaveStatus::Saved
                } else {
                    SaveStatus::Failed
                }
            }
            None => SaveStatus::Skipped,
        };
    }

    fn reload_presets(&mut self) {
        match self.repo.presets() {
            Ok(presets) => {
                self.presets = presets;
                if self.selected >= self.presets.len() {
                    self.selected = 0;
                }
            }
            Err(e) => warn!("could not reload presets: {e}"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply_overrides(&mut config);

    let data_dir = config
        .data_dir
        .clone()
        .or_else(AppDirs::state_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    init_logging(&data_dir);
    info!("accrue {} starting", env!("CARGO_PKG_VERSION"));

    let mut repo = open_repository(config.storage, &data_dir)
        .with_context(|| format!("could not open storage in {}", data_dir.display()))?;
    repo.ensure_default_presets()
        .context("could not seed default presets")?;

    if let Some(command) = &cli.command {
        let mut stdout = io::stdout();
        return run_command(command, repo.as_mut(), &mut stdout);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let initial = cli.initial_session(repo.as_mut())?;

    let engine = SessionEngine::new()
        .arming_delay(config.arming_delay())
        .rest_warning_secs(config.rest_warning_secs);
    let events = CrosstermEventSource::new();
    let mut app = App::new(engine, repo, config)?.with_events(events.sender());
    if let Some((session_config, preset)) = initial {
        app.start_with(session_config, preset);
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: CrosstermEventSource,
) -> anyhow::Result<()> {
    let runner = Runner::new(events, FixedTicker::new(app.config.tick_rate()));

    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        let quit = match runner.step() {
            AppEvent::Key(key) => app.handle_key(key),
            AppEvent::RestTick(token) => {
                app.on_rest_tick(token);
                false
            }
            AppEvent::Tick | AppEvent::Resize => false,
        };

        if app.take_bell() {
            ring_bell()?;
        }
        if quit {
            break;
        }
    }

    info!("quitting");
    Ok(())
}

fn ring_bell() -> io::Result<()> {
    let mut out = io::stdout();
    out.write_all(b"\x07")?;
    out.flush()
}

/// Log to `accrue.log` in the data dir so the terminal stays clean
fn init_logging(dir: &Path) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    let file = fs::create_dir_all(dir).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("accrue.log"))
    });
    match file {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(_) => {
            builder.filter_level(LevelFilter::Off);
        }
    }
    let _ = builder.try_init();
}

fn run_command<W: Write>(
    command: &Command,
    repo: &mut dyn TrainingRepository,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        Command::Presets => {
            for preset in repo.presets()? {
                writeln!(
                    out,
                    "{:<24} {:<5} target {:<10} rest {:<6} adjustment {}",
                    preset.name,
                    preset.mode,
                    ui::format_amount(preset.mode, preset.target),
                    util::format_countdown(preset.rest_seconds.max(0) as u32),
                    preset.adjustment
                )?;
            }
        }
        Command::Preset { action } => run_preset_action(action, repo, out)?,
        Command::History {
            action: Some(HistoryAction::Delete { id }),
            ..
        } => {
            let session = find_session(repo, id)?;
            repo.delete_history(session.id)?;
            info!("deleted session {}", session.id);
            writeln!(
                out,
                "deleted {} session from {}",
                session.exercise_name,
                session.date.format("%Y-%m-%d %H:%M")
            )?;
        }
        Command::History {
            preset: Some(name), ..
        } => {
            let Some(preset) = repo.preset_by_name(name)? else {
                bail!("no preset named '{name}'");
            };
            let sessions = repo.histories(preset.id)?;
            write_preset_history(out, &preset, &sessions)?;
        }
        Command::History { preset: None, .. } => {
            for preset in repo.presets()? {
                let sessions = repo.histories(preset.id)?;
                write_preset_history(out, &preset, &sessions)?;
            }
        }
        Command::Export { dir } => {
            let histories = repo.all_histories()?;
            let (sessions, attempts) = export_csv(&histories, dir)
                .with_context(|| format!("could not export to {}", dir.display()))?;
            writeln!(out, "{}", sessions.display())?;
            writeln!(out, "{}", attempts.display())?;
        }
    }
    Ok(())
}

fn run_preset_action<W: Write>(
    action: &PresetAction,
    repo: &mut dyn TrainingRepository,
    out: &mut W,
) -> anyhow::Result<()> {
    match action {
        PresetAction::Add { name, mode, values } => {
            let name = name.trim();
            if name.is_empty() {
                bail!("preset name must not be empty");
            }
            if repo.preset_by_name(name)?.is_some() {
                bail!("a preset named '{name}' already exists");
            }
            let mode = TrainingMode::from(*mode);
            let config = values.apply(mode, defaults_for(mode));
            config.validate()?;
            repo.save_preset(&Preset::new(name, config))?;
            info!("added preset '{name}'");
            writeln!(out, "added {name}")?;
        }
        PresetAction::Edit {
            name,
            rename,
            mode,
            values,
        } => {
            let Some(preset) = repo.preset_by_name(name)? else {
                bail!("no preset named '{name}'");
            };
            let mode = mode.map(TrainingMode::from).unwrap_or(preset.mode);
            let config = values.apply(mode, preset.configuration());
            config.validate()?;

            let mut edited = preset.with_configuration(config);
            if let Some(new_name) = rename {
                let new_name = new_name.trim();
                if new_name.is_empty() {
                    bail!("preset name must not be empty");
                }
                if repo
                    .preset_by_name(new_name)?
                    .is_some_and(|other| other.id != preset.id)
                {
                    bail!("a preset named '{new_name}' already exists");
                }
                edited.name = new_name.to_string();
            }
            repo.save_preset(&edited)?;
            info!("edited preset '{}'", edited.name);
            writeln!(out, "updated {}", edited.name)?;
        }
        PresetAction::Delete { name } => {
            let Some(preset) = repo.preset_by_name(name)? else {
                bail!("no preset named '{name}'");
            };
            let sessions = repo.histories(preset.id)?.len();
            repo.delete_preset(preset.id)?;
            info!("deleted preset '{}' with {sessions} sessions", preset.name);
            writeln!(out, "deleted {} and {sessions} sessions", preset.name)?;
        }
    }
    Ok(())
}

/// The one stored session whose id starts with `prefix`
fn find_session(repo: &dyn TrainingRepository, prefix: &str) -> anyhow::Result<SessionHistory> {
    let prefix = prefix.trim().to_ascii_lowercase();
    if prefix.is_empty() {
        bail!("session id must not be empty");
    }
    let mut matches: Vec<SessionHistory> = repo
        .all_histories()?
        .into_iter()
        .filter(|h| h.id.to_string().starts_with(&prefix))
        .collect();
    match matches.len() {
        0 => bail!("no session with id '{prefix}'"),
        1 => Ok(matches.remove(0)),
        n => bail!("'{prefix}' matches {n} sessions, give more of the id"),
    }
}

fn write_preset_history<W: Write>(
    out: &mut W,
    preset: &Preset,
    sessions: &[SessionHistory],
) -> io::Result<()> {
    writeln!(out, "{}", preset.name)?;
    match compute_stats(sessions) {
        Some(stats) => writeln!(
            out,
            "  {} sessions, average {}, best {}, trend {}",
            stats.total_sessions,
            util::format_time(stats.average_duration),
            util::format_time(stats.best_duration),
            stats.trend
        )?,
        None => writeln!(out, "  no sessions yet")?,
    }
    for session in sessions {
        writeln!(
            out,
            "  {}  {}  {} of {} in {} attempts, {}",
            &session.id.to_string()[..8],
            session.date.format("%Y-%m-%d %H:%M"),
            ui::format_amount(session.mode, session.accumulated_total),
            ui::format_amount(session.mode, session.target),
            session.attempt_count,
            util::format_time(session.duration_seconds)
        )?;
    }
    Ok(())
}
