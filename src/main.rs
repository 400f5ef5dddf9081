// boltmap - payment-channel network world map
// Channel opens and closes strike the map as lightning bolts.

mod app;
mod audio;
mod engine;
mod geo;
mod net;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::{
    event::{handle_key_event, handle_mouse_event},
    AppConfig, AppState, UI_INTERVAL_MS,
};
use audio::{Silent, SoundCue, TerminalBell};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "boltmap")]
#[command(version)]
#[command(about = "Payment-channel network activity as lightning on a world map", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot source: http(s) URL or JSON file
    #[arg(short, long)]
    source: Option<String>,

    /// Landmass GeoJSON: http(s) URL or file
    #[arg(short, long)]
    landmass: Option<String>,

    /// Seed for bolt shapes and debug bolts
    #[arg(long)]
    seed: Option<u64>,

    /// Disable the sound cue
    #[arg(short, long)]
    mute: bool,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install log subscriber: {}", e))?;
    Ok(())
}

fn build_app(cli: Cli) -> Result<AppState> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if cli.source.is_some() {
        config.source = cli.source;
    }
    if cli.landmass.is_some() {
        config.landmass = cli.landmass;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.mute {
        config.sound = false;
    }
    let config = config.sanitized();

    if let Some(path) = &config.log_file {
        init_logging(path)?;
    }
    tracing::info!(?config, "Configuration loaded");

    let landmasses = match config.landmass.as_deref() {
        Some(location) => geo::load(location, config.fetch_timeout()).unwrap_or_else(|e| {
            tracing::warn!(location, error = %e, "Landmass dataset unavailable, drawing without land");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let source = config
        .source
        .as_deref()
        .map(|location| net::source_for(location, config.fetch_timeout()));
    let sound: Box<dyn SoundCue> = if config.sound {
        Box::new(TerminalBell::stdout())
    } else {
        Box::new(Silent)
    };
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    Ok(AppState::new(&config, &landmasses, source, sound, rng))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // Load everything before touching the terminal so errors print plainly
    let mut app = build_app(cli)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
) -> Result<()> {
    let interval = Duration::from_millis(UI_INTERVAL_MS);
    loop {
        app.on_tick(Instant::now());
        terminal.draw(|f| ui::draw(f, app))?;

        if !app.running {
            return Ok(());
        }

        if event::poll(interval)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key_event(app, key.code);
                }
                Event::Mouse(mouse) => handle_mouse_event(app, mouse),
                // Resize needs nothing here: the next draw refits the projection
                _ => {}
            }
        }
    }
}
