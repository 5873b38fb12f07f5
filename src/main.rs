//! SMA06F Subjugation Protocol
//!
//! Fictional hacking terminal. For artistic purposes only.

use anyhow::Context;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use subjugation_protocol::game::{FlavorTextProvider, GeminiProvider, Session, SystemClock};
use subjugation_protocol::tui::App;
use subjugation_protocol::{logging, ConsoleConfig, Result};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "subjugation-protocol", version, about = "Fictional hacking terminal")]
struct Cli {
    /// Config file (TOML); defaults to the per-user config if present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the generative flavor-text provider
    #[arg(long)]
    offline: bool,

    /// Seed for the progress and log jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Where diagnostic logs go
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConsoleConfig::resolve(cli.config.as_deref())?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let log_path = cli.log_file.clone().unwrap_or_else(logging::default_log_path);
    logging::init(&log_path)?;
    info!(version = subjugation_protocol::VERSION, "console starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let provider: Option<Box<dyn FlavorTextProvider>> = if cli.offline {
        None
    } else {
        match GeminiProvider::from_config(&config.flavor, runtime.handle().clone()) {
            Ok(provider) => Some(Box::new(provider)),
            Err(err) => {
                warn!(error = %err, "flavor text disabled");
                None
            }
        }
    };

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let session = Session::new(config, Arc::new(SystemClock::new()), rng, provider);
    let mut app = App::new(session);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = run(&mut terminal, &mut app);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("console exiting");
    println!("\nDisconnecting terminal. Stay hidden, operator.\n");
    outcome
}

fn run<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while app.running {
        app.tick();
        terminal.draw(|frame| app.render(frame))?;
        if !app.handle_input()? {
            break;
        }
    }
    Ok(())
}
