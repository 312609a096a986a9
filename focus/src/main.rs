use anyhow::Result;
use clap::{Parser, Subcommand};
use focus_ipc::{SessionType, SOCKET_PATH};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

mod clock;
mod config;
mod countdown;
mod events;
mod input;
mod ipc;
mod notify;
mod timer;
mod ui;

use clock::SystemClock;
use config::{config_path, load_settings, Settings};
use input::StdinReader;
use ipc::server;
use notify::DesktopNotifier;
use timer::{Collaborators, Overrides, SessionTimer, TimerConfig};
use ui::TerminalRenderer;

#[derive(Parser)]
#[command(name = "focus", version)]
#[command(about = "Focus is a cross-platform pomodoro app for the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Pomodoro interval duration in minutes (default: 25)
    #[arg(short, long, value_name = "MINS")]
    pomodoro: Option<u32>,

    /// Short break duration in minutes (default: 5)
    #[arg(short, long, value_name = "MINS")]
    short_break: Option<u32>,

    /// Long break duration in minutes (default: 15)
    #[arg(short, long, value_name = "MINS")]
    long_break: Option<u32>,

    /// Number of pomodoro sessions before a long break (default: 4)
    #[arg(long, value_name = "N")]
    long_break_interval: Option<u32>,

    /// Start pomodoros without waiting for ENTER
    #[arg(long)]
    auto_pomodoro: bool,

    /// Start breaks without waiting for ENTER
    #[arg(long)]
    auto_break: bool,

    /// Do not show desktop notifications
    #[arg(long)]
    disable_notifications: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the configuration file
    Config {
        /// Overwrite an existing file with the defaults
        #[arg(long)]
        reset: bool,
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            pomodoro: self.pomodoro,
            short_break: self.short_break,
            long_break: self.long_break,
            long_break_interval: self.long_break_interval,
            auto_start_pomodoro: self.auto_pomodoro,
            auto_start_break: self.auto_break,
            disable_notifications: self.disable_notifications,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they don't tear the countdown line
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { reset, show }) => run_config(reset, show),
        None => run_timer(cli.overrides()).await,
    }
}

fn run_config(reset: bool, show: bool) -> Result<()> {
    let path = config_path()?;

    if reset || !path.exists() {
        Settings::default().save_to(&path)?;
        println!("Wrote default configuration to {}", path.display());
    } else {
        println!("Configuration file: {}", path.display());
    }

    if show {
        let settings = Settings::load_from(&path)?;
        print!("{}", toml::to_string_pretty(&settings)?);
    }

    Ok(())
}

async fn run_timer(overrides: Overrides) -> Result<()> {
    let settings = load_settings()?;
    let config = TimerConfig::new(&settings, &overrides);

    let cancel = CancellationToken::new();
    let (control_tx, control_rx) = mpsc::channel(8);

    let socket = PathBuf::from(SOCKET_PATH);
    let server = match server::bind(&socket).await {
        Ok(listener) => Some(tokio::spawn(server::serve(
            listener,
            socket,
            control_tx,
            cancel.clone(),
        ))),
        Err(e) => {
            warn!("focusctl will not be able to reach this timer: {:#}", e);
            None
        }
    };

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => cancel.cancel(),
                Err(e) => error!("Failed to listen for ctrl-c: {}", e),
            }
        });
    }

    let collaborators = Collaborators {
        clock: Box::new(SystemClock),
        renderer: Box::new(TerminalRenderer::stdout(settings.theme.clone())),
        notifier: Box::new(DesktopNotifier::new()),
        input: Box::new(StdinReader::spawn()),
    };
    let mut timer = SessionTimer::new(config, collaborators).with_control(control_rx);

    timer.run(SessionType::Pomodoro, cancel.clone()).await;

    cancel.cancel();
    if let Some(server) = server {
        let _ = server.await;
    }

    if !timer.events().is_empty() {
        println!();
        println!("{}", timer.events().summary().line());
    }

    Ok(())
}
