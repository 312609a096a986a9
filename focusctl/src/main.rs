use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use focus_ipc::{send_command, Command, Event, Response, TimerStatus};

#[derive(Parser)]
#[command(name = "focusctl")]
#[command(about = "Control a running focus timer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current session and time left
    Status,
    /// List the sessions of this run
    Events,
    /// End the current session early and start the next one
    Skip,
    /// Stop the timer
    Stop,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Convert CLI command to IPC command
    let command = match cli.command {
        Commands::Status => Command::Status,
        Commands::Events => Command::Events,
        Commands::Skip => Command::Skip,
        Commands::Stop => Command::Stop,
    };

    let response = send_command(&command).await?;

    match response {
        Response::Ok => println!("OK"),
        Response::Status(status) => print_status(&status),
        Response::Events(events) => print_events(&events),
        Response::Error(e) => bail!("{}", e),
    }

    Ok(())
}

fn print_status(status: &TimerStatus) {
    if status.session.is_break() {
        println!("Session: {}", status.session);
    } else {
        println!(
            "Session: {} {}/{}",
            status.session, status.iteration, status.long_break_interval
        );
    }

    if status.awaiting_input {
        println!("Waiting for ENTER to start");
        return;
    }

    let left = status.remaining_seconds.max(0);
    println!("Remaining: {:02}:{:02}", left / 60, left % 60);
    if let Some(end) = status.end_time {
        println!("Until: {}", end.format("%I:%M:%S %p"));
    }
}

fn print_events(events: &[Event]) {
    if events.is_empty() {
        println!("No sessions yet");
        return;
    }
    for event in events {
        let ended = event
            .actual_end_time
            .map_or("-".to_string(), |t| t.format("%H:%M:%S").to_string());
        println!(
            "{} {:<12} {:<10} {:>3}m  ended {}",
            event.start_time.format("%H:%M:%S"),
            event.session.label(),
            event.status.to_string(),
            event.duration,
            ended
        );
    }
}
