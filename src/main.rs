use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bugcastle::config::Config;
use bugcastle::engine::{GameEngine, SubmissionOutcome};
use bugcastle::generator::GroqGenerator;
use bugcastle::router::{Event, Outcome, Router};
use bugcastle::session::{FileSessionStore, Sessions};

/// Bugcastle - session orchestration core for the Castle of Bugs debugging adventure
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Sessions file (overrides config file)
    #[arg(long)]
    sessions_file: Option<PathBuf>,

    /// User identity for the local console driver
    #[arg(long, default_value_t = 0)]
    user: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let mut config = Config::load(&args.config)?;
    if let Some(path) = args.sessions_file {
        config.sessions_file = path;
    }

    let api_key = std::env::var(&config.generator.api_key_env)
        .with_context(|| format!("environment variable {} not set", config.generator.api_key_env))?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.generator.timeout_seconds))
        .build()
        .context("failed to build http client")?;
    let generator = Arc::new(GroqGenerator::new(
        client,
        api_key,
        config.generator.base_url.clone(),
        config.generator.model.clone(),
        config.generator.temperature,
        config.generator.max_tokens,
    ));

    let store = FileSessionStore::new(config.sessions_file.clone());
    let sessions = Sessions::from_map(store.load_all().await);
    info!(sessions = sessions.len().await, "startup recovery complete");

    let engine = Arc::new(GameEngine::new(
        sessions,
        store,
        generator,
        config.final_room,
    ));
    let router = Router::new(engine.clone());

    run_console(&router, args.user).await?;

    engine.shutdown().await;
    Ok(())
}

/// Minimal line-based driver standing in for a chat transport.
///
/// Slash commands map to the event taxonomy; any other non-empty line is a
/// solution attempt.
async fn run_console(router: &Router, user_id: i64) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    println!("Castle of Bugs - /enter /hint /progress /reveal /leave /quit");

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = signal::ctrl_c() => {
                println!();
                info!("received Ctrl+C, shutting down");
                break;
            }
        };
        let Some(input) = line else {
            println!();
            break;
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" || input == "/exit" {
            break;
        }

        let event = match input {
            "/enter" => Event::EnterCastle,
            "/hint" => Event::RequestHint,
            "/leave" => Event::LeaveGame,
            "/progress" => Event::ShowProgress,
            "/reveal" => Event::RevealSolution,
            other => Event::Submission(other.to_string()),
        };

        println!("{}", render(router.dispatch(user_id, event).await));
    }

    Ok(())
}

fn render(outcome: Outcome) -> String {
    match outcome {
        Outcome::RoomPresented {
            room_number,
            description,
            buggy_snippet,
        } => format!("Room {room_number}\n{description}\n\nCursed code:\n{buggy_snippet}\n\nSend the fixed code to break the spell."),
        Outcome::HintGiven(hint) => format!("A ghost whispers: {hint}"),
        Outcome::HintUnavailable => {
            "The ghosts of the castle have fallen silent. Try again later.".to_string()
        }
        Outcome::Submission(SubmissionOutcome::Incorrect { attempts }) => format!(
            "The bug still stands. Failed attempts in this room: {attempts}."
        ),
        Outcome::Submission(SubmissionOutcome::Advanced(view)) => format!(
            "The spell is broken! A passage opens to room {}.\n{}\n\nCursed code:\n{}",
            view.room_number, view.description, view.buggy_snippet
        ),
        Outcome::Submission(SubmissionOutcome::Victory) => {
            "You defeated the final bug and escaped the Castle of Bugs!".to_string()
        }
        Outcome::Submission(SubmissionOutcome::FatalFailure) => {
            "The castle collapses around you. The game is over.".to_string()
        }
        Outcome::ProgressReport {
            room_number,
            attempts,
            final_room,
        } => format!("Room {room_number} of {final_room}, failed attempts here: {attempts}."),
        Outcome::SolutionRevealed(solution) => format!("God mode - the solution:\n{solution}"),
        Outcome::GenerationFailed => {
            "The castle gate is jammed by a mysterious bug. Try again shortly.".to_string()
        }
        Outcome::Departed => "You teleport out of the castle.".to_string(),
        Outcome::Busy => "Still concentrating on the current spell, wait a moment...".to_string(),
        Outcome::NoActiveSession => {
            "You are outside the castle walls. Use /enter to begin.".to_string()
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
