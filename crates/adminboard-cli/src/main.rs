//! adminboard - an interactive console over the admin dashboard's session core.
//!
//! Restores a saved session or prompts for credentials, then accepts
//! commands. Every line typed counts as activity; after the idle timeout
//! the session ends and the login prompt returns.

mod commands;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use adminboard_core::{
    ActivityHub, ActivityKind, Config, CredentialStore, FileStore, LogoutReason, SessionManager,
};
use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{describe_profile, open_message, section_listing, Command, HELP_TEXT};

// ============================================================================
// Constants
// ============================================================================

/// Failed attempts allowed before the console exits
const MAX_LOGIN_ATTEMPTS: usize = 3;

const LOG_FILE_PREFIX: &str = "adminboard";

type Manager = SessionManager<CredentialStore>;
type InputLines = Lines<BufReader<Stdin>>;

/// What ended an interactive session
enum SessionEnd {
    LoggedOut,
    Quit,
}

/// Initialize the tracing subscriber, writing to a log file beside the
/// session storage since the terminal is in use
fn init_tracing(log_dir: &Path) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir);

    match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            warn!(error = %e, "File logging unavailable, logging to stderr");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: {:#}. Using default settings.", e);
        Config::default()
    });
    let storage_dir = config.storage_dir()?;
    let store = FileStore::new(&storage_dir)
        .with_context(|| format!("Failed to open session storage in {}", storage_dir.display()))?;

    let _log_guard = init_tracing(&storage_dir);
    info!(storage = %store.path().display(), "adminboard starting");

    let hub = ActivityHub::new();
    let manager = SessionManager::builder(CredentialStore::demo())
        .store(Arc::new(store))
        .activity_source(Arc::new(hub.clone()))
        .settings(config.session_settings())
        .build();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let result = run(&manager, &hub, &mut config, &mut lines).await;

    // Keep the session on disk for next time; only release the watchdog
    manager.shutdown();
    info!("adminboard shutting down");
    result
}

async fn run(
    manager: &Manager,
    hub: &ActivityHub,
    config: &mut Config,
    lines: &mut InputLines,
) -> Result<()> {
    if manager.restore() {
        if let Some(profile) = manager.current_profile() {
            println!("Welcome back, {}.", profile.display_name);
        }
    }

    loop {
        if !manager.is_authenticated() && !login(manager, config, lines).await? {
            return Ok(());
        }

        println!("Type 'help' for commands.");
        match run_session(manager, hub, lines).await? {
            SessionEnd::LoggedOut => continue,
            SessionEnd::Quit => return Ok(()),
        }
    }
}

fn prompt(text: &str) -> Result<()> {
    print!("{}", text);
    io::stdout().flush().context("Failed to write prompt")
}

/// Prompt for credentials until a login succeeds or attempts run out.
/// Returns false if the user gave up.
async fn login(manager: &Manager, config: &mut Config, lines: &mut InputLines) -> Result<bool> {
    let default_identifier = std::env::var("ADMINBOARD_IDENTIFIER")
        .ok()
        .or_else(|| config.last_identifier.clone())
        .unwrap_or_default();
    let mut env_secret = std::env::var("ADMINBOARD_SECRET").ok();

    for attempt in 1..=MAX_LOGIN_ATTEMPTS {
        if default_identifier.is_empty() {
            prompt("Email: ")?;
        } else {
            prompt(&format!("Email [{}]: ", default_identifier))?;
        }
        let Some(line) = lines.next_line().await? else {
            return Ok(false);
        };
        let identifier = match line.trim() {
            "" => default_identifier.clone(),
            typed => typed.to_string(),
        };

        // An env-provided secret is tried once only
        let secret = match env_secret.take() {
            Some(secret) => secret,
            None => tokio::task::spawn_blocking(|| rpassword::prompt_password("Password: "))
                .await
                .context("Password prompt task failed")?
                .context("Failed to read password")?,
        };

        match manager.login(&identifier, &secret).await {
            Ok(profile) => {
                println!("Signed in as {} ({}).", profile.display_name, profile.role);
                if config.last_identifier.as_deref() != Some(identifier.as_str()) {
                    config.last_identifier = Some(identifier);
                    if let Err(e) = config.save() {
                        warn!(error = %e, "Failed to save config");
                    }
                }
                return Ok(true);
            }
            Err(e) => {
                let left = MAX_LOGIN_ATTEMPTS - attempt;
                println!("{}. {} attempt(s) left.", e, left);
            }
        }
    }

    println!("Too many failed attempts.");
    Ok(false)
}

async fn run_session(
    manager: &Manager,
    hub: &ActivityHub,
    lines: &mut InputLines,
) -> Result<SessionEnd> {
    let mut updates = manager.subscribe();
    prompt("> ")?;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(SessionEnd::Quit);
                }
                let snapshot = updates.borrow_and_update().clone();
                if !snapshot.is_authenticated() {
                    announce_logout(snapshot.logout_reason);
                    return Ok(SessionEnd::LoggedOut);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(SessionEnd::Quit);
                };
                hub.emit(ActivityKind::Key);
                if !manager.is_authenticated() {
                    announce_logout(manager.snapshot().logout_reason);
                    return Ok(SessionEnd::LoggedOut);
                }

                if let Some(end) = execute(manager, Command::parse(&line)) {
                    return Ok(end);
                }
                prompt("> ")?;
            }
        }
    }
}

fn announce_logout(reason: Option<LogoutReason>) {
    match reason {
        Some(LogoutReason::Expired) => {
            println!("\nSession expired after inactivity. Please sign in again.")
        }
        _ => println!("Signed out."),
    }
}

fn execute(manager: &Manager, command: Command) -> Option<SessionEnd> {
    match command {
        Command::WhoAmI => {
            if let Some(profile) = manager.current_profile() {
                println!(
                    "{}",
                    describe_profile(&profile, manager.last_activity(), manager.time_until_expiry())
                );
            }
        }
        Command::Sections => {
            if let Some(role) = manager.role() {
                println!("{}", section_listing(role));
            }
        }
        Command::Open(path) => println!("{}", open_message(manager.role(), &path)),
        Command::Logout => {
            manager.logout();
            println!("Signed out.");
            return Some(SessionEnd::LoggedOut);
        }
        Command::Help => println!("{}", HELP_TEXT),
        Command::Quit => return Some(SessionEnd::Quit),
        Command::Empty => {}
        Command::Unknown(input) => println!("Unknown command: {} (try 'help')", input),
    }
    None
}
