//! Fear Tracker CLI
//!
//! Thin wrapper around feartracker-core for command-line usage. Commands run
//! a tracker session against the settings stored in the data directory; the
//! CLI also stands in for the game system when writing its settings.
//!
//! ## Usage
//!
//! ```bash
//! # Show the current fear and the pip bar
//! feartracker status
//!
//! # Activate one pip, or three
//! feartracker add
//! feartracker add 3
//!
//! # Deactivate pips
//! feartracker remove 2
//!
//! # Write the game system's fear value, as the system would
//! feartracker set-authority 5
//!
//! # Change the homebrew maximum (a number or the raw homebrew JSON)
//! feartracker set-max 20
//! feartracker set-max '{"maxFear": 8}'
//!
//! # Show or hide the tracker for players
//! feartracker toggle-visibility
//!
//! # Move the overlay back to the top center
//! feartracker reset-position
//!
//! # Run a gamemaster and players in memory
//! feartracker simulate --players 2 --steps +1,+2,authority=5,max=8,-1
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use feartracker_core::settings::{SYSTEM_FEAR, SYSTEM_HOMEBREW, VISIBILITY};
use feartracker_core::{
    register_system_settings, BroadcastChannel, ClientId, HubPort, Length, LocalHub, MemoryStore,
    MemorySurface, RedbStore, Role, SettingKey, SettingsStore, SyncOutcome, TrackerConfig,
    TrackerSession,
};
use serde_json::{json, Value};
use tracing::{debug, info};

const WORLD_DB: &str = "world.redb";
const CLIENT_DB: &str = "client.redb";
const DEFAULT_STEPS: &str = "+1,+2,authority=5,max=8,-1";

/// Fear Tracker - Shared Fear Pips
#[derive(Parser)]
#[command(name = "feartracker")]
#[command(version = "0.1.0")]
#[command(about = "Fear Tracker - shared fear pips for the whole table")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Data directory (default: ~/.feartracker/data)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Role of this client: gm or player
    #[arg(short, long, global = true, default_value = "gm")]
    role: Role,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current fear and the pip bar
    Status,

    /// Activate pips
    Add {
        /// Number of pips
        #[arg(default_value_t = 1)]
        n: u32,
    },

    /// Deactivate pips
    Remove {
        /// Number of pips
        #[arg(default_value_t = 1)]
        n: u32,
    },

    /// Write the game system's fear value
    SetAuthority {
        /// New fear value
        #[arg(allow_hyphen_values = true)]
        value: f64,
    },

    /// Write the game system's homebrew maximum
    SetMax {
        /// A number, or the homebrew settings as JSON
        value: String,
    },

    /// Show or hide the tracker for players
    ToggleVisibility,

    /// Move the overlay; omitted coordinates mean top center
    ResetPosition {
        /// Left edge, in pixels or any CSS length
        #[arg(long)]
        x: Option<String>,
        /// Top edge, in pixels or any CSS length
        #[arg(long)]
        y: Option<String>,
    },

    /// Run a gamemaster and players in memory and print every client
    Simulate {
        /// Number of players at the table
        #[arg(short, long, default_value_t = 2)]
        players: usize,

        /// Steps: +n, -n, authority=n, max=n, toggle
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        steps: Vec<String>,
    },
}

/// One simulation step
#[derive(Debug, Clone, PartialEq)]
enum Step {
    Add(u32),
    Remove(u32),
    Authority(f64),
    Max(u32),
    Toggle,
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "toggle" {
            return Ok(Step::Toggle);
        }
        if let Some(n) = s.strip_prefix('+') {
            return Ok(Step::Add(n.parse().context("Invalid step count")?));
        }
        if let Some(n) = s.strip_prefix('-') {
            return Ok(Step::Remove(n.parse().context("Invalid step count")?));
        }
        if let Some(n) = s.strip_prefix("authority=") {
            return Ok(Step::Authority(n.parse().context("Invalid authority value")?));
        }
        if let Some(n) = s.strip_prefix("max=") {
            return Ok(Step::Max(n.parse().context("Invalid maximum")?));
        }
        Err(anyhow!(
            "Unknown step: {}. Valid steps: +n, -n, authority=n, max=n, toggle",
            s
        ))
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".feartracker")
        .join("data")
}

/// Parse a coordinate: bare numbers are pixels, anything else is CSS
fn parse_length(s: &str) -> Length {
    match s.trim().parse::<f64>() {
        Ok(px) => Length::Px(px),
        Err(_) => Length::Css(s.to_string()),
    }
}

/// Homebrew value for `set-max`: a number becomes `{"maxFear": n}`, JSON is
/// stored as text the way the game system stores it
fn homebrew_value(raw: &str) -> Result<Value> {
    if let Ok(n) = raw.trim().parse::<f64>() {
        return Ok(json!({ "maxFear": n }));
    }
    serde_json::from_str::<Value>(raw)
        .with_context(|| format!("Not a number or JSON: {}", raw))?;
    Ok(Value::String(raw.to_string()))
}

fn pip_bar(surface: &MemorySurface) -> String {
    surface
        .slots
        .iter()
        .map(|slot| if slot.active { '●' } else { '○' })
        .collect()
}

fn print_status<S, C>(session: &TrackerSession<S, C>)
where
    S: SettingsStore,
    C: BroadcastChannel,
{
    let state = session.snapshot();
    let visible = session
        .world()
        .get(&SettingKey::module(VISIBILITY))
        .and_then(|v| v.as_bool())
        .unwrap_or(true);

    println!("Fear Tracker");
    println!("  Role: {}", session.role());
    println!("  Fear: {} / {}", state.active_count, state.max);
    println!("  Inactive pips: {}", state.left_side_count);
    match state.authority.as_ref().and_then(|a| a.number()) {
        Some(n) => println!("  Authority: {}", n),
        None => println!("  Authority: (not set)"),
    }
    println!("  Visible: {}", if visible { "yes" } else { "no" });

    session.with_surface(|surface| match &surface.position {
        Some(position) if surface.is_mounted() => {
            println!("  Position: {}", position);
            println!();
            println!("  [{}]", pip_bar(surface));
        }
        _ => println!("  (tracker hidden on this client)"),
    });
}

async fn open_session(data_dir: &Path, role: Role) -> Result<TrackerSession<RedbStore, HubPort>> {
    let config = TrackerConfig::load(data_dir).context("Failed to load config")?;
    let world = RedbStore::new(data_dir.join(WORLD_DB)).context("Failed to open world store")?;
    let client = RedbStore::new(data_dir.join(CLIENT_DB)).context("Failed to open client store")?;
    register_system_settings(&world);
    debug!(data_dir = %data_dir.display(), %role, "Opened settings stores");

    let hub = LocalHub::new();
    let session = TrackerSession::new(
        role,
        world,
        client,
        hub.join(ClientId::new()),
        MemorySurface::new(),
        config,
    );
    session.start().await;
    session.pump().await;
    Ok(session)
}

fn check_outcome(outcome: SyncOutcome) -> Result<()> {
    match outcome {
        SyncOutcome::Written(_) | SyncOutcome::Unchanged | SyncOutcome::Deferred => Ok(()),
        SyncOutcome::NotPermitted => bail!("Only the gamemaster can change fear"),
        SyncOutcome::Failed => bail!("The settings store rejected the change"),
    }
}

async fn simulate(players: usize, steps: Vec<String>) -> Result<()> {
    let steps: Vec<Step> = if steps.is_empty() {
        DEFAULT_STEPS.split(',').map(Step::from_str).collect::<Result<_>>()?
    } else {
        steps.iter().map(|s| Step::from_str(s)).collect::<Result<_>>()?
    };

    info!(players, steps = steps.len(), "Starting simulation");
    let world = MemoryStore::new();
    register_system_settings(&world);
    let hub = LocalHub::new();
    let join = |role| {
        TrackerSession::new(
            role,
            world.clone(),
            MemoryStore::new(),
            hub.join(ClientId::new()),
            MemorySurface::new(),
            TrackerConfig::default(),
        )
    };

    let mut sessions = vec![join(Role::Gamemaster)];
    sessions.extend((0..players).map(|_| join(Role::Player)));
    for session in &sessions {
        session.start().await;
    }
    TrackerSession::settle(&sessions).await;

    let gm = sessions[0].clone();
    print_table("start", &sessions);
    for step in steps {
        debug!(?step, "Applying simulation step");
        match &step {
            Step::Add(n) => {
                gm.add_fear(*n).await;
            }
            Step::Remove(n) => {
                gm.remove_fear(*n).await;
            }
            Step::Authority(n) => {
                world.set(&SettingKey::system(SYSTEM_FEAR), json!(n)).await?;
            }
            Step::Max(n) => {
                world
                    .set(&SettingKey::system(SYSTEM_HOMEBREW), json!({ "maxFear": n }))
                    .await?;
            }
            Step::Toggle => {
                gm.toggle_visibility().await;
            }
        }
        TrackerSession::settle(&sessions).await;
        print_table(&format!("{:?}", step), &sessions);
    }
    Ok(())
}

fn print_table(label: &str, sessions: &[TrackerSession<MemoryStore, HubPort>]) {
    let state = sessions[0].snapshot();
    println!("{} (fear {} / {})", label, state.active_count, state.max);
    for (i, session) in sessions.iter().enumerate() {
        let name = if i == 0 {
            "gm".to_string()
        } else {
            format!("player {}", i)
        };
        session.with_surface(|surface| {
            println!("  {:<9} [{}] opacity {}", name, pip_bar(surface), surface.opacity);
        });
    }
}

async fn run(command: Commands, data_dir: &Path, role: Role) -> Result<()> {
    let session = open_session(data_dir, role).await?;

    match command {
        Commands::Status => {}

        Commands::Add { n } => check_outcome(session.add_fear(n).await)?,

        Commands::Remove { n } => check_outcome(session.remove_fear(n).await)?,

        Commands::SetAuthority { value } => {
            info!(value, "Writing system fear value");
            session
                .world()
                .set(&SettingKey::system(SYSTEM_FEAR), json!(value))
                .await?;
        }

        Commands::SetMax { value } => {
            info!(%value, "Writing homebrew maximum");
            session
                .world()
                .set(&SettingKey::system(SYSTEM_HOMEBREW), homebrew_value(&value)?)
                .await?;
        }

        Commands::ToggleVisibility => {
            let visible = session
                .toggle_visibility()
                .await
                .ok_or_else(|| anyhow!("Only the gamemaster can toggle visibility"))?;
            println!("Tracker is now {}", if visible { "visible" } else { "hidden" });
        }

        Commands::ResetPosition { x, y } => {
            let position = session
                .reset_position(x.as_deref().map(parse_length), y.as_deref().map(parse_length))
                .await?;
            println!("Tracker moved to {}", position);
        }

        Commands::Simulate { players, steps } => return simulate(players, steps).await,
    }

    let handled = session.pump().await;
    debug!(handled, "Drained pending notifications");
    print_status(&session);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match cli.command {
        Commands::Simulate { players, steps } => simulate(players, steps).await,
        command => {
            let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
            run(command, &data_dir, cli.role).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        assert_eq!(Step::from_str("+2").unwrap(), Step::Add(2));
        assert_eq!(Step::from_str("-1").unwrap(), Step::Remove(1));
        assert_eq!(Step::from_str("authority=4.5").unwrap(), Step::Authority(4.5));
        assert_eq!(Step::from_str("max=20").unwrap(), Step::Max(20));
        assert_eq!(Step::from_str(" toggle ").unwrap(), Step::Toggle);
        assert!(Step::from_str("jump").is_err());
        assert!(Step::from_str("+x").is_err());
    }

    #[test]
    fn test_default_steps_parse() {
        assert!(DEFAULT_STEPS.split(',').all(|s| Step::from_str(s).is_ok()));
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("120"), Length::Px(120.0));
        assert_eq!(parse_length("10%"), Length::Css("10%".into()));
    }

    #[test]
    fn test_homebrew_value() {
        assert_eq!(homebrew_value("20").unwrap(), json!({ "maxFear": 20.0 }));
        assert_eq!(
            homebrew_value("{\"maxFear\": 8}").unwrap(),
            json!("{\"maxFear\": 8}")
        );
        assert!(homebrew_value("lots").is_err());
    }
}
