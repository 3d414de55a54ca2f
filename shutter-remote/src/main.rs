//! Shutter Remote - drive the camera remote from a desktop
//!
//! BLE cameras are reached through the host's adapter; IR frames are logged.
//!
//! Usage:
//!   SHUTTER_HOME=/tmp/shutter cargo run -p shutter-remote -- <command>
//!
//! Commands:
//!   run [--config PATH]        - Interactive remote (n, p, t, b, q)
//!   scan [--duration SECS]     - List nearby BLE devices and their addresses
//!   config init [--force]      - Write the default config
//!   config show                - Print the active config
//!   config path                - Print where the config lives

use clap::{Parser, Subcommand};
use log::{info, warn};
use shutter_host::{ble, ir::DryRunIr, peripheral::UnsupportedPeripheral, store};
use shutter_mcu::{CommandDispatcher, EventQueue, InputEvent, RemoteConfig};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "shutter-remote")]
#[command(about = "Trigger IR and BLE cameras from one remote")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the remote interactively
    Run {
        /// Config file to use instead of $SHUTTER_HOME/config.json
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Scan for BLE devices
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write the default config
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the active config
    Show,
    /// Print the config file location
    Path,
}

/// One line typed at the prompt
enum Key {
    Input(InputEvent),
    Quit,
}

fn get_home() -> PathBuf {
    std::env::var("SHUTTER_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".shutter")
        })
}

fn config_path() -> PathBuf {
    get_home().join("config.json")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let path = config.unwrap_or_else(config_path);
            cmd_run(&path).await?
        }
        Commands::Scan { duration } => cmd_scan(duration).await?,
        Commands::Config { action } => run_config(action)?,
    }

    Ok(())
}

// ============================================================================
// Remote
// ============================================================================

fn print_help() {
    println!("Keys (then Enter):");
    println!("  n  next camera");
    println!("  p  previous camera");
    println!("  t  trigger shutter");
    println!("  b  back / clear message");
    println!("  q  quit");
}

fn parse_key(line: &str) -> Option<Key> {
    match line.trim() {
        "n" | "next" => Some(Key::Input(InputEvent::SelectNext)),
        "p" | "prev" => Some(Key::Input(InputEvent::SelectPrevious)),
        "t" | "trigger" => Some(Key::Input(InputEvent::Trigger)),
        "b" | "back" => Some(Key::Input(InputEvent::Back)),
        "q" | "quit" => Some(Key::Quit),
        _ => None,
    }
}

/// Read stdin on a plain thread; the loop below picks keys up between ticks
fn spawn_key_reader() -> mpsc::UnboundedReceiver<Key> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_key(&line) {
                Some(key) => {
                    if tx.send(key).is_err() {
                        return;
                    }
                }
                None => print_help(),
            }
        }
        let _ = tx.send(Key::Quit);
    });
    rx
}

async fn cmd_run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = store::load_or_create(path)?;
    info!("using config {}", path.display());

    let events = EventQueue::new();
    let central = ble::HostCentral::new(events.sink()).await?;
    let mut remote = CommandDispatcher::new(
        &config,
        DryRunIr::default(),
        central,
        UnsupportedPeripheral,
        events,
    )?;
    remote.start();

    print_help();
    let mut keys = spawn_key_reader();
    let started = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_interval_ms.max(1)));
    let mut shown = String::new();

    loop {
        ticker.tick().await;

        while let Ok(key) = keys.try_recv() {
            match key {
                Key::Input(input) => {
                    if let Some(Err(e)) = remote.handle_input(input) {
                        warn!("trigger failed: {e}");
                    }
                }
                Key::Quit => return Ok(()),
            }
        }

        let now = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        remote.poll(now);

        let status = remote.status_text();
        if status != shown {
            println!("{status}");
            shown = status;
        }
    }
}

// ============================================================================
// Scan
// ============================================================================

async fn cmd_scan(duration: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("Scanning for BLE devices ({} seconds)...", duration);
    let devices = ble::scan(duration).await?;

    let cameras: Vec<_> = devices.iter().filter(|d| d.is_camera).collect();
    let others: Vec<_> = devices.iter().filter(|d| !d.is_camera).collect();

    if !cameras.is_empty() {
        println!("\nCameras:");
        for device in &cameras {
            let rssi = device.rssi.map(|r| format!(" ({}dBm)", r)).unwrap_or_default();
            println!("  {} - {}{}", device.name, device.address, rssi);
        }
    }

    if !others.is_empty() {
        println!("\nOther devices:");
        for device in &others {
            let rssi = device.rssi.map(|r| format!(" ({}dBm)", r)).unwrap_or_default();
            println!("  {} - {}{}", device.name, device.address, rssi);
        }
    }

    if cameras.is_empty() {
        println!("\nNo cameras found.");
        println!("Make sure the camera is awake and its wireless remote mode is on.");
    } else {
        println!("\nPut the addresses into {}", config_path().display());
    }

    Ok(())
}

// ============================================================================
// Config
// ============================================================================

fn run_config(cmd: ConfigCommands) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path();

    match cmd {
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                return Err(format!("{} already exists, use --force", path.display()).into());
            }
            store::save(&path, &RemoteConfig::default())?;
            println!("Wrote default config to {}", path.display());
        }
        ConfigCommands::Show => {
            let config = store::load_or_create(&path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Path => println!("{}", path.display()),
    }

    Ok(())
}
