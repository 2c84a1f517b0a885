use clap::{Parser, Subcommand};
use serial_button_bridge::config::{ConfigLoader, LogFormat, LoggingConfig};
use serial_button_bridge::{BridgeEvent, ButtonBridge, DeviceEnumerator, StatsSnapshot};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tokio::time::{self, Interval};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "button-bridge",
    version,
    about = "Headless host for USB serial button controllers.",
    long_about = "Finds an Arduino-style button controller, keeps the serial connection alive with bounded automatic reconnection, and prints debounced button presses and connection status until interrupted."
)]
struct Args {
    /// Configuration file (defaults to the standard lookup order)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List attached serial devices and mark likely controllers
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Connect and print events until Ctrl+C
    Run {
        /// Device path; auto-detected when omitted
        #[arg(short, long)]
        port: Option<String>,

        /// Print statistics every N seconds
        #[arg(long, value_name = "SECS")]
        stats_every: Option<u64>,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Write it to this file instead
        #[arg(long, value_name = "PATH")]
        write: Option<PathBuf>,
    },
}

// --- Main Application Entry Point ---
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    init_logging(&loader.config().logging);

    if let Some(path) = &loader.config_path {
        info!("Using configuration from {}", path.display());
    }

    match args.command {
        Command::List { json } => list_devices(&loader, json)?,
        Command::Run { port, stats_every } => run(&loader, port, stats_every).await?,
        Command::Config { write } => match write {
            Some(path) => {
                loader.save_to(&path)?;
                println!("Configuration written to {}", path.display());
            }
            None => print!("{}", toml::to_string_pretty(loader.config())?),
        },
    }

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(env_filter);

    match logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
}

fn list_devices(loader: &ConfigLoader, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let devices = DeviceEnumerator::new(&loader.config().discovery).list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No serial devices found.");
        return Ok(());
    }

    for device in &devices {
        let marker = if device.is_candidate { "*" } else { " " };
        println!("{} {:<24} {}", marker, device.path, device.description);
    }
    println!("\n* = likely button controller");
    Ok(())
}

async fn run(
    loader: &ConfigLoader,
    port: Option<String>,
    stats_every: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (bridge, mut events) = ButtonBridge::native(loader.config());

    match &port {
        Some(path) => {
            if !bridge.connect(path).await {
                bridge.shutdown().await;
                return Err(format!("could not open {}", path).into());
            }
        }
        None => {
            if !bridge.auto_connect().await {
                warn!("No controller connected yet, retrying in the background");
            }
        }
    }

    let mut stats_timer = stats_every.filter(|secs| *secs > 0).map(|secs| {
        let period = Duration::from_secs(secs);
        time::interval_at(time::Instant::now() + period, period)
    });

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            _ = next_tick(&mut stats_timer) => print_stats(&bridge.stats().await),
        }
    }

    print_stats(&bridge.stats().await);
    bridge.shutdown().await;
    Ok(())
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn print_event(event: &BridgeEvent) {
    match event {
        BridgeEvent::ButtonPressed(press) => println!(
            "{}  button {}",
            press.received_at.format("%H:%M:%S%.3f"),
            press.label
        ),
        BridgeEvent::Status(text) => println!("[status] {}", text),
        BridgeEvent::Connected(path) => println!("[connected] {}", path),
        BridgeEvent::Disconnected => println!("[disconnected]"),
        BridgeEvent::MaxReconnectReached => {
            println!("[gave up] max reconnect attempts reached, use Ctrl+C to exit")
        }
    }
}

fn print_stats(stats: &StatsSnapshot) {
    println!(
        "[stats] total={} blocked={} success={:.1}% window={}s",
        stats.total_presses, stats.blocked_presses, stats.success_rate, stats.uptime_secs
    );
    for (label, count) in &stats.presses_per_label {
        println!("          button {}: {}", label, count);
    }
}

// --- Graceful Shutdown Handler ---
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    println!("\nSignal received, shutting down...");
}
