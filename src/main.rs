use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use openthings_rs::util::parse_hex_lenient;
use openthings_rs::{
    init_logger, log_info, EngineConfig, MockTransceiver, OpenThingsEngine,
};

#[derive(Parser)]
#[command(name = "openthings-cli")]
#[command(about = "CLI tool for the OpenThings RF protocol")]
struct Cli {
    /// JSON file with engine tuning overrides
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Hex frame to preload into the mock radio (repeatable)
    #[arg(short = 'f', long = "frame")]
    frames: Vec<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Switch a mains-powered device on or off
    Switch {
        product_id: u8,
        device_id: u32,
        /// Switch off instead of on
        #[arg(long)]
        off: bool,
        #[arg(short, long, default_value = "20")]
        xmits: u8,
    },
    /// Transmit a command immediately, without caching
    Send {
        product_id: u8,
        device_id: u32,
        command: u8,
        value: f32,
        #[arg(short, long, default_value = "20")]
        xmits: u8,
    },
    /// Park a command for a battery device's next receive window
    Cache {
        product_id: u8,
        device_id: u32,
        command: u8,
        value: f32,
        #[arg(short, long, default_value = "10")]
        retries: u8,
    },
    /// Cancel whatever command is parked for a device
    Cancel { product_id: u8, device_id: u32 },
    /// Poll once for a reading
    Receive {
        #[arg(default_value = "5000")]
        timeout_ms: u64,
    },
    /// Stream readings until the air goes quiet
    Monitor {
        #[arg(short, long, default_value = "500")]
        poll_ms: u64,
        /// Stop after this long without a reading
        #[arg(short, long, default_value = "2000")]
        idle_ms: u64,
    },
    /// List known devices, scanning the air first if none are known
    Devices {
        /// Scan again even if devices are already known
        #[arg(long)]
        rescan: bool,
    },
    /// Acknowledge a device's join request
    JoinAck {
        product_id: u8,
        device_id: u32,
        #[arg(short, long, default_value = "20")]
        xmits: u8,
    },
}

fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    let radio = MockTransceiver::new();
    for hex in &cli.frames {
        let bytes = parse_hex_lenient(hex).with_context(|| format!("bad frame {hex:?}"))?;
        radio.inject_frame(bytes);
    }
    let engine = Arc::new(OpenThingsEngine::with_config(Box::new(radio), config));
    engine.initialize(false)?;

    match cli.command {
        Commands::Switch {
            product_id,
            device_id,
            off,
            xmits,
        } => {
            engine.switch(product_id, device_id, !off, xmits)?;
            log_info("Switch transmitted");
        }
        Commands::Send {
            product_id,
            device_id,
            command,
            value,
            xmits,
        } => {
            engine.send_command(product_id, device_id, command, value, xmits)?;
            log_info("Command transmitted");
        }
        Commands::Cache {
            product_id,
            device_id,
            command,
            value,
            retries,
        } => {
            engine.cache_command(product_id, device_id, command, value, retries)?;
            log_info("Command cached for the device's next receive window");
        }
        Commands::Cancel {
            product_id,
            device_id,
        } => {
            engine.cache_command(product_id, device_id, 0, 0.0, 0)?;
            log_info("Cached command cancelled");
        }
        Commands::Receive { timeout_ms } => match engine.receive(timeout_ms)? {
            Some(reading) => println!("{}", serde_json::to_string(&reading)?),
            None => log_info("Nothing received"),
        },
        Commands::Monitor { poll_ms, idle_ms } => {
            let rx = engine.start_monitor(poll_ms);
            while let Ok(reading) = rx.recv_timeout(Duration::from_millis(idle_ms)) {
                println!("{}", serde_json::to_string(&reading)?);
            }
            engine.stop_monitoring();
        }
        Commands::Devices { rescan } => {
            for row in engine.device_list(rescan)? {
                println!("{}", serde_json::to_string(&row)?);
            }
        }
        Commands::JoinAck {
            product_id,
            device_id,
            xmits,
        } => {
            engine.join_ack(product_id, device_id, xmits)?;
            log_info("Join acknowledged");
        }
    }

    engine.shutdown()?;
    Ok(())
}
