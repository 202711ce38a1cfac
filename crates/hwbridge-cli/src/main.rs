// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// hwbridge: inspect ALSA rawmidi devices and exercise the fingerprint
// bridge against the simulated HAL.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use hwbridge_core::status::subdevice_count_code;
use hwbridge_core::{BridgeConfig, BridgeError};
use hwbridge_fingerprint::sim::{SimulatedDevice, SimulatedModule};
use hwbridge_fingerprint::{FingerprintBridge, FingerprintDevice, ModuleRegistry};
use hwbridge_midi::RawMidi;

type Result<T> = std::result::Result<T, BridgeError>;

/// Hardware bridge tool
#[derive(Parser)]
#[command(name = "hwbridge", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// ALSA rawmidi devices
    Midi {
        #[command(subcommand)]
        command: MidiCommand,
    },
    /// Fingerprint bridge
    Fingerprint {
        #[command(subcommand)]
        command: FingerprintCommand,
    },
    /// Configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum MidiCommand {
    /// List rawmidi devices on a card
    Devices {
        #[arg(long, default_value_t = 0)]
        card: u32,
    },
    /// Print the subdevice count the way nativeGetSubdeviceCount reports it
    Count {
        #[arg(long, default_value_t = 0)]
        card: u32,
        #[arg(long, default_value_t = 0)]
        device: u32,
    },
    /// Describe a device as published to MIDI clients
    Info {
        #[arg(long, default_value_t = 0)]
        card: u32,
        #[arg(long, default_value_t = 0)]
        device: u32,
        /// Device id to publish under
        #[arg(long, default_value_t = 0)]
        id: i32,
    },
    /// Open every subdevice, report the descriptors, then close them
    Open {
        #[arg(long, default_value_t = 0)]
        card: u32,
        #[arg(long, default_value_t = 0)]
        device: u32,
        /// Subdevices to open; defaults to the driver's count
        #[arg(long)]
        count: Option<usize>,
    },
}

#[derive(Subcommand)]
enum FingerprintCommand {
    /// Run open, enroll, authenticate, remove and close against a simulated HAL
    Simulate {
        /// Samples the simulated enrollment takes
        #[arg(long, default_value_t = 3)]
        samples: u32,
        #[arg(long, default_value_t = 0)]
        group: u32,
        /// API version the simulated device reports
        #[arg(long)]
        hal_version: Option<u32>,
        /// Delay between simulated touches, in milliseconds
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write the default configuration to a file
    Init { path: PathBuf },
}

fn setup_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let default = if verbose { "debug" } else { "info" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };

    match cli.command {
        Commands::Midi { command } => midi(&config, command),
        Commands::Fingerprint { command } => fingerprint(&config, command),
        Commands::Config { command } => match command {
            ConfigCommand::Show => {
                println!("{}", serde_json::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigCommand::Init { path } => {
                BridgeConfig::default().save(&path)?;
                info!(path = %path.display(), "wrote default configuration");
                Ok(())
            }
        },
    }
}

// ---------------------------------------------------------------------------
// midi
// ---------------------------------------------------------------------------

fn midi(config: &BridgeConfig, command: MidiCommand) -> Result<()> {
    let rawmidi = RawMidi::from_config(&config.midi);
    match command {
        MidiCommand::Devices { card } => {
            let devices = rawmidi.devices(card)?;
            if devices.is_empty() {
                println!("card {card}: no rawmidi devices");
            }
            for device in devices {
                match rawmidi.info(card, device) {
                    Ok(info) => println!(
                        "hw:{card},{device}  {:<24} {:<24} subdevices {}/{}",
                        info.id, info.name, info.subdevices_avail, info.subdevices_count
                    ),
                    Err(e) => println!("hw:{card},{device}  <{e}>"),
                }
            }
            Ok(())
        }
        MidiCommand::Count { card, device } => {
            println!("{}", subdevice_count_code(&rawmidi.subdevice_count(card, device)));
            Ok(())
        }
        MidiCommand::Info { card, device, id } => {
            let info = rawmidi.describe(id, card, device)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
        MidiCommand::Open {
            card,
            device,
            count,
        } => {
            let count = match count {
                Some(count) => count,
                None => rawmidi.subdevice_count(card, device)? as usize,
            };
            let handles = rawmidi.open_subdevices(card, device, count)?;
            for (index, handle) in handles.iter().enumerate() {
                println!("subdevice {index}: {handle:?}");
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// fingerprint
// ---------------------------------------------------------------------------

fn fingerprint(config: &BridgeConfig, command: FingerprintCommand) -> Result<()> {
    let FingerprintCommand::Simulate {
        samples,
        group,
        hal_version,
        delay_ms,
    } = command;

    let mut device =
        SimulatedDevice::new().with_enroll_samples(samples, Duration::from_millis(delay_ms));
    if let Some(version) = hal_version {
        device = device.with_version(version);
    }
    let device = Arc::new(device);

    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(SimulatedModule::new(
        config.fingerprint.module_id.clone(),
        Arc::clone(&device),
    )));

    let listener = |msg_type: i32, arg1: i32, arg2: i32, arg3: i32| {
        println!("notify({msg_type}, {arg1}, {arg2}, {arg3})");
    };
    let (bridge, looper) =
        FingerprintBridge::init(config.fingerprint.clone(), Arc::new(registry), listener)?;

    let result = run_session(&bridge, &device, group);

    // The looper exits once the device's callback and the bridge are gone.
    device.set_notify(None);
    drop(bridge);
    if looper.join().is_err() {
        warn!("fingerprint looper panicked");
    }
    result
}

fn run_session(bridge: &FingerprintBridge, device: &SimulatedDevice, group: u32) -> Result<()> {
    let opened = bridge.open_hal()?;
    info!(handle = opened.handle.get(), "HAL open");
    if let Some(mismatch) = opened.version_mismatch {
        warn!(
            expected = mismatch.expected,
            actual = mismatch.actual,
            "HAL version mismatch"
        );
    }

    bridge.enroll(60, group)?;
    device.join_workers();

    bridge.authenticate(1, group)?;
    device.join_workers();

    if let Some(finger) = device.enrolled().first() {
        bridge.remove(finger.fid, finger.gid)?;
        device.join_workers();
    }

    match bridge.close_hal() {
        Ok(()) => info!("HAL closed"),
        Err(BridgeError::Unsupported) => info!("closeHal not supported, device left open"),
        Err(e) => return Err(e),
    }
    Ok(())
}
