//! # tmprint CLI
//!
//! Command-line front end for the discovery and printing workflows. It runs
//! against the simulated SDK, so everything works without hardware.
//!
//! ## Usage
//!
//! ```bash
//! # List supported printer models
//! tmprint models
//!
//! # Scan for 3 seconds and list what was found
//! tmprint discover
//!
//! # Scan for specific simulated devices, output JSON
//! tmprint discover --device TM-P80=BT:00:01:90:AA:BB:CC --json
//!
//! # Print an image and save what the paper would look like
//! tmprint print --target BT:00:01:90:AA:BB:CC --image receipt.png --preview paper.png
//! ```
//!
//! Set `RUST_LOG=tmprint=debug` to see SDK events.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use tmprint::{
    DiscoveryScreen, PrintScreen, PrinterModel, Selection, TmprintError,
    permissions::StaticPermissions,
    render::{preview, view::ImageView},
    sdk::{
        DeviceInfo,
        sim::{SimDiscovery, SimPrinterFactory},
    },
};

/// tmprint - Receipt printer discovery and printing
#[derive(Parser, Debug)]
#[command(name = "tmprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List supported printer models
    Models,

    /// Scan for printers and list them
    Discover {
        /// How long to scan, in seconds
        #[arg(long, default_value = "3")]
        seconds: u64,

        /// Output the device list as JSON
        #[arg(long)]
        json: bool,

        /// Simulated device to announce (repeatable)
        #[arg(long = "device", value_name = "NAME=TARGET", value_parser = parse_device)]
        devices: Vec<DeviceInfo>,

        /// Delay between simulated announcements, in milliseconds
        #[arg(long, default_value = "200")]
        interval_ms: u64,

        /// Platform version reported to the permission flow
        #[arg(long, default_value = "33")]
        platform_version: u32,

        /// Deny Bluetooth permissions
        #[arg(long)]
        deny: bool,

        /// Select the device at this index after scanning
        #[arg(long)]
        select: Option<usize>,
    },

    /// Print an image as a receipt
    Print {
        /// Connection target of the printer
        #[arg(long)]
        target: String,

        /// Image to print
        #[arg(long, value_name = "FILE")]
        image: PathBuf,

        /// Printer model
        #[arg(long, default_value = "tm-p80")]
        model: String,

        /// Save a preview of the printed paper as PNG
        #[arg(long, value_name = "FILE")]
        preview: Option<PathBuf>,

        /// Simulate a printer that is connected but offline
        #[arg(long)]
        offline: bool,

        /// Simulate a printer that cannot be reached
        #[arg(long)]
        unreachable: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "tmprint=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), TmprintError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Models => {
            list_models();
            Ok(())
        }
        Commands::Discover {
            seconds,
            json,
            devices,
            interval_ms,
            platform_version,
            deny,
            select,
        } => {
            let devices = if devices.is_empty() {
                default_devices()
            } else {
                devices
            };
            let sdk = SimDiscovery::new()
                .with_devices(devices)
                .with_interval(Duration::from_millis(interval_ms));
            let mut host = if deny {
                StaticPermissions::denied(platform_version)
            } else {
                StaticPermissions::granted(platform_version)
            };

            discover(sdk, &mut host, Duration::from_secs(seconds), json, select)
        }
        Commands::Print {
            target,
            image,
            model,
            preview,
            offline,
            unreachable,
        } => {
            let model =
                PrinterModel::by_name(&model).ok_or_else(|| TmprintError::UnknownModel(model))?;
            let sdk = SimPrinterFactory::new();
            if offline {
                sdk.set_online(false);
            }
            if unreachable {
                sdk.set_reachable(Vec::<String>::new());
            }

            print(sdk, model, target, image, preview)
        }
    }
}

fn list_models() {
    println!("Available models:");
    for model in PrinterModel::list() {
        println!(
            "  {:<8} {:>4} dots  {:>3} DPI  {:.0}mm",
            model.name,
            model.width_dots,
            model.dpi,
            model.width_mm()
        );
    }
}

fn default_devices() -> Vec<DeviceInfo> {
    vec![
        DeviceInfo::new("TM-P80", "BT:00:01:90:AA:BB:CC"),
        DeviceInfo::new("TM-m30", "TCP:192.168.1.40"),
    ]
}

/// Parse `NAME=TARGET`.
fn parse_device(s: &str) -> Result<DeviceInfo, String> {
    match s.split_once('=') {
        Some((name, target)) if !name.is_empty() && !target.is_empty() => {
            Ok(DeviceInfo::new(name, target))
        }
        _ => Err(format!("expected NAME=TARGET, got '{}'", s)),
    }
}

/// Run the discovery screen for `window` and report what it found.
fn discover(
    sdk: SimDiscovery,
    host: &mut StaticPermissions,
    window: Duration,
    json: bool,
    select: Option<usize>,
) -> Result<(), TmprintError> {
    let mut screen = DiscoveryScreen::new(sdk);
    if !screen.open(host) {
        return Err(TmprintError::PermissionDenied(
            "Bluetooth access is required to scan".to_string(),
        ));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(async {
        let deadline = tokio::time::sleep(window);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                found = screen.next_device() => match found {
                    Some(device) => info!(name = %device.device_name, "found"),
                    None => break,
                },
            }
        }
    });
    screen.stop()?;

    if json {
        let out = serde_json::to_string_pretty(screen.devices()).map_err(std::io::Error::from)?;
        println!("{}", out);
    } else if screen.devices().is_empty() {
        println!("No printers found.");
    } else {
        println!("Found printers:");
        for (i, device) in screen.devices().iter().enumerate() {
            println!("  {:>2}  {:<10} {}", i, device.device_name, device.target);
        }
    }

    if let Some(index) = select {
        let Selection { target } = screen.select(index).ok_or(TmprintError::NoTarget)?;
        println!("Selected {}", target);
    }

    Ok(())
}

/// Run the printing screen on an image file.
fn print(
    sdk: SimPrinterFactory,
    model: PrinterModel,
    target: String,
    image: PathBuf,
    preview_path: Option<PathBuf>,
) -> Result<(), TmprintError> {
    let view = ImageView::open(&image)?.fit_width(model.width_dots as u32);
    let mut screen = PrintScreen::open(sdk.clone(), model, Some(Selection { target }));

    println!("Printing {} on {}...", image.display(), model.name);
    let printed = screen.print_view(&view);

    if !printed {
        return Err(TmprintError::PrintFailed(
            "printer did not accept the data".to_string(),
        ));
    }
    println!("Printed successfully!");

    if let Some(path) = preview_path {
        if let Some(job) = sdk.last_job() {
            let paper = preview::render_job(&model, &job.commands);
            preview::save_png(&path, &paper)?;
            println!("Saved preview to {}", path.display());
        }
    }

    Ok(())
}
