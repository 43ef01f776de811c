// SPDX-License-Identifier: GPL-3.0-only

use barcode_scanner::backends::camera::types::CameraFacing;
use barcode_scanner::config::Config;
use barcode_scanner::constants::app_info;
use barcode_scanner::storage;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Mutex;

mod cli;

#[derive(Parser)]
#[command(name = "barcode-scanner")]
#[command(about = "Scan barcodes and QR codes with the camera")]
#[command(version = app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Start with the front camera
    #[arg(long)]
    front: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Decode a barcode from an image file
    Decode {
        /// Image to decode
        image: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so its logs go to a file
    init_logging(cli.command.is_none().then(storage::log_file_path));
    let mut config = Config::load(cli.config.as_deref());

    match cli.command {
        Some(Commands::List) => cli::list_cameras(),
        Some(Commands::Decode { image }) => cli::decode_image(&config, &image),
        None => {
            if cli.front {
                config.camera_facing = CameraFacing::Front;
            }
            barcode_scanner::terminal::run(config)
        }
    }
}

/// Set up tracing
///
/// Set RUST_LOG to control the level, e.g. RUST_LOG=debug or
/// RUST_LOG=barcode_scanner=trace.
fn init_logging(log_file: Option<PathBuf>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let file = log_file.and_then(|path| {
        let dir = path.parent()?;
        std::fs::create_dir_all(dir).ok()?;
        std::fs::File::create(&path).ok()
    });

    match file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_target(true)
            .with_writer(Mutex::new(file))
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init(),
    }
}
