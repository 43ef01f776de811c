// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - Listing available cameras
//! - Decoding a barcode from an image file

use barcode_scanner::app::frame_processor::{MultiFormatDecoder, decode_first};
use barcode_scanner::backends::camera::CameraBackendManager;
use barcode_scanner::config::Config;
use barcode_scanner::errors::DecodeError;
use barcode_scanner::storage;
use std::path::Path;

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    gstreamer::init()?;

    let provider = CameraBackendManager::new().acquire()?;
    let cameras = provider.devices();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {} ({})", index, camera.name, camera.facing);
        println!("      Path: {}", camera.path);
    }

    Ok(())
}

/// Decode the first barcode in `image` and print its payload
///
/// Exits with status 1 when nothing is recognised.
pub fn decode_image(config: &Config, image: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let luma = storage::load_still_image(image)?;
    let decoder = MultiFormatDecoder::with_max_dimension(
        config.still_image_formats.iter().copied(),
        config.max_decode_dimension,
    );

    match decode_first(&decoder, &luma) {
        Ok(barcode) => {
            eprintln!("{} ({})", barcode.format, barcode.action().kind_label());
            println!("{}", barcode.text);
            Ok(())
        }
        Err(DecodeError::Empty) => {
            eprintln!("No barcode recognized in {}", image.display());
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
