// SPDX-License-Identifier: GPL-3.0-only

//! Barcode Scanner - camera barcode and QR code scanner for the Linux desktop
//!
//! # Architecture
//!
//! - [`app`]: scanner model, permission gate, camera session, frame analyzer
//! - [`backends`]: camera (PipeWire/GStreamer), permissions, picker, clipboard
//! - [`config`]: user configuration
//! - [`storage`]: picked-image loading and log file location
//! - [`terminal`]: terminal front end
//!
//! # Example
//!
//! ```ignore
//! // Scan with the camera in the terminal:
//! //   barcode-scanner
//! // Decode an image file:
//! //   barcode-scanner decode label.png
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod flash;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::frame_processor::{BarcodeFormat, ContentAction, DecodedBarcode};
pub use app::{Effect, Message, Notice, ScannerModel};
pub use config::Config;
