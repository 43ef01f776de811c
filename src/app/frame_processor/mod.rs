// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing for barcode detection
//!
//! Live frames reach the [`FrameAnalyzer`] through a keep-latest slot and
//! are decoded one at a time on its worker thread. Still images skip the
//! analyzer and go straight to a [`BarcodeDecoder`].

pub mod analyzer;
pub mod luma;
pub mod tasks;
pub mod types;

pub use analyzer::{AnalyzerInput, FrameAnalyzer};
pub use tasks::{BarcodeDecoder, MultiFormatDecoder, decode_first};
pub use types::{BarcodeFormat, ContentAction, DecodedBarcode, WifiSecurity};
