// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing tasks
//!
//! This module contains the decoder abstraction and its implementation.

pub mod barcode_decoder;

pub use barcode_decoder::{BarcodeDecoder, MultiFormatDecoder, decode_first};
