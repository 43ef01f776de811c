// SPDX-License-Identifier: GPL-3.0-only

//! Message handler modules
//!
//! Handlers are grouped by feature and all extend `ScannerModel`.

mod camera;
mod permission;
mod result;
mod still_image;
