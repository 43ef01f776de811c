// SPDX-License-Identifier: GPL-3.0-only

//! Platform services the scanner depends on
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              App Layer (model)               │
//! └────────────────────┬────────────────────────┘
//!                      │ effects
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐    │
//! │  │   Camera    │    │   Permissions    │    │
//! │  │ (PipeWire)  │    │ (portal / nodes) │    │
//! │  └─────────────┘    └──────────────────┘    │
//! │  ┌─────────────┐    ┌──────────────────┐    │
//! │  │   Picker    │    │    Clipboard     │    │
//! │  │   (rfd)     │    │    (arboard)     │    │
//! │  └─────────────┘    └──────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Camera backend with device enumeration and frame capture
//! - [`permissions`]: Camera and storage permission checks and prompts
//! - [`picker`]: Single-image chooser
//! - [`clipboard`]: Plain-text clipboard writes

pub mod camera;
pub mod clipboard;
pub mod permissions;
pub mod picker;
