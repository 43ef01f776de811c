// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the scanner
//!
//! Every failure in the scanner is terminal for the action that triggered it
//! and none of them is fatal to the process: they end up as a notice in the
//! status bar or as a log line.

use crate::backends::camera::types::CameraFacing;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Errors of file-backed operations
#[derive(Debug, Clone)]
pub enum AppError {
    /// A still image could not be read or decoded into pixels
    ImageLoad(String),
    /// Configuration errors
    Config(String),
}

/// Camera session errors
#[derive(Debug, Clone)]
pub enum CameraError {
    /// The requested camera is not physically present
    NotSupported(CameraFacing),
    /// Acquiring the camera provider failed
    AcquisitionFailed(String),
    /// Binding the preview and analysis outputs failed
    BindFailed(String),
}

/// Outcome of a decode attempt that did not produce a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The image was processed but no barcode was recognised
    Empty,
    /// The decoding library reported an error
    Failed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ImageLoad(msg) => write!(f, "Failed to load image: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NotSupported(facing) => write!(f, "No {} camera available", facing),
            CameraError::AcquisitionFailed(msg) => write!(f, "Acquisition failed: {}", msg),
            CameraError::BindFailed(msg) => write!(f, "Bind failed: {}", msg),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "No barcode recognized"),
            DecodeError::Failed(msg) => write!(f, "Decoding failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for DecodeError {}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::ImageLoad(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
