// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON under `$XDG_CONFIG_HOME/barcode-scanner/config.json`.
//! Unknown keys are ignored and missing keys take their defaults, so older
//! files keep loading after fields are added.

use crate::app::frame_processor::BarcodeFormat;
use crate::backends::camera::types::{CameraFacing, Resolution, StreamConfig};
use crate::constants::{app_info, decoding, pipeline};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera used when the scanner starts
    pub camera_facing: CameraFacing,
    /// Size of the preview output
    pub preview_resolution: Resolution,
    /// Size of the frames handed to the analyzer
    pub analysis_resolution: Resolution,
    /// Formats searched for in live frames
    pub live_formats: Vec<BarcodeFormat>,
    /// Formats searched for in picked images
    pub still_image_formats: Vec<BarcodeFormat>,
    /// Longest edge handed to the decoders
    pub max_decode_dimension: u32,
    /// Show a notice when a picked image cannot be read
    pub report_image_load_errors: bool,
    /// Directory the image picker opens in (default: Pictures)
    pub picker_directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_facing: CameraFacing::Back,
            preview_resolution: pipeline::PREVIEW_RESOLUTION,
            analysis_resolution: pipeline::ANALYSIS_RESOLUTION,
            live_formats: BarcodeFormat::ALL.to_vec(),
            still_image_formats: BarcodeFormat::STILL_IMAGE_DEFAULT.to_vec(),
            max_decode_dimension: decoding::MAX_DECODE_DIMENSION,
            report_image_load_errors: false,
            picker_directory: None,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(app_info::APP_DIR).join(CONFIG_FILE))
    }

    /// Load the config, falling back to defaults
    ///
    /// A missing file is normal on first run. A malformed file is reported
    /// and ignored rather than overwritten.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            warn!("No config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                info!(path = %path.display(), "Config loaded");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }
        }
    }

    /// Load the config at `path`, reporting any error
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config.sanitized())
    }

    /// Shape of the two camera outputs
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            preview: self.preview_resolution,
            analysis: self.analysis_resolution,
        }
    }

    /// Directory the picker should open in
    pub fn picker_start_dir(&self) -> PathBuf {
        crate::storage::picker_start_dir(self.picker_directory.as_deref())
    }

    /// Replace values that would leave the scanner unable to work
    fn sanitized(mut self) -> Self {
        if self.live_formats.is_empty() {
            warn!("live_formats is empty, enabling all formats");
            self.live_formats = BarcodeFormat::ALL.to_vec();
        }
        if self.still_image_formats.is_empty() {
            warn!("still_image_formats is empty, using defaults");
            self.still_image_formats = BarcodeFormat::STILL_IMAGE_DEFAULT.to_vec();
        }
        if self.max_decode_dimension == 0 {
            self.max_decode_dimension = decoding::MAX_DECODE_DIMENSION;
        }
        for (resolution, default) in [
            (&mut self.preview_resolution, pipeline::PREVIEW_RESOLUTION),
            (&mut self.analysis_resolution, pipeline::ANALYSIS_RESOLUTION),
        ] {
            if resolution.width == 0 || resolution.height == 0 {
                warn!(%resolution, "Invalid resolution, using default");
                *resolution = default;
            }
        }
        self
    }
}
