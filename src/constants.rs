// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use crate::backends::camera::types::Resolution;
use std::time::Duration;

/// Camera pipeline constants
pub mod pipeline {
    use super::Resolution;

    /// Default size of the RGBA preview output
    pub const PREVIEW_RESOLUTION: Resolution = Resolution::new(640, 480);

    /// Default size of the GRAY8 analysis output
    ///
    /// Small enough to decode every frame on a laptop CPU, large enough for
    /// EAN-13 bars at arm's length.
    pub const ANALYSIS_RESOLUTION: Resolution = Resolution::new(540, 360);

    /// Preview frames queued for the UI before new ones are dropped
    pub const PREVIEW_CHANNEL_CAPACITY: usize = 2;

    /// Buffers held by the preview appsink
    pub const PREVIEW_MAX_BUFFERS: u32 = 2;

    /// Buffers held by the analysis appsink (keep-latest)
    pub const ANALYSIS_MAX_BUFFERS: u32 = 1;

    /// Output format of the preview branch
    pub const PREVIEW_FORMAT: &str = "RGBA";

    /// Output format of the analysis branch
    pub const ANALYSIS_FORMAT: &str = "GRAY8";
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Interval for logging frame statistics (every N frames)
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Timeout for the pipeline to stop (seconds)
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Timeout for the pipeline to start (seconds)
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// How long the analyzer worker waits for a frame before rechecking its
    /// stop signal
    pub const ANALYZER_WAIT: Duration = Duration::from_millis(100);

    /// How long a notice stays in the status bar
    pub const NOTICE_DURATION: Duration = Duration::from_secs(2);

    /// Terminal redraw / input poll period
    pub const UI_TICK: Duration = Duration::from_millis(33);
}

/// Decoding constants
pub mod decoding {
    /// Longest edge handed to the decoders; larger images are downscaled
    pub const MAX_DECODE_DIMENSION: u32 = 1280;
}

/// File format constants
pub mod file_formats {
    /// Image extensions offered by the picker
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff"];
}

/// Application information utilities
pub mod app_info {
    use std::path::Path;

    /// Directory name used under the config and cache dirs
    pub const APP_DIR: &str = "barcode-scanner";

    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }

    /// Check if the application is running inside a Flatpak sandbox
    pub fn is_flatpak() -> bool {
        Path::new("/.flatpak-info").exists()
    }

    /// Get the runtime environment string (e.g., "Flatpak" or "Native")
    pub fn runtime_environment() -> &'static str {
        if is_flatpak() { "Flatpak" } else { "Native" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picker_extensions_are_lowercase() {
        for ext in file_formats::IMAGE_EXTENSIONS {
            assert_eq!(*ext, ext.to_ascii_lowercase());
        }
    }
}
