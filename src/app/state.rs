// SPDX-License-Identifier: GPL-3.0-only

//! Application state types
//!
//! [`Message`]s flow into the model, [`Effect`]s flow out of it. Every
//! asynchronous completion carries the token it was issued under so the
//! model can tell a live answer from a late one.

use crate::app::frame_processor::DecodedBarcode;
use crate::backends::camera::CameraStream;
use crate::backends::camera::types::{CameraFacing, CameraRequest};
use crate::backends::permissions::Permission;
use crate::errors::{AppError, CameraError, DecodeError};
use image::GrayImage;
use std::path::PathBuf;

/// Messages handled by [`ScannerModel::update`](crate::app::ScannerModel::update)
#[derive(Debug)]
pub enum Message {
    // ===== Lifecycle =====
    /// The scanner screen is shown; starts the camera (permission permitting)
    ViewAttached,
    /// The scanner screen is going away
    Shutdown,

    // ===== Permissions =====
    /// Answer to a permission prompt
    PermissionResult {
        permission: Permission,
        granted: bool,
    },

    // ===== Camera =====
    /// Opening the camera finished
    CameraOpened {
        token: u64,
        result: Result<Box<dyn CameraStream>, CameraError>,
    },
    /// The analyzer found a barcode in a live frame
    FrameDecoded {
        generation: u64,
        barcode: DecodedBarcode,
    },
    /// Switch the torch on or off
    ToggleTorch,
    /// Switch between back and front camera
    FlipCamera,

    // ===== Still image =====
    /// Pick an image from storage
    PickImage,
    /// Picker closed; `None` when cancelled
    ImagePicked(Option<PathBuf>),
    /// Picked image read from disk
    StillImageLoaded {
        token: u64,
        result: Result<GrayImage, AppError>,
    },
    /// One-shot decode of the picked image finished
    StillImageDecoded {
        token: u64,
        result: Result<DecodedBarcode, DecodeError>,
    },

    // ===== Result panel =====
    /// Copy the shown result to the clipboard
    CopyResult,
    /// Clipboard write finished
    CopyFinished(Result<(), String>),
    /// Open the shown result with the desktop's handler
    OpenResultLink,
    /// Back navigation
    Back,
}

/// Asynchronous work requested by the model
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Show the permission prompt; answers with [`Message::PermissionResult`]
    RequestPermission(Permission),
    /// Acquire a camera and bind its outputs; answers with [`Message::CameraOpened`]
    AcquireCamera { token: u64, request: CameraRequest },
    /// Open the image chooser; answers with [`Message::ImagePicked`]
    OpenImagePicker,
    /// Read an image; answers with [`Message::StillImageLoaded`]
    LoadStillImage { token: u64, path: PathBuf },
    /// Decode a loaded image; answers with [`Message::StillImageDecoded`]
    DecodeStillImage { token: u64, image: GrayImage },
    /// Write text to the clipboard; answers with [`Message::CopyFinished`]
    CopyToClipboard(String),
    /// Hand a URI to the desktop opener (no answer)
    OpenLink(String),
}

/// A short-lived message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Picked image contains no recognisable barcode
    BarcodeNotRecognized,
    /// Decoding the picked image failed
    ImageDecodeFailed,
    /// Picked image could not be read (only when enabled in the config)
    ImageLoadFailed,
    CameraPermissionDenied,
    StoragePermissionDenied,
    /// The requested camera does not exist
    CameraNotSupported(CameraFacing),
    /// Result copied to the clipboard
    Copied,
    /// The shown result has nothing to open
    NothingToOpen,
}

impl Notice {
    /// Text shown in the status bar
    pub fn message(&self) -> String {
        match self {
            Notice::BarcodeNotRecognized => "No barcode recognized".to_string(),
            Notice::ImageDecodeFailed => "Could not decode the image".to_string(),
            Notice::ImageLoadFailed => "Could not read the image".to_string(),
            Notice::CameraPermissionDenied => "Camera permission denied".to_string(),
            Notice::StoragePermissionDenied => "Storage permission denied".to_string(),
            Notice::CameraNotSupported(facing) => {
                format!("This device has no {} camera", facing)
            }
            Notice::Copied => "Copied to clipboard".to_string(),
            Notice::NothingToOpen => "Nothing to open".to_string(),
        }
    }

    /// Notice for a denied permission
    pub fn denied(permission: Permission) -> Self {
        match permission {
            Permission::Camera => Notice::CameraPermissionDenied,
            Permission::StorageRead => Notice::StoragePermissionDenied,
        }
    }
}

/// The result panel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPanel {
    barcode: Option<DecodedBarcode>,
}

impl ResultPanel {
    pub fn is_visible(&self) -> bool {
        self.barcode.is_some()
    }

    /// Decoded text, while visible
    pub fn text(&self) -> Option<&str> {
        self.barcode.as_ref().map(|b| b.text.as_str())
    }

    pub fn barcode(&self) -> Option<&DecodedBarcode> {
        self.barcode.as_ref()
    }

    pub(crate) fn show(&mut self, barcode: DecodedBarcode) {
        self.barcode = Some(barcode);
    }

    pub(crate) fn hide(&mut self) {
        self.barcode = None;
    }
}

/// Features held back by the permission gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatedAction {
    StartCamera,
    OpenPicker,
}

impl GatedAction {
    /// Permission the action needs
    pub fn permission(self) -> Permission {
        match self {
            GatedAction::StartCamera => Permission::Camera,
            GatedAction::OpenPicker => Permission::StorageRead,
        }
    }
}

/// Still-image work in progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct StillImageState {
    /// Token of the current load/decode; completions with another token are stale
    pub token: u64,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::frame_processor::BarcodeFormat;

    #[test]
    fn test_panel_show_hide() {
        let mut panel = ResultPanel::default();
        assert!(!panel.is_visible());

        panel.show(DecodedBarcode::new(BarcodeFormat::Ean13, "8412345678905"));
        assert!(panel.is_visible());
        assert_eq!(panel.text(), Some("8412345678905"));

        panel.hide();
        assert_eq!(panel.text(), None);
    }

    #[test]
    fn test_denied_notice_per_permission() {
        assert_eq!(
            Notice::denied(Permission::Camera),
            Notice::CameraPermissionDenied
        );
        assert_eq!(
            Notice::denied(Permission::StorageRead),
            Notice::StoragePermissionDenied
        );
        assert_eq!(
            Notice::CameraNotSupported(CameraFacing::Front).message(),
            "This device has no front camera"
        );
    }
}
