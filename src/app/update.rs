// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! `update()` only dispatches; the handling code lives in the `handlers`
//! submodules, one per feature:
//!
//! - `handlers::permission`: permission answers and gated actions
//! - `handlers::camera`: camera start, binding, live results, torch
//! - `handlers::still_image`: picking, loading and decoding an image
//! - `handlers::result`: result panel, clipboard, links, back navigation

use crate::app::ScannerModel;
use crate::app::state::{Effect, Message};
use tracing::debug;

impl ScannerModel {
    /// Apply `message` and return the work it requires
    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        if self.shut_down {
            debug!(?message, "Message after shutdown ignored");
            return Vec::new();
        }

        match message {
            // ===== Lifecycle =====
            Message::ViewAttached => self.handle_view_attached(),
            Message::Shutdown => self.handle_shutdown(),

            // ===== Permissions =====
            Message::PermissionResult {
                permission,
                granted,
            } => self.handle_permission_result(permission, granted),

            // ===== Camera =====
            Message::CameraOpened { token, result } => {
                self.handle_camera_opened(token, result)
            }
            Message::FrameDecoded {
                generation,
                barcode,
            } => self.handle_frame_decoded(generation, barcode),
            Message::ToggleTorch => self.handle_toggle_torch(),
            Message::FlipCamera => self.handle_flip_camera(),

            // ===== Still image =====
            Message::PickImage => self.handle_pick_image(),
            Message::ImagePicked(path) => self.handle_image_picked(path),
            Message::StillImageLoaded { token, result } => {
                self.handle_still_image_loaded(token, result)
            }
            Message::StillImageDecoded { token, result } => {
                self.handle_still_image_decoded(token, result)
            }

            // ===== Result panel =====
            Message::CopyResult => self.handle_copy_result(),
            Message::CopyFinished(result) => self.handle_copy_finished(result),
            Message::OpenResultLink => self.handle_open_result_link(),
            Message::Back => self.handle_back(),
        }
    }
}
