// SPDX-License-Identifier: GPL-3.0-only

//! Still-image handlers
//!
//! A picked image replaces the live session until its one-shot decode is
//! done. Every completion carries the token it was issued under; anything
//! else is a leftover from abandoned work.

use crate::app::ScannerModel;
use crate::app::frame_processor::DecodedBarcode;
use crate::app::state::{Effect, GatedAction, Notice};
use crate::errors::{AppError, DecodeError};
use image::GrayImage;
use std::path::PathBuf;
use tracing::{debug, info, warn};

impl ScannerModel {
    pub(crate) fn handle_pick_image(&mut self) -> Vec<Effect> {
        self.gated(GatedAction::OpenPicker)
    }

    pub(crate) fn handle_image_picked(&mut self, path: Option<PathBuf>) -> Vec<Effect> {
        let Some(path) = path else {
            debug!("Image picker cancelled");
            return Vec::new();
        };

        self.session.stop();
        self.gate.cancel(GatedAction::StartCamera);

        self.still.token += 1;
        self.still.active = true;
        info!(path = %path.display(), token = self.still.token, "Decoding picked image");
        vec![Effect::LoadStillImage {
            token: self.still.token,
            path,
        }]
    }

    pub(crate) fn handle_still_image_loaded(
        &mut self,
        token: u64,
        result: Result<GrayImage, AppError>,
    ) -> Vec<Effect> {
        if !self.is_current_still(token) {
            return Vec::new();
        }

        match result {
            Ok(image) => vec![Effect::DecodeStillImage { token, image }],
            Err(e) => {
                warn!(error = %e, "Picked image could not be loaded");
                self.still.active = false;
                if self.config.report_image_load_errors {
                    self.notify(Notice::ImageLoadFailed);
                }
                self.resume_scanning()
            }
        }
    }

    pub(crate) fn handle_still_image_decoded(
        &mut self,
        token: u64,
        result: Result<DecodedBarcode, DecodeError>,
    ) -> Vec<Effect> {
        if !self.is_current_still(token) {
            return Vec::new();
        }
        self.still.active = false;

        match result {
            Ok(barcode) => {
                self.show_result(barcode);
                Vec::new()
            }
            Err(DecodeError::Empty) => {
                info!("No barcode in picked image");
                self.notify(Notice::BarcodeNotRecognized);
                self.resume_scanning()
            }
            Err(DecodeError::Failed(e)) => {
                warn!(error = %e, "Picked image decode failed");
                self.notify(Notice::ImageDecodeFailed);
                self.resume_scanning()
            }
        }
    }

    /// Abandon still-image work in progress
    pub(crate) fn cancel_still_image(&mut self) {
        if self.still.active {
            debug!(token = self.still.token, "Still-image work abandoned");
            self.still.active = false;
            self.still.token += 1;
        }
    }

    fn is_current_still(&self, token: u64) -> bool {
        let current = self.still.active && token == self.still.token;
        if !current {
            debug!(token, current = self.still.token, "Stale still-image completion ignored");
        }
        current
    }
}
