// SPDX-License-Identifier: GPL-3.0-only

//! Result panel handlers

use crate::app::ScannerModel;
use crate::app::frame_processor::DecodedBarcode;
use crate::app::state::{Effect, GatedAction, Notice};
use tracing::{debug, info, warn};

impl ScannerModel {
    pub(crate) fn show_result(&mut self, barcode: DecodedBarcode) {
        info!(
            format = %barcode.format,
            kind = barcode.action().kind_label(),
            "Showing result"
        );
        self.panel.show(barcode);
    }

    pub(crate) fn handle_copy_result(&mut self) -> Vec<Effect> {
        match self.panel.text() {
            Some(text) => vec![Effect::CopyToClipboard(text.to_string())],
            None => {
                debug!("Copy ignored, no result shown");
                Vec::new()
            }
        }
    }

    pub(crate) fn handle_copy_finished(&mut self, result: Result<(), String>) -> Vec<Effect> {
        match result {
            Ok(()) => self.notify(Notice::Copied),
            Err(e) => warn!(error = %e, "Clipboard write failed"),
        }
        Vec::new()
    }

    pub(crate) fn handle_open_result_link(&mut self) -> Vec<Effect> {
        let Some(target) = self.panel.barcode().map(|b| b.action().open_target()) else {
            return Vec::new();
        };

        match target {
            Some(target) => vec![Effect::OpenLink(target)],
            None => {
                self.notify(Notice::NothingToOpen);
                Vec::new()
            }
        }
    }

    /// Back hides the result and resumes scanning; with no result shown it exits
    pub(crate) fn handle_back(&mut self) -> Vec<Effect> {
        if self.panel.is_visible() {
            self.panel.hide();
            info!("Result dismissed, resuming scan");
            return self.gated(GatedAction::StartCamera);
        }

        info!("Back with no result shown, exiting");
        self.exit_requested = true;
        Vec::new()
    }
}
