// SPDX-License-Identifier: GPL-3.0-only

//! Camera handlers
//!
//! Starting, binding and stopping the live session, live results and the
//! torch.

use crate::app::ScannerModel;
use crate::app::frame_processor::DecodedBarcode;
use crate::app::session::BindOutcome;
use crate::app::state::{Effect, GatedAction, Notice};
use crate::backends::camera::CameraStream;
use crate::backends::permissions::Permission;
use crate::errors::CameraError;
use tracing::{debug, info};

impl ScannerModel {
    pub(crate) fn handle_view_attached(&mut self) -> Vec<Effect> {
        info!("Scanner view attached");
        self.gated(GatedAction::StartCamera)
    }

    /// Start (or restart) the live session
    ///
    /// Live scanning and still-image decoding are exclusive, so any
    /// still-image work is abandoned first.
    pub(crate) fn start_camera(&mut self) -> Vec<Effect> {
        self.cancel_still_image();
        let (token, request) = self.session.begin_start();
        vec![Effect::AcquireCamera { token, request }]
    }

    /// Restart scanning after the screen freed up, without prompting
    pub(crate) fn resume_scanning(&mut self) -> Vec<Effect> {
        if self.panel.is_visible() || self.still.active {
            return Vec::new();
        }
        if !self.gate.is_granted(Permission::Camera) {
            debug!("Not resuming camera, permission not granted");
            return Vec::new();
        }
        self.start_camera()
    }

    pub(crate) fn handle_camera_opened(
        &mut self,
        token: u64,
        result: Result<Box<dyn CameraStream>, CameraError>,
    ) -> Vec<Effect> {
        match self.session.on_camera_opened(token, result) {
            BindOutcome::NotSupported(facing) => self.notify(Notice::CameraNotSupported(facing)),
            BindOutcome::Bound { .. } | BindOutcome::Stale | BindOutcome::Failed => {}
        }
        Vec::new()
    }

    pub(crate) fn handle_frame_decoded(
        &mut self,
        generation: u64,
        barcode: DecodedBarcode,
    ) -> Vec<Effect> {
        if !self.session.accepts(generation) {
            debug!(generation, "Late live result ignored");
            return Vec::new();
        }
        self.session.stop();
        self.show_result(barcode);
        Vec::new()
    }

    pub(crate) fn handle_toggle_torch(&mut self) -> Vec<Effect> {
        self.session.toggle_torch();
        Vec::new()
    }

    pub(crate) fn handle_flip_camera(&mut self) -> Vec<Effect> {
        self.session.flip();
        if self.panel.is_visible() || self.still.active {
            return Vec::new();
        }
        self.gated(GatedAction::StartCamera)
    }

    pub(crate) fn handle_shutdown(&mut self) -> Vec<Effect> {
        info!("Scanner shutting down");
        self.shut_down = true;
        self.cancel_still_image();
        self.gate.cancel(GatedAction::StartCamera);
        self.gate.cancel(GatedAction::OpenPicker);
        self.session.shutdown();
        Vec::new()
    }
}
