// SPDX-License-Identifier: GPL-3.0-only

//! Scanner application model
//!
//! # Architecture
//!
//! - `state`: messages, effects, notices and the result panel
//! - `session`: the live camera session and its analyzer attachment
//! - `permission_gate`: holds gated actions until their permission is granted
//! - `frame_processor`: luma conversion, barcode decoding and the live analyzer
//! - `update` / `handlers`: message handling, split by feature
//! - `runtime`: executes effects and posts their completions back
//!
//! `ScannerModel` is owned by the UI thread. Everything that blocks or waits
//! runs as an [`Effect`] and comes back as a [`Message`].

pub mod frame_processor;
mod handlers;
pub mod permission_gate;
pub mod runtime;
pub mod session;
pub mod state;
mod update;

pub use permission_gate::{GateDecision, PermissionGate, Resolution};
pub use runtime::{EffectRunner, Platform};
pub use session::{BindOutcome, CameraSession};
pub use state::{Effect, GatedAction, Message, Notice, ResultPanel};

use crate::backends::camera::types::FrameSender;
use crate::backends::permissions::PermissionBroker;
use crate::config::Config;
use frame_processor::{BarcodeDecoder, FrameAnalyzer};
use state::StillImageState;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// State of the scanner screen
pub struct ScannerModel {
    config: Config,
    gate: PermissionGate,
    session: CameraSession,
    panel: ResultPanel,
    still: StillImageState,
    notices: Vec<Notice>,
    exit_requested: bool,
    shut_down: bool,
}

impl ScannerModel {
    /// Create the model and start the analyzer worker
    ///
    /// Live decode results are posted to `messages` as
    /// [`Message::FrameDecoded`]; preview frames go to `preview`.
    pub fn new(
        config: Config,
        permissions: Arc<dyn PermissionBroker>,
        live_decoder: Arc<dyn BarcodeDecoder>,
        messages: UnboundedSender<Message>,
        preview: FrameSender,
    ) -> io::Result<Self> {
        let analyzer = FrameAnalyzer::start(live_decoder, move |generation, barcode| {
            if messages
                .send(Message::FrameDecoded {
                    generation,
                    barcode,
                })
                .is_err()
            {
                debug!(generation, "Model gone, live result dropped");
            }
        })?;

        let session = CameraSession::new(
            analyzer,
            preview,
            config.stream_config(),
            config.camera_facing,
        );
        info!(facing = %config.camera_facing, "Scanner model created");

        Ok(Self {
            config,
            gate: PermissionGate::new(permissions),
            session,
            panel: ResultPanel::default(),
            still: StillImageState::default(),
            notices: Vec::new(),
            exit_requested: false,
            shut_down: false,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn panel(&self) -> &ResultPanel {
        &self.panel
    }

    pub fn session(&self) -> &CameraSession {
        &self.session
    }

    /// Whether a picked image is being loaded or decoded
    pub fn is_still_image_active(&self) -> bool {
        self.still.active
    }

    /// Notices queued since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Back was pressed with nothing left to close
    pub fn should_exit(&self) -> bool {
        self.exit_requested
    }

    pub(crate) fn notify(&mut self, notice: Notice) {
        debug!(?notice, "Notice queued");
        self.notices.push(notice);
    }
}

impl std::fmt::Debug for ScannerModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerModel")
            .field("session", &self.session)
            .field("gate", &self.gate)
            .field("panel", &self.panel)
            .field("still", &self.still)
            .field("shut_down", &self.shut_down)
            .finish()
    }
}
