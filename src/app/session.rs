// SPDX-License-Identifier: GPL-3.0-only

//! Live camera session
//!
//! Owns the bound camera stream and the analyzer attachment. Only the UI
//! thread touches it. Opening the camera blocks, so the session only
//! describes the camera it wants; the opened stream arrives as a message and
//! the analyzer reports through one.
//!
//! Two counters keep late callbacks harmless:
//! - the acquisition token, bumped by every start, so a stream that arrives
//!   after the session moved on is stopped and dropped;
//! - the analyzer generation, bumped by every start, so frames and decodes
//!   from a previous binding are ignored.

use crate::app::frame_processor::FrameAnalyzer;
use crate::backends::camera::CameraStream;
use crate::backends::camera::types::{
    BackendError, CameraFacing, CameraRequest, FrameSender, StreamConfig, StreamOutputs,
};
use crate::errors::CameraError;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What happened to a stream handed to [`CameraSession::on_camera_opened`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// Camera bound and analyzer attached under `generation`
    Bound { generation: u64 },
    /// The stream belongs to a start that was cancelled
    Stale,
    /// No camera with the requested facing
    NotSupported(CameraFacing),
    /// Acquisition or binding failed; the session stays unbound
    Failed,
}

/// The live camera session
pub struct CameraSession {
    analyzer: FrameAnalyzer,
    preview: FrameSender,
    stream_config: StreamConfig,
    facing: CameraFacing,
    /// Set once the user picked a facing; the startup preference may fall back
    flipped: bool,
    /// Token of the acquisition in flight, if any
    pending_acquisition: Option<u64>,
    last_token: u64,
    generation: u64,
    stream: Option<Box<dyn CameraStream>>,
    torch_on: bool,
}

impl CameraSession {
    pub fn new(
        analyzer: FrameAnalyzer,
        preview: FrameSender,
        stream_config: StreamConfig,
        facing: CameraFacing,
    ) -> Self {
        Self {
            analyzer,
            preview,
            stream_config,
            facing,
            flipped: false,
            pending_acquisition: None,
            last_token: 0,
            generation: 0,
            stream: None,
            torch_on: false,
        }
    }

    /// Begin a (re)start
    ///
    /// Any bound stream is stopped first. Returns the token the opened
    /// stream must come back with and the camera to open.
    pub fn begin_start(&mut self) -> (u64, CameraRequest) {
        self.stop();
        self.last_token += 1;
        self.pending_acquisition = Some(self.last_token);

        self.generation += 1;
        // Attach before the stream exists so the first frame is not dropped
        self.analyzer.attach(self.generation);

        let request = CameraRequest {
            facing: self.facing,
            fallback: !self.flipped,
            config: self.stream_config,
            outputs: StreamOutputs {
                preview: self.preview.clone(),
                analysis: Arc::new(self.analyzer.input_for(self.generation)),
            },
        };
        debug!(
            token = self.last_token,
            generation = self.generation,
            facing = %self.facing,
            "Camera acquisition started"
        );
        (self.last_token, request)
    }

    /// Finish a start with the opened stream
    pub fn on_camera_opened(
        &mut self,
        token: u64,
        result: Result<Box<dyn CameraStream>, CameraError>,
    ) -> BindOutcome {
        if self.pending_acquisition != Some(token) {
            debug!(token, current = ?self.pending_acquisition, "Stale camera stream dropped");
            if let Ok(mut stream) = result
                && let Err(e) = stream.stop()
            {
                warn!(error = %e, "Stale camera stream did not stop cleanly");
            }
            return BindOutcome::Stale;
        }
        self.pending_acquisition = None;

        match result {
            Ok(stream) => {
                info!(device = %stream.device().name, generation = self.generation, "Camera bound");
                self.stream = Some(stream);
                BindOutcome::Bound {
                    generation: self.generation,
                }
            }
            Err(CameraError::NotSupported(facing)) => {
                self.analyzer.detach();
                warn!(%facing, "Requested camera not available");
                BindOutcome::NotSupported(facing)
            }
            Err(e) => {
                self.analyzer.detach();
                error!(error = %e, "Opening the camera failed");
                BindOutcome::Failed
            }
        }
    }

    /// Detach the analyzer and release the camera. Idempotent.
    ///
    /// Also cancels an acquisition in flight.
    pub fn stop(&mut self) {
        self.analyzer.detach();
        if self.pending_acquisition.take().is_some() {
            debug!("Pending camera acquisition cancelled");
        }

        let Some(mut stream) = self.stream.take() else {
            return;
        };

        if self.torch_on {
            if let Err(e) = stream.set_torch(false) {
                warn!(error = %e, "Failed to switch torch off");
            }
            self.torch_on = false;
        }
        if let Err(e) = stream.stop() {
            warn!(error = %e, "Camera stream did not stop cleanly");
        }
        info!("Camera session stopped");
    }

    /// Flip the torch; a no-op while no camera is bound
    ///
    /// The torch state only changes when the hardware accepted the switch.
    pub fn toggle_torch(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            debug!("Torch toggle ignored, no camera bound");
            return self.torch_on;
        };

        let wanted = !self.torch_on;
        match stream.set_torch(wanted) {
            Ok(()) => {
                self.torch_on = wanted;
                info!(on = wanted, "Torch switched");
            }
            Err(BackendError::Unsupported(msg)) => debug!(msg, "Torch not supported"),
            Err(e) => warn!(error = %e, "Torch switch failed"),
        }
        self.torch_on
    }

    /// Switch the preferred camera between back and front
    ///
    /// A flipped preference is strict: a missing camera is reported instead
    /// of replaced.
    pub fn flip(&mut self) -> CameraFacing {
        self.facing = match self.facing {
            CameraFacing::Front => CameraFacing::Back,
            _ => CameraFacing::Front,
        };
        self.flipped = true;
        info!(facing = %self.facing, "Camera preference flipped");
        self.facing
    }

    /// Whether a decode reported under `generation` belongs to the live binding
    pub fn accepts(&self, generation: u64) -> bool {
        self.stream.is_some() && generation == self.generation
    }

    pub fn is_bound(&self) -> bool {
        self.stream.is_some()
    }

    /// Bound, or about to be
    pub fn is_active(&self) -> bool {
        self.stream.is_some() || self.pending_acquisition.is_some()
    }

    pub fn is_analyzer_attached(&self) -> bool {
        self.analyzer.is_attached()
    }

    pub fn torch_on(&self) -> bool {
        self.torch_on
    }

    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    /// Name of the bound camera
    pub fn device_name(&self) -> Option<&str> {
        self.stream.as_ref().map(|s| s.device().name.as_str())
    }

    /// Stop everything and join the analyzer worker
    pub fn shutdown(&mut self) {
        self.stop();
        self.analyzer.shutdown();
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("facing", &self.facing)
            .field("bound", &self.is_bound())
            .field("pending_acquisition", &self.pending_acquisition)
            .field("generation", &self.generation)
            .field("torch_on", &self.torch_on)
            .finish()
    }
}
