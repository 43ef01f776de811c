// SPDX-License-Identifier: GPL-3.0-only

//! PipeWire camera backend
//!
//! Uses PipeWire for camera enumeration and a GStreamer `pipewiresrc`
//! pipeline for capture. The torch is driven through sysfs flash LEDs.

mod enumeration;
mod pipeline;

pub use enumeration::{enumerate_pipewire_cameras, is_pipewire_available};
pub use pipeline::PipeWirePipeline;

use super::types::*;
use super::{CameraBackend, CameraStream};
use crate::flash::Torch;
use tracing::{info, warn};

/// PipeWire backend implementation
#[derive(Debug, Default)]
pub struct PipeWireBackend;

impl PipeWireBackend {
    /// Create a new PipeWire backend
    pub fn new() -> Self {
        Self
    }
}

impl CameraBackend for PipeWireBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        match enumerate_pipewire_cameras() {
            Some(cameras) => {
                info!(count = cameras.len(), "PipeWire cameras enumerated");
                cameras
            }
            None => {
                info!("PipeWire enumeration returned None");
                Vec::new()
            }
        }
    }

    fn is_available(&self) -> bool {
        is_pipewire_available()
    }

    fn open(
        &self,
        device: &CameraDevice,
        config: &StreamConfig,
        outputs: StreamOutputs,
    ) -> BackendResult<Box<dyn CameraStream>> {
        let pipeline = PipeWirePipeline::new(device, config, outputs)?;

        // Flash LEDs sit next to built-in sensors only
        let torch = match device.facing {
            CameraFacing::Back => Torch::discover(),
            _ => Torch::default(),
        };

        Ok(Box::new(PipeWireStream {
            device: device.clone(),
            pipeline,
            torch,
            torch_on: false,
        }))
    }
}

/// A running PipeWire capture
pub struct PipeWireStream {
    device: CameraDevice,
    pipeline: PipeWirePipeline,
    torch: Torch,
    torch_on: bool,
}

impl CameraStream for PipeWireStream {
    fn device(&self) -> &CameraDevice {
        &self.device
    }

    fn set_torch(&mut self, on: bool) -> BackendResult<()> {
        if !self.torch.is_available() {
            return Err(BackendError::Unsupported(format!(
                "no torch for {}",
                self.device.name
            )));
        }
        self.torch.set(on)?;
        self.torch_on = on;
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        if self.torch_on {
            if let Err(e) = self.torch.set(false) {
                warn!(error = %e, "Failed to switch torch off");
            }
            self.torch_on = false;
        }
        self.pipeline.stop()
    }
}

impl Drop for PipeWireStream {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "Failed to stop camera stream");
        }
    }
}
