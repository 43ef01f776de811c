// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! ```text
//! ┌──────────────────────┐
//! │  ScannerModel (UI)   │
//! └──────────┬───────────┘
//!            │ CameraRequest (off the UI thread)
//!            ▼
//! ┌──────────────────────┐
//! │ CameraBackendManager │  ← device snapshot, facing selection, bind
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │ CameraBackend trait  │  ← enumeration + opening streams
//! └──────────┬───────────┘
//!            ▼
//!       ┌────────┐
//!       │PipeWire│  ← GStreamer pipeline with preview + analysis sinks
//!       └────────┘
//! ```

pub mod frame_loop;
pub mod manager;
pub mod pipewire;
pub mod types;

pub use manager::{CameraBackendManager, CameraProvider};
pub use types::*;

/// Camera backend
///
/// A backend enumerates devices and opens streams. Opening a stream binds
/// both outputs at once; the stream stays live until [`CameraStream::stop`]
/// is called or the stream is dropped.
pub trait CameraBackend: Send + Sync {
    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Check if this backend is available on the current system
    fn is_available(&self) -> bool;

    /// Open `device` and start feeding `outputs`
    fn open(
        &self,
        device: &CameraDevice,
        config: &StreamConfig,
        outputs: StreamOutputs,
    ) -> BackendResult<Box<dyn CameraStream>>;
}

/// A bound, running camera
pub trait CameraStream: Send {
    /// Device this stream was opened on
    fn device(&self) -> &CameraDevice;

    /// Switch the continuous torch light on or off
    ///
    /// Returns `Err(BackendError::Unsupported)` when the device has no
    /// controllable light.
    fn set_torch(&mut self, on: bool) -> BackendResult<()>;

    /// Stop capture and release the device. Calling it twice is harmless.
    fn stop(&mut self) -> BackendResult<()>;
}

impl std::fmt::Debug for dyn CameraStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraStream")
            .field("device", &self.device().name)
            .finish()
    }
}

/// Get the default backend (PipeWire)
pub fn get_backend() -> Box<dyn CameraBackend> {
    Box::new(pipewire::PipeWireBackend::new())
}
