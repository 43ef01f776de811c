// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use gstreamer::buffer::{MappedBuffer, Readable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Frame data storage - either pre-copied bytes or zero-copy GStreamer buffer
///
/// The `Mapped` variant keeps the GStreamer buffer mapped and out of the
/// pipeline's buffer pool until every reference is dropped. Analysis frames
/// use it, which is why they travel inside a [`FrameLease`].
#[derive(Clone)]
pub enum FrameData {
    /// Pre-copied bytes (preview frames, still images, tests)
    Copied(Arc<[u8]>),
    /// Zero-copy mapped GStreamer buffer
    Mapped(Arc<MappedBuffer<Readable>>),
}

impl FrameData {
    /// Create FrameData from a mapped GStreamer buffer (zero-copy)
    pub fn from_mapped_buffer(buffer: MappedBuffer<Readable>) -> Self {
        FrameData::Mapped(Arc::new(buffer))
    }

    /// Get the length of the frame data in bytes
    pub fn len(&self) -> usize {
        match self {
            FrameData::Copied(data) => data.len(),
            FrameData::Mapped(buf) => buf.len(),
        }
    }

    /// Check if the frame data is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for FrameData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameData::Copied(data) => write!(f, "FrameData::Copied({} bytes)", data.len()),
            FrameData::Mapped(buf) => write!(f, "FrameData::Mapped({} bytes)", buf.len()),
        }
    }
}

impl AsRef<[u8]> for FrameData {
    fn as_ref(&self) -> &[u8] {
        match self {
            FrameData::Copied(data) => data.as_ref(),
            FrameData::Mapped(buf) => buf.as_slice(),
        }
    }
}

impl std::ops::Deref for FrameData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_ref()
    }
}

impl From<Vec<u8>> for FrameData {
    fn from(data: Vec<u8>) -> Self {
        FrameData::Copied(Arc::from(data))
    }
}

/// Which way a camera points
///
/// Laptop and phone sensors driven by libcamera report `front`/`back`;
/// USB webcams usually report nothing and are treated as external.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraFacing {
    /// World-facing sensor
    #[default]
    Back,
    /// User-facing sensor
    Front,
    /// Detachable or unknown placement
    External,
}

impl CameraFacing {
    /// Parse the `api.libcamera.location` / `camera.location` property value
    pub fn from_location(location: &str) -> Self {
        match location.trim().to_ascii_lowercase().as_str() {
            "back" | "rear" => CameraFacing::Back,
            "front" => CameraFacing::Front,
            _ => CameraFacing::External,
        }
    }
}

impl std::fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraFacing::Back => write!(f, "back"),
            CameraFacing::Front => write!(f, "front"),
            CameraFacing::External => write!(f, "external"),
        }
    }
}

/// A camera as seen by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Human-readable name
    pub name: String,
    /// Backend-specific path (`pipewire-serial-N`, `pipewire-N`, empty = default)
    pub path: String,
    /// Placement of the sensor
    pub facing: CameraFacing,
}

/// Pixel format of frame data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit luma only
    Gray8,
    /// 8-bit RGBA, 4 bytes per pixel
    RGBA,
    /// 8-bit RGB, 3 bytes per pixel
    RGB24,
    /// Y plane followed by interleaved UV plane at half resolution
    NV12,
}

impl PixelFormat {
    /// Bytes per pixel of the first plane
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Gray8 | PixelFormat::NV12 => 1,
            PixelFormat::RGB24 => 3,
            PixelFormat::RGBA => 4,
        }
    }
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Frame data (first plane first for planar formats)
    pub data: FrameData,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride of the first plane (bytes per row, may include padding)
    pub stride: u32,
    /// Timestamp when frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a tightly packed frame from owned bytes
    pub fn from_packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width * format.bytes_per_pixel(),
            data: FrameData::from(data),
            format,
            captured_at: Instant::now(),
        }
    }

    /// Get the frame data as a byte slice
    pub fn data_slice(&self) -> &[u8] {
        &self.data
    }
}

/// Resolution of one stream output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Requested shape of the two outputs bound to a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Target resolution of the RGBA preview output
    pub preview: Resolution,
    /// Target resolution of the GRAY8 analysis output
    pub analysis: Resolution,
}

/// A camera frame handed to the analysis consumer
///
/// The lease pins the underlying buffer. Its release hook runs exactly once:
/// on [`FrameLease::release`] or, failing that, on drop. A lease that is never
/// released starves the capture pipeline of buffers.
pub struct FrameLease {
    frame: CameraFrame,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl FrameLease {
    /// Wrap a frame with a release hook
    pub fn new(frame: CameraFrame, on_release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            frame,
            on_release: Some(Box::new(on_release)),
        }
    }

    /// Borrow the leased frame
    pub fn frame(&self) -> &CameraFrame {
        &self.frame
    }

    /// Give the buffer back to its producer
    pub fn release(mut self) {
        self.run_release_hook();
    }

    fn run_release_hook(&mut self) {
        if let Some(hook) = self.on_release.take() {
            hook();
        }
    }
}

impl Drop for FrameLease {
    fn drop(&mut self) {
        self.run_release_hook();
    }
}

impl std::fmt::Debug for FrameLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLease")
            .field("width", &self.frame.width)
            .field("height", &self.frame.height)
            .field("format", &self.frame.format)
            .field("released", &self.on_release.is_none())
            .finish()
    }
}

/// Receiver end of the analysis output
///
/// Implementations must take ownership of the lease and make sure it is
/// released on every path.
pub trait FrameConsumer: Send + Sync {
    fn submit(&self, lease: FrameLease);
}

/// Frame receiver type for preview streaming
pub type FrameReceiver = futures::channel::mpsc::Receiver<Arc<CameraFrame>>;

/// Frame sender type for preview streaming
pub type FrameSender = futures::channel::mpsc::Sender<Arc<CameraFrame>>;

/// Outputs a camera stream feeds once bound
#[derive(Clone)]
pub struct StreamOutputs {
    /// Preview frames for display; frames are dropped when the channel is full
    pub preview: FrameSender,
    /// Analysis frames; the consumer applies keep-latest backpressure
    pub analysis: Arc<dyn FrameConsumer>,
}

/// A camera to open and the outputs to bind to it
#[derive(Clone)]
pub struct CameraRequest {
    pub facing: CameraFacing,
    /// Whether a camera facing elsewhere may stand in when none faces `facing`
    pub fallback: bool,
    pub config: StreamConfig,
    pub outputs: StreamOutputs,
}

// Outputs are plumbing: two requests are equal when they ask for the same camera
impl PartialEq for CameraRequest {
    fn eq(&self, other: &Self) -> bool {
        self.facing == other.facing
            && self.fallback == other.fallback
            && self.config == other.config
    }
}

impl std::fmt::Debug for CameraRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraRequest")
            .field("facing", &self.facing)
            .field("fallback", &self.fallback)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Camera backend errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to initialize backend
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// The operation is not supported by this device
    Unsupported(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::Unsupported(msg) => write!(f, "Not supported: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gray_frame() -> CameraFrame {
        CameraFrame::from_packed(2, 2, PixelFormat::Gray8, vec![0, 64, 128, 255])
    }

    #[test]
    fn test_lease_released_once_on_explicit_release() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let lease = FrameLease::new(gray_frame(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        lease.release();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lease_released_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        {
            let _lease = FrameLease::new(gray_frame(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_facing_from_location() {
        assert_eq!(CameraFacing::from_location("back"), CameraFacing::Back);
        assert_eq!(CameraFacing::from_location(" Front "), CameraFacing::Front);
        assert_eq!(CameraFacing::from_location("external"), CameraFacing::External);
        assert_eq!(CameraFacing::from_location(""), CameraFacing::External);
    }

    #[test]
    fn test_packed_stride() {
        let frame = CameraFrame::from_packed(3, 1, PixelFormat::RGBA, vec![0; 12]);
        assert_eq!(frame.stride, 12);
        assert_eq!(frame.data_slice().len(), 12);
    }
}
