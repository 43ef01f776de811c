// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend lifecycle manager
//!
//! The manager hands out [`CameraProvider`]s: a snapshot of the devices
//! present at acquisition time plus the backend that can open them.
//! Acquisition enumerates devices and may spawn subprocesses, and binding
//! waits for the pipeline to start, so callers run both off the UI thread.

use super::types::*;
use super::{CameraBackend, CameraStream};
use crate::errors::CameraError;
use std::sync::Arc;
use tracing::{debug, info};

/// Camera backend manager
///
/// Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct CameraBackendManager {
    backend: Arc<dyn CameraBackend>,
}

impl CameraBackendManager {
    /// Create a manager for the default backend
    pub fn new() -> Self {
        Self::with_backend(Arc::from(super::get_backend()))
    }

    /// Create a manager around an explicit backend
    pub fn with_backend(backend: Arc<dyn CameraBackend>) -> Self {
        Self { backend }
    }

    /// Check if the backend is available on this system
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Acquire a camera provider
    ///
    /// Fails when the backend is missing. An empty device list is not an
    /// error here; the session decides what a missing camera means.
    pub fn acquire(&self) -> BackendResult<CameraProvider> {
        if !self.backend.is_available() {
            return Err(BackendError::NotAvailable(
                "camera backend is not available".to_string(),
            ));
        }

        let devices = self.backend.enumerate_cameras();
        info!(count = devices.len(), "Camera provider acquired");

        Ok(CameraProvider {
            devices,
            backend: Arc::clone(&self.backend),
        })
    }

    /// Acquire a provider, pick the camera `request` asks for and bind it
    ///
    /// Blocking. Fails with [`CameraError::NotSupported`] when no camera
    /// serves the requested facing.
    pub fn open(&self, request: CameraRequest) -> Result<Box<dyn CameraStream>, CameraError> {
        let provider = self
            .acquire()
            .map_err(|e| CameraError::AcquisitionFailed(e.to_string()))?;

        let device = provider
            .select(request.facing, request.fallback)
            .cloned()
            .ok_or(CameraError::NotSupported(request.facing))?;

        provider
            .bind(&device, &request.config, request.outputs)
            .map_err(|e| CameraError::BindFailed(format!("{}: {}", device.name, e)))
    }
}

impl Default for CameraBackendManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CameraBackendManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraBackendManager")
            .field("available", &self.backend.is_available())
            .finish()
    }
}

/// Handle to the cameras present when it was acquired
#[derive(Clone)]
pub struct CameraProvider {
    devices: Vec<CameraDevice>,
    backend: Arc<dyn CameraBackend>,
}

impl CameraProvider {
    /// All devices in the snapshot
    pub fn devices(&self) -> &[CameraDevice] {
        &self.devices
    }

    /// Device that serves `facing`
    ///
    /// A back-facing request prefers a sensor that reports `back` and
    /// otherwise takes the first external camera, which is the world-facing
    /// camera on desktops. With `fallback` it settles for any remaining
    /// camera, so a laptop with only a user-facing sensor still scans.
    /// Front-facing requests need a `front` sensor.
    pub fn select(&self, facing: CameraFacing, fallback: bool) -> Option<&CameraDevice> {
        let find = |wanted: CameraFacing| self.devices.iter().find(|d| d.facing == wanted);
        match facing {
            CameraFacing::Back => find(CameraFacing::Back)
                .or_else(|| find(CameraFacing::External))
                .or_else(|| fallback.then(|| self.devices.first()).flatten()),
            _ => find(facing),
        }
    }

    /// Whether a device serving `facing` exists, without falling back
    pub fn has_camera(&self, facing: CameraFacing) -> bool {
        self.select(facing, false).is_some()
    }

    /// Bind the preview and analysis outputs to `device`
    pub fn bind(
        &self,
        device: &CameraDevice,
        config: &StreamConfig,
        outputs: StreamOutputs,
    ) -> BackendResult<Box<dyn CameraStream>> {
        debug!(device = %device.name, facing = %device.facing, "Binding camera outputs");
        self.backend.open(device, config, outputs)
    }
}

impl std::fmt::Debug for CameraProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraProvider")
            .field("devices", &self.devices)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ListBackend(Vec<CameraDevice>);

    impl CameraBackend for ListBackend {
        fn enumerate_cameras(&self) -> Vec<CameraDevice> {
            self.0.clone()
        }

        fn is_available(&self) -> bool {
            true
        }

        fn open(
            &self,
            _device: &CameraDevice,
            _config: &StreamConfig,
            _outputs: StreamOutputs,
        ) -> BackendResult<Box<dyn CameraStream>> {
            Err(BackendError::Other("not used".to_string()))
        }
    }

    fn device(name: &str, facing: CameraFacing) -> CameraDevice {
        CameraDevice {
            name: name.to_string(),
            path: String::new(),
            facing,
        }
    }

    fn provider(devices: Vec<CameraDevice>) -> CameraProvider {
        CameraBackendManager::with_backend(Arc::new(ListBackend(devices)))
            .acquire()
            .unwrap()
    }

    #[test]
    fn test_back_prefers_back_sensor() {
        let p = provider(vec![
            device("usb", CameraFacing::External),
            device("rear", CameraFacing::Back),
        ]);
        assert_eq!(p.select(CameraFacing::Back, false).unwrap().name, "rear");
    }

    #[test]
    fn test_back_falls_back_to_external() {
        let p = provider(vec![device("usb", CameraFacing::External)]);
        assert_eq!(p.select(CameraFacing::Back, false).unwrap().name, "usb");
        assert!(!p.has_camera(CameraFacing::Front));
    }

    #[test]
    fn test_front_requires_front_sensor() {
        let p = provider(vec![
            device("rear", CameraFacing::Back),
            device("selfie", CameraFacing::Front),
        ]);
        assert_eq!(p.select(CameraFacing::Front, true).unwrap().name, "selfie");
    }

    #[test]
    fn test_back_request_settles_for_front_only_with_fallback() {
        let p = provider(vec![device("user", CameraFacing::Front)]);
        assert!(p.select(CameraFacing::Back, false).is_none());
        assert_eq!(p.select(CameraFacing::Back, true).unwrap().name, "user");
        assert!(!p.has_camera(CameraFacing::Back));
    }

    #[test]
    fn test_front_request_never_falls_back() {
        let p = provider(vec![device("rear", CameraFacing::Back)]);
        assert!(p.select(CameraFacing::Front, true).is_none());
    }

    #[test]
    fn test_open_reports_missing_camera() {
        let manager = CameraBackendManager::with_backend(Arc::new(ListBackend(vec![device(
            "rear",
            CameraFacing::Back,
        )])));
        let (preview, _rx) = futures::channel::mpsc::channel(1);
        let request = CameraRequest {
            facing: CameraFacing::Front,
            fallback: false,
            config: StreamConfig {
                preview: Resolution::new(64, 48),
                analysis: Resolution::new(64, 48),
            },
            outputs: StreamOutputs {
                preview,
                analysis: Arc::new(Discard),
            },
        };

        assert!(matches!(
            manager.open(request),
            Err(CameraError::NotSupported(CameraFacing::Front))
        ));
    }

    struct Discard;

    impl FrameConsumer for Discard {
        fn submit(&self, lease: FrameLease) {
            lease.release();
        }
    }

    #[test]
    fn test_empty_provider_has_nothing() {
        let p = provider(Vec::new());
        assert!(!p.has_camera(CameraFacing::Back));
        assert!(!p.has_camera(CameraFacing::Front));
    }
}
