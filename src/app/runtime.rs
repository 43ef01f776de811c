// SPDX-License-Identifier: GPL-3.0-only

//! Effect execution
//!
//! [`EffectRunner`] performs the work a [`ScannerModel`](super::ScannerModel)
//! asks for and posts each completion back as exactly one [`Message`].
//! Blocking calls (device enumeration, image I/O, decoding, clipboard) run on
//! tokio's blocking pool so the UI thread never waits on them.

use crate::app::frame_processor::{BarcodeDecoder, MultiFormatDecoder, decode_first};
use crate::app::state::{Effect, Message};
use crate::backends::camera::manager::CameraBackendManager;
use crate::backends::clipboard::{ClipboardWriter, SystemClipboard};
use crate::backends::permissions::{PermissionBroker, SystemPermissions};
use crate::backends::picker::{DialogPicker, ImagePicker};
use crate::config::Config;
use crate::errors::{AppError, CameraError, DecodeError};
use crate::storage;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// Services the scanner talks to
#[derive(Clone)]
pub struct Platform {
    pub permissions: Arc<dyn PermissionBroker>,
    pub cameras: CameraBackendManager,
    pub picker: Arc<dyn ImagePicker>,
    pub clipboard: Arc<dyn ClipboardWriter>,
    /// Decoder for picked images
    pub still_decoder: Arc<dyn BarcodeDecoder>,
    /// Decoder for live frames
    pub live_decoder: Arc<dyn BarcodeDecoder>,
}

impl Platform {
    /// Services of the running desktop session
    pub fn system(config: &Config) -> Self {
        Self {
            permissions: Arc::new(SystemPermissions::new(config.picker_directory.clone())),
            cameras: CameraBackendManager::new(),
            picker: Arc::new(DialogPicker::new(config.picker_start_dir())),
            clipboard: Arc::new(SystemClipboard::new()),
            still_decoder: Arc::new(MultiFormatDecoder::with_max_dimension(
                config.still_image_formats.iter().copied(),
                config.max_decode_dimension,
            )),
            live_decoder: Arc::new(MultiFormatDecoder::with_max_dimension(
                config.live_formats.iter().copied(),
                config.max_decode_dimension,
            )),
        }
    }
}

/// Runs effects on a tokio runtime
pub struct EffectRunner {
    platform: Platform,
    handle: Handle,
    messages: UnboundedSender<Message>,
}

impl EffectRunner {
    pub fn new(platform: Platform, handle: Handle, messages: UnboundedSender<Message>) -> Self {
        Self {
            platform,
            handle,
            messages,
        }
    }

    pub fn run_all(&self, effects: impl IntoIterator<Item = Effect>) {
        for effect in effects {
            self.run(effect);
        }
    }

    /// Start `effect`; returns immediately
    pub fn run(&self, effect: Effect) {
        debug!(?effect, "Running effect");
        let tx = self.messages.clone();

        match effect {
            Effect::RequestPermission(permission) => {
                let request = self.platform.permissions.request(permission);
                self.handle.spawn(async move {
                    let granted = request.await;
                    post(&tx, Message::PermissionResult {
                        permission,
                        granted,
                    });
                });
            }

            Effect::AcquireCamera { token, request } => {
                let cameras = self.platform.cameras.clone();
                self.handle.spawn(async move {
                    let result = tokio::task::spawn_blocking(move || cameras.open(request))
                        .await
                        .unwrap_or_else(|e| Err(CameraError::AcquisitionFailed(e.to_string())));
                    post(&tx, Message::CameraOpened { token, result });
                });
            }

            Effect::OpenImagePicker => {
                let pick = self.platform.picker.pick_image();
                self.handle.spawn(async move {
                    let path = pick.await;
                    post(&tx, Message::ImagePicked(path));
                });
            }

            Effect::LoadStillImage { token, path } => {
                self.handle.spawn(async move {
                    let result =
                        tokio::task::spawn_blocking(move || storage::load_still_image(&path))
                            .await
                            .unwrap_or_else(|e| Err(AppError::ImageLoad(e.to_string())));
                    post(&tx, Message::StillImageLoaded { token, result });
                });
            }

            Effect::DecodeStillImage { token, image } => {
                let decoder = Arc::clone(&self.platform.still_decoder);
                self.handle.spawn(async move {
                    let result = tokio::task::spawn_blocking(move || {
                        decode_first(decoder.as_ref(), &image)
                    })
                    .await
                    .unwrap_or_else(|e| {
                        error!(error = %e, "Still-image decode task failed");
                        Err(DecodeError::Failed(e.to_string()))
                    });
                    post(&tx, Message::StillImageDecoded { token, result });
                });
            }

            Effect::CopyToClipboard(text) => {
                let clipboard = Arc::clone(&self.platform.clipboard);
                self.handle.spawn(async move {
                    let result = tokio::task::spawn_blocking(move || clipboard.set_text(&text))
                        .await
                        .unwrap_or_else(|e| Err(e.to_string()));
                    post(&tx, Message::CopyFinished(result));
                });
            }

            Effect::OpenLink(target) => {
                self.handle.spawn_blocking(move || match open::that(&target) {
                    Ok(()) => info!(%target, "Opened result"),
                    Err(e) => warn!(%target, error = %e, "Failed to open result"),
                });
            }
        }
    }
}

fn post(tx: &UnboundedSender<Message>, message: Message) {
    if let Err(e) = tx.send(message) {
        debug!(message = ?e.0, "Model gone, completion dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::frame_processor::{BarcodeFormat, DecodedBarcode};
    use crate::backends::camera::types::{
        BackendResult, CameraDevice, CameraFacing, CameraRequest, StreamConfig, StreamOutputs,
    };
    use crate::backends::camera::{CameraBackend, CameraStream};
    use crate::backends::permissions::Permission;
    use futures::future::{BoxFuture, FutureExt};
    use image::GrayImage;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct Allow;

    impl PermissionBroker for Allow {
        fn is_granted(&self, _: Permission) -> bool {
            false
        }

        fn request(&self, _: Permission) -> BoxFuture<'static, bool> {
            async { true }.boxed()
        }
    }

    struct NoCameras;

    impl CameraBackend for NoCameras {
        fn enumerate_cameras(&self) -> Vec<CameraDevice> {
            Vec::new()
        }

        fn is_available(&self) -> bool {
            false
        }

        fn open(
            &self,
            _: &CameraDevice,
            _: &StreamConfig,
            _: StreamOutputs,
        ) -> BackendResult<Box<dyn CameraStream>> {
            unreachable!("no cameras to open")
        }
    }

    struct Cancel;

    impl ImagePicker for Cancel {
        fn pick_image(&self) -> BoxFuture<'static, Option<PathBuf>> {
            async { None }.boxed()
        }
    }

    #[derive(Default)]
    struct Recorder {
        texts: Mutex<Vec<String>>,
    }

    impl ClipboardWriter for Recorder {
        fn set_text(&self, text: &str) -> Result<(), String> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct Panics;

    impl BarcodeDecoder for Panics {
        fn decode(&self, _: &GrayImage) -> Result<Vec<DecodedBarcode>, DecodeError> {
            panic!("decoder bug")
        }
    }

    fn runner(clipboard: Arc<Recorder>) -> (EffectRunner, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let platform = Platform {
            permissions: Arc::new(Allow),
            cameras: CameraBackendManager::with_backend(Arc::new(NoCameras)),
            picker: Arc::new(Cancel),
            clipboard,
            still_decoder: Arc::new(Panics),
            live_decoder: Arc::new(MultiFormatDecoder::new([BarcodeFormat::QrCode])),
        };
        (EffectRunner::new(platform, Handle::current(), tx), rx)
    }

    #[tokio::test]
    async fn test_permission_request_posts_answer() {
        let (runner, mut rx) = runner(Arc::default());
        runner.run(Effect::RequestPermission(Permission::Camera));

        match rx.recv().await {
            Some(Message::PermissionResult {
                permission,
                granted,
            }) => {
                assert_eq!(permission, Permission::Camera);
                assert!(granted);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unavailable_backend_fails_acquisition() {
        let (runner, mut rx) = runner(Arc::default());
        let (preview, _frames) = futures::channel::mpsc::channel(1);
        let analyzer = crate::app::frame_processor::FrameAnalyzer::start(
            Arc::new(MultiFormatDecoder::new([BarcodeFormat::QrCode])),
            |_, _| {},
        )
        .unwrap();
        let request = CameraRequest {
            facing: CameraFacing::Back,
            fallback: true,
            config: Config::default().stream_config(),
            outputs: StreamOutputs {
                preview,
                analysis: Arc::new(analyzer.input_for(1)),
            },
        };
        runner.run(Effect::AcquireCamera { token: 4, request });

        match rx.recv().await {
            Some(Message::CameraOpened { token, result }) => {
                assert_eq!(token, 4);
                assert!(matches!(result, Err(CameraError::AcquisitionFailed(_))));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_picker_posts_none() {
        let (runner, mut rx) = runner(Arc::default());
        runner.run(Effect::OpenImagePicker);

        assert!(matches!(rx.recv().await, Some(Message::ImagePicked(None))));
    }

    #[tokio::test]
    async fn test_decoder_panic_becomes_failure() {
        let (runner, mut rx) = runner(Arc::default());
        runner.run(Effect::DecodeStillImage {
            token: 2,
            image: GrayImage::new(4, 4),
        });

        match rx.recv().await {
            Some(Message::StillImageDecoded { token, result }) => {
                assert_eq!(token, 2);
                assert!(matches!(result, Err(DecodeError::Failed(_))));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_image_reports_load_error() {
        let (runner, mut rx) = runner(Arc::default());
        runner.run(Effect::LoadStillImage {
            token: 1,
            path: PathBuf::from("/nonexistent/scan.png"),
        });

        match rx.recv().await {
            Some(Message::StillImageLoaded { result, .. }) => {
                assert!(matches!(result, Err(AppError::ImageLoad(_))));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_copy_writes_clipboard() {
        let clipboard = Arc::new(Recorder::default());
        let (runner, mut rx) = runner(Arc::clone(&clipboard));
        runner.run(Effect::CopyToClipboard("8412345678905".to_string()));

        assert!(matches!(rx.recv().await, Some(Message::CopyFinished(Ok(())))));
        assert_eq!(*clipboard.texts.lock().unwrap(), vec!["8412345678905"]);
    }
}
