// SPDX-License-Identifier: GPL-3.0-only

//! Live frame analyzer
//!
//! ```text
//! appsink thread ── submit ──► [ slot: newest frame ] ──► worker thread
//!                               (older frame released)      luma → decode → report
//! ```
//!
//! The analyzer is attached under a generation number. Frames and results
//! carry the generation they were submitted under, so anything that arrives
//! after a detach (or after a re-attach under a newer generation) is dropped
//! instead of acted upon.

use super::luma::frame_to_luma;
use super::tasks::BarcodeDecoder;
use super::types::DecodedBarcode;
use crate::backends::camera::frame_loop::{LoopAction, WorkerLoop};
use crate::backends::camera::types::{FrameConsumer, FrameLease};
use crate::constants::timing;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use tracing::{debug, error, info, trace, warn};

const DETACHED: u64 = 0;

struct PendingFrame {
    generation: u64,
    lease: FrameLease,
}

struct Shared {
    slot: Mutex<Option<PendingFrame>>,
    ready: Condvar,
    /// Generation currently attached, `DETACHED` when none
    attached: AtomicU64,
}

impl Shared {
    fn take_pending(&self) -> Option<PendingFrame> {
        match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// Producer side of the analyzer, handed to one camera stream
///
/// Only frames submitted while the analyzer is attached under the input's
/// own generation are kept, so a stream that outlived its session cannot
/// feed the next one.
#[derive(Clone)]
pub struct AnalyzerInput {
    shared: Arc<Shared>,
    generation: u64,
}

impl FrameConsumer for AnalyzerInput {
    fn submit(&self, lease: FrameLease) {
        let generation = self.generation;
        if self.shared.attached.load(Ordering::SeqCst) != generation {
            lease.release();
            return;
        }

        let replaced = {
            let mut slot = match self.shared.slot.lock() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
            };
            slot.replace(PendingFrame { generation, lease })
        };
        self.shared.ready.notify_one();

        if let Some(old) = replaced {
            trace!(generation = old.generation, "Unanalyzed frame replaced by newer one");
            old.lease.release();
        }
    }
}

/// Keep-latest barcode analyzer with a single worker thread
pub struct FrameAnalyzer {
    shared: Arc<Shared>,
    worker: WorkerLoop,
}

impl FrameAnalyzer {
    /// Start the worker thread
    ///
    /// `on_result` runs on the worker thread with the generation the frame
    /// was analyzed under. It is called at most once per attachment: the
    /// analyzer detaches itself when it reports.
    pub fn start<F>(decoder: Arc<dyn BarcodeDecoder>, on_result: F) -> io::Result<Self>
    where
        F: Fn(u64, DecodedBarcode) + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            slot: Mutex::new(None),
            ready: Condvar::new(),
            attached: AtomicU64::new(DETACHED),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = WorkerLoop::start("barcode-analyzer", move || {
            if let Some(pending) = wait_for_frame(&worker_shared) {
                analyze(&worker_shared, decoder.as_ref(), &on_result, pending);
            }
            LoopAction::Continue
        })?;

        Ok(Self { shared, worker })
    }

    /// Consumer to bind to the analysis output of the stream opened under
    /// `generation`
    pub fn input_for(&self, generation: u64) -> AnalyzerInput {
        AnalyzerInput {
            shared: Arc::clone(&self.shared),
            generation,
        }
    }

    /// Start accepting frames under `generation` (must be non-zero)
    pub fn attach(&self, generation: u64) {
        debug_assert_ne!(generation, DETACHED);
        debug!(generation, "Analyzer attached");
        self.shared.attached.store(generation, Ordering::SeqCst);
    }

    /// Stop accepting frames and release the pending one. Idempotent.
    pub fn detach(&self) {
        let previous = self.shared.attached.swap(DETACHED, Ordering::SeqCst);
        if previous != DETACHED {
            debug!(generation = previous, "Analyzer detached");
        }
        if let Some(pending) = self.shared.take_pending() {
            pending.lease.release();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.shared.attached.load(Ordering::SeqCst) != DETACHED
    }

    /// Detach and join the worker thread
    pub fn shutdown(&mut self) {
        self.detach();
        self.worker.request_stop();
        self.shared.ready.notify_all();
        self.worker.stop();
        info!("Analyzer worker shut down");
    }
}

impl Drop for FrameAnalyzer {
    fn drop(&mut self) {
        if self.worker.is_running() {
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for FrameAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameAnalyzer")
            .field("attached", &self.shared.attached.load(Ordering::SeqCst))
            .field("worker", &self.worker)
            .finish()
    }
}

fn wait_for_frame(shared: &Shared) -> Option<PendingFrame> {
    let slot = match shared.slot.lock() {
        Ok(slot) => slot,
        Err(poisoned) => poisoned.into_inner(),
    };
    let mut slot = if slot.is_none() {
        match shared.ready.wait_timeout(slot, timing::ANALYZER_WAIT) {
            Ok((slot, _)) => slot,
            Err(poisoned) => poisoned.into_inner().0,
        }
    } else {
        slot
    };
    slot.take()
}

fn analyze<F>(shared: &Shared, decoder: &dyn BarcodeDecoder, on_result: &F, pending: PendingFrame)
where
    F: Fn(u64, DecodedBarcode),
{
    let PendingFrame { generation, lease } = pending;

    if shared.attached.load(Ordering::SeqCst) != generation {
        trace!(generation, "Frame from stale generation dropped");
        lease.release();
        return;
    }

    let latency = lease.frame().captured_at.elapsed();
    let luma = frame_to_luma(lease.frame());
    // The luma copy is all the decoder needs; give the buffer back now
    lease.release();

    let Some(luma) = luma else {
        return;
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| decoder.decode(&luma)));
    let first = match outcome {
        Ok(Ok(found)) => found.into_iter().next(),
        Ok(Err(e)) => {
            debug!(generation, error = %e, "Frame decode failed");
            None
        }
        Err(_) => {
            error!(generation, "Decoder panicked on a frame");
            None
        }
    };

    let Some(barcode) = first else {
        return;
    };

    // Report once per attachment; a detach or re-attach in the meantime wins
    match shared.attached.compare_exchange(
        generation,
        DETACHED,
        Ordering::SeqCst,
        Ordering::SeqCst,
    ) {
        Ok(_) => {
            info!(
                generation,
                format = %barcode.format,
                latency_ms = latency.as_millis(),
                "Barcode found in live frame"
            );
            if let Some(stale) = shared.take_pending() {
                stale.lease.release();
            }
            on_result(generation, barcode);
        }
        Err(current) => {
            warn!(generation, current, "Decode result arrived after detach, ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::frame_processor::types::BarcodeFormat;
    use crate::backends::camera::types::{CameraFrame, PixelFormat};
    use crate::errors::DecodeError;
    use image::GrayImage;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Duration;

    /// Returns a fixed answer, chosen by the first pixel of the image
    struct PixelDecoder;

    impl BarcodeDecoder for PixelDecoder {
        fn decode(&self, image: &GrayImage) -> Result<Vec<DecodedBarcode>, DecodeError> {
            match image.get_pixel(0, 0).0[0] {
                0 => Ok(Vec::new()),
                1 => Err(DecodeError::Failed("bad frame".to_string())),
                2 => panic!("decoder blew up"),
                _ => Ok(vec![
                    DecodedBarcode::new(BarcodeFormat::Ean13, "8412345678905"),
                    DecodedBarcode::new(BarcodeFormat::QrCode, "second"),
                ]),
            }
        }
    }

    fn lease(pixel: u8, released: &Arc<AtomicUsize>) -> FrameLease {
        let counter = Arc::clone(released);
        FrameLease::new(
            CameraFrame::from_packed(2, 2, PixelFormat::Gray8, vec![pixel; 4]),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
    }

    fn start() -> (FrameAnalyzer, mpsc::Receiver<(u64, DecodedBarcode)>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let analyzer = FrameAnalyzer::start(Arc::new(PixelDecoder), move |generation, barcode| {
            let _ = tx.lock().unwrap().send((generation, barcode));
        })
        .unwrap();
        (analyzer, rx)
    }

    fn wait_for(count: &AtomicUsize, expected: usize) {
        for _ in 0..200 {
            if count.load(Ordering::SeqCst) >= expected {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_detached_input_releases_immediately() {
        let (analyzer, rx) = start();
        let released = Arc::new(AtomicUsize::new(0));

        analyzer.input_for(1).submit(lease(9, &released));

        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_input_of_older_generation_is_ignored() {
        let (analyzer, rx) = start();
        let released = Arc::new(AtomicUsize::new(0));
        let old = analyzer.input_for(1);
        analyzer.attach(2);

        old.submit(lease(9, &released));

        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert!(analyzer.is_attached());
    }

    #[test]
    fn test_first_result_reported_and_analyzer_detaches() {
        let (analyzer, rx) = start();
        let released = Arc::new(AtomicUsize::new(0));
        analyzer.attach(7);

        analyzer.input_for(7).submit(lease(9, &released));

        let (generation, barcode) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(generation, 7);
        assert_eq!(barcode.text, "8412345678905");
        assert!(!analyzer.is_attached());
        wait_for(&released, 1);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_every_outcome_releases_exactly_once() {
        let (analyzer, rx) = start();
        let released = Arc::new(AtomicUsize::new(0));
        analyzer.attach(1);

        // empty, failure, panic
        for (sent, pixel) in [0u8, 1, 2].into_iter().enumerate() {
            analyzer.input_for(1).submit(lease(pixel, &released));
            wait_for(&released, sent + 1);
        }

        assert_eq!(released.load(Ordering::SeqCst), 3);
        assert!(analyzer.is_attached());
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_newer_frame_replaces_pending_one() {
        let shared = Arc::new(Shared {
            slot: Mutex::new(None),
            ready: Condvar::new(),
            attached: AtomicU64::new(3),
        });
        let input = AnalyzerInput {
            shared: Arc::clone(&shared),
            generation: 3,
        };
        let released = Arc::new(AtomicUsize::new(0));

        input.submit(lease(0, &released));
        input.submit(lease(9, &released));

        assert_eq!(released.load(Ordering::SeqCst), 1);
        let pending = shared.take_pending().unwrap();
        assert_eq!(pending.lease.frame().data_slice()[0], 9);
        pending.lease.release();
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_shutdown_releases_pending_frame() {
        let (mut analyzer, _rx) = start();
        analyzer.attach(1);
        analyzer.shutdown();

        let released = Arc::new(AtomicUsize::new(0));
        analyzer.input_for(1).submit(lease(9, &released));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
