// SPDX-License-Identifier: GPL-3.0-only

//! PipeWire GStreamer pipeline for camera capture
//!
//! One source is split by a `tee` into two branches:
//!
//! ```text
//! pipewiresrc ─ decodebin ─ videoconvert ─ tee ┬─ queue ─ scale ─ RGBA  ─ appsink "preview"
//!                                              └─ queue ─ scale ─ GRAY8 ─ appsink "analysis"
//! ```
//!
//! Both branches use leaky single-buffer queues and dropping appsinks, so a
//! slow consumer only ever sees the newest frame and never stalls the source.

use super::super::types::*;
use crate::constants::{pipeline, timing};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Translate a device path into `pipewiresrc` properties
///
/// An empty path lets PipeWire pick its default camera.
pub(crate) fn source_properties(device_path: &str) -> String {
    if device_path.is_empty() {
        String::new()
    } else if device_path.starts_with("v4l2:") {
        format!("path={}", device_path)
    } else if let Some(serial) = device_path.strip_prefix("pipewire-serial-") {
        format!("target-object={}", serial)
    } else if let Some(node_id) = device_path.strip_prefix("pipewire-") {
        format!("target-object={}", node_id)
    } else if device_path.starts_with("/dev/video") {
        format!("path=v4l2:{}", device_path)
    } else {
        warn!(device_path, "Unknown device path format, using path property");
        format!("path={}", device_path)
    }
}

/// Build the `gst-launch` description of the two-branch capture pipeline
pub(crate) fn pipeline_description(device_path: &str, config: &StreamConfig) -> String {
    let source = source_properties(device_path);
    format!(
        "pipewiresrc {source} do-timestamp=true ! decodebin ! videoconvert ! tee name=t \
         t. ! queue leaky=downstream max-size-buffers=1 ! videoconvert ! videoscale ! \
         video/x-raw,format={pf},width={pw},height={ph} ! \
         appsink name=preview max-buffers={pmax} drop=true sync=false \
         t. ! queue leaky=downstream max-size-buffers=1 ! videoconvert ! videoscale add-borders=true ! \
         video/x-raw,format={af},width={aw},height={ah},pixel-aspect-ratio=1/1 ! \
         appsink name=analysis max-buffers={amax} drop=true sync=false",
        pf = pipeline::PREVIEW_FORMAT,
        pw = config.preview.width,
        ph = config.preview.height,
        pmax = pipeline::PREVIEW_MAX_BUFFERS,
        af = pipeline::ANALYSIS_FORMAT,
        aw = config.analysis.width,
        ah = config.analysis.height,
        amax = pipeline::ANALYSIS_MAX_BUFFERS,
    )
}

/// PipeWire camera pipeline feeding a preview channel and an analysis consumer
pub struct PipeWirePipeline {
    pipeline: gstreamer::Pipeline,
    preview_sink: AppSink,
    analysis_sink: AppSink,
    /// Analysis buffers currently held by a [`FrameLease`]
    outstanding: Arc<AtomicUsize>,
    stopped: bool,
}

impl PipeWirePipeline {
    /// Build the pipeline, wire both sinks and start playing
    pub fn new(
        device: &CameraDevice,
        config: &StreamConfig,
        outputs: StreamOutputs,
    ) -> BackendResult<Self> {
        info!(
            device = %device.name,
            preview = %config.preview,
            analysis = %config.analysis,
            "Creating PipeWire pipeline"
        );

        gstreamer::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let description = pipeline_description(&device.path, config);
        debug!(pipeline = %description, "Launching pipeline");

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| {
                BackendError::InitializationFailed("Failed to cast to pipeline".to_string())
            })?;

        let preview_sink = app_sink(&pipeline, "preview")?;
        let analysis_sink = app_sink(&pipeline, "analysis")?;
        let outstanding = Arc::new(AtomicUsize::new(0));

        preview_sink.set_callbacks(preview_callbacks(outputs.preview));
        analysis_sink.set_callbacks(analysis_callbacks(
            outputs.analysis,
            Arc::clone(&outstanding),
        ));

        let mut this = Self {
            pipeline,
            preview_sink,
            analysis_sink,
            outstanding,
            stopped: false,
        };

        if let Err(e) = this.pipeline.set_state(gstreamer::State::Playing) {
            this.stop_quietly();
            return Err(BackendError::InitializationFailed(format!(
                "Failed to start pipeline: {}",
                e
            )));
        }

        let (result, state, pending) = this.pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::START_TIMEOUT_SECS,
        ));
        debug!(result = ?result, state = ?state, pending = ?pending, "Pipeline state");
        if result.is_err() {
            this.stop_quietly();
            return Err(BackendError::InitializationFailed(
                "Pipeline failed to reach PLAYING".to_string(),
            ));
        }
        if state != gstreamer::State::Playing {
            warn!("Pipeline is not in PLAYING state yet");
        }

        info!("PipeWire camera pipeline running");
        Ok(this)
    }

    /// Analysis buffers not yet given back by the consumer
    pub fn outstanding_leases(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Stop the pipeline and release the camera. Idempotent.
    pub fn stop(&mut self) -> BackendResult<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        info!("Stopping PipeWire pipeline");

        // Callbacks own the outputs; dropping them releases the channel and consumer
        self.preview_sink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        self.analysis_sink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());

        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| BackendError::Other(format!("Failed to stop pipeline: {}", e)))?;

        let (result, state, _) = self.pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::STOP_TIMEOUT_SECS,
        ));
        match result {
            Ok(_) => info!(state = ?state, "PipeWire pipeline stopped"),
            Err(e) => debug!(error = ?e, state = ?state, "Pipeline state change had issues"),
        }

        let outstanding = self.outstanding_leases();
        if outstanding > 0 {
            debug!(outstanding, "Analysis buffers still leased at stop");
        }
        Ok(())
    }

    fn stop_quietly(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "Failed to stop pipeline");
        }
    }
}

impl Drop for PipeWirePipeline {
    fn drop(&mut self) {
        self.stop_quietly();
    }
}

fn app_sink(pipeline: &gstreamer::Pipeline, name: &str) -> BackendResult<AppSink> {
    pipeline
        .by_name(name)
        .ok_or_else(|| BackendError::InitializationFailed(format!("Missing appsink '{}'", name)))?
        .dynamic_cast::<AppSink>()
        .map_err(|_| BackendError::InitializationFailed(format!("'{}' is not an appsink", name)))
}

fn preview_callbacks(mut sender: FrameSender) -> gstreamer_app::AppSinkCallbacks {
    let frame_counter = AtomicU64::new(0);

    gstreamer_app::AppSinkCallbacks::builder()
        .new_sample(move |appsink| {
            let frame_num = frame_counter.fetch_add(1, Ordering::Relaxed);
            let sample = appsink.pull_sample().map_err(|_| gstreamer::FlowError::Eos)?;
            let (buffer, info) = sample_parts(&sample, frame_num)?;

            if buffer.flags().contains(gstreamer::BufferFlags::CORRUPTED) {
                trace!(frame = frame_num, "Corrupted preview buffer skipped");
                return Ok(gstreamer::FlowSuccess::Ok);
            }

            let map = buffer.map_readable().map_err(|e| {
                error!(frame = frame_num, error = ?e, "Failed to map preview buffer");
                gstreamer::FlowError::Error
            })?;

            let frame = CameraFrame {
                width: info.width(),
                height: info.height(),
                data: FrameData::Copied(Arc::from(map.as_slice())),
                format: PixelFormat::RGBA,
                stride: info.stride()[0] as u32,
                captured_at: Instant::now(),
            };

            if let Err(e) = sender.try_send(Arc::new(frame)) {
                if e.is_disconnected() {
                    return Err(gstreamer::FlowError::Eos);
                }
                trace!(frame = frame_num, "Preview frame dropped (channel full)");
            }

            Ok(gstreamer::FlowSuccess::Ok)
        })
        .build()
}

fn analysis_callbacks(
    consumer: Arc<dyn FrameConsumer>,
    outstanding: Arc<AtomicUsize>,
) -> gstreamer_app::AppSinkCallbacks {
    let frame_counter = AtomicU64::new(0);

    gstreamer_app::AppSinkCallbacks::builder()
        .new_sample(move |appsink| {
            let frame_num = frame_counter.fetch_add(1, Ordering::Relaxed);
            let captured_at = Instant::now();
            let sample = appsink.pull_sample().map_err(|_| gstreamer::FlowError::Eos)?;
            let (_, info) = sample_parts(&sample, frame_num)?;

            let buffer = sample.buffer_owned().ok_or(gstreamer::FlowError::Error)?;
            let mapped = buffer.into_mapped_buffer_readable().map_err(|_| {
                error!(frame = frame_num, "Failed to map analysis buffer");
                gstreamer::FlowError::Error
            })?;

            let frame = CameraFrame {
                width: info.width(),
                height: info.height(),
                data: FrameData::from_mapped_buffer(mapped),
                format: PixelFormat::Gray8,
                stride: info.stride()[0] as u32,
                captured_at,
            };

            let held = outstanding.fetch_add(1, Ordering::SeqCst) + 1;
            if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                debug!(
                    frame = frame_num,
                    width = frame.width,
                    height = frame.height,
                    held,
                    "Analysis frame"
                );
            }

            let counter = Arc::clone(&outstanding);
            consumer.submit(FrameLease::new(frame, move || {
                counter.fetch_sub(1, Ordering::SeqCst);
            }));

            Ok(gstreamer::FlowSuccess::Ok)
        })
        .build()
}

fn sample_parts(
    sample: &gstreamer::Sample,
    frame_num: u64,
) -> Result<(&gstreamer::BufferRef, VideoInfo), gstreamer::FlowError> {
    let buffer = sample.buffer().ok_or_else(|| {
        error!(frame = frame_num, "No buffer in sample");
        gstreamer::FlowError::Error
    })?;
    let caps = sample.caps().ok_or_else(|| {
        error!(frame = frame_num, "No caps in sample");
        gstreamer::FlowError::Error
    })?;
    let info = VideoInfo::from_caps(caps).map_err(|e| {
        error!(frame = frame_num, error = ?e, "Failed to get video info");
        gstreamer::FlowError::Error
    })?;
    Ok((buffer, info))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_properties() {
        assert_eq!(source_properties(""), "");
        assert_eq!(source_properties("pipewire-serial-2146"), "target-object=2146");
        assert_eq!(source_properties("pipewire-64"), "target-object=64");
        assert_eq!(source_properties("/dev/video0"), "path=v4l2:/dev/video0");
        assert_eq!(source_properties("v4l2:/dev/video2"), "path=v4l2:/dev/video2");
    }

    #[test]
    fn test_pipeline_description_has_both_branches() {
        let config = StreamConfig {
            preview: Resolution::new(640, 480),
            analysis: Resolution::new(540, 360),
        };
        let desc = pipeline_description("pipewire-serial-7", &config);

        assert!(desc.starts_with("pipewiresrc target-object=7 "));
        assert!(desc.contains("format=RGBA,width=640,height=480"));
        assert!(desc.contains("format=GRAY8,width=540,height=360"));
        assert!(desc.contains("appsink name=preview"));
        assert!(desc.contains("appsink name=analysis max-buffers=1 drop=true"));
    }
}
