// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use barcode_scanner::constants::{app_info, decoding, file_formats, pipeline, timing};

#[test]
fn test_analysis_keeps_only_latest_buffer() {
    assert_eq!(pipeline::ANALYSIS_MAX_BUFFERS, 1);
    assert_eq!(pipeline::ANALYSIS_FORMAT, "GRAY8");
}

#[test]
fn test_analysis_not_larger_than_preview() {
    let preview = pipeline::PREVIEW_RESOLUTION;
    let analysis = pipeline::ANALYSIS_RESOLUTION;
    assert!(analysis.width * analysis.height <= preview.width * preview.height);
    assert!(analysis.width.max(analysis.height) <= decoding::MAX_DECODE_DIMENSION);
}

#[test]
fn test_notice_outlives_several_ticks() {
    assert!(timing::NOTICE_DURATION > timing::UI_TICK * 10);
}

#[test]
fn test_picker_offers_common_photo_formats() {
    for ext in ["png", "jpg", "jpeg", "webp"] {
        assert!(file_formats::IMAGE_EXTENSIONS.contains(&ext));
    }
    assert!(!file_formats::IMAGE_EXTENSIONS.contains(&"pdf"));
}

#[test]
fn test_version_is_set() {
    assert!(!app_info::version().is_empty());
    assert!(matches!(
        app_info::runtime_environment(),
        "Flatpak" | "Native"
    ));
}
