// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use barcode_scanner::Config;
use barcode_scanner::app::frame_processor::BarcodeFormat;
use barcode_scanner::backends::camera::types::{CameraFacing, Resolution};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.camera_facing, CameraFacing::Back);
    assert_eq!(config.live_formats.len(), BarcodeFormat::ALL.len());
    assert!(
        !config.report_image_load_errors,
        "Image load errors should be silent by default"
    );
}

#[test]
fn test_still_image_defaults_cover_linear_stacked_and_qr() {
    let formats = Config::default().still_image_formats;
    assert!(formats.contains(&BarcodeFormat::Ean13));
    assert!(formats.contains(&BarcodeFormat::Pdf417));
    assert!(formats.contains(&BarcodeFormat::QrCode));
}

#[test]
fn test_config_file_is_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let config = Config {
        camera_facing: CameraFacing::Front,
        live_formats: vec![BarcodeFormat::QrCode, BarcodeFormat::Code128],
        report_image_load_errors: true,
        ..Config::default()
    };
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    assert_eq!(Config::load_from(&path).unwrap(), config);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "camera_facing": "Front", "unknown_key": 1 }"#).unwrap();

    let config = Config::load(Some(path.as_path()));

    assert_eq!(config.camera_facing, CameraFacing::Front);
    assert_eq!(
        config.still_image_formats,
        BarcodeFormat::STILL_IMAGE_DEFAULT.to_vec()
    );
}

#[test]
fn test_unusable_values_are_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "live_formats": [],
            "max_decode_dimension": 0,
            "analysis_resolution": { "width": 0, "height": 360 }
        }"#,
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    let defaults = Config::default();

    assert_eq!(config.live_formats, defaults.live_formats);
    assert_eq!(config.max_decode_dimension, defaults.max_decode_dimension);
    assert_eq!(config.analysis_resolution, defaults.analysis_resolution);
}

#[test]
fn test_malformed_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Config::load_from(&path).is_err());
    assert_eq!(Config::load(Some(path.as_path())), Config::default());
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(Some(dir.path().join("absent.json").as_path()));
    assert_eq!(config, Config::default());
}

#[test]
fn test_stream_config_uses_configured_resolutions() {
    let config = Config {
        analysis_resolution: Resolution::new(320, 240),
        ..Config::default()
    };
    let stream = config.stream_config();
    assert_eq!(stream.analysis, Resolution::new(320, 240));
    assert_eq!(stream.preview, config.preview_resolution);
}
