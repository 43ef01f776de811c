// SPDX-License-Identifier: GPL-3.0-only

//! File access: picked images and the log file

use crate::constants::app_info;
use crate::errors::{AppError, AppResult};
use image::GrayImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read a picked image into the decoders' input form
///
/// The format is sniffed from the content, so files with a wrong or missing
/// extension still load.
pub fn load_still_image(path: &Path) -> AppResult<GrayImage> {
    let reader = image::ImageReader::open(path)
        .map_err(|e| AppError::ImageLoad(format!("{}: {}", path.display(), e)))?
        .with_guessed_format()
        .map_err(|e| AppError::ImageLoad(format!("{}: {}", path.display(), e)))?;

    let image = reader.decode()?;
    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "Still image loaded"
    );
    Ok(image.into_luma8())
}

/// Directory the image picker opens in
///
/// The first existing directory among the configured one, Pictures and
/// home. XDG user dirs may name a Pictures directory that was never created.
pub fn picker_start_dir(configured: Option<&Path>) -> PathBuf {
    first_existing_dir([
        configured.map(Path::to_path_buf),
        dirs::picture_dir(),
        dirs::home_dir(),
    ])
}

fn first_existing_dir(candidates: impl IntoIterator<Item = Option<PathBuf>>) -> PathBuf {
    candidates
        .into_iter()
        .flatten()
        .find(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Log file used while the terminal UI owns the screen
pub fn log_file_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(app_info::APP_DIR)
        .join(format!("{}.log", app_info::APP_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn test_load_png_as_luma() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("white.png");
        RgbImage::from_pixel(8, 4, Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();

        let luma = load_still_image(&path).unwrap();
        assert_eq!(luma.dimensions(), (8, 4));
        assert_eq!(*luma.get_pixel(0, 0), Luma([255]));
    }

    #[test]
    fn test_load_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("img.png");
        GrayImage::new(3, 3).save(&png).unwrap();
        let renamed = dir.path().join("img");
        std::fs::rename(&png, &renamed).unwrap();

        assert!(load_still_image(&renamed).is_ok());
    }

    #[test]
    fn test_start_dir_skips_missing_pictures_dir() {
        let home = tempfile::tempdir().unwrap();
        let pictures = home.path().join("Pictures");

        let dir = first_existing_dir([None, Some(pictures.clone()), Some(home.path().into())]);
        assert_eq!(dir, home.path());

        std::fs::create_dir(&pictures).unwrap();
        let dir = first_existing_dir([None, Some(pictures.clone()), Some(home.path().into())]);
        assert_eq!(dir, pictures);
    }

    #[test]
    fn test_start_dir_prefers_configured() {
        let configured = tempfile::tempdir().unwrap();
        assert_eq!(picker_start_dir(Some(configured.path())), configured.path());
        assert!(picker_start_dir(Some(&configured.path().join("gone"))).is_dir());
    }

    #[test]
    fn test_missing_and_corrupt_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_still_image(&dir.path().join("missing.png")),
            Err(AppError::ImageLoad(_))
        ));

        let corrupt = dir.path().join("corrupt.png");
        std::fs::write(&corrupt, b"\x89PNG\r\n\x1a\nnot really").unwrap();
        assert!(matches!(
            load_still_image(&corrupt),
            Err(AppError::ImageLoad(_))
        ));
    }
}
