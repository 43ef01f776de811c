// SPDX-License-Identifier: GPL-3.0-only

//! Gallery image picker

use crate::constants::file_formats::IMAGE_EXTENSIONS;
use futures::future::{BoxFuture, FutureExt};
use std::path::PathBuf;

/// Single-image chooser; resolves to `None` when the user cancels
pub trait ImagePicker: Send + Sync {
    fn pick_image(&self) -> BoxFuture<'static, Option<PathBuf>>;
}

/// Desktop file chooser (portal-backed inside a sandbox)
#[derive(Debug, Clone)]
pub struct DialogPicker {
    start_dir: PathBuf,
}

impl DialogPicker {
    pub fn new(start_dir: PathBuf) -> Self {
        Self { start_dir }
    }
}

impl ImagePicker for DialogPicker {
    fn pick_image(&self) -> BoxFuture<'static, Option<PathBuf>> {
        let start_dir = self.start_dir.clone();
        async move {
            let mut dialog = rfd::AsyncFileDialog::new()
                .set_title("Scan image")
                .add_filter("Images", IMAGE_EXTENSIONS);
            if start_dir.exists() {
                dialog = dialog.set_directory(&start_dir);
            }
            dialog.pick_file().await.map(|h| h.path().to_path_buf())
        }
        .boxed()
    }
}
