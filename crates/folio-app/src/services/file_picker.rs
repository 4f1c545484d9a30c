// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native file dialogs via `rfd`.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use folio_bridge::{FilePicker, PickedFile};
use folio_core::error::Result;
#[cfg(any(target_os = "ios", target_os = "android"))]
use folio_core::error::FolioError;

/// Describe a file on disk. Size is 0 when it cannot be read.
pub fn picked_from_path(path: &Path) -> PickedFile {
    let display_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let byte_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    PickedFile {
        display_name,
        source_path: path.display().to_string(),
        byte_size,
    }
}

/// Open/save dialogs from the desktop environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct RfdPicker;

#[async_trait]
impl FilePicker for RfdPicker {
    async fn pick_documents(&self, multiple: bool) -> Result<Vec<PickedFile>> {
        #[cfg(any(target_os = "ios", target_os = "android"))]
        {
            let _ = multiple;
            return Err(FolioError::PlatformUnavailable);
        }

        #[cfg(not(any(target_os = "ios", target_os = "android")))]
        {
            let dialog = rfd::AsyncFileDialog::new()
                .set_title("Choose PDF files")
                .add_filter("PDF", &["pdf"]);

            let handles = if multiple {
                dialog.pick_files().await.unwrap_or_default()
            } else {
                dialog.pick_file().await.into_iter().collect()
            };

            let picked: Vec<PickedFile> =
                handles.iter().map(|h| picked_from_path(h.path())).collect();
            debug!(count = picked.len(), "documents picked");
            Ok(picked)
        }
    }

    async fn pick_save_path(&self, default_name: &str, extension: &str) -> Result<Option<String>> {
        #[cfg(any(target_os = "ios", target_os = "android"))]
        {
            let _ = (default_name, extension);
            return Err(FolioError::PlatformUnavailable);
        }

        #[cfg(not(any(target_os = "ios", target_os = "android")))]
        {
            let handle = rfd::AsyncFileDialog::new()
                .set_file_name(default_name)
                .add_filter(extension.to_uppercase(), &[extension])
                .save_file()
                .await;
            Ok(handle.map(|h| h.path().display().to_string()))
        }
    }
}
