// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trait definitions for everything Folio consumes but does not implement:
// the processing engine, native file dialogs, and settings storage.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use tokio::sync::{broadcast, oneshot};

use folio_core::config::AppConfig;
use folio_core::error::Result;
use folio_core::types::{
    ConvertRequest, DocumentInfo, MergeRequest, NewDocument, ProgressEvent, TaskId,
};

/// Name of the engine's progress event channel.
pub const PROGRESS_CHANNEL: &str = "conversion-progress";

/// Final response of an accepted job: the output path, or the engine's
/// failure reason.
pub type Completion = oneshot::Receiver<std::result::Result<String, String>>;

/// A job the engine has accepted but not finished.
///
/// The engine answers a submission twice: once on acceptance (carrying the
/// task id) and once on completion. There is no terminal progress event.
#[derive(Debug)]
pub struct PendingTask {
    pub task_id: TaskId,
    pub completion: Completion,
}

impl PendingTask {
    pub fn new(task_id: TaskId, completion: Completion) -> Self {
        Self { task_id, completion }
    }
}

/// Command and event interface of the external processing engine.
///
/// Every command is independently invocable. Progress for running tasks is
/// broadcast to all subscribers; receivers filter by task id.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ProcessingEngine: Send + Sync {
    /// Whether the optional external converter (Calibre) is installed.
    async fn probe_capability(&self) -> Result<bool>;

    /// Page count, size, metadata and thumbnail of a document.
    async fn document_info(&self, path: &str) -> Result<DocumentInfo>;

    async fn submit_merge(&self, request: MergeRequest) -> Result<PendingTask>;

    async fn submit_convert(&self, request: ConvertRequest) -> Result<PendingTask>;

    /// Ask the engine to stop a task. Best-effort; no confirmation.
    async fn cancel(&self, task_id: &TaskId) -> Result<()>;

    /// Subscribe to the progress channel.
    fn subscribe(&self) -> broadcast::Receiver<ProgressEvent>;
}

/// A file chosen in a native dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    pub display_name: String,
    pub source_path: String,
    /// 0 = unknown.
    pub byte_size: u64,
}

impl From<PickedFile> for NewDocument {
    fn from(file: PickedFile) -> Self {
        NewDocument::new(file.display_name, file.source_path, file.byte_size)
    }
}

/// Native open/save dialogs.
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Show an open dialog filtered to PDF. Empty if the user cancelled.
    async fn pick_documents(&self, multiple: bool) -> Result<Vec<PickedFile>>;

    /// Show a save dialog. `None` if the user cancelled.
    async fn pick_save_path(&self, default_name: &str, extension: &str) -> Result<Option<String>>;
}

/// Where application settings live between runs.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<AppConfig>;

    fn save(&self, config: &AppConfig) -> Result<()>;
}
