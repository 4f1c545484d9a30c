// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub engine for runs where no processing engine is installed.
//
// Every command returns `EngineUnavailable`. The capability probe therefore
// caches `Absent` and any submitted job ends `Failed`.

use async_trait::async_trait;
use tokio::sync::broadcast;

use folio_core::error::{FolioError, Result};
use folio_core::types::{ConvertRequest, DocumentInfo, MergeRequest, ProgressEvent, TaskId};

use crate::traits::{PendingTask, ProcessingEngine};

/// Engine stand-in that has nothing to offer.
pub struct StubEngine {
    /// Never sent on; keeps subscriptions open and silent.
    events: broadcast::Sender<ProgressEvent>,
}

impl StubEngine {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1);
        Self { events }
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessingEngine for StubEngine {
    async fn probe_capability(&self) -> Result<bool> {
        tracing::warn!("ProcessingEngine::probe_capability called on stub engine");
        Err(FolioError::EngineUnavailable)
    }

    async fn document_info(&self, _path: &str) -> Result<DocumentInfo> {
        Err(FolioError::EngineUnavailable)
    }

    async fn submit_merge(&self, _request: MergeRequest) -> Result<PendingTask> {
        tracing::warn!("ProcessingEngine::submit_merge called on stub engine");
        Err(FolioError::EngineUnavailable)
    }

    async fn submit_convert(&self, _request: ConvertRequest) -> Result<PendingTask> {
        tracing::warn!("ProcessingEngine::submit_convert called on stub engine");
        Err(FolioError::EngineUnavailable)
    }

    async fn cancel(&self, _task_id: &TaskId) -> Result<()> {
        Err(FolioError::EngineUnavailable)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_command_is_unavailable() {
        let engine = StubEngine::new();
        assert!(matches!(
            engine.probe_capability().await,
            Err(FolioError::EngineUnavailable)
        ));
        assert!(matches!(
            engine.document_info("/a.pdf").await,
            Err(FolioError::EngineUnavailable)
        ));
        assert!(matches!(
            engine.cancel(&TaskId::from("t")).await,
            Err(FolioError::EngineUnavailable)
        ));
    }

    #[tokio::test]
    async fn subscription_stays_silent() {
        let engine = StubEngine::new();
        let mut events = engine.subscribe();
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
