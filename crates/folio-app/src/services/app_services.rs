// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — owns the document list, the job orchestrator, the
// engine handle and the settings, and runs the flow
// add -> resolve metadata -> probe if needed -> build -> submit.
//
// The registry sits behind a std `Mutex`: every registry operation is
// synchronous and short, and no lock is held across an engine call.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use folio_bridge::{ProcessingEngine, SettingsStore, engine_for};
use folio_core::AppConfig;
use folio_core::error::{FolioError, Result};
use folio_core::types::{
    CapabilityFlag, DocumentEntry, DocumentMetadata, EntryId, JobOptions, JobPhase, JobState,
    NewDocument,
};
use folio_document::{Direction, DocumentRegistry};
use folio_jobs::{CapabilityProbe, JobOrchestrator, build, process_probe};

use super::data_dir;
use super::settings::JsonSettingsStore;

/// Shared application services.
///
/// All fields are cheaply cloneable (Arc-wrapped) so the struct can move
/// into spawned tasks.
#[derive(Clone)]
pub struct AppServices {
    engine: Arc<dyn ProcessingEngine>,
    registry: Arc<Mutex<DocumentRegistry>>,
    orchestrator: JobOrchestrator,
    probe: &'static CapabilityProbe,
    settings: Arc<dyn SettingsStore>,
    config: Arc<Mutex<AppConfig>>,
}

#[allow(dead_code)]
impl AppServices {
    /// Initialise all services. Call once at startup, inside the runtime.
    ///
    /// `engine_override` wins over the configured engine path.
    pub fn init(engine_override: Option<PathBuf>) -> Result<Self> {
        let dir = data_dir::data_dir();
        info!(path = %dir.display(), "initialising app services");

        let settings = JsonSettingsStore::in_dir(&dir);
        let config = settings.load()?;
        let engine_path = engine_override.or_else(|| config.engine_path.clone());
        let engine = engine_for(engine_path.as_deref());

        Self::with_parts(engine, Arc::new(settings), process_probe())
    }

    /// Assemble services from explicit parts.
    pub fn with_parts(
        engine: Arc<dyn ProcessingEngine>,
        settings: Arc<dyn SettingsStore>,
        probe: &'static CapabilityProbe,
    ) -> Result<Self> {
        let config = settings.load()?;
        Ok(Self {
            orchestrator: JobOrchestrator::new(Arc::clone(&engine)),
            engine,
            registry: Arc::new(Mutex::new(DocumentRegistry::new())),
            probe,
            settings,
            config: Arc::new(Mutex::new(config)),
        })
    }

    // -- Documents -----------------------------------------------------------

    /// Append documents; returns their new ids in order.
    pub fn add_documents(&self, documents: impl IntoIterator<Item = NewDocument>) -> Vec<EntryId> {
        self.registry
            .lock()
            .expect("registry lock poisoned")
            .add(documents)
    }

    /// Ask the engine for page counts and sizes of `ids`.
    ///
    /// Entries removed while a lookup is in flight are skipped. Lookup
    /// failures leave the entry's values unknown. Returns how many entries
    /// were updated.
    pub async fn resolve_metadata(&self, ids: &[EntryId]) -> usize {
        let mut resolved = 0;
        for &id in ids {
            let Some(path) = self.document(id).map(|e| e.source_path) else {
                continue;
            };

            match self.engine.document_info(&path).await {
                Ok(info) => {
                    let metadata = DocumentMetadata::from(info);
                    if self
                        .registry
                        .lock()
                        .expect("registry lock poisoned")
                        .resolve_metadata(id, metadata)
                    {
                        resolved += 1;
                    }
                }
                Err(e) => warn!(entry_id = %id, path = %path, error = %e, "document info unavailable"),
            }
        }
        debug!(requested = ids.len(), resolved, "metadata resolution finished");
        resolved
    }

    pub fn remove_document(&self, id: EntryId) -> bool {
        self.registry.lock().expect("registry lock poisoned").remove(id)
    }

    pub fn clear_documents(&self) {
        self.registry.lock().expect("registry lock poisoned").clear();
    }

    pub fn sort_documents(&self) {
        self.registry.lock().expect("registry lock poisoned").sort_by_name();
    }

    pub fn reverse_documents(&self) {
        self.registry.lock().expect("registry lock poisoned").reverse();
    }

    pub fn move_document(&self, from: EntryId, to: EntryId) -> bool {
        self.registry
            .lock()
            .expect("registry lock poisoned")
            .move_entry(from, to)
    }

    pub fn shift_document(&self, id: EntryId, direction: Direction) -> bool {
        self.registry
            .lock()
            .expect("registry lock poisoned")
            .shift(id, direction)
    }

    pub fn document(&self, id: EntryId) -> Option<DocumentEntry> {
        self.registry
            .lock()
            .expect("registry lock poisoned")
            .get(id)
            .cloned()
    }

    /// Snapshot of the document list in order.
    pub fn documents(&self) -> Vec<DocumentEntry> {
        self.registry
            .lock()
            .expect("registry lock poisoned")
            .entries()
            .to_vec()
    }

    pub fn total_pages(&self) -> u64 {
        self.registry.lock().expect("registry lock poisoned").total_pages()
    }

    // -- Capability ----------------------------------------------------------

    /// Converter availability, querying the engine on first use.
    pub async fn probe_capability(&self) -> CapabilityFlag {
        self.probe.probe(self.engine.as_ref()).await
    }

    pub async fn reprobe_capability(&self) -> CapabilityFlag {
        self.probe.reprobe(self.engine.as_ref()).await
    }

    pub fn cached_capability(&self) -> CapabilityFlag {
        self.probe.cached()
    }

    // -- Jobs ----------------------------------------------------------------

    /// Validate the current document list against `options` and submit it.
    ///
    /// Formats that need the external converter probe first, so a missing
    /// converter is reported here and the engine is never contacted.
    pub async fn start_job(&self, options: JobOptions) -> Result<()> {
        let capability = match &options {
            JobOptions::Convert(opts) if opts.output_format.requires_converter() => {
                self.probe_capability().await
            }
            _ => self.cached_capability(),
        };

        let request = build(&self.documents(), &options, capability)?;
        self.orchestrator.submit(request)
    }

    pub fn cancel_job(&self) -> bool {
        self.orchestrator.cancel()
    }

    pub fn start_new_job(&self) -> Result<()> {
        self.orchestrator.start_new_job()
    }

    pub fn job_state(&self) -> JobState {
        self.orchestrator.state()
    }

    pub fn watch_job(&self) -> watch::Receiver<JobState> {
        self.orchestrator.watch()
    }

    /// Wait until the current job leaves flight, then remember its output
    /// path if it succeeded.
    ///
    /// Returns at once when no job is in flight. There is no timeout.
    pub async fn finish_job(&self) -> Result<JobState> {
        let mut rx = self.watch_job();
        let state = rx
            .wait_for(|s| !s.phase.is_in_flight())
            .await
            .map_err(|_| FolioError::Transport("job state channel closed".into()))?
            .clone();

        if state.phase == JobPhase::Succeeded {
            if let Some(output) = &state.output_path {
                let mut config = self.config();
                config.last_output_path = output.clone();
                self.save_config(&config)?;
            }
        }
        Ok(state)
    }

    // -- Config --------------------------------------------------------------

    /// Get a clone of the current config.
    pub fn config(&self) -> AppConfig {
        self.config.lock().expect("config lock poisoned").clone()
    }

    /// Update and persist the config.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        *self.config.lock().expect("config lock poisoned") = config.clone();
        self.settings.save(config)
    }
}
