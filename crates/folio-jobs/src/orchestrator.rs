// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job orchestrator: runs at most one job against the processing engine and
// publishes its state.
//
// Each submitted job gets a driver task that owns the progress subscription
// and waits for the engine's completion. The driver feeds engine messages
// into the `JobMachine`; local actions (cancel, start new job) go straight
// to the machine from the caller. Every driver carries the generation it was
// started for and its messages are dropped once a newer job exists. A job
// cancelled before acceptance signals its driver to drop the subscription
// while the submission is still pending.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use folio_bridge::{PendingTask, ProcessingEngine};
use folio_core::error::{FolioError, Result};
use folio_core::human_errors::humanize_error;
use folio_core::types::{EngineRequest, JobPhase, JobState, TaskId};

use crate::machine::{JobEvent, JobMachine, Transition};
use crate::request::JobRequest;

struct Slot {
    machine: JobMachine,
    generation: u64,
    /// Raised when the current job is cancelled before acceptance.
    abandoned: Arc<Notify>,
}

struct Inner {
    slot: Mutex<Slot>,
    state: watch::Sender<JobState>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    /// Apply `event` on behalf of the driver for `generation`.
    /// `None` if that driver is stale.
    fn apply(&self, generation: u64, event: JobEvent) -> Option<Transition> {
        let mut slot = self.slot.lock().expect("job slot lock poisoned");
        if slot.generation != generation {
            debug!(generation, current = slot.generation, "event from stale job driver dropped");
            return None;
        }
        let transition = slot.machine.apply(event);
        if transition.is_applied() {
            self.publish(&slot);
        }
        Some(transition)
    }

    fn publish(&self, slot: &Slot) {
        self.state.send_replace(slot.machine.state().clone());
    }

    fn replace_driver(&self, driver: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        let mut current = self.driver.lock().expect("driver lock poisoned");
        std::mem::replace(&mut *current, driver)
    }
}

/// Runs one job at a time and reports its phase and progress.
///
/// Cloning yields another handle to the same orchestrator. Methods that
/// start work spawn onto the current Tokio runtime.
#[derive(Clone)]
pub struct JobOrchestrator {
    engine: Arc<dyn ProcessingEngine>,
    inner: Arc<Inner>,
}

impl JobOrchestrator {
    pub fn new(engine: Arc<dyn ProcessingEngine>) -> Self {
        let machine = JobMachine::new();
        let (state, _) = watch::channel(machine.state().clone());
        Self {
            engine,
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot {
                    machine,
                    generation: 0,
                    abandoned: Arc::new(Notify::new()),
                }),
                state,
                driver: Mutex::new(None),
            }),
        }
    }

    /// Submit a validated job.
    ///
    /// Returns as soon as the job is `Submitting`; engine acceptance,
    /// progress and completion arrive through [`Self::watch`]. Fails with
    /// `AlreadyRunning`, leaving the current job untouched, unless the
    /// orchestrator is `Idle`.
    #[instrument(skip_all, fields(kind = ?request.kind(), output = request.output_path()))]
    pub fn submit(&self, request: JobRequest) -> Result<()> {
        let (generation, abandoned) = {
            let mut slot = self.inner.slot.lock().expect("job slot lock poisoned");
            if slot.machine.apply(JobEvent::Submit) == Transition::Rejected {
                warn!(phase = ?slot.machine.phase(), "submit refused; a job is already active");
                return Err(FolioError::AlreadyRunning);
            }
            slot.generation += 1;
            slot.abandoned = Arc::new(Notify::new());
            self.inner.publish(&slot);
            (slot.generation, Arc::clone(&slot.abandoned))
        };

        if let Some(previous) = self.inner.replace_driver(None) {
            if previous.is_finished() {
                debug!("previous job driver already finished");
            } else {
                // Only a job cancelled before acceptance leaves its driver
                // running. It holds no subscription and cancels its own task
                // once the engine answers.
                debug!("previous job driver still settling a cancelled submission");
            }
        }

        let driver = tokio::spawn(drive(
            Arc::clone(&self.engine),
            Arc::clone(&self.inner),
            generation,
            abandoned,
            request,
        ));
        self.inner.replace_driver(Some(driver));
        info!(generation, "job submitted");
        Ok(())
    }

    /// Cancel the job in flight.
    ///
    /// The local state becomes `Cancelled` before this returns. The engine
    /// is told to stop in the background and its answer is not awaited.
    /// Returns `false` if there was nothing to cancel.
    pub fn cancel(&self) -> bool {
        let (transition, task_id) = {
            let mut slot = self.inner.slot.lock().expect("job slot lock poisoned");
            let transition = slot.machine.apply(JobEvent::CancelRequested);
            if transition.is_applied() {
                self.inner.publish(&slot);
            }
            if matches!(transition, Transition::Applied { from: JobPhase::Submitting, .. }) {
                slot.abandoned.notify_one();
            }
            (transition, slot.machine.state().task_id.clone())
        };

        let Transition::Applied { from, .. } = transition else {
            return false;
        };
        info!(task_id = %task_id, from = ?from, "job cancelled");

        if from == JobPhase::Submitting {
            // No task id yet. The driver drops its subscription now and
            // cancels the task once the engine accepts it.
            return true;
        }

        if let Some(driver) = self.inner.replace_driver(None) {
            driver.abort();
        }
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            if let Err(e) = engine.cancel(&task_id).await {
                warn!(task_id = %task_id, error = %e, "engine did not take the cancel request");
            }
        });
        true
    }

    /// Return to `Idle` after a finished job. Refused with `AlreadyRunning`
    /// while a job is in flight.
    pub fn start_new_job(&self) -> Result<()> {
        let mut slot = self.inner.slot.lock().expect("job slot lock poisoned");
        match slot.machine.apply(JobEvent::Reset) {
            Transition::Rejected => Err(FolioError::AlreadyRunning),
            _ => {
                self.inner.publish(&slot);
                Ok(())
            }
        }
    }

    /// Snapshot of the current job.
    pub fn state(&self) -> JobState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every published state change.
    pub fn watch(&self) -> watch::Receiver<JobState> {
        self.inner.state.subscribe()
    }
}

/// Submit `request` and follow it until the engine finishes it or the
/// driver is aborted.
async fn drive(
    engine: Arc<dyn ProcessingEngine>,
    inner: Arc<Inner>,
    generation: u64,
    abandoned: Arc<Notify>,
    request: JobRequest,
) {
    // Subscribe before submitting so no early progress is missed.
    let mut events = Some(engine.subscribe());

    let submission = async {
        match request.to_engine_request() {
            EngineRequest::Merge(merge) => engine.submit_merge(merge).await,
            EngineRequest::Convert(convert) => engine.submit_convert(convert).await,
        }
    };
    tokio::pin!(submission);
    let submitted = loop {
        tokio::select! {
            biased;

            submitted = &mut submission => break submitted,
            _ = abandoned.notified(), if events.is_some() => {
                debug!(generation, "job abandoned before acceptance; dropping progress subscription");
                events = None;
            }
        }
    };

    let PendingTask {
        task_id,
        mut completion,
    } = match submitted {
        Ok(pending) => pending,
        Err(e) => {
            warn!(error = %e, "engine refused the submission");
            inner.apply(generation, JobEvent::TransportFailed(humanize_error(&e).message));
            return;
        }
    };

    if !matches!(
        inner.apply(generation, JobEvent::Accepted(task_id.clone())),
        Some(Transition::Applied { .. })
    ) {
        // Cancelled or replaced before the engine answered.
        drop(events);
        cancel_orphan(engine.as_ref(), &task_id).await;
        return;
    }
    info!(task_id = %task_id, "engine accepted job");

    let Some(mut events) = events else {
        return;
    };

    let mut events_open = true;
    loop {
        tokio::select! {
            biased;

            received = events.recv(), if events_open => match received {
                Ok(progress) if progress.task_id == task_id => {
                    if inner.apply(generation, JobEvent::Progress(progress)).is_none() {
                        return;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(task_id = %task_id, skipped, "progress subscriber lagged");
                }
                Err(RecvError::Closed) => {
                    debug!(task_id = %task_id, "progress channel closed");
                    events_open = false;
                }
            },

            outcome = &mut completion => {
                let event = match outcome {
                    Ok(Ok(output_path)) => {
                        info!(task_id = %task_id, output = %output_path, "engine finished job");
                        JobEvent::Completed { task_id, output_path }
                    }
                    Ok(Err(reason)) => {
                        warn!(task_id = %task_id, reason = %reason, "engine failed job");
                        JobEvent::EngineFailed { task_id, reason }
                    }
                    Err(_) => {
                        let lost = FolioError::Transport("engine went away mid-job".into());
                        warn!(task_id = %task_id, "{lost}");
                        JobEvent::TransportFailed(humanize_error(&lost).message)
                    }
                };
                inner.apply(generation, event);
                return;
            }
        }
    }
}

async fn cancel_orphan(engine: &dyn ProcessingEngine, task_id: &TaskId) {
    info!(task_id = %task_id, "cancelling task accepted after the job was abandoned");
    if let Err(e) = engine.cancel(task_id).await {
        warn!(task_id = %task_id, error = %e, "engine did not take the cancel request");
    }
}
