// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job phase state machine.
//
// Idle -> Submitting -> Analyzing -> Processing -> {Succeeded | Failed | Cancelled}
//
// Back to Idle only through an explicit `Reset`. Every race between local
// actions and engine messages is settled here, in `apply`: once a job is
// terminal, later engine messages for it are discarded, and progress never
// moves backwards.

use chrono::Utc;
use tracing::debug;

use folio_core::human_errors::display_reason;
use folio_core::types::{JobPhase, JobState, ProgressEvent, TaskId};

/// Everything that can happen to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// Caller submits a new job.
    Submit,
    /// Engine accepted the submission and assigned a task id.
    Accepted(TaskId),
    /// Engine progress for some task.
    Progress(ProgressEvent),
    /// Engine finished a task.
    Completed { task_id: TaskId, output_path: String },
    /// Engine reported that a task failed.
    EngineFailed { task_id: TaskId, reason: String },
    /// The engine could not be reached, or the link to it broke.
    /// Carries the user-facing message.
    TransportFailed(String),
    /// User cancelled.
    CancelRequested,
    /// "Start new job".
    Reset,
}

/// Outcome of applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State changed. `from == to` for progress within a phase.
    Applied { from: JobPhase, to: JobPhase },
    /// Stale or out-of-order engine message; state untouched.
    Discarded,
    /// Caller action not allowed in the current phase; state untouched.
    Rejected,
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// `Err` carries `Discarded` or `Rejected`.
type Step = Result<(), Transition>;

/// Stages the engine reports while still inspecting its input.
const ANALYSIS_STAGES: &[&str] = &["", "analyzing", "queued", "extracting_text"];

fn begins_work(stage: &str) -> bool {
    !ANALYSIS_STAGES.contains(&stage)
}

/// The state of one orchestrator's job and its transition function.
#[derive(Debug, Clone, Default)]
pub struct JobMachine {
    state: JobState,
}

impl JobMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn phase(&self) -> JobPhase {
        self.state.phase
    }

    /// Apply one event.
    pub fn apply(&mut self, event: JobEvent) -> Transition {
        let from = self.state.phase;
        let step = match event {
            JobEvent::Submit => self.submit(),
            JobEvent::Accepted(task_id) => self.accepted(task_id),
            JobEvent::Progress(progress) => self.progress(progress),
            JobEvent::Completed { task_id, output_path } => self.completed(&task_id, output_path),
            JobEvent::EngineFailed { task_id, reason } => self.engine_failed(&task_id, &reason),
            JobEvent::TransportFailed(message) => self.transport_failed(message),
            JobEvent::CancelRequested => self.cancel(),
            JobEvent::Reset => self.reset(),
        };

        match step {
            Ok(()) => Transition::Applied {
                from,
                to: self.state.phase,
            },
            Err(refused) => refused,
        }
    }

    fn submit(&mut self) -> Step {
        if self.state.phase != JobPhase::Idle {
            return Err(Transition::Rejected);
        }
        self.state = JobState {
            phase: JobPhase::Submitting,
            started_at: Some(Utc::now()),
            ..Default::default()
        };
        Ok(())
    }

    fn accepted(&mut self, task_id: TaskId) -> Step {
        if self.state.phase != JobPhase::Submitting {
            return self.discard(&task_id, "acceptance outside Submitting");
        }
        self.state.task_id = task_id;
        self.state.phase = JobPhase::Analyzing;
        self.state.percent = 0;
        Ok(())
    }

    fn progress(&mut self, progress: ProgressEvent) -> Step {
        if !self.is_running_task(&progress.task_id) {
            return self.discard(&progress.task_id, "progress for an inactive task");
        }

        let percent = progress.percent.min(100) as u8;
        if percent < self.state.percent {
            return self.discard(&progress.task_id, "progress below current percent");
        }

        if self.state.phase == JobPhase::Analyzing && begins_work(&progress.stage) {
            self.state.phase = JobPhase::Processing;
        }
        self.state.percent = percent;
        self.state.stage = progress.stage;
        self.state.message = progress.message;
        Ok(())
    }

    fn completed(&mut self, task_id: &TaskId, output_path: String) -> Step {
        if !self.is_running_task(task_id) {
            return self.discard(task_id, "completion for an inactive task");
        }
        self.state.percent = 100;
        self.state.output_path = Some(output_path);
        self.finish(JobPhase::Succeeded);
        Ok(())
    }

    fn engine_failed(&mut self, task_id: &TaskId, reason: &str) -> Step {
        if !self.is_running_task(task_id) {
            return self.discard(task_id, "failure for an inactive task");
        }
        self.state.message = display_reason(reason);
        self.finish(JobPhase::Failed);
        Ok(())
    }

    fn transport_failed(&mut self, message: String) -> Step {
        if !self.state.phase.is_in_flight() {
            return self.discard(&TaskId::default(), "transport failure with no job in flight");
        }
        self.state.message = message;
        self.finish(JobPhase::Failed);
        Ok(())
    }

    fn cancel(&mut self) -> Step {
        if !self.state.phase.is_in_flight() {
            return self.discard(&TaskId::default(), "cancel with no job in flight");
        }
        self.finish(JobPhase::Cancelled);
        Ok(())
    }

    fn reset(&mut self) -> Step {
        if self.state.phase.is_in_flight() {
            return Err(Transition::Rejected);
        }
        self.state = JobState::default();
        Ok(())
    }

    fn is_running_task(&self, task_id: &TaskId) -> bool {
        matches!(self.state.phase, JobPhase::Analyzing | JobPhase::Processing)
            && self.state.task_id == *task_id
    }

    fn finish(&mut self, phase: JobPhase) {
        self.state.phase = phase;
        self.state.finished_at = Some(Utc::now());
    }

    fn discard(&self, incoming: &TaskId, why: &'static str) -> Step {
        debug!(
            phase = ?self.state.phase,
            task_id = %self.state.task_id,
            incoming = %incoming,
            why,
            "job event discarded"
        );
        Err(Transition::Discarded)
    }
}
