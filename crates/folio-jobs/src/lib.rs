// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio Jobs — turning a document list into an engine job and following that
// job to completion.
//
// `builder` validates a registry snapshot into an immutable `JobRequest`,
// `machine` is the pure phase transition function, `orchestrator` drives one
// job at a time against a `ProcessingEngine`, and `capability` caches whether
// the optional external converter is installed.

pub mod builder;
pub mod capability;
pub mod machine;
pub mod orchestrator;
pub mod request;

pub use builder::build;
pub use capability::{CapabilityProbe, process_probe};
pub use machine::{JobEvent, JobMachine, Transition};
pub use orchestrator::JobOrchestrator;
pub use request::JobRequest;
