// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio — Bridge to the external processing engine.
//
// The engine does the real PDF merging, OCR and format conversion. Folio only
// talks to it through the `ProcessingEngine` trait: a set of independently
// invocable commands plus a progress event channel.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

pub mod sidecar;
pub mod stub;
pub mod traits;

pub use sidecar::SidecarEngine;
pub use stub::StubEngine;
pub use traits::{FilePicker, PendingTask, PickedFile, ProcessingEngine, SettingsStore};

#[cfg(any(test, feature = "test-export-mocks"))]
pub use traits::MockProcessingEngine;

/// Start the engine at `program`, or fall back to the stub when none is
/// configured or it fails to launch.
///
/// Must be called from within a Tokio runtime.
pub fn engine_for(program: Option<&Path>) -> Arc<dyn ProcessingEngine> {
    let Some(program) = program else {
        info!("no processing engine configured; running without one");
        return Arc::new(StubEngine::new());
    };

    match SidecarEngine::spawn(program) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            warn!(program = %program.display(), error = %e, "engine failed to start; running without one");
            Arc::new(StubEngine::new())
        }
    }
}
