// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability probe: is the optional external converter installed?
//
// The answer is cached after the first query. A failed query caches `Absent`
// and is not retried until `reprobe` or `reset`.

use std::sync::OnceLock;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use folio_bridge::ProcessingEngine;
use folio_core::types::CapabilityFlag;

/// Cached converter availability.
///
/// Concurrent first calls share one engine query: the lock is held across it.
#[derive(Debug, Default)]
pub struct CapabilityProbe {
    flag: Mutex<CapabilityFlag>,
}

impl CapabilityProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached flag, querying the engine on first use.
    pub async fn probe(&self, engine: &dyn ProcessingEngine) -> CapabilityFlag {
        let mut flag = self.flag.lock().await;
        if *flag == CapabilityFlag::Unknown {
            *flag = query(engine).await;
        }
        *flag
    }

    /// Query the engine again, replacing the cached flag.
    pub async fn reprobe(&self, engine: &dyn ProcessingEngine) -> CapabilityFlag {
        let mut flag = self.flag.lock().await;
        *flag = query(engine).await;
        *flag
    }

    /// Cached flag without querying. `Unknown` while a query is running.
    pub fn cached(&self) -> CapabilityFlag {
        self.flag
            .try_lock()
            .map(|flag| *flag)
            .unwrap_or(CapabilityFlag::Unknown)
    }

    /// Forget the cached flag.
    pub async fn reset(&self) {
        *self.flag.lock().await = CapabilityFlag::Unknown;
    }
}

#[instrument(skip_all)]
async fn query(engine: &dyn ProcessingEngine) -> CapabilityFlag {
    match engine.probe_capability().await {
        Ok(true) => {
            info!("external converter present");
            CapabilityFlag::Present
        }
        Ok(false) => {
            info!("external converter absent");
            CapabilityFlag::Absent
        }
        Err(e) => {
            warn!(error = %e, "capability probe failed; treating converter as absent");
            CapabilityFlag::Absent
        }
    }
}

/// The process-wide probe.
pub fn process_probe() -> &'static CapabilityProbe {
    static PROBE: OnceLock<CapabilityProbe> = OnceLock::new();
    PROBE.get_or_init(CapabilityProbe::new)
}
