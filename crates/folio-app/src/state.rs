// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Read-only application snapshot for display.

use folio_core::AppConfig;
use folio_core::config::Language;
use folio_core::types::{CapabilityFlag, DocumentEntry, JobPhase, JobState};

use crate::services::app_services::AppServices;

/// Everything a front end shows at one instant.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct AppState {
    /// Documents in merge order.
    pub documents: Vec<DocumentEntry>,
    /// Sum of known page counts.
    pub total_pages: u64,
    pub job: JobState,
    pub capability: CapabilityFlag,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(svc: &AppServices) -> Self {
        Self {
            documents: svc.documents(),
            total_pages: svc.total_pages(),
            job: svc.job_state(),
            capability: svc.cached_capability(),
            config: svc.config(),
        }
    }

    /// Message key for the status bar.
    pub fn status_key(&self) -> &'static str {
        status_key(self.job.phase)
    }

    /// Status bar text in the configured language.
    pub fn status_text(&self) -> &'static str {
        status_text(self.status_key(), self.config.language)
    }
}

pub fn status_key(phase: JobPhase) -> &'static str {
    match phase {
        JobPhase::Idle => "status.ready",
        JobPhase::Submitting | JobPhase::Analyzing | JobPhase::Processing => "status.processing",
        JobPhase::Succeeded => "status.completed",
        JobPhase::Failed => "status.failed",
        JobPhase::Cancelled => "status.cancelled",
    }
}

pub fn status_text(key: &str, language: Language) -> &'static str {
    match (language, key) {
        (Language::EnUs, "status.processing") => "Processing…",
        (Language::EnUs, "status.completed") => "Completed",
        (Language::EnUs, "status.failed") => "Failed",
        (Language::EnUs, "status.cancelled") => "Cancelled",
        (Language::EnUs, _) => "Ready",
        (Language::ZhCn, "status.processing") => "处理中…",
        (Language::ZhCn, "status.completed") => "已完成",
        (Language::ZhCn, "status.failed") => "失败",
        (Language::ZhCn, "status.cancelled") => "已取消",
        (Language::ZhCn, _) => "就绪",
    }
}
