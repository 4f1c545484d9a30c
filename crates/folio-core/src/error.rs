// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use thiserror::Error;

use crate::types::OutputFormat;

/// Reasons a job request is refused before the engine is ever contacted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Merging needs at least two documents.
    #[error("merge needs at least 2 documents, found {found}")]
    InsufficientInputs { found: usize },

    /// Conversion takes exactly one document.
    #[error("conversion takes exactly 1 document, found {found}")]
    InvalidInputCount { found: usize },

    /// The output format needs the external converter and it is absent.
    #[error("output format {format} requires the external converter, which is not installed")]
    MissingCapability { format: OutputFormat },

    /// A selected page lies outside the document's known page count.
    #[error("page {page} is out of range for {document} ({page_count} pages)")]
    PageOutOfRange {
        document: String,
        page: u32,
        page_count: u32,
    },
}

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Job errors --
    #[error("job validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("a job is already in flight")]
    AlreadyRunning,

    // -- Engine errors --
    #[error("processing engine is not available")]
    EngineUnavailable,

    #[error("engine transport failed: {0}")]
    Transport(String),

    #[error("engine reported an error: {0}")]
    EngineReported(String),

    #[error("malformed engine message: {0}")]
    Protocol(String),

    // -- Platform --
    #[error("feature not available on this platform")]
    PlatformUnavailable,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;
