// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Transport failures deliberately stay generic: the raw detail goes to the
// log, not the status bar.

use crate::error::{FolioError, ValidationError};

/// Longest engine-supplied reason shown to the user, in characters.
const MAX_REASON_CHARS: usize = 200;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Engine hiccup; submitting again may work.
    Transient,
    /// User must change something (add a file, install a tool).
    ActionRequired,
    /// Retrying the same request will not help.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether submitting the job again is worth a try. Nothing retries
    /// automatically.
    pub retry_suggested: bool,
    pub severity: Severity,
}

/// Convert a `FolioError` into a `HumanError`.
pub fn humanize_error(err: &FolioError) -> HumanError {
    match err {
        FolioError::Validation(v) => humanize_validation(v),

        FolioError::AlreadyRunning => HumanError {
            message: "Another job is still running.".into(),
            suggestion: "Wait for it to finish or cancel it, then start again.".into(),
            retry_suggested: false,
            severity: Severity::ActionRequired,
        },

        FolioError::EngineUnavailable | FolioError::Transport(_) | FolioError::Protocol(_) => {
            HumanError {
                message: "The processing engine could not be reached.".into(),
                suggestion: "Check that the engine is installed, then try again.".into(),
                retry_suggested: true,
                severity: Severity::Transient,
            }
        }

        FolioError::EngineReported(reason) => HumanError {
            message: display_reason(reason),
            suggestion: "Check the input file and options, then try again.".into(),
            retry_suggested: true,
            severity: Severity::Permanent,
        },

        FolioError::PlatformUnavailable => HumanError {
            message: "This isn't available on this computer.".into(),
            suggestion: "Pass the file paths on the command line instead.".into(),
            retry_suggested: false,
            severity: Severity::Permanent,
        },

        FolioError::Io(_) => HumanError {
            message: "A file couldn't be read or written.".into(),
            suggestion: "Check that the file exists and that you have permission to use it.".into(),
            retry_suggested: true,
            severity: Severity::ActionRequired,
        },

        FolioError::Serialization(_) | FolioError::Config(_) => HumanError {
            message: "The settings file is damaged.".into(),
            suggestion: "Delete config.json in the Folio data folder to restore defaults.".into(),
            retry_suggested: false,
            severity: Severity::Permanent,
        },
    }
}

fn humanize_validation(err: &ValidationError) -> HumanError {
    match err {
        ValidationError::InsufficientInputs { .. } => HumanError {
            message: "Add at least two documents to merge.".into(),
            suggestion: "Drop more PDF files onto the list.".into(),
            retry_suggested: false,
            severity: Severity::ActionRequired,
        },
        ValidationError::InvalidInputCount { .. } => HumanError {
            message: "Conversion works on one document at a time.".into(),
            suggestion: "Keep a single PDF in the list and try again.".into(),
            retry_suggested: false,
            severity: Severity::ActionRequired,
        },
        ValidationError::MissingCapability { format } => HumanError {
            message: format!("Converting to {} needs Calibre.", format.extension().to_uppercase()),
            suggestion: "Install Calibre (ebook-convert), or pick EPUB, TXT, Markdown or HTML.".into(),
            retry_suggested: false,
            severity: Severity::ActionRequired,
        },
        ValidationError::PageOutOfRange { document, page, page_count } => HumanError {
            message: format!("{document} has no page {page}."),
            suggestion: format!("Pick pages between 1 and {page_count}."),
            retry_suggested: false,
            severity: Severity::ActionRequired,
        },
    }
}

/// Trim an engine-reported failure to something safe to display: the first
/// non-empty line, bounded in length.
pub fn display_reason(reason: &str) -> String {
    let line = reason
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("The engine reported an unknown error.");

    if line.chars().count() <= MAX_REASON_CHARS {
        line.to_owned()
    } else {
        let mut cut: String = line.chars().take(MAX_REASON_CHARS).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputFormat;

    #[test]
    fn transport_failure_is_generic() {
        let err = FolioError::Transport("broken pipe writing to /usr/lib/folio/engine".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Transient);
        assert!(!human.message.contains("broken pipe"));
        assert!(human.retry_suggested);
    }

    #[test]
    fn missing_capability_names_format() {
        let err = FolioError::from(ValidationError::MissingCapability {
            format: OutputFormat::Mobi,
        });
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.message.contains("MOBI"));
    }

    #[test]
    fn engine_reason_keeps_first_line() {
        let reason = "\n  ebook-convert failed: bad input  \nTraceback (most recent call last):\n";
        assert_eq!(display_reason(reason), "ebook-convert failed: bad input");
    }

    #[test]
    fn long_engine_reason_is_truncated() {
        let reason = "x".repeat(500);
        let shown = display_reason(&reason);
        assert_eq!(shown.chars().count(), MAX_REASON_CHARS + 1);
        assert!(shown.ends_with('…'));
    }

    #[test]
    fn blank_engine_reason_gets_placeholder() {
        assert_eq!(display_reason("   \n"), "The engine reported an unknown error.");
    }
}
