// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Folio.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Stable identity of a document entry. Minted once, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A source document tracked by the registry.
///
/// Two entries are equal when their ids are; metadata filled in later does
/// not change an entry's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub id: EntryId,
    pub display_name: String,
    /// Filesystem path handed to the engine, as the picker or command line
    /// supplied it.
    pub source_path: String,
    /// 0 = unknown.
    pub page_count: u32,
    /// 0 = unknown.
    pub byte_size: u64,
    /// Opaque thumbnail reference supplied by the engine.
    pub thumbnail: Option<String>,
    /// 1-based page indices to include. `None` means every page.
    pub selected_pages: Option<BTreeSet<u32>>,
}

impl PartialEq for DocumentEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DocumentEntry {}

impl std::hash::Hash for DocumentEntry {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Caller-supplied description of a document to add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub display_name: String,
    pub source_path: String,
    pub byte_size: u64,
    pub selected_pages: Option<BTreeSet<u32>>,
}

impl NewDocument {
    pub fn new(display_name: impl Into<String>, source_path: impl Into<String>, byte_size: u64) -> Self {
        Self {
            display_name: display_name.into(),
            source_path: source_path.into(),
            byte_size,
            selected_pages: None,
        }
    }

    /// Restrict the document to a subset of its pages (1-based).
    pub fn with_selected_pages(mut self, pages: impl IntoIterator<Item = u32>) -> Self {
        self.selected_pages = Some(pages.into_iter().collect());
        self
    }
}

/// Lazily resolved facts about a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub page_count: u32,
    pub byte_size: u64,
    pub thumbnail: Option<String>,
}

/// What the engine reports for `get_pdf_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub page_count: u32,
    pub file_size: u64,
    pub title: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub thumbnail: String,
}

impl From<DocumentInfo> for DocumentMetadata {
    fn from(info: DocumentInfo) -> Self {
        Self {
            page_count: info.page_count,
            byte_size: info.file_size,
            thumbnail: (!info.thumbnail.is_empty()).then_some(info.thumbnail),
        }
    }
}

// ---------------------------------------------------------------------------
// Job options
// ---------------------------------------------------------------------------

/// Page size applied to merged output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    Original,
    A4,
    Letter,
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "a4" => Ok(Self::A4),
            "letter" => Ok(Self::Letter),
            other => Err(format!("unknown page size: {other}")),
        }
    }
}

/// E-book / text output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Epub,
    Mobi,
    Azw3,
    Txt,
    Md,
    Docx,
    Fb2,
    Html,
}

impl OutputFormat {
    /// File extension (also the wire name).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Epub => "epub",
            Self::Mobi => "mobi",
            Self::Azw3 => "azw3",
            Self::Txt => "txt",
            Self::Md => "md",
            Self::Docx => "docx",
            Self::Fb2 => "fb2",
            Self::Html => "html",
        }
    }

    /// Whether producing this format needs the optional external converter.
    pub fn requires_converter(&self) -> bool {
        matches!(self, Self::Mobi | Self::Azw3 | Self::Docx | Self::Fb2)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "epub" => Ok(Self::Epub),
            "mobi" => Ok(Self::Mobi),
            "azw3" => Ok(Self::Azw3),
            "txt" => Ok(Self::Txt),
            "md" | "markdown" => Ok(Self::Md),
            "docx" => Ok(Self::Docx),
            "fb2" => Ok(Self::Fb2),
            "html" => Ok(Self::Html),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Reflow,
    Fixed,
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reflow" => Ok(Self::Reflow),
            "fixed" => Ok(Self::Fixed),
            other => Err(format!("unknown layout mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl FromStr for FontSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            other => Err(format!("unknown font size: {other}")),
        }
    }
}

/// OCR settings for scanned input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrOptions {
    pub enabled: bool,
    /// Tesseract language codes, e.g. `eng`, `chi_sim`.
    pub languages: BTreeSet<String>,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            languages: ["chi_sim", "eng"].into_iter().map(String::from).collect(),
        }
    }
}

/// Book metadata written into converted output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    pub cover_path: Option<String>,
}

/// Options for merging several documents into one PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    pub keep_bookmarks: bool,
    pub page_size: PageSize,
    /// Empty means "use the default".
    pub output_path: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            keep_bookmarks: true,
            page_size: PageSize::Original,
            output_path: String::new(),
        }
    }
}

/// Options for converting one document to an e-book or text format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOptions {
    pub output_format: OutputFormat,
    pub layout_mode: LayoutMode,
    pub ocr: OcrOptions,
    pub metadata: BookMetadata,
    pub keep_images: bool,
    pub detect_tables: bool,
    pub font_size: FontSize,
    /// Empty means "derive from title or input name".
    pub output_path: String,
}

/// The two kinds of job the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    Merge,
    Convert,
}

/// Closed job configuration, one variant per job kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOptions {
    Merge(MergeOptions),
    Convert(ConvertOptions),
}

impl JobOptions {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Merge(_) => JobKind::Merge,
            Self::Convert(_) => JobKind::Convert,
        }
    }

    pub fn output_path(&self) -> &str {
        match self {
            Self::Merge(opts) => &opts.output_path,
            Self::Convert(opts) => &opts.output_path,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine wire requests
// ---------------------------------------------------------------------------

/// One input of a job, copied out of the registry at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDocument {
    pub path: String,
    pub selected_pages: Option<Vec<u32>>,
}

/// `merge_pdfs` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub files: Vec<RequestDocument>,
    pub output_path: String,
    pub keep_bookmarks: bool,
    pub page_size: PageSize,
}

/// `convert_pdf_to_ebook` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub input_path: String,
    pub output_path: String,
    pub output_format: OutputFormat,
    pub layout_mode: LayoutMode,
    pub ocr: OcrOptions,
    pub metadata: BookMetadata,
    pub keep_images: bool,
    pub detect_tables: bool,
    pub font_size: FontSize,
}

/// A request in the shape the engine accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineRequest {
    Merge(MergeRequest),
    Convert(ConvertRequest),
}

// ---------------------------------------------------------------------------
// Job progress
// ---------------------------------------------------------------------------

/// Engine-assigned task identifier. Empty until the engine accepts a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Payload of the `conversion-progress` channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub task_id: TaskId,
    pub percent: u32,
    pub stage: String,
    pub message: String,
}

/// Phases of the job orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobPhase {
    /// No job; ready to submit.
    #[default]
    Idle,
    /// Request sent, engine has not assigned a task id yet.
    Submitting,
    /// Accepted; engine is inspecting the input.
    Analyzing,
    /// Engine is producing output.
    Processing,
    Succeeded,
    Failed,
    /// Cancelled locally. The engine was asked to stop.
    Cancelled,
}

impl JobPhase {
    /// Submitting, Analyzing or Processing.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitting | Self::Analyzing | Self::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// Live state of the single job an orchestrator owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobState {
    pub task_id: TaskId,
    pub phase: JobPhase,
    /// 0..=100, never decreasing while Analyzing/Processing.
    pub percent: u8,
    /// Last engine stage name (e.g. `extracting_text`).
    pub stage: String,
    pub message: String,
    /// Set once the job has succeeded.
    pub output_path: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Whether the optional external converter is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CapabilityFlag {
    #[default]
    Unknown,
    Present,
    Absent,
}
