// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Validated, immutable job request.

use folio_core::types::{
    ConvertRequest, EngineRequest, JobKind, JobOptions, MergeRequest, RequestDocument,
};

/// A job that passed validation.
///
/// Holds value copies of the input paths and page subsets, so later edits to
/// the registry never reach a job that is already built. Only
/// [`crate::builder::build`] can create one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    documents: Vec<RequestDocument>,
    options: JobOptions,
}

impl JobRequest {
    pub(crate) fn new(documents: Vec<RequestDocument>, options: JobOptions) -> Self {
        Self { documents, options }
    }

    pub fn kind(&self) -> JobKind {
        self.options.kind()
    }

    pub fn documents(&self) -> &[RequestDocument] {
        &self.documents
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// Output path after defaulting; never empty.
    pub fn output_path(&self) -> &str {
        self.options.output_path()
    }

    /// The payload in the shape the engine's command expects.
    pub fn to_engine_request(&self) -> EngineRequest {
        match &self.options {
            JobOptions::Merge(opts) => EngineRequest::Merge(MergeRequest {
                files: self.documents.clone(),
                output_path: opts.output_path.clone(),
                keep_bookmarks: opts.keep_bookmarks,
                page_size: opts.page_size,
            }),
            JobOptions::Convert(opts) => EngineRequest::Convert(ConvertRequest {
                input_path: self
                    .documents
                    .first()
                    .map(|doc| doc.path.clone())
                    .unwrap_or_default(),
                output_path: opts.output_path.clone(),
                output_format: opts.output_format,
                layout_mode: opts.layout_mode,
                ocr: opts.ocr.clone(),
                metadata: opts.metadata.clone(),
                keep_images: opts.keep_images,
                detect_tables: opts.detect_tables,
                font_size: opts.font_size,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use folio_core::types::{ConvertOptions, MergeOptions, OutputFormat, PageSize};

    use super::*;

    fn document(path: &str) -> RequestDocument {
        RequestDocument {
            path: path.into(),
            selected_pages: None,
        }
    }

    #[test]
    fn merge_request_keeps_order_and_options() {
        let request = JobRequest::new(
            vec![document("/b.pdf"), document("/a.pdf")],
            JobOptions::Merge(MergeOptions {
                keep_bookmarks: false,
                page_size: PageSize::A4,
                output_path: "out.pdf".into(),
            }),
        );

        let EngineRequest::Merge(merge) = request.to_engine_request() else {
            panic!("expected a merge request");
        };
        let paths: Vec<_> = merge.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["/b.pdf", "/a.pdf"]);
        assert!(!merge.keep_bookmarks);
        assert_eq!(merge.page_size, PageSize::A4);
        assert_eq!(merge.output_path, "out.pdf");
    }

    #[test]
    fn convert_request_takes_the_single_input() {
        let request = JobRequest::new(
            vec![document("/scan.pdf")],
            JobOptions::Convert(ConvertOptions {
                output_format: OutputFormat::Txt,
                output_path: "scan.txt".into(),
                ..Default::default()
            }),
        );

        assert_eq!(request.kind(), JobKind::Convert);
        let EngineRequest::Convert(convert) = request.to_engine_request() else {
            panic!("expected a convert request");
        };
        assert_eq!(convert.input_path, "/scan.pdf");
        assert_eq!(convert.output_format, OutputFormat::Txt);
        assert_eq!(convert.output_path, "scan.txt");
    }
}
