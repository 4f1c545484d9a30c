// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job configuration builder.
//
// Validation happens here, before any engine contact. A request that fails
// validation is never submitted.

use folio_core::error::ValidationError;
use folio_core::types::{
    CapabilityFlag, ConvertOptions, DocumentEntry, JobOptions, MergeOptions, RequestDocument,
};
use tracing::debug;

use crate::request::JobRequest;

/// Output used for merges when none is given.
pub const DEFAULT_MERGE_OUTPUT: &str = "merged.pdf";

/// Stem used for conversions when neither a title nor an input name exists.
const FALLBACK_STEM: &str = "output";

/// Validate a registry snapshot against `options` and produce a request.
///
/// Checks, in order: input count for the job kind, converter availability
/// for the output format, then selected page indices against known page
/// counts. `CapabilityFlag::Unknown` does not block; callers probe first
/// when the format needs the converter.
pub fn build(
    entries: &[DocumentEntry],
    options: &JobOptions,
    capability: CapabilityFlag,
) -> Result<JobRequest, ValidationError> {
    let options = match options {
        JobOptions::Merge(opts) => JobOptions::Merge(merge_options(entries, opts)?),
        JobOptions::Convert(opts) => JobOptions::Convert(convert_options(entries, opts, capability)?),
    };

    let documents = entries
        .iter()
        .map(request_document)
        .collect::<Result<Vec<_>, _>>()?;

    debug!(kind = ?options.kind(), inputs = documents.len(), output = options.output_path(), "job request built");
    Ok(JobRequest::new(documents, options))
}

fn merge_options(
    entries: &[DocumentEntry],
    opts: &MergeOptions,
) -> Result<MergeOptions, ValidationError> {
    if entries.len() < 2 {
        return Err(ValidationError::InsufficientInputs {
            found: entries.len(),
        });
    }

    let mut opts = opts.clone();
    if opts.output_path.trim().is_empty() {
        opts.output_path = DEFAULT_MERGE_OUTPUT.into();
    }
    Ok(opts)
}

fn convert_options(
    entries: &[DocumentEntry],
    opts: &ConvertOptions,
    capability: CapabilityFlag,
) -> Result<ConvertOptions, ValidationError> {
    let [input] = entries else {
        return Err(ValidationError::InvalidInputCount {
            found: entries.len(),
        });
    };

    if opts.output_format.requires_converter() && capability == CapabilityFlag::Absent {
        return Err(ValidationError::MissingCapability {
            format: opts.output_format,
        });
    }

    let mut opts = opts.clone();
    let title = opts.metadata.title.trim();
    let stem = if title.is_empty() {
        input_stem(&input.display_name)
    } else {
        title.to_owned()
    };

    if opts.metadata.title.trim().is_empty() {
        opts.metadata.title = stem.clone();
    }
    if opts.output_path.trim().is_empty() {
        opts.output_path = format!("{stem}.{}", opts.output_format.extension());
    }
    Ok(opts)
}

/// Display name without a trailing `.pdf` (any case).
fn input_stem(display_name: &str) -> String {
    let name = display_name.trim();
    let stem = match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".pdf") => {
            &name[..cut]
        }
        _ => name,
    };

    if stem.is_empty() {
        FALLBACK_STEM.into()
    } else {
        stem.into()
    }
}

fn request_document(entry: &DocumentEntry) -> Result<RequestDocument, ValidationError> {
    if let Some(pages) = &entry.selected_pages {
        if entry.page_count > 0 {
            if let Some(&page) = pages.iter().find(|&&p| p == 0 || p > entry.page_count) {
                return Err(ValidationError::PageOutOfRange {
                    document: entry.display_name.clone(),
                    page,
                    page_count: entry.page_count,
                });
            }
        }
    }

    Ok(RequestDocument {
        path: entry.source_path.clone(),
        selected_pages: entry
            .selected_pages
            .as_ref()
            .map(|pages| pages.iter().copied().collect()),
    })
}

#[cfg(test)]
mod tests {
    use folio_core::types::{
        BookMetadata, EngineRequest, EntryId, JobKind, OutputFormat, PageSize,
    };

    use super::*;

    fn entry(name: &str) -> DocumentEntry {
        DocumentEntry {
            id: EntryId::new(),
            display_name: name.into(),
            source_path: format!("/docs/{name}"),
            page_count: 0,
            byte_size: 0,
            thumbnail: None,
            selected_pages: None,
        }
    }

    fn convert_to(format: OutputFormat) -> JobOptions {
        JobOptions::Convert(ConvertOptions {
            output_format: format,
            ..Default::default()
        })
    }

    #[test]
    fn merge_needs_two_documents() {
        let mut entries = vec![entry("a.pdf")];
        let options = JobOptions::Merge(MergeOptions::default());

        assert_eq!(
            build(&entries, &options, CapabilityFlag::Unknown),
            Err(ValidationError::InsufficientInputs { found: 1 })
        );

        entries.push(entry("b.pdf"));
        let request = build(&entries, &options, CapabilityFlag::Unknown).expect("valid merge");
        assert_eq!(request.kind(), JobKind::Merge);
        assert_eq!(request.documents().len(), 2);
    }

    #[test]
    fn merge_output_defaults() {
        let entries = vec![entry("a.pdf"), entry("b.pdf")];
        let request = build(
            &entries,
            &JobOptions::Merge(MergeOptions::default()),
            CapabilityFlag::Unknown,
        )
        .expect("valid merge");
        assert_eq!(request.output_path(), DEFAULT_MERGE_OUTPUT);

        let request = build(
            &entries,
            &JobOptions::Merge(MergeOptions {
                output_path: "/out/book.pdf".into(),
                page_size: PageSize::Letter,
                ..Default::default()
            }),
            CapabilityFlag::Unknown,
        )
        .expect("valid merge");
        assert_eq!(request.output_path(), "/out/book.pdf");
    }

    #[test]
    fn convert_takes_exactly_one_document() {
        let options = convert_to(OutputFormat::Epub);
        assert_eq!(
            build(&[], &options, CapabilityFlag::Present),
            Err(ValidationError::InvalidInputCount { found: 0 })
        );
        assert_eq!(
            build(&[entry("a.pdf"), entry("b.pdf")], &options, CapabilityFlag::Present),
            Err(ValidationError::InvalidInputCount { found: 2 })
        );
    }

    #[test]
    fn converter_formats_need_capability() {
        let entries = vec![entry("novel.pdf")];

        assert_eq!(
            build(&entries, &convert_to(OutputFormat::Mobi), CapabilityFlag::Absent),
            Err(ValidationError::MissingCapability {
                format: OutputFormat::Mobi
            })
        );
        assert!(build(&entries, &convert_to(OutputFormat::Mobi), CapabilityFlag::Present).is_ok());
        assert!(build(&entries, &convert_to(OutputFormat::Mobi), CapabilityFlag::Unknown).is_ok());
        assert!(build(&entries, &convert_to(OutputFormat::Epub), CapabilityFlag::Absent).is_ok());
    }

    #[test]
    fn count_is_checked_before_capability() {
        assert_eq!(
            build(&[], &convert_to(OutputFormat::Azw3), CapabilityFlag::Absent),
            Err(ValidationError::InvalidInputCount { found: 0 })
        );
    }

    #[test]
    fn convert_output_derives_from_input_name() {
        let request = build(
            &[entry("Annual Report.PDF")],
            &convert_to(OutputFormat::Epub),
            CapabilityFlag::Unknown,
        )
        .expect("valid convert");
        assert_eq!(request.output_path(), "Annual Report.epub");

        let JobOptions::Convert(opts) = request.options() else {
            panic!("expected convert options");
        };
        assert_eq!(opts.metadata.title, "Annual Report");
    }

    #[test]
    fn convert_output_prefers_title() {
        let options = JobOptions::Convert(ConvertOptions {
            output_format: OutputFormat::Md,
            metadata: BookMetadata {
                title: "Field Notes".into(),
                ..Default::default()
            },
            ..Default::default()
        });
        let request =
            build(&[entry("scan-0042.pdf")], &options, CapabilityFlag::Unknown).expect("valid");
        assert_eq!(request.output_path(), "Field Notes.md");
    }

    #[test]
    fn convert_output_falls_back_to_output() {
        let request = build(&[entry(".pdf")], &convert_to(OutputFormat::Txt), CapabilityFlag::Unknown)
            .expect("valid");
        assert_eq!(request.output_path(), "output.txt");
    }

    #[test]
    fn explicit_output_path_is_kept() {
        let options = JobOptions::Convert(ConvertOptions {
            output_path: "/books/x.fb2".into(),
            output_format: OutputFormat::Fb2,
            ..Default::default()
        });
        let request =
            build(&[entry("a.pdf")], &options, CapabilityFlag::Present).expect("valid");
        assert_eq!(request.output_path(), "/books/x.fb2");
    }

    #[test]
    fn selected_pages_checked_against_known_count() {
        let mut doc = entry("a.pdf");
        doc.selected_pages = Some([1, 3, 9].into_iter().collect());
        let options = JobOptions::Merge(MergeOptions::default());

        // Unknown page count: passed through.
        let request = build(&[doc.clone(), entry("b.pdf")], &options, CapabilityFlag::Unknown)
            .expect("unknown count is not validated");
        assert_eq!(request.documents()[0].selected_pages, Some(vec![1, 3, 9]));

        doc.page_count = 5;
        assert_eq!(
            build(&[doc.clone(), entry("b.pdf")], &options, CapabilityFlag::Unknown),
            Err(ValidationError::PageOutOfRange {
                document: "a.pdf".into(),
                page: 9,
                page_count: 5,
            })
        );

        doc.selected_pages = Some([0].into_iter().collect());
        assert!(matches!(
            build(&[doc, entry("b.pdf")], &options, CapabilityFlag::Unknown),
            Err(ValidationError::PageOutOfRange { page: 0, .. })
        ));
    }

    #[test]
    fn request_is_a_value_copy() {
        let mut entries = vec![entry("a.pdf"), entry("b.pdf")];
        let request = build(
            &entries,
            &JobOptions::Merge(MergeOptions::default()),
            CapabilityFlag::Unknown,
        )
        .expect("valid");

        entries[0].source_path = "/moved.pdf".into();
        entries.clear();

        let EngineRequest::Merge(merge) = request.to_engine_request() else {
            panic!("expected merge");
        };
        assert_eq!(merge.files[0].path, "/docs/a.pdf");
    }
}
