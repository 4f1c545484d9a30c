// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use folio_core::types::{
    BookMetadata, ConvertOptions, FontSize, LayoutMode, MergeOptions, NewDocument, OcrOptions,
    OutputFormat, PageSize,
};

use crate::services::file_picker::picked_from_path;

/// Merge PDF files and convert them to e-books.
///
/// The heavy lifting is done by an external processing engine. Point
/// `--engine` (or FOLIO_ENGINE, or `engine_path` in config.json) at its
/// executable.
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Merge PDF files and convert them to e-books", long_about = None)]
pub struct Cli {
    /// Processing engine executable
    #[arg(long, global = true, env = "FOLIO_ENGINE", value_name = "PATH")]
    pub engine: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge PDF files into one, in the order given
    Merge(MergeArgs),
    /// Convert one PDF to EPUB, MOBI, AZW3, TXT, Markdown, DOCX, FB2 or HTML
    Convert(ConvertArgs),
    /// Check whether Calibre is available for MOBI/AZW3/DOCX/FB2 output
    Probe,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Input PDF files, in merge order
    ///
    /// `FILE:PAGES` keeps only the listed pages, e.g. `report.pdf:1-3,7`.
    /// Opens a file dialog when no files are given.
    #[arg(value_name = "FILE[:PAGES]", value_parser = parse_input)]
    pub files: Vec<InputFile>,

    /// Output PDF file path [default: merged.pdf]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Choose the output location in a save dialog
    #[arg(long, conflicts_with = "output")]
    pub save_as: bool,

    /// Page size of the merged document: original, a4 or letter
    #[arg(long, value_name = "SIZE", default_value = "original")]
    pub page_size: PageSize,

    /// Drop the bookmarks of the input files
    #[arg(long)]
    pub no_bookmarks: bool,

    /// Sort the inputs by file name first
    #[arg(long)]
    pub sort: bool,

    /// Reverse the input order (after --sort)
    #[arg(long)]
    pub reverse: bool,
}

impl MergeArgs {
    pub fn options(&self) -> MergeOptions {
        MergeOptions {
            keep_bookmarks: !self.no_bookmarks,
            page_size: self.page_size,
            output_path: self.output.clone().unwrap_or_default(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input PDF file. Opens a file dialog when omitted.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Output format: epub, mobi, azw3, txt, md, docx, fb2 or html
    #[arg(short, long, value_name = "FORMAT", default_value = "epub")]
    pub format: OutputFormat,

    /// Layout: reflow (text flows to the screen) or fixed (keeps pages)
    #[arg(long, value_name = "MODE", default_value = "reflow")]
    pub layout: LayoutMode,

    /// Skip OCR of scanned pages
    #[arg(long)]
    pub no_ocr: bool,

    /// OCR languages (Tesseract codes)
    #[arg(long, value_name = "LANG", value_delimiter = ',', default_values = ["chi_sim", "eng"])]
    pub ocr_lang: Vec<String>,

    /// Book title [default: input file name]
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Book author
    #[arg(long, value_name = "TEXT")]
    pub author: Option<String>,

    /// Cover image
    #[arg(long, value_name = "FILE")]
    pub cover: Option<String>,

    /// Keep embedded images
    #[arg(long)]
    pub keep_images: bool,

    /// Detect and rebuild tables
    #[arg(long)]
    pub detect_tables: bool,

    /// Body font size: small, medium or large
    #[arg(long, value_name = "SIZE", default_value = "medium")]
    pub font_size: FontSize,

    /// Output file path [default: <title>.<format>]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Choose the output location in a save dialog
    #[arg(long, conflicts_with = "output")]
    pub save_as: bool,
}

impl ConvertArgs {
    pub fn options(&self) -> ConvertOptions {
        ConvertOptions {
            output_format: self.format,
            layout_mode: self.layout,
            ocr: OcrOptions {
                enabled: !self.no_ocr,
                languages: self.ocr_lang.iter().cloned().collect(),
            },
            metadata: BookMetadata {
                title: self.title.clone().unwrap_or_default(),
                author: self.author.clone().unwrap_or_default(),
                cover_path: self.cover.clone(),
            },
            keep_images: self.keep_images,
            detect_tables: self.detect_tables,
            font_size: self.font_size,
            output_path: self.output.clone().unwrap_or_default(),
        }
    }
}

/// A file argument with an optional page subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub pages: Option<BTreeSet<u32>>,
}

impl InputFile {
    pub fn to_document(&self) -> NewDocument {
        let document = NewDocument::from(picked_from_path(&self.path));
        match &self.pages {
            Some(pages) => document.with_selected_pages(pages.iter().copied()),
            None => document,
        }
    }
}

/// `path` or `path:PAGES`. A suffix that is not a page list stays part of
/// the path.
fn parse_input(arg: &str) -> Result<InputFile, String> {
    if let Some((path, pages)) = arg.rsplit_once(':') {
        if !path.is_empty() {
            if let Ok(pages) = parse_pages(pages) {
                return Ok(InputFile {
                    path: path.into(),
                    pages: Some(pages),
                });
            }
        }
    }
    if arg.is_empty() {
        return Err("empty file name".into());
    }
    Ok(InputFile {
        path: arg.into(),
        pages: None,
    })
}

/// `1-3,7` -> {1, 2, 3, 7}. Pages are 1-based.
fn parse_pages(list: &str) -> Result<BTreeSet<u32>, String> {
    let mut pages = BTreeSet::new();
    for part in list.split(',').map(str::trim) {
        let (first, last) = match part.split_once('-') {
            Some((a, b)) => (parse_page(a)?, parse_page(b)?),
            None => {
                let page = parse_page(part)?;
                (page, page)
            }
        };
        if first > last {
            return Err(format!("backwards page range {part}"));
        }
        pages.extend(first..=last);
    }
    Ok(pages)
}

fn parse_page(s: &str) -> Result<u32, String> {
    match s.trim().parse::<u32>() {
        Ok(0) => Err("pages start at 1".into()),
        Ok(page) => Ok(page),
        Err(_) => Err(format!("not a page number: {s:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_lists() {
        assert_eq!(
            parse_pages("1-3,7").expect("valid"),
            BTreeSet::from([1, 2, 3, 7])
        );
        assert_eq!(parse_pages(" 2 , 2 ").expect("valid").len(), 1);
        assert!(parse_pages("3-1").is_err());
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("").is_err());
    }

    #[test]
    fn input_with_and_without_pages() {
        let input = parse_input("report.pdf:1-2").expect("valid");
        assert_eq!(input.path, PathBuf::from("report.pdf"));
        assert_eq!(input.pages, Some(BTreeSet::from([1, 2])));

        let input = parse_input("C:\\scans\\a.pdf").expect("valid");
        assert_eq!(input.path, PathBuf::from("C:\\scans\\a.pdf"));
        assert!(input.pages.is_none());
    }

    #[test]
    fn merge_defaults() {
        let cli = Cli::try_parse_from(["folio", "merge", "a.pdf", "b.pdf"]).expect("parse");
        let Command::Merge(args) = cli.command else {
            panic!("expected merge");
        };
        assert_eq!(
            args.options(),
            MergeOptions {
                keep_bookmarks: true,
                page_size: PageSize::Original,
                output_path: String::new(),
            }
        );
        assert_eq!(args.files.len(), 2);
    }

    #[test]
    fn convert_flags() {
        let cli = Cli::try_parse_from([
            "folio",
            "convert",
            "scan.pdf",
            "--format",
            "mobi",
            "--no-ocr",
            "--ocr-lang",
            "eng,deu",
            "--title",
            "Field Notes",
            "--font-size",
            "large",
            "-o",
            "/books/notes.mobi",
        ])
        .expect("parse");
        let Command::Convert(args) = cli.command else {
            panic!("expected convert");
        };

        let options = args.options();
        assert_eq!(options.output_format, OutputFormat::Mobi);
        assert!(!options.ocr.enabled);
        assert_eq!(
            options.ocr.languages,
            BTreeSet::from(["deu".to_string(), "eng".to_string()])
        );
        assert_eq!(options.metadata.title, "Field Notes");
        assert_eq!(options.font_size, FontSize::Large);
        assert_eq!(options.output_path, "/books/notes.mobi");
    }

    #[test]
    fn convert_defaults_match_ocr_defaults() {
        let cli = Cli::try_parse_from(["folio", "convert", "a.pdf"]).expect("parse");
        let Command::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.options().ocr, OcrOptions::default());
        assert_eq!(args.options().layout_mode, LayoutMode::Reflow);
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["folio", "convert", "a.pdf", "--format", "pdf"]).is_err());
    }
}
