// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio — merge PDFs and convert them to e-books.
//
// Entry point. Initialises logging and backend services, then runs one
// command to completion.

mod cli;
mod services;
mod state;

use std::path::Path;

use anyhow::{Context, anyhow, bail};
use clap::Parser;

use folio_bridge::FilePicker;
use folio_core::error::FolioError;
use folio_core::human_errors::humanize_error;
use folio_core::types::{CapabilityFlag, JobOptions, JobPhase, JobState, NewDocument};
use folio_jobs::builder::DEFAULT_MERGE_OUTPUT;

use cli::{Cli, Command, ConvertArgs, MergeArgs};
use services::app_services::AppServices;
use services::file_picker::{RfdPicker, picked_from_path};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("Folio starting");

    let svc = AppServices::init(cli.engine.clone()).context("failed to start Folio")?;

    match cli.command {
        Command::Probe => probe(&svc).await,
        Command::Merge(args) => merge(&svc, args).await,
        Command::Convert(args) => convert(&svc, args).await,
    }
}

async fn probe(svc: &AppServices) -> anyhow::Result<()> {
    match svc.reprobe_capability().await {
        CapabilityFlag::Present => println!("Calibre: installed (MOBI, AZW3, DOCX and FB2 available)"),
        CapabilityFlag::Absent => println!("Calibre: not found (EPUB, TXT, Markdown and HTML only)"),
        CapabilityFlag::Unknown => println!("Calibre: unknown"),
    }
    Ok(())
}

async fn merge(svc: &AppServices, args: MergeArgs) -> anyhow::Result<()> {
    let documents: Vec<NewDocument> = if args.files.is_empty() {
        RfdPicker
            .pick_documents(true)
            .await
            .map_err(explain)?
            .into_iter()
            .map(NewDocument::from)
            .collect()
    } else {
        args.files.iter().map(|f| f.to_document()).collect()
    };

    let ids = svc.add_documents(documents);
    if args.sort {
        svc.sort_documents();
    }
    if args.reverse {
        svc.reverse_documents();
    }
    svc.resolve_metadata(&ids).await;
    println!(
        "Merging {} documents ({} pages known)",
        ids.len(),
        svc.total_pages()
    );

    let mut options = args.options();
    if args.save_as {
        options.output_path = save_path(DEFAULT_MERGE_OUTPUT, "pdf").await?;
    }
    run_job(svc, JobOptions::Merge(options)).await
}

async fn convert(svc: &AppServices, args: ConvertArgs) -> anyhow::Result<()> {
    let document = match &args.file {
        Some(path) => NewDocument::from(picked_from_path(path)),
        None => RfdPicker
            .pick_documents(false)
            .await
            .map_err(explain)?
            .into_iter()
            .next()
            .map(NewDocument::from)
            .ok_or_else(|| anyhow!("no document chosen"))?,
    };

    let stem = Path::new(&document.display_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    let ids = svc.add_documents([document]);
    svc.resolve_metadata(&ids).await;

    let mut options = args.options();
    if args.save_as {
        let ext = options.output_format.extension();
        options.output_path = save_path(&format!("{stem}.{ext}"), ext).await?;
    }
    run_job(svc, JobOptions::Convert(options)).await
}

async fn save_path(default_name: &str, extension: &str) -> anyhow::Result<String> {
    RfdPicker
        .pick_save_path(default_name, extension)
        .await
        .map_err(explain)?
        .ok_or_else(|| anyhow!("no output location chosen"))
}

/// Submit, print progress until the job leaves flight, report the outcome.
/// Ctrl-C cancels the job.
async fn run_job(svc: &AppServices, options: JobOptions) -> anyhow::Result<()> {
    svc.start_job(options).await.map_err(explain)?;

    let mut rx = svc.watch_job();
    let mut shown: Option<(u8, String)> = None;
    loop {
        let state = rx.borrow_and_update().clone();
        show_progress(&state, &mut shown);
        if !state.phase.is_in_flight() {
            break;
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if svc.cancel_job() {
                    eprintln!("Cancelling…");
                }
            }
        }
    }

    let state = svc.finish_job().await.map_err(explain)?;
    let snapshot = AppState::new(svc);
    let elapsed = match (state.started_at, state.finished_at) {
        (Some(start), Some(end)) => format!(" in {:.1}s", (end - start).num_milliseconds() as f64 / 1000.0),
        _ => String::new(),
    };

    match state.phase {
        JobPhase::Succeeded => {
            println!(
                "{}{elapsed}: {}",
                snapshot.status_text(),
                state.output_path.as_deref().unwrap_or_default()
            );
            Ok(())
        }
        JobPhase::Cancelled => {
            println!("{}", snapshot.status_text());
            Ok(())
        }
        _ => bail!("{}: {}", snapshot.status_text(), state.message),
    }
}

fn show_progress(state: &JobState, shown: &mut Option<(u8, String)>) {
    if !matches!(state.phase, JobPhase::Analyzing | JobPhase::Processing) {
        return;
    }
    let current = (state.percent, state.stage.clone());
    if shown.as_ref() == Some(&current) {
        return;
    }
    let label = if state.message.is_empty() {
        &state.stage
    } else {
        &state.message
    };
    eprintln!("[{:>3}%] {label}", state.percent);
    *shown = Some(current);
}

/// Attach the human-readable explanation to a backend error.
fn explain(err: FolioError) -> anyhow::Error {
    let human = humanize_error(&err);
    anyhow::Error::new(err).context(format!("{} {}", human.message, human.suggestion))
}
