use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use chrono::Utc;
use tracing::info;

use crate::cli::ReconcileArgs;
use crate::model::{RawIssue, ReconcileRunManifest, ReconciledIssue, RunPaths};
use crate::util::{ensure_directory, now_utc_string, read_json, sha256_file, utc_compact_string, write_json_pretty};

use super::collaborators::{
    CommandSolutionPageReader, FormFeedPageText, NoPageText, NoSolutionPageReader, PacedSolutionPageReader,
    PageTextSource, SolutionPageReader,
};
use super::intake::{intake_articles, resolve_total_pages};
use super::pipeline::Reconciler;
use super::taxonomy::Taxonomy;

pub fn run(args: ReconcileArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let manifest_dir = args.out_dir.join("manifests");
    ensure_directory(&manifest_dir)?;

    let output_path = args.output_path.clone().unwrap_or_else(|| default_output_path(&args));
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("reconcile_run_{}.json", utc_compact_string(started_ts)))
    });

    info!(input = %args.input.display(), run_id = %run_id, "starting reconcile");

    let input_sha256 = sha256_file(&args.input)?;
    let raw: RawIssue = read_json(&args.input)?;
    let total_pages = resolve_total_pages(&raw, args.total_pages);
    let issue = raw.issue.clone();

    let taxonomy = Taxonomy::load(args.taxonomy_path.as_deref())?;
    let reconciler = Reconciler::new(taxonomy)?;

    let page_text: Box<dyn PageTextSource> = match &args.page_text_path {
        Some(path) => Box::new(FormFeedPageText::load(path)?),
        None => Box::new(NoPageText),
    };
    let mut reader = build_reader(&args)?;

    let mut warnings = Vec::new();
    let (articles, intake) = intake_articles(raw.articles, total_pages, &mut warnings);

    let outcome = reconciler.reconcile(&issue, total_pages, articles, page_text.as_ref(), reader.as_mut());
    warnings.extend(outcome.warnings);

    let mut counts = outcome.counts;
    counts.ranges_clamped = intake.ranges_clamped;

    let mut notes = vec![
        "Phases: intake, merge_solutions, preview_filter, expand_trim, annotate_interleaved, locate_solutions."
            .to_string(),
        "Warnings never block the run; review them before publishing.".to_string(),
    ];
    notes.extend(outcome.decisions);

    let reconciled = ReconciledIssue {
        issue: issue.clone(),
        total_pages,
        articles: outcome.articles,
        warnings: warnings.clone(),
    };
    write_json_pretty(&output_path, &reconciled)?;
    info!(path = %output_path.display(), "wrote reconciled issue");

    let manifest = ReconcileRunManifest {
        manifest_version: 1,
        run_id,
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_reconcile_command(&args),
        input_sha256,
        next_issue: issue.next_issue_label(),
        issue,
        total_pages,
        paths: RunPaths {
            input_path: args.input.display().to_string(),
            output_path: output_path.display().to_string(),
            manifest_path: manifest_path.display().to_string(),
        },
        counts,
        warnings,
        notes,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote reconcile run manifest");
    info!(
        articles = manifest.counts.articles_out,
        warnings = manifest.warnings.len(),
        "reconcile completed"
    );

    Ok(())
}

fn default_output_path(args: &ReconcileArgs) -> PathBuf {
    let stem = args
        .input
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("issue");
    args.out_dir.join(format!("{stem}.reconciled.json"))
}

fn build_reader(args: &ReconcileArgs) -> Result<Box<dyn SolutionPageReader>> {
    let Some(program) = &args.reader_command else {
        return Ok(Box::new(NoSolutionPageReader));
    };
    let Some(image_dir) = &args.page_image_dir else {
        bail!("--reader-command requires --page-image-dir");
    };
    if !image_dir.is_dir() {
        bail!("page image directory not found: {}", image_dir.display());
    }

    info!(
        program = %program,
        image_dir = %image_dir.display(),
        min_interval_ms = args.reader_min_interval_ms,
        max_retries = args.reader_max_retries,
        "using external solution-page reader"
    );

    Ok(Box::new(PacedSolutionPageReader::new(
        CommandSolutionPageReader::new(program.clone(), args.reader_args.clone(), image_dir.clone()),
        Duration::from_millis(args.reader_min_interval_ms),
        args.reader_max_retries,
        Duration::from_millis(args.reader_backoff_ms),
    )))
}

pub(crate) fn render_reconcile_command(args: &ReconcileArgs) -> String {
    let mut command = vec![
        "issue-reconcile".to_string(),
        "reconcile".to_string(),
        "--input".to_string(),
        args.input.display().to_string(),
        "--out-dir".to_string(),
        args.out_dir.display().to_string(),
    ];

    if let Some(path) = &args.output_path {
        command.push("--output-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.taxonomy_path {
        command.push("--taxonomy-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(total_pages) = args.total_pages {
        command.push("--total-pages".to_string());
        command.push(total_pages.to_string());
    }
    if let Some(path) = &args.page_text_path {
        command.push("--page-text-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(program) = &args.reader_command {
        command.push("--reader-command".to_string());
        command.push(program.clone());
        for arg in &args.reader_args {
            command.push("--reader-arg".to_string());
            command.push(arg.clone());
        }
        if let Some(path) = &args.page_image_dir {
            command.push("--page-image-dir".to_string());
            command.push(path.display().to_string());
        }
        command.push("--reader-min-interval-ms".to_string());
        command.push(args.reader_min_interval_ms.to_string());
        command.push("--reader-max-retries".to_string());
        command.push(args.reader_max_retries.to_string());
        command.push("--reader-backoff-ms".to_string());
        command.push(args.reader_backoff_ms.to_string());
    }

    command.join(" ")
}
