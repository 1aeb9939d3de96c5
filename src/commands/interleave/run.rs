use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};

use crate::cli::InterleaveArgs;
use crate::model::{ArticleFragments, FragmentDocument, InterleaveCounts, InterleaveRunManifest, RunPaths};
use crate::util::{ensure_directory, now_utc_string, read_json, sha256_file, utc_compact_string, write_json_pretty};

use super::markers::MarkerPatterns;
use super::solution_groups::{Layout, interleave_solutions};

pub fn run(args: InterleaveArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let manifest_dir = args.out_dir.join("manifests");
    ensure_directory(&manifest_dir)?;

    let output_path = args.output_path.clone().unwrap_or_else(|| default_output_path(&args));
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("interleave_run_{}.json", utc_compact_string(started_ts)))
    });

    info!(input = %args.input.display(), run_id = %run_id, "starting interleave");

    let input_sha256 = sha256_file(&args.input)?;
    let document: FragmentDocument = read_json(&args.input)?;
    let patterns = MarkerPatterns::new()?;

    let (document, counts) = interleave_document(document, &patterns)?;
    write_json_pretty(&output_path, &document)?;
    info!(path = %output_path.display(), "wrote interleaved fragments");

    let manifest = InterleaveRunManifest {
        manifest_version: 1,
        run_id,
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_interleave_command(&args),
        input_sha256,
        paths: RunPaths {
            input_path: args.input.display().to_string(),
            output_path: output_path.display().to_string(),
            manifest_path: manifest_path.display().to_string(),
        },
        counts,
        notes: vec![
            "Existing solutionGroup fragments are left as they are; rerunning on this output is a no-op."
                .to_string(),
        ],
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote interleave run manifest");
    info!(
        articles = manifest.counts.article_count,
        groups = manifest.counts.solution_groups_created,
        "interleave completed"
    );

    Ok(())
}

pub(crate) fn interleave_document(
    document: FragmentDocument,
    patterns: &MarkerPatterns,
) -> Result<(FragmentDocument, InterleaveCounts)> {
    let mut counts = InterleaveCounts {
        article_count: document.articles.len(),
        ..InterleaveCounts::default()
    };

    let mut articles = Vec::with_capacity(document.articles.len());
    for article in document.articles {
        let title = article.title;
        let result = interleave_solutions(article.fragments, patterns)
            .with_context(|| format!("failed to interleave solutions for '{title}'"))?;

        match result.layout {
            Layout::Grouped => counts.grouped_articles += 1,
            Layout::Interleaved => counts.interleaved_articles += 1,
            Layout::Unchanged => counts.unchanged_articles += 1,
        }
        counts.solution_groups_created += result.groups_created;
        counts.unmatched_solution_runs += result.unmatched_runs;

        debug!(
            title = %title,
            layout = result.layout.as_str(),
            groups = result.groups_created,
            unmatched = result.unmatched_runs,
            "interleaved article fragments"
        );
        articles.push(ArticleFragments {
            title,
            fragments: result.fragments,
        });
    }

    Ok((FragmentDocument { articles }, counts))
}

fn default_output_path(args: &InterleaveArgs) -> PathBuf {
    let stem = args
        .input
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("fragments");
    args.out_dir.join(format!("{stem}.interleaved.json"))
}

pub(crate) fn render_interleave_command(args: &InterleaveArgs) -> String {
    let mut command = vec![
        "issue-reconcile".to_string(),
        "interleave".to_string(),
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

    command.join(" ")
}
