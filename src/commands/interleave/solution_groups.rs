use std::collections::HashSet;
use std::ops::Range;

use anyhow::{Context, Result};
use tracing::debug;

use crate::model::Fragment;
use crate::util::sha256_hex;

use super::markers::{Marker, MarkerKind, MarkerPatterns};

const GROUP_ID_HEX_CHARS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Layout {
    Unchanged,
    Grouped,
    Interleaved,
}

impl Layout {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Grouped => "grouped",
            Self::Interleaved => "interleaved",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InterleaveResult {
    pub fragments: Vec<Fragment>,
    pub layout: Layout,
    pub groups_created: usize,
    pub unmatched_runs: usize,
}

struct SolutionRun {
    span: Range<usize>,
    id: Option<String>,
}

pub(crate) fn interleave_solutions(fragments: Vec<Fragment>, patterns: &MarkerPatterns) -> Result<InterleaveResult> {
    let markers = patterns.scan(&fragments);
    let problems = markers
        .iter()
        .filter(|marker| marker.kind == MarkerKind::Problem)
        .collect::<Vec<&Marker>>();
    let solutions = markers
        .iter()
        .filter(|marker| marker.kind == MarkerKind::Solution)
        .collect::<Vec<&Marker>>();

    let (Some(first_solution), Some(last_problem)) = (solutions.first(), problems.last()) else {
        return Ok(InterleaveResult {
            fragments,
            layout: Layout::Unchanged,
            groups_created: 0,
            unmatched_runs: 0,
        });
    };

    if first_solution.index > last_problem.index {
        rebuild_grouped(fragments, &problems, &solutions, patterns)
    } else {
        wrap_in_place(fragments, &markers, patterns)
    }
}

fn rebuild_grouped(
    fragments: Vec<Fragment>,
    problems: &[&Marker],
    solutions: &[&Marker],
    patterns: &MarkerPatterns,
) -> Result<InterleaveResult> {
    let solutions_start = solutions[0].index;
    let problem_runs = problems
        .iter()
        .enumerate()
        .map(|(position, marker)| {
            let end = problems
                .get(position + 1)
                .map(|next| next.index)
                .unwrap_or(solutions_start);
            (marker.index..end, marker.id.clone())
        })
        .collect::<Vec<(Range<usize>, Option<String>)>>();
    let solution_runs = solutions
        .iter()
        .enumerate()
        .map(|(position, marker)| SolutionRun {
            span: marker.index..solutions
                .get(position + 1)
                .map(|next| next.index)
                .unwrap_or(fragments.len()),
            id: marker.id.clone(),
        })
        .collect::<Vec<SolutionRun>>();

    let mut output = Vec::with_capacity(fragments.len());
    output.extend_from_slice(&fragments[..problems[0].index]);

    let mut used = HashSet::new();
    let mut groups_created = 0usize;
    for (span, problem_id) in problem_runs {
        output.extend_from_slice(&fragments[span]);

        let matched = solution_runs.iter().enumerate().find(|(position, run)| {
            !used.contains(position) && problem_id.is_some() && run.id == problem_id
        });
        if let Some((position, run)) = matched {
            used.insert(position);
            output.push(wrap_run(&fragments[run.span.clone()], run.id.as_deref(), patterns)?);
            groups_created += 1;
        }
    }

    let mut unmatched_runs = 0usize;
    for (position, run) in solution_runs.iter().enumerate() {
        if used.contains(&position) {
            continue;
        }
        debug!(id = ?run.id, "solution run has no matching problem; appended at end");
        output.push(wrap_run(&fragments[run.span.clone()], run.id.as_deref(), patterns)?);
        groups_created += 1;
        unmatched_runs += 1;
    }

    Ok(InterleaveResult {
        fragments: output,
        layout: Layout::Grouped,
        groups_created,
        unmatched_runs,
    })
}

/// Each solution marker's run ends at the next marker of either kind.
fn wrap_in_place(fragments: Vec<Fragment>, markers: &[Marker], patterns: &MarkerPatterns) -> Result<InterleaveResult> {
    let runs = markers
        .iter()
        .enumerate()
        .filter(|(_, marker)| marker.kind == MarkerKind::Solution)
        .map(|(position, marker)| SolutionRun {
            span: marker.index..markers
                .get(position + 1)
                .map(|next| next.index)
                .unwrap_or(fragments.len()),
            id: marker.id.clone(),
        })
        .collect::<Vec<SolutionRun>>();

    let mut output = Vec::with_capacity(fragments.len());
    let mut cursor = 0usize;
    for run in &runs {
        output.extend_from_slice(&fragments[cursor..run.span.start]);
        output.push(wrap_run(&fragments[run.span.clone()], run.id.as_deref(), patterns)?);
        cursor = run.span.end;
    }
    output.extend_from_slice(&fragments[cursor..]);

    Ok(InterleaveResult {
        fragments: output,
        layout: Layout::Interleaved,
        groups_created: runs.len(),
        unmatched_runs: 0,
    })
}

fn wrap_run(run: &[Fragment], id: Option<&str>, patterns: &MarkerPatterns) -> Result<Fragment> {
    let mut fragments = Vec::with_capacity(run.len());
    for fragment in run {
        match fragment {
            Fragment::SolutionGroup { fragments: inner, .. } => fragments.extend(inner.iter().cloned()),
            other => fragments.push(other.clone()),
        }
    }

    Ok(Fragment::SolutionGroup {
        id: solution_group_id(&fragments)?,
        label: patterns.label_for(&fragments, id),
        fragments,
    })
}

fn solution_group_id(fragments: &[Fragment]) -> Result<String> {
    let encoded = serde_json::to_vec(fragments).context("failed to encode solution group fragments")?;
    let digest = sha256_hex(&encoded);
    Ok(format!("sg-{}", &digest[..GROUP_ID_HEX_CHARS]))
}
