use std::collections::HashSet;

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use tracing::warn;

use crate::model::Fragment;

const MAX_LABEL_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MarkerKind {
    Problem,
    Solution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Marker {
    pub index: usize,
    pub kind: MarkerKind,
    pub id: Option<String>,
}

impl Marker {
    fn new(index: usize, kind: MarkerKind, id: Option<String>) -> Self {
        Self { index, kind, id }
    }
}

pub(crate) struct MarkerPatterns {
    solution: Regex,
    bare_solution: Regex,
    problem: Regex,
    numbered: Regex,
    bare_label: Regex,
    emphasis: Vec<Regex>,
}

impl MarkerPatterns {
    pub fn new() -> Result<Self> {
        let id = r"(?:(?P<num>[0-9]{1,3})\b|(?P<letter>[a-z])(?:\s*[.:)\-–—*_]|\s*$))";
        let problem_word = r"(?:problem|deal|hand|quiz)(?:\s+#?|\s*#)\s*";

        let mut emphasis = Vec::new();
        for source in [
            r"\*\*([^*\n]+?)\*\*",
            r"__([^_\n]+?)__",
            r"\*([^*\n]+)\*",
            r"\b_([^_\n]+)_\b",
        ] {
            emphasis.push(
                Regex::new(source).with_context(|| format!("failed to compile emphasis regex: {source}"))?,
            );
        }

        Ok(Self {
            solution: Regex::new(&format!(
                r"(?i)^(?:solutions?|answers?)(?:\s+(?:to|for)\s+|\s*#\s*|\s*:\s*|\s+)(?:{problem_word})?{id}"
            ))
            .context("failed to compile solution marker regex")?,
            bare_solution: Regex::new(
                r"(?i)^(?:solutions?|answers?)(?:[*_]*\s*[:.\-–—]|[\s*_]*$|\s+(?:to|for)\s+(?:the\s+|these\s+)?(?:problems?|quiz(?:zes)?|deals|hands)\b)",
            )
            .context("failed to compile bare solutions heading regex")?,
            problem: Regex::new(&format!(r"(?i)^{problem_word}{id}"))
                .context("failed to compile problem marker regex")?,
            numbered: Regex::new(r"^(?P<num>[0-9]{1,2}|[A-H])\.(?:\s|$)")
                .context("failed to compile numbered item regex")?,
            bare_label: Regex::new(r"(?i)^(?:solutions?|answers?)[\s:.]*$")
                .context("failed to compile bare label regex")?,
            emphasis,
        })
    }

    pub fn scan(&self, fragments: &[Fragment]) -> Vec<Marker> {
        let mut markers = Vec::new();
        let mut after_bare_heading = false;
        let mut problem_ids = HashSet::new();

        for (index, fragment) in fragments.iter().enumerate() {
            if fragment.is_solution_group() {
                continue;
            }
            let Some(text) = fragment.as_text() else {
                continue;
            };
            let line = marker_line(text);
            if line.is_empty() {
                continue;
            }

            if let Some(captures) = self.solution.captures(line) {
                markers.push(Marker::new(index, MarkerKind::Solution, captured_id(&captures, line)));
                continue;
            }
            if self.bare_solution.is_match(line) {
                after_bare_heading = true;
                markers.push(Marker::new(index, MarkerKind::Solution, None));
                continue;
            }
            if let Some(captures) = self.problem.captures(line) {
                let id = captured_id(&captures, line);
                // Under a solutions heading, "Problem N" restates a problem already seen.
                let restated = after_bare_heading && id.as_ref().is_some_and(|id| problem_ids.contains(id));
                if restated {
                    markers.push(Marker::new(index, MarkerKind::Solution, id));
                    continue;
                }
                after_bare_heading = false;
                if let Some(id) = &id {
                    problem_ids.insert(id.clone());
                }
                markers.push(Marker::new(index, MarkerKind::Problem, id));
                continue;
            }
            if let Some(captures) = self.numbered.captures(line) {
                let kind = if after_bare_heading {
                    MarkerKind::Solution
                } else {
                    MarkerKind::Problem
                };
                markers.push(Marker::new(index, kind, captured_id(&captures, line)));
            }
        }

        resolve_bare_headings(markers)
    }

    pub fn label_for(&self, fragments: &[Fragment], id: Option<&str>) -> String {
        for fragment in fragments {
            let Some(text) = fragment.as_text() else {
                continue;
            };

            let mut phrases = Vec::new();
            for pattern in &self.emphasis {
                for captures in pattern.captures_iter(text) {
                    if let Some(phrase) = captures.get(1) {
                        phrases.push((phrase.start(), phrase.as_str().trim()));
                    }
                }
            }
            phrases.sort_by_key(|(start, _)| *start);

            let label = phrases.into_iter().map(|(_, phrase)| phrase).find(|phrase| {
                !phrase.is_empty()
                    && phrase.chars().count() <= MAX_LABEL_CHARS
                    && !self.bare_label.is_match(phrase)
            });
            if let Some(label) = label {
                return label.to_string();
            }
        }

        match id {
            Some(id) => format!("Solution {id}"),
            None => "Solution".to_string(),
        }
    }
}

fn captured_id(captures: &Captures<'_>, line: &str) -> Option<String> {
    let id = captures
        .name("num")
        .or_else(|| captures.name("letter"))
        .map(|value| value.as_str().to_uppercase());
    if id.is_none() {
        warn!(line = %line, "marker matched without an id capture");
    }
    id
}

fn marker_line(text: &str) -> &str {
    text.lines()
        .map(|line| line.trim_start_matches(|character: char| character.is_whitespace() || "#*_>".contains(character)))
        .find(|line| !line.trim().is_empty())
        .map(str::trim_end)
        .unwrap_or_default()
}

/// A bare heading directly followed by an id'd solution marker becomes the
/// start of that marker's run. Any other bare heading takes the id of the
/// problem at the same ordinal position.
fn resolve_bare_headings(markers: Vec<Marker>) -> Vec<Marker> {
    let mut merged: Vec<Marker> = Vec::with_capacity(markers.len());
    let mut iter = markers.into_iter().peekable();
    while let Some(marker) = iter.next() {
        let absorbs_next = marker.kind == MarkerKind::Solution
            && marker.id.is_none()
            && iter
                .peek()
                .is_some_and(|next| next.kind == MarkerKind::Solution && next.id.is_some());
        if absorbs_next {
            if let Some(next) = iter.next() {
                merged.push(Marker::new(marker.index, MarkerKind::Solution, next.id));
            }
            continue;
        }
        merged.push(marker);
    }

    let problem_ids = merged
        .iter()
        .filter(|marker| marker.kind == MarkerKind::Problem)
        .map(|marker| marker.id.clone())
        .collect::<Vec<Option<String>>>();

    let mut ordinal = 0usize;
    for marker in merged.iter_mut() {
        if marker.kind != MarkerKind::Solution {
            continue;
        }
        if marker.id.is_none() {
            marker.id = problem_ids.get(ordinal).cloned().flatten();
        }
        ordinal += 1;
    }

    merged
}
