use std::collections::BTreeSet;

use crate::model::{ArticleCandidate, PageRange};

pub(crate) type PageSet = BTreeSet<u32>;

/// Sorts by start page and drops exact duplicates. Touching or overlapping
/// ranges stay separate: range count is read as a structural signal.
pub(crate) fn normalize(ranges: &mut Vec<PageRange>) {
    ranges.sort();
    ranges.dedup();
}

pub(crate) fn pages_of(ranges: &[PageRange]) -> PageSet {
    ranges
        .iter()
        .flat_map(|range| range.start..=range.end)
        .collect()
}

/// Removes `excluded` pages, splitting a range into one sub-range per
/// maximal run of surviving pages. Fully excluded ranges disappear.
pub(crate) fn clip(ranges: &[PageRange], excluded: &PageSet) -> Vec<PageRange> {
    let mut clipped = Vec::with_capacity(ranges.len());

    for range in ranges {
        let mut run_start: Option<u32> = None;
        for page in range.start..=range.end {
            if excluded.contains(&page) {
                if let Some(start) = run_start.take() {
                    clipped.push(PageRange::new(start, page - 1));
                }
            } else if run_start.is_none() {
                run_start = Some(page);
            }
        }
        if let Some(start) = run_start {
            clipped.push(PageRange::new(start, range.end));
        }
    }

    normalize(&mut clipped);
    clipped
}

pub(crate) fn contains_all(ranges: &[PageRange], pages: &PageSet) -> bool {
    pages
        .iter()
        .all(|page| ranges.iter().any(|range| range.contains(*page)))
}

pub(crate) fn page_count(ranges: &[PageRange]) -> usize {
    pages_of(ranges).len()
}

pub(crate) fn page_span(ranges: &[PageRange]) -> Option<(u32, u32)> {
    let start = ranges.iter().map(|range| range.start).min()?;
    let end = ranges.iter().map(|range| range.end).max()?;
    Some((start, end))
}

pub(crate) fn content_pages(article: &ArticleCandidate) -> PageSet {
    let solutions = pages_of(&article.solution_pages);
    pages_of(&article.pages)
        .into_iter()
        .filter(|page| !solutions.contains(page))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClampedRange {
    pub range: PageRange,
    pub corrected: bool,
}

pub(crate) fn clamp_range(start: i64, end: i64, total_pages: u32) -> Option<ClampedRange> {
    let (mut low, mut high) = (start, end);
    let mut corrected = false;
    if low > high {
        std::mem::swap(&mut low, &mut high);
        corrected = true;
    }

    let total = i64::from(total_pages.max(1));
    if high < 1 || low > total {
        return None;
    }

    if low < 1 {
        low = 1;
        corrected = true;
    }
    if high > total {
        high = total;
        corrected = true;
    }

    Some(ClampedRange {
        range: PageRange::new(low as u32, high as u32),
        corrected,
    })
}

pub(crate) fn format_ranges(ranges: &[PageRange]) -> String {
    ranges
        .iter()
        .map(|range| {
            if range.start == range.end {
                range.start.to_string()
            } else {
                format!("{}-{}", range.start, range.end)
            }
        })
        .collect::<Vec<String>>()
        .join(", ")
}
