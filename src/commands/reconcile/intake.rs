use tracing::{debug, info};

use crate::model::{ArticleCandidate, PageRange, RawArticle, RawIssue, RawPages, ReconcileWarning, WarningKind};

use super::page_ranges::{clamp_range, contains_all, normalize, pages_of};
use super::warnings::push_warning;

const PHASE: &str = "intake";

#[derive(Debug, Default)]
pub(crate) struct IntakeReport {
    pub ranges_clamped: usize,
}

pub(crate) fn resolve_total_pages(raw: &RawIssue, override_pages: Option<u32>) -> u32 {
    if let Some(total) = override_pages.or(raw.total_pages).filter(|total| *total > 0) {
        return total;
    }

    let inferred = raw
        .articles
        .iter()
        .flat_map(|article| {
            raw_pairs(article.pages.as_ref())
                .into_iter()
                .chain(raw_pairs(article.solution_pages.as_ref()))
                .chain(article.page_start.zip(article.page_end.or(article.page_start)))
        })
        .map(|(start, end)| start.max(end))
        .max()
        .unwrap_or(1)
        .max(1);

    info!(total_pages = inferred, "inferred total page count from article ranges");
    inferred.min(i64::from(u32::MAX)) as u32
}

pub(crate) fn intake_articles(
    raw_articles: Vec<RawArticle>,
    total_pages: u32,
    warnings: &mut Vec<ReconcileWarning>,
) -> (Vec<ArticleCandidate>, IntakeReport) {
    let mut report = IntakeReport::default();
    let mut articles = Vec::with_capacity(raw_articles.len());

    for raw in raw_articles {
        let title = raw.title.trim().to_string();
        if title.is_empty() {
            push_warning(
                warnings,
                WarningKind::MalformedInput,
                PHASE,
                &title,
                "article has an empty title",
                &[],
            );
        }

        let mut page_pairs = raw_pairs(raw.pages.as_ref());
        if page_pairs.is_empty() {
            if let Some(start) = raw.page_start {
                page_pairs.push((start, raw.page_end.unwrap_or(start)));
            }
        }

        let mut pages = clamp_pairs(&title, "pages", &page_pairs, total_pages, warnings, &mut report);
        let mut solution_pages = clamp_pairs(
            &title,
            "solutionPages",
            &raw_pairs(raw.solution_pages.as_ref()),
            total_pages,
            warnings,
            &mut report,
        );
        normalize(&mut solution_pages);

        if !contains_all(&pages, &pages_of(&solution_pages)) {
            debug!(title = %title, "adding solution ranges missing from article pages");
            pages.extend(solution_pages.iter().copied());
        }
        normalize(&mut pages);

        let interleaved = raw.interleaved;
        let parent_title = raw
            .parent_title
            .map(|parent| parent.trim().to_string())
            .filter(|parent| interleaved && !parent.is_empty());

        articles.push(ArticleCandidate {
            title,
            author: raw.author.filter(|author| !author.trim().is_empty()),
            category: raw.category.filter(|category| !category.trim().is_empty()),
            tags: raw.tags,
            excerpt: raw.excerpt,
            pages,
            solution_pages,
            interleaved,
            parent_title,
        });
    }

    (articles, report)
}

fn raw_pairs(pages: Option<&RawPages>) -> Vec<(i64, i64)> {
    match pages {
        None => Vec::new(),
        Some(RawPages::Ranges(ranges)) => ranges.iter().map(|[start, end]| (*start, *end)).collect(),
        Some(RawPages::Single([start, end])) => vec![(*start, *end)],
        Some(RawPages::Page(page)) => vec![(*page, *page)],
    }
}

fn clamp_pairs(
    title: &str,
    field: &str,
    pairs: &[(i64, i64)],
    total_pages: u32,
    warnings: &mut Vec<ReconcileWarning>,
    report: &mut IntakeReport,
) -> Vec<PageRange> {
    let mut ranges = Vec::with_capacity(pairs.len());
    for (start, end) in pairs {
        match clamp_range(*start, *end, total_pages) {
            Some(clamped) => {
                if clamped.corrected {
                    report.ranges_clamped += 1;
                    push_warning(
                        warnings,
                        WarningKind::MalformedInput,
                        PHASE,
                        title,
                        format!(
                            "{field} range [{start}, {end}] corrected to document bounds 1..={total_pages}"
                        ),
                        &[clamped.range],
                    );
                }
                ranges.push(clamped.range);
            }
            None => {
                report.ranges_clamped += 1;
                push_warning(
                    warnings,
                    WarningKind::MalformedInput,
                    PHASE,
                    title,
                    format!(
                        "{field} range [{start}, {end}] lies outside document bounds 1..={total_pages}; dropped"
                    ),
                    &[],
                );
            }
        }
    }
    ranges
}
