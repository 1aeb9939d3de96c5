use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::model::{ArticleCandidate, PageRange, ReconcileWarning, WarningKind};

use super::collaborators::{PageTextSource, SolutionPageReader};
use super::page_ranges::{normalize, pages_of};
use super::taxonomy::Taxonomy;
use super::warnings::push_warning;

const PHASE: &str = "locate_solutions";

pub(crate) struct ReferencePatterns {
    patterns: Vec<Regex>,
}

impl ReferencePatterns {
    pub fn new() -> Result<Self> {
        let sources = [
            r"(?i)\bsolutions?\s+(?:is\s+|are\s+|appears?\s+|can\s+be\s+found\s+)?on\s+(?:page|p\.)\s*(\d{1,4})\b",
            r"(?i)\(\s*(?:solutions?|answers?)\s*(?:on\s+|:\s*)?(?:page|p\.)\s*(\d{1,4})\s*\)",
            r"(?i)\banswers?\s+(?:is\s+|are\s+|appears?\s+)?on\s+(?:page|p\.)\s*(\d{1,4})\b",
            r"(?i)\bsee\s+page\s+(\d{1,4})\b",
            r"(?i)\bpage\s+(\d{1,4})\s+for\s+(?:the\s+)?solutions?\b",
        ];

        let mut patterns = Vec::with_capacity(sources.len());
        for source in sources {
            patterns.push(
                Regex::new(source)
                    .with_context(|| format!("failed to compile solution reference regex: {source}"))?,
            );
        }
        Ok(Self { patterns })
    }

    pub fn find_reference(&self, text: &str, accept: impl Fn(u32) -> bool) -> Option<u32> {
        let mut hits = Vec::new();
        for pattern in &self.patterns {
            for captures in pattern.captures_iter(text) {
                let Some(number) = captures.get(1) else {
                    debug!(pattern = pattern.as_str(), "reference pattern matched without a page capture");
                    continue;
                };
                if let Ok(page) = number.as_str().parse::<u32>() {
                    hits.push((number.start(), page));
                }
            }
        }
        hits.sort();
        hits.into_iter()
            .map(|(_, page)| page)
            .find(|page| accept(*page))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SolutionSource {
    PageText { page: u32 },
    Reader,
}

impl SolutionSource {
    pub fn describe(self) -> String {
        match self {
            Self::PageText { page } => format!("text reference on page {page}"),
            Self::Reader => "page reader".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LocatedSolution {
    pub title: String,
    pub solution_page: u32,
    pub source: SolutionSource,
}

#[derive(Debug, Default)]
pub(crate) struct LocateReport {
    pub located: Vec<LocatedSolution>,
    pub missing: Vec<String>,
}

impl LocateReport {
    pub fn count_from_text(&self) -> usize {
        self.located
            .iter()
            .filter(|located| matches!(located.source, SolutionSource::PageText { .. }))
            .count()
    }

    pub fn count_from_reader(&self) -> usize {
        self.located
            .iter()
            .filter(|located| located.source == SolutionSource::Reader)
            .count()
    }
}

pub(crate) fn locate_solution_pages(
    articles: &mut [ArticleCandidate],
    taxonomy: &Taxonomy,
    patterns: &ReferencePatterns,
    total_pages: u32,
    page_text: &dyn PageTextSource,
    reader: &mut dyn SolutionPageReader,
    warnings: &mut Vec<ReconcileWarning>,
) -> LocateReport {
    let mut report = LocateReport::default();

    for article in articles.iter_mut() {
        if !taxonomy.is_problem_category(article.category.as_deref()) || !article.solution_pages.is_empty() {
            continue;
        }

        let own_pages = pages_of(&article.pages);
        let in_bounds = |page: u32| (1..=total_pages).contains(&page) && !own_pages.contains(&page);

        let mut found = own_pages.iter().find_map(|page| {
            let text = page_text.page_text(*page)?;
            patterns
                .find_reference(&text, in_bounds)
                .map(|solution_page| (solution_page, SolutionSource::PageText { page: *page }))
        });

        if found.is_none() {
            if let Some(first_page) = own_pages.first().copied() {
                match reader.read_solution_page(first_page) {
                    Ok(Some(solution_page)) if in_bounds(solution_page) => {
                        found = Some((solution_page, SolutionSource::Reader));
                    }
                    Ok(Some(solution_page)) => {
                        debug!(
                            title = %article.title,
                            solution_page,
                            "reader returned a page outside bounds or inside the article"
                        );
                    }
                    Ok(None) => {}
                    Err(error) => {
                        push_warning(
                            warnings,
                            WarningKind::UnresolvedReference,
                            PHASE,
                            &article.title,
                            format!("solution-page reader failed on page {first_page}: {error:#}"),
                            &article.pages,
                        );
                    }
                }
            }
        }

        let Some((solution_page, source)) = found else {
            push_warning(
                warnings,
                WarningKind::UnresolvedReference,
                PHASE,
                &article.title,
                "no solution page found by text scan or page reader; continuing without solutions",
                &article.pages,
            );
            report.missing.push(article.title.clone());
            continue;
        };

        article.pages.push(PageRange::single(solution_page));
        normalize(&mut article.pages);
        article.solution_pages.push(PageRange::single(solution_page));
        normalize(&mut article.solution_pages);

        info!(
            title = %article.title,
            solution_page,
            source = ?source,
            "located solution page"
        );
        report.located.push(LocatedSolution {
            title: article.title.clone(),
            solution_page,
            source,
        });
    }

    report
}
