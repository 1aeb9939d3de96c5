use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

use crate::model::{ArticleCandidate, IssueMeta, ReconcileWarning, WarningKind, month_name};

use super::page_ranges::{PageSet, clip, format_ranges, pages_of};
use super::warnings::push_warning;

const PHASE: &str = "preview_filter";

pub(crate) struct PreviewPatterns {
    month_words: Vec<Regex>,
    hands_for: Regex,
    problems_for: Regex,
}

impl PreviewPatterns {
    pub fn new() -> Result<Self> {
        let mut month_words = Vec::with_capacity(12);
        for month in 1..=12 {
            let name = month_name(month).context("month table is incomplete")?;
            month_words.push(
                Regex::new(&format!(r"(?:^(?:The\s+)?|:\s*|\s[\-–]\s*){name}\b|\b{name},?\s+[0-9]{{4}}\b"))
                    .with_context(|| format!("failed to compile month regex for {name}"))?,
            );
        }

        Ok(Self {
            month_words,
            hands_for: Regex::new(r"(?i)\b(?:west|east)\s+hands\s+for\b")
                .context("failed to compile hands-for regex")?,
            problems_for: Regex::new(r"(?i)\bproblems\s+for\b")
                .context("failed to compile problems-for regex")?,
        })
    }

    /// Capitalised, and leading the title or a `:`/dash section, or followed by a year.
    fn mentions_month(&self, title: &str, month: u32) -> bool {
        month
            .checked_sub(1)
            .and_then(|index| self.month_words.get(index as usize))
            .map(|pattern| pattern.is_match(title))
            .unwrap_or(false)
    }

    pub fn is_preview(&self, title: &str, issue: &IssueMeta) -> bool {
        if let Some(next_month) = issue.next_month() {
            if self.mentions_month(title, next_month) && !self.mentions_month(title, issue.month) {
                return true;
            }
        }
        self.hands_for.is_match(title) || self.problems_for.is_match(title)
    }
}

#[derive(Debug, Default)]
pub(crate) struct FilterReport {
    pub removed: Vec<String>,
    pub clipped: Vec<String>,
    pub excluded_pages: PageSet,
}

pub(crate) fn filter_preview_content(
    articles: &mut Vec<ArticleCandidate>,
    patterns: &PreviewPatterns,
    issue: &IssueMeta,
    warnings: &mut Vec<ReconcileWarning>,
) -> FilterReport {
    let mut report = FilterReport::default();

    if issue.next_month().is_none() {
        push_warning(
            warnings,
            WarningKind::MalformedInput,
            PHASE,
            issue.title.as_deref().unwrap_or_default(),
            format!("issue month {} is not in 1..=12; month-based preview detection skipped", issue.month),
            &[],
        );
    }

    let (preview, kept): (Vec<ArticleCandidate>, Vec<ArticleCandidate>) = std::mem::take(articles)
        .into_iter()
        .partition(|article| patterns.is_preview(&article.title, issue));

    for article in &preview {
        report.excluded_pages.extend(pages_of(&article.pages));
        info!(
            title = %article.title,
            pages = %format_ranges(&article.pages),
            next_issue = %issue.next_issue_label().unwrap_or_default(),
            "removed next-issue preview article"
        );
        report.removed.push(article.title.clone());
    }

    *articles = kept;
    if report.excluded_pages.is_empty() {
        return report;
    }

    for article in articles.iter_mut() {
        let clipped_pages = clip(&article.pages, &report.excluded_pages);
        if clipped_pages == article.pages {
            continue;
        }

        info!(
            title = %article.title,
            before = %format_ranges(&article.pages),
            after = %format_ranges(&clipped_pages),
            "clipped preview pages from article"
        );
        article.pages = clipped_pages;
        article.solution_pages = clip(&article.solution_pages, &report.excluded_pages);
        report.clipped.push(article.title.clone());
    }

    report
}
