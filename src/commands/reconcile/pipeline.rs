use anyhow::Result;
use tracing::info;

use crate::model::{ArticleCandidate, IssueMeta, ReconcileCounts, ReconcileWarning};

use super::annotate::{annotate_interleaved, clear_dangling_parents};
use super::collaborators::{PageTextSource, SolutionPageReader};
use super::expand_trim::{expand_main_articles, trim_interleaved_features};
use super::locate::{ReferencePatterns, locate_solution_pages};
use super::merge::{SolutionsTitleParser, merge_solutions};
use super::page_ranges::{contains_all, normalize, pages_of};
use super::preview_filter::{PreviewPatterns, filter_preview_content};
use super::taxonomy::Taxonomy;

#[derive(Debug)]
pub(crate) struct ReconcileOutcome {
    pub articles: Vec<ArticleCandidate>,
    pub warnings: Vec<ReconcileWarning>,
    pub counts: ReconcileCounts,
    pub decisions: Vec<String>,
}

pub(crate) struct Reconciler {
    taxonomy: Taxonomy,
    solutions_titles: SolutionsTitleParser,
    previews: PreviewPatterns,
    references: ReferencePatterns,
}

impl Reconciler {
    pub fn new(taxonomy: Taxonomy) -> Result<Self> {
        Ok(Self {
            taxonomy,
            solutions_titles: SolutionsTitleParser::new()?,
            previews: PreviewPatterns::new()?,
            references: ReferencePatterns::new()?,
        })
    }

    pub fn reconcile(
        &self,
        issue: &IssueMeta,
        total_pages: u32,
        mut articles: Vec<ArticleCandidate>,
        page_text: &dyn PageTextSource,
        reader: &mut dyn SolutionPageReader,
    ) -> ReconcileOutcome {
        let mut warnings = Vec::new();
        let mut counts = ReconcileCounts {
            articles_in: articles.len(),
            ..ReconcileCounts::default()
        };

        for article in &mut articles {
            normalize(&mut article.pages);
            normalize(&mut article.solution_pages);
            if !contains_all(&article.pages, &pages_of(&article.solution_pages)) {
                article.pages.extend(article.solution_pages.iter().copied());
                normalize(&mut article.pages);
            }
        }

        let mut decisions = Vec::new();

        let merged = merge_solutions(&mut articles, &self.solutions_titles, &self.taxonomy, &mut warnings);
        counts.solutions_merged = merged.resolutions.len();
        counts.solutions_unresolved = merged.unresolved.len();
        decisions.extend(merged.resolutions.iter().map(|resolution| {
            format!(
                "merged '{}' into '{}' ({})",
                resolution.solutions_title,
                resolution.parent_title,
                resolution.strategy.as_str()
            )
        }));

        let filtered = filter_preview_content(&mut articles, &self.previews, issue, &mut warnings);
        counts.preview_articles_removed = filtered.removed.len();
        counts.articles_clipped = filtered.clipped.len();

        counts.articles_expanded = expand_main_articles(&mut articles, &self.taxonomy, total_pages);
        let trimmed = trim_interleaved_features(&mut articles, &self.taxonomy);
        counts.features_trimmed = trimmed.len();
        decisions.extend(
            trimmed
                .iter()
                .map(|title| format!("trimmed '{title}' to its first content page")),
        );

        clear_dangling_parents(&mut articles, &mut warnings);
        let attributions = annotate_interleaved(&mut articles, &self.taxonomy, &mut warnings);
        counts.articles_interleaved = attributions.len();
        decisions.extend(attributions.iter().map(|attribution| {
            format!(
                "'{}' is interleaved in '{}' ({})",
                attribution.title,
                attribution.parent_title,
                attribution.matched_by.as_str()
            )
        }));

        let located = locate_solution_pages(
            &mut articles,
            &self.taxonomy,
            &self.references,
            total_pages,
            page_text,
            reader,
            &mut warnings,
        );
        counts.solution_pages_from_text = located.count_from_text();
        counts.solution_pages_from_reader = located.count_from_reader();
        counts.solution_pages_missing = located.missing.len();
        decisions.extend(located.located.iter().map(|found| {
            format!(
                "'{}' solutions on page {} from {}",
                found.title,
                found.solution_page,
                found.source.describe()
            )
        }));

        counts.articles_out = articles.len();
        info!(
            articles_in = counts.articles_in,
            articles_out = counts.articles_out,
            merged = counts.solutions_merged,
            previews_removed = counts.preview_articles_removed,
            expanded = counts.articles_expanded,
            trimmed = counts.features_trimmed,
            interleaved = counts.articles_interleaved,
            warnings = warnings.len(),
            "reconciled issue"
        );

        ReconcileOutcome {
            articles,
            warnings,
            counts,
            decisions,
        }
    }
}
