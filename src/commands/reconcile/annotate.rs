use std::collections::HashSet;

use tracing::info;

use crate::model::{ArticleCandidate, ReconcileWarning, WarningKind};
use crate::util::fold_title;

use super::page_ranges::{PageSet, content_pages, pages_of};
use super::taxonomy::Taxonomy;
use super::warnings::push_warning;

const PHASE: &str = "annotate_interleaved";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParentMatch {
    Overlap,
    SpanFallback,
}

impl ParentMatch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overlap => "overlap",
            Self::SpanFallback => "span_fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Attribution {
    pub title: String,
    pub parent_title: String,
    pub matched_by: ParentMatch,
}

pub(crate) fn clear_dangling_parents(
    articles: &mut [ArticleCandidate],
    warnings: &mut Vec<ReconcileWarning>,
) -> usize {
    let titles = articles
        .iter()
        .map(|article| fold_title(&article.title))
        .collect::<HashSet<String>>();

    let mut cleared = 0usize;
    for article in articles.iter_mut() {
        let Some(parent) = article.parent_title.as_deref() else {
            continue;
        };
        let folded_parent = fold_title(parent);
        if titles.contains(&folded_parent) && folded_parent != fold_title(&article.title) {
            continue;
        }

        push_warning(
            warnings,
            WarningKind::AmbiguousAttribution,
            PHASE,
            &article.title,
            format!("parent article '{parent}' not found; interleave reference cleared"),
            &article.pages,
        );
        article.parent_title = None;
        article.interleaved = false;
        cleared += 1;
    }
    cleared
}

/// Parent is the first larger non-interleavable article, in input order, that
/// overlaps the feature; else the largest article whose span contains it.
pub(crate) fn annotate_interleaved(
    articles: &mut [ArticleCandidate],
    taxonomy: &Taxonomy,
    warnings: &mut Vec<ReconcileWarning>,
) -> Vec<Attribution> {
    // Located solution pages are left out so a rerun measures the same sizes.
    let measured = articles.iter().map(measured_pages).collect::<Vec<PageSet>>();

    let mut decisions = Vec::new();
    for (index, article) in articles.iter().enumerate() {
        if !taxonomy.is_interleavable(&article.title) {
            continue;
        }

        let own_pages = &measured[index];
        let content_count = content_pages(article).len();
        if content_count > taxonomy.max_feature_content_pages {
            push_warning(
                warnings,
                WarningKind::AmbiguousAttribution,
                PHASE,
                &article.title,
                format!(
                    "known short feature spans {content_count} content pages (expected at most {}); attribution may be wrong",
                    taxonomy.max_feature_content_pages
                ),
                &article.pages,
            );
        }

        if own_pages.is_empty() {
            decisions.push((index, None));
            continue;
        }

        let own_size = own_pages.len();
        let overlapping = articles
            .iter()
            .enumerate()
            .filter(|(other, candidate)| {
                *other != index
                    && !taxonomy.is_interleavable(&candidate.title)
                    && measured[*other].len() > own_size
                    && !measured[*other].is_disjoint(own_pages)
            })
            .map(|(other, _)| other)
            .collect::<Vec<usize>>();

        if let Some(&parent) = overlapping.first() {
            if overlapping.len() > 1 {
                let alternatives = overlapping[1..]
                    .iter()
                    .map(|other| articles[*other].title.as_str())
                    .collect::<Vec<&str>>()
                    .join("; ");
                push_warning(
                    warnings,
                    WarningKind::AmbiguousAttribution,
                    PHASE,
                    &article.title,
                    format!(
                        "overlaps several larger articles; chose '{}' (first in input order) over: {alternatives}",
                        articles[parent].title
                    ),
                    &article.pages,
                );
            }
            decisions.push((index, Some((parent, ParentMatch::Overlap))));
            continue;
        }

        let largest = articles
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .max_by(|(left_index, _), (right_index, _)| {
                measured[*left_index]
                    .len()
                    .cmp(&measured[*right_index].len())
                    .then(right_index.cmp(left_index))
            })
            .map(|(other, _)| other);

        let fallback = largest.filter(|other| {
            match (measured[*other].first(), measured[*other].last()) {
                (Some(low), Some(high)) => own_pages.iter().any(|page| low <= page && page <= high),
                _ => false,
            }
        });

        if let Some(parent) = fallback {
            push_warning(
                warnings,
                WarningKind::AmbiguousAttribution,
                PHASE,
                &article.title,
                format!(
                    "no direct page overlap; attributed to largest article '{}' by page-span containment",
                    articles[parent].title
                ),
                &article.pages,
            );
            decisions.push((index, Some((parent, ParentMatch::SpanFallback))));
        } else {
            decisions.push((index, None));
        }
    }

    let mut attributions = Vec::new();
    for (index, decision) in decisions {
        match decision {
            Some((parent, matched_by)) => {
                let parent_title = articles[parent].title.clone();
                let article = &mut articles[index];
                article.interleaved = true;
                article.parent_title = Some(parent_title.clone());
                info!(
                    title = %article.title,
                    parent = %parent_title,
                    fallback = matched_by == ParentMatch::SpanFallback,
                    "marked feature as interleaved"
                );
                attributions.push(Attribution {
                    title: article.title.clone(),
                    parent_title,
                    matched_by,
                });
            }
            None => {
                let article = &mut articles[index];
                article.interleaved = false;
                article.parent_title = None;
            }
        }
    }

    attributions
}

fn measured_pages(article: &ArticleCandidate) -> PageSet {
    let content = content_pages(article);
    if content.is_empty() {
        pages_of(&article.pages)
    } else {
        content
    }
}
