use tracing::{debug, info};

use crate::model::{ArticleCandidate, PageRange};

use super::page_ranges::{PageSet, content_pages, format_ranges, normalize, pages_of};
use super::taxonomy::Taxonomy;

fn primary_range(article: &ArticleCandidate) -> Option<usize> {
    let solutions = pages_of(&article.solution_pages);
    article
        .pages
        .iter()
        .position(|range| !(range.start..=range.end).all(|page| solutions.contains(&page)))
}

/// Ranges before the content range or past its new end are separately
/// printed solution pages and are kept.
pub(crate) fn expand_main_articles(
    articles: &mut [ArticleCandidate],
    taxonomy: &Taxonomy,
    total_pages: u32,
) -> usize {
    let mut mains = articles
        .iter()
        .enumerate()
        .filter(|(_, article)| !taxonomy.is_short_feature(&article.title))
        .filter_map(|(index, article)| {
            primary_range(article).map(|primary| (index, primary, article.pages[primary].start))
        })
        .collect::<Vec<(usize, usize, u32)>>();
    mains.sort_by_key(|(index, _, start)| (*start, *index));

    let mut expanded = 0usize;
    for (position, (index, primary, start)) in mains.iter().enumerate() {
        let article = &mut articles[*index];
        let content = article.pages[*primary];

        let new_end = match mains.get(position + 1) {
            Some((_, _, next_start)) if *next_start > *start => next_start - 1,
            Some(_) => content.end,
            None => total_pages.max(content.end),
        };

        let mut pages = Vec::with_capacity(article.pages.len());
        for (range_index, range) in article.pages.iter().enumerate() {
            if range_index == *primary {
                pages.push(PageRange::new(content.start, new_end));
            } else if range.start < content.start || range.start > new_end {
                pages.push(*range);
            } else if range.end > new_end {
                pages.push(PageRange::new(new_end + 1, range.end));
            }
        }
        normalize(&mut pages);

        if pages != article.pages {
            debug!(
                title = %article.title,
                before = %format_ranges(&article.pages),
                after = %format_ranges(&pages),
                "expanded main article range"
            );
            article.pages = pages;
            expanded += 1;
        }
    }

    expanded
}

pub(crate) fn trim_interleaved_features(
    articles: &mut [ArticleCandidate],
    taxonomy: &Taxonomy,
) -> Vec<String> {
    let main_pages = articles
        .iter()
        .filter(|article| !taxonomy.is_short_feature(&article.title))
        .map(|article| pages_of(&article.pages))
        .collect::<Vec<PageSet>>();

    let mut trimmed = Vec::new();
    for article in articles.iter_mut() {
        if !taxonomy.is_short_feature(&article.title) {
            continue;
        }

        let content = content_pages(article);
        if content.len() <= 1 {
            continue;
        }
        let Some(first_content_page) = content.first().copied() else {
            continue;
        };

        let containing = main_pages
            .iter()
            .filter(|pages| content.is_subset(pages))
            .count();
        if containing != 1 {
            continue;
        }

        let mut pages = vec![PageRange::single(first_content_page)];
        pages.extend(article.solution_pages.iter().copied());
        normalize(&mut pages);
        if pages == article.pages {
            continue;
        }

        info!(
            title = %article.title,
            before = %format_ranges(&article.pages),
            after = %format_ranges(&pages),
            "trimmed interleaved short feature"
        );
        article.pages = pages;
        trimmed.push(article.title.clone());
    }

    trimmed
}
