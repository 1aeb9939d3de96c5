use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::model::{ArticleCandidate, ReconcileWarning, WarningKind};
use crate::util::fold_title;

use super::page_ranges::normalize;
use super::taxonomy::Taxonomy;
use super::warnings::push_warning;

const PHASE: &str = "merge_solutions";

pub(crate) struct SolutionsTitleParser {
    solutions_word: Regex,
    trailing_form: Regex,
    leading_form: Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SolutionsTitle {
    pub base: String,
}

impl SolutionsTitle {
    pub fn is_bare(&self) -> bool {
        self.base.is_empty()
    }
}

impl SolutionsTitleParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            solutions_word: Regex::new(r"(?i)\bsolutions?\b")
                .context("failed to compile solutions word regex")?,
            trailing_form: Regex::new(r"(?i)^(?P<base>.*?)[\s:\-–—]*\bsolutions?[\s.:]*$")
                .context("failed to compile trailing solutions title regex")?,
            leading_form: Regex::new(r"(?i)^solutions?\b[\s:\-–—]*(?:to\s+(?:the\s+)?)?(?P<base>.*?)[\s.:]*$")
                .context("failed to compile leading solutions title regex")?,
        })
    }

    pub fn mentions_solutions(&self, title: &str) -> bool {
        self.solutions_word.is_match(title)
    }

    pub fn parse(&self, title: &str) -> Option<SolutionsTitle> {
        let title = title.trim();
        let captures = self
            .trailing_form
            .captures(title)
            .or_else(|| self.leading_form.captures(title))?;
        let base = captures
            .name("base")
            .map(|value| value.as_str())
            .unwrap_or_default()
            .trim_matches(|character: char| {
                character.is_whitespace() || matches!(character, ':' | '-' | '–' | '—' | '.')
            });
        Some(SolutionsTitle {
            base: fold_title(base),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeStrategy {
    ExactTitle,
    KnownProblemFeature,
    TitleSubstring,
    NearestKnownFeature,
}

impl MergeStrategy {
    pub const CASCADE: [MergeStrategy; 4] = [
        MergeStrategy::ExactTitle,
        MergeStrategy::KnownProblemFeature,
        MergeStrategy::TitleSubstring,
        MergeStrategy::NearestKnownFeature,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactTitle => "exact_title",
            Self::KnownProblemFeature => "known_problem_feature",
            Self::TitleSubstring => "title_substring",
            Self::NearestKnownFeature => "nearest_known_feature",
        }
    }

    fn resolve(self, context: &MergeContext<'_>, position: usize, title: &SolutionsTitle) -> Option<usize> {
        match self {
            Self::ExactTitle => {
                if title.is_bare() {
                    return None;
                }
                context.by_title.get(&title.base).copied()
            }
            Self::KnownProblemFeature => {
                if title.is_bare() {
                    return None;
                }
                let feature = context.taxonomy.known_problem_feature_for(&title.base)?;
                context
                    .parents
                    .iter()
                    .find(|(_, folded)| feature.matches_either(folded))
                    .map(|(index, _)| *index)
            }
            Self::TitleSubstring => {
                if title.is_bare() {
                    return None;
                }
                context
                    .parents
                    .iter()
                    .find(|(_, folded)| {
                        !folded.is_empty()
                            && (folded.contains(&title.base) || title.base.contains(folded.as_str()))
                    })
                    .map(|(index, _)| *index)
            }
            Self::NearestKnownFeature => {
                if !title.is_bare() {
                    return None;
                }
                let window = context.taxonomy.bare_solutions_window;
                context
                    .parents
                    .iter()
                    .filter(|(index, _)| index.abs_diff(position) <= window)
                    .filter(|(_, folded)| context.taxonomy.known_problem_feature_for(folded).is_some())
                    .min_by_key(|(index, _)| (index.abs_diff(position), *index))
                    .map(|(index, _)| *index)
            }
        }
    }
}

struct MergeContext<'a> {
    taxonomy: &'a Taxonomy,
    by_title: HashMap<String, usize>,
    parents: Vec<(usize, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MergeResolution {
    pub solutions_title: String,
    pub parent_title: String,
    pub strategy: MergeStrategy,
}

#[derive(Debug, Default)]
pub(crate) struct MergeReport {
    pub resolutions: Vec<MergeResolution>,
    pub unresolved: Vec<String>,
}

pub(crate) fn merge_solutions(
    articles: &mut Vec<ArticleCandidate>,
    parser: &SolutionsTitleParser,
    taxonomy: &Taxonomy,
    warnings: &mut Vec<ReconcileWarning>,
) -> MergeReport {
    let mut report = MergeReport::default();

    let parents = articles
        .iter()
        .enumerate()
        .filter(|(_, article)| !parser.mentions_solutions(&article.title))
        .map(|(index, article)| (index, fold_title(&article.title)))
        .collect::<Vec<(usize, String)>>();
    let mut by_title = HashMap::new();
    for (index, folded) in &parents {
        by_title.entry(folded.clone()).or_insert(*index);
    }
    let context = MergeContext {
        taxonomy,
        by_title,
        parents,
    };

    let mut merges = Vec::new();
    for (position, article) in articles.iter().enumerate() {
        let Some(solutions_title) = parser.parse(&article.title) else {
            continue;
        };

        let resolved = MergeStrategy::CASCADE.iter().find_map(|strategy| {
            strategy
                .resolve(&context, position, &solutions_title)
                .map(|parent| (parent, *strategy))
        });

        match resolved {
            Some((parent, strategy)) => {
                debug!(
                    solutions = %article.title,
                    parent = %articles[parent].title,
                    strategy = strategy.as_str(),
                    "resolved solutions article"
                );
                merges.push((position, parent, strategy));
            }
            None => {
                report.unresolved.push(article.title.clone());
                push_warning(
                    warnings,
                    WarningKind::UnresolvedReference,
                    PHASE,
                    &article.title,
                    "solutions article could not be matched to a problem article; kept standalone",
                    &article.pages,
                );
            }
        }
    }

    let mut removed = BTreeSet::new();
    for (position, parent, strategy) in merges {
        let solution_ranges = articles[position].pages.clone();
        let solutions_title = articles[position].title.clone();

        let target = &mut articles[parent];
        target.pages.extend(solution_ranges.iter().copied());
        normalize(&mut target.pages);
        target.solution_pages.extend(solution_ranges.iter().copied());
        normalize(&mut target.solution_pages);

        info!(
            solutions = %solutions_title,
            parent = %target.title,
            strategy = strategy.as_str(),
            "merged solutions pages into parent article"
        );
        report.resolutions.push(MergeResolution {
            solutions_title,
            parent_title: target.title.clone(),
            strategy,
        });
        removed.insert(position);
    }

    let mut position = 0usize;
    articles.retain(|_| {
        let keep = !removed.contains(&position);
        position += 1;
        keep
    });

    report
}
