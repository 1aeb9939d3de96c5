use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::util::{fold_title, read_json};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaxonomyConfig {
    pub known_problem_features: Vec<String>,
    pub short_features: Vec<String>,
    pub interleavable_features: Vec<String>,
    pub problem_categories: Vec<String>,
    pub max_feature_content_pages: usize,
    pub bare_solutions_window: usize,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            known_problem_features: vec![
                "Test Your Play".to_string(),
                "Test Your Defense".to_string(),
                "Bidding Quiz".to_string(),
                "Play Problems".to_string(),
                "Defense Problems".to_string(),
                "It's Your Call".to_string(),
                "Master Solvers".to_string(),
            ],
            short_features: vec![
                "Test Your Play".to_string(),
                "Test Your Defense".to_string(),
                "Bidding Quiz".to_string(),
                "Play Problems".to_string(),
                "Defense Problems".to_string(),
            ],
            interleavable_features: vec!["It's Your Call".to_string()],
            problem_categories: vec![
                "problem".to_string(),
                "problems".to_string(),
                "quiz".to_string(),
                "puzzle".to_string(),
            ],
            max_feature_content_pages: 3,
            bare_solutions_window: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FeatureMatcher {
    folded: String,
}

impl FeatureMatcher {
    pub fn new(name: &str) -> Self {
        Self {
            folded: fold_title(name),
        }
    }

    pub fn matches_title(&self, title: &str) -> bool {
        !self.folded.is_empty() && fold_title(title).contains(&self.folded)
    }

    pub fn matches_either(&self, folded_text: &str) -> bool {
        if self.folded.is_empty() || folded_text.is_empty() {
            return false;
        }
        folded_text.contains(&self.folded) || self.folded.contains(folded_text)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Taxonomy {
    known_problem_features: Vec<FeatureMatcher>,
    short_features: Vec<FeatureMatcher>,
    interleavable_features: Vec<FeatureMatcher>,
    problem_categories: Vec<String>,
    pub max_feature_content_pages: usize,
    pub bare_solutions_window: usize,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::from_config(TaxonomyConfig::default())
    }
}

impl Taxonomy {
    pub fn from_config(config: TaxonomyConfig) -> Self {
        let short_features = matchers(&config.short_features);

        let mut interleavable_features = short_features.clone();
        for matcher in matchers(&config.interleavable_features) {
            if !interleavable_features.contains(&matcher) {
                interleavable_features.push(matcher);
            }
        }

        Self {
            known_problem_features: matchers(&config.known_problem_features),
            short_features,
            interleavable_features,
            problem_categories: config
                .problem_categories
                .iter()
                .map(|category| fold_title(category))
                .filter(|category| !category.is_empty())
                .collect(),
            max_feature_content_pages: config.max_feature_content_pages,
            bare_solutions_window: config.bare_solutions_window,
        }
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let config: TaxonomyConfig = read_json(path)?;
        info!(
            path = %path.display(),
            known_problem_features = config.known_problem_features.len(),
            short_features = config.short_features.len(),
            "loaded taxonomy"
        );
        Ok(Self::from_config(config))
    }

    pub fn is_short_feature(&self, title: &str) -> bool {
        self.short_features
            .iter()
            .any(|matcher| matcher.matches_title(title))
    }

    pub fn is_interleavable(&self, title: &str) -> bool {
        self.interleavable_features
            .iter()
            .any(|matcher| matcher.matches_title(title))
    }

    pub fn known_problem_feature_for(&self, folded_text: &str) -> Option<&FeatureMatcher> {
        self.known_problem_features
            .iter()
            .find(|matcher| matcher.matches_either(folded_text))
    }

    pub fn is_problem_category(&self, category: Option<&str>) -> bool {
        let Some(category) = category else {
            return false;
        };
        let folded = fold_title(category);
        self.problem_categories
            .iter()
            .any(|candidate| *candidate == folded)
    }
}

fn matchers(names: &[String]) -> Vec<FeatureMatcher> {
    names
        .iter()
        .map(|name| FeatureMatcher::new(name))
        .filter(|matcher| !matcher.folded.is_empty())
        .collect()
}
