use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "[u32; 2]")]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn single(page: u32) -> Self {
        Self {
            start: page,
            end: page,
        }
    }

    pub fn contains(&self, page: u32) -> bool {
        self.start <= page && page <= self.end
    }
}

impl From<PageRange> for [u32; 2] {
    fn from(range: PageRange) -> Self {
        [range.start, range.end]
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IssueMeta {
    pub month: u32,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl IssueMeta {
    pub fn next_month(&self) -> Option<u32> {
        if (1..=12).contains(&self.month) {
            Some(self.month % 12 + 1)
        } else {
            None
        }
    }

    pub fn next_issue_label(&self) -> Option<String> {
        let next_month = self.next_month()?;
        let year = if next_month == 1 {
            self.year + 1
        } else {
            self.year
        };
        Some(format!("{} {}", month_name(next_month)?, year))
    }
}

pub fn month_name(month: u32) -> Option<&'static str> {
    if (1..=12).contains(&month) {
        Some(MONTH_NAMES[(month - 1) as usize])
    } else {
        None
    }
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleCandidate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    pub pages: Vec<PageRange>,
    pub solution_pages: Vec<PageRange>,
    pub interleaved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPages {
    Ranges(Vec<[i64; 2]>),
    Single([i64; 2]),
    Page(i64),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "authorName")]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub pages: Option<RawPages>,
    #[serde(default)]
    pub page_start: Option<i64>,
    #[serde(default)]
    pub page_end: Option<i64>,
    #[serde(default)]
    pub solution_pages: Option<RawPages>,
    #[serde(default)]
    pub interleaved: bool,
    #[serde(default)]
    pub parent_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIssue {
    pub issue: IssueMeta,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub articles: Vec<RawArticle>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledIssue {
    pub issue: IssueMeta,
    pub total_pages: u32,
    pub articles: Vec<ArticleCandidate>,
    pub warnings: Vec<ReconcileWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningKind {
    UnresolvedReference,
    AmbiguousAttribution,
    MalformedInput,
}

impl WarningKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnresolvedReference => "unresolved_reference",
            Self::AmbiguousAttribution => "ambiguous_attribution",
            Self::MalformedInput => "malformed_input",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileWarning {
    pub kind: WarningKind,
    pub phase: String,
    pub article_title: String,
    pub reason: String,
    pub pages: Vec<PageRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Fragment {
    Text {
        text: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    CardHandDiagram {
        #[serde(flatten)]
        payload: Map<String, Value>,
    },
    AuctionTable {
        #[serde(flatten)]
        payload: Map<String, Value>,
    },
    Image {
        #[serde(flatten)]
        payload: Map<String, Value>,
    },
    Video {
        #[serde(flatten)]
        payload: Map<String, Value>,
    },
    ResultsTable {
        #[serde(flatten)]
        payload: Map<String, Value>,
    },
    SolutionGroup {
        id: String,
        label: String,
        fragments: Vec<Fragment>,
    },
}

impl Fragment {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_solution_group(&self) -> bool {
        matches!(self, Self::SolutionGroup { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleFragments {
    pub title: String,
    #[serde(default)]
    pub fragments: Vec<Fragment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentDocument {
    #[serde(default)]
    pub articles: Vec<ArticleFragments>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ReconcileCounts {
    pub articles_in: usize,
    pub articles_out: usize,
    pub ranges_clamped: usize,
    pub solutions_merged: usize,
    pub solutions_unresolved: usize,
    pub preview_articles_removed: usize,
    pub articles_clipped: usize,
    pub articles_expanded: usize,
    pub features_trimmed: usize,
    pub articles_interleaved: usize,
    pub solution_pages_from_text: usize,
    pub solution_pages_from_reader: usize,
    pub solution_pages_missing: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunPaths {
    pub input_path: String,
    pub output_path: String,
    pub manifest_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub input_sha256: String,
    pub issue: IssueMeta,
    pub next_issue: Option<String>,
    pub total_pages: u32,
    pub paths: RunPaths,
    pub counts: ReconcileCounts,
    pub warnings: Vec<ReconcileWarning>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct InterleaveCounts {
    pub article_count: usize,
    pub grouped_articles: usize,
    pub interleaved_articles: usize,
    pub unchanged_articles: usize,
    pub solution_groups_created: usize,
    pub unmatched_solution_runs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterleaveRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub input_sha256: String,
    pub paths: RunPaths,
    pub counts: InterleaveCounts,
    pub notes: Vec<String>,
}
