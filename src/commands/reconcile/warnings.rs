use tracing::warn;

use crate::model::{PageRange, ReconcileWarning, WarningKind};

use super::page_ranges::format_ranges;

pub(crate) fn push_warning(
    warnings: &mut Vec<ReconcileWarning>,
    kind: WarningKind,
    phase: &str,
    article_title: &str,
    reason: impl Into<String>,
    pages: &[PageRange],
) {
    let reason = reason.into();
    warn!(
        kind = kind.as_str(),
        phase,
        title = %article_title,
        pages = %format_ranges(pages),
        "{reason}"
    );
    warnings.push(ReconcileWarning {
        kind,
        phase: phase.to_string(),
        article_title: article_title.to_string(),
        reason,
        pages: pages.to_vec(),
    });
}
