mod annotate;
mod collaborators;
mod expand_trim;
mod intake;
mod locate;
mod merge;
mod page_ranges;
mod pipeline;
mod preview_filter;
mod run;
mod taxonomy;
mod warnings;

pub use run::run;
