mod markers;
mod run;
mod solution_groups;
#[cfg(test)]
mod tests;

pub use run::run;
