pub mod interleave;
pub mod reconcile;
