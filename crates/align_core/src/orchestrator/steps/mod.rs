//! Pipeline step implementations.
//!
//! Each step handles one stage of an alignment run.

mod apply;
mod collect;
mod detect;
mod gap_fill;
mod matching;

pub use apply::ApplyStep;
pub use collect::CollectStep;
pub use detect::DetectStep;
pub use gap_fill::GapFillStep;
pub use matching::MatchStep;
