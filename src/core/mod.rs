// Core algorithm exports
pub mod overlap;
pub mod ranker;
pub mod router;
pub mod scoring;
pub mod selector;

pub use overlap::availability_overlap_hours;
pub use ranker::{rank_candidates, ScoredCandidate};
pub use router::Router;
pub use scoring::{jaccard, score_worker};
pub use selector::{RandomRequesterSelection, RequesterSelector};
