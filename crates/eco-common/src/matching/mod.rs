pub mod distance;
pub mod ranking;
pub mod scoring;
pub mod similarity;
pub mod weights;

pub use distance::distance_km;
pub use scoring::{MatchScorer, ProjectScore, explain_match, score_project};
