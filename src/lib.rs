mod error;
pub mod distance;
pub mod pool;
pub mod ranker;
pub mod vector;

pub use distance::{
    compute_distances, compute_distances_raw, CosineDistance, DistanceCalculator, DistanceTriple,
    EuclideanDistance, ManhattanDistance,
};
pub use error::{Error, Result};
pub use pool::Pool;
pub use ranker::{recommend, RankOptions, RankedCandidate, Ranker, Recommendation, Seed};
pub use vector::{CandidateRecord, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
