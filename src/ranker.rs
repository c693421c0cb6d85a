use std::sync::atomic::{AtomicBool, Ordering};

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace};

use crate::distance::{compute_distances, DistanceTriple};
use crate::error::{Error, Result};
use crate::vector::{CandidateRecord, FeatureVector};

pub const DEFAULT_TOP_K: usize = 10;
/// Size of the short list shown for hand-built profiles.
pub const HEAD_K: usize = 5;
/// Pools at least this large are scored on the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 2048;

/// The reference point a pool is ranked against.
#[derive(Clone, Debug, PartialEq)]
pub struct Seed {
    pub features: FeatureVector,
    /// Only set when the seed came from a pool; used by `exclude_self`.
    pub track_id: Option<String>,
}

impl Seed {
    pub fn from_profile(features: FeatureVector) -> Self {
        Seed { features, track_id: None }
    }
}

impl From<&CandidateRecord> for Seed {
    fn from(record: &CandidateRecord) -> Self {
        Seed {
            features: record.features,
            track_id: record.track_id.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RankOptions {
    pub k: usize,
    /// Skip candidates whose `track_id` equals the seed's. Off by default,
    /// so a seed present in its own pool ranks first.
    pub exclude_self: bool,
    pub parallel_threshold: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        RankOptions {
            k: DEFAULT_TOP_K,
            exclude_self: false,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

/// One candidate with its distances to the seed. Lives only as long as the
/// borrowed pool; nothing is written back into it.
#[derive(Clone, Debug, Serialize)]
pub struct RankedCandidate<'a> {
    /// Position in the input pool.
    pub index: usize,
    pub record: &'a CandidateRecord,
    pub distances: DistanceTriple,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub track_name: String,
    pub artist_name: String,
}

impl From<&RankedCandidate<'_>> for Recommendation {
    fn from(ranked: &RankedCandidate<'_>) -> Self {
        Recommendation {
            track_name: ranked.record.track_name.clone(),
            artist_name: ranked.record.artist_name.clone(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Ranker {
    options: RankOptions,
}

impl Ranker {
    pub fn new(options: RankOptions) -> Self {
        Ranker { options }
    }

    pub fn options(&self) -> &RankOptions {
        &self.options
    }

    /// Score every eligible candidate against `seed`, order by cosine
    /// distance and keep the first `k`.
    ///
    /// The sort is stable and cosine distance is the only key: candidates at
    /// equal distance keep their pool order. Euclidean and Manhattan are
    /// reported but never affect the order.
    pub fn rank<'a>(
        &self,
        seed: &Seed,
        pool: &'a [CandidateRecord],
    ) -> Result<Vec<RankedCandidate<'a>>> {
        self.rank_inner(seed, pool, None)
    }

    /// Like [`Ranker::rank`], but gives up with [`Error::Cancelled`] once
    /// `cancel` is set.
    pub fn rank_cancellable<'a>(
        &self,
        seed: &Seed,
        pool: &'a [CandidateRecord],
        cancel: &AtomicBool,
    ) -> Result<Vec<RankedCandidate<'a>>> {
        self.rank_inner(seed, pool, Some(cancel))
    }

    pub fn recommend(&self, seed: &Seed, pool: &[CandidateRecord]) -> Result<Vec<Recommendation>> {
        Ok(self
            .rank(seed, pool)?
            .iter()
            .map(Recommendation::from)
            .collect())
    }

    fn rank_inner<'a>(
        &self,
        seed: &Seed,
        pool: &'a [CandidateRecord],
        cancel: Option<&AtomicBool>,
    ) -> Result<Vec<RankedCandidate<'a>>> {
        if pool.is_empty() {
            return Err(Error::EmptyPool);
        }

        let excluded = |record: &CandidateRecord| {
            self.options.exclude_self
                && seed.track_id.is_some()
                && record.track_id == seed.track_id
        };

        let score = |(index, record): (usize, &'a CandidateRecord)| {
            if excluded(record) {
                return None;
            }
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Some(Err(Error::Cancelled));
            }
            let scored = compute_distances(&seed.features, &record.features).map(|distances| {
                trace!(index, cosine = distances.cosine, "scored candidate");
                RankedCandidate { index, record, distances }
            });
            Some(scored)
        };

        // Indexed collect keeps pool order on both paths, so the stable sort
        // below sees identical input either way.
        let parallel = pool.len() >= self.options.parallel_threshold;
        let mut ranked: Vec<RankedCandidate<'a>> = if parallel {
            debug!(candidates = pool.len(), "scoring pool in parallel");
            pool.par_iter()
                .enumerate()
                .filter_map(score)
                .collect::<Result<_>>()?
        } else {
            pool.iter()
                .enumerate()
                .filter_map(score)
                .collect::<Result<_>>()?
        };

        ranked.sort_by_key(|r| OrderedFloat(r.distances.cosine));
        ranked.truncate(self.options.k);

        debug!(
            pool = pool.len(),
            returned = ranked.len(),
            k = self.options.k,
            exclude_self = self.options.exclude_self,
            "ranked candidate pool"
        );
        Ok(ranked)
    }
}

/// Rank `pool` against a feature profile with default options and the given `k`.
pub fn recommend(
    seed: &FeatureVector,
    pool: &[CandidateRecord],
    k: usize,
) -> Result<Vec<Recommendation>> {
    let ranker = Ranker::new(RankOptions {
        k,
        ..RankOptions::default()
    });
    ranker.recommend(&Seed::from_profile(*seed), pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: [f64; 9]) -> FeatureVector {
        FeatureVector::new(values).unwrap()
    }

    fn seed_vector() -> FeatureVector {
        vector([0.8, 0.7, -5.0, 0.05, 0.1, 0.0, 0.2, 0.9, 120.0])
    }

    /// The seed's own track plus nine that drift further away.
    fn pool() -> Vec<CandidateRecord> {
        let base = seed_vector();
        let mut out = vec![CandidateRecord::new("Gento", "SB19", base).with_track_id("t0")];
        for i in 1..10 {
            let step = i as f64;
            let mut values = [0.0; 9];
            values.copy_from_slice(base.as_slice());
            values[2] -= 2.0 * step;
            values[5] += 0.1 * step;
            values[8] -= 6.0 * step;
            values[0] = 0.8 - 0.05 * step;
            out.push(
                CandidateRecord::new(format!("Track {i}"), "Various", vector(values))
                    .with_track_id(format!("t{i}")),
            );
        }
        out
    }

    #[test]
    fn seed_itself_ranks_first() {
        let top = recommend(&seed_vector(), &pool(), 1).unwrap();
        assert_eq!(
            top,
            vec![Recommendation {
                track_name: "Gento".into(),
                artist_name: "SB19".into()
            }]
        );
    }

    #[test]
    fn empty_pool_is_an_error() {
        assert!(matches!(recommend(&seed_vector(), &[], 10), Err(Error::EmptyPool)));
    }

    #[test]
    fn result_size_is_min_of_k_and_pool() {
        let pool = pool();
        for k in [0, 1, 5, 10, 25] {
            assert_eq!(recommend(&seed_vector(), &pool, k).unwrap().len(), k.min(pool.len()));
        }
    }

    #[test]
    fn results_are_sorted_by_cosine() {
        let pool = pool();
        let ranked = Ranker::default()
            .rank(&Seed::from_profile(seed_vector()), &pool)
            .unwrap();
        assert!(ranked
            .windows(2)
            .all(|w| w[0].distances.cosine <= w[1].distances.cosine));
    }

    #[test]
    fn ties_keep_pool_order() {
        let v = seed_vector();
        let x = vector([0.5, 0.5, -8.0, 0.1, 0.3, 0.2, 0.1, 0.4, 100.0]);
        let y = vector([0.1, 0.9, -20.0, 0.4, 0.9, 0.8, 0.6, 0.1, 40.0]);
        let pool = vec![
            CandidateRecord::new("x1", "a", x),
            CandidateRecord::new("y", "b", y),
            CandidateRecord::new("self", "c", v),
            CandidateRecord::new("x2", "d", x),
        ];
        let ranked = Ranker::default()
            .rank(&Seed::from_profile(v), &pool)
            .unwrap();
        assert_eq!(ranked[1].distances, ranked[2].distances);
        let indices: Vec<_> = ranked.iter().map(|r| r.index).collect();
        assert_eq!(indices[..3], [2, 0, 3]);
    }

    #[test]
    fn exclude_self_drops_matching_track_id() {
        let pool = pool();
        let seed = Seed::from(&pool[0]);
        let ranker = Ranker::new(RankOptions {
            exclude_self: true,
            ..RankOptions::default()
        });
        let ranked = ranker.rank(&seed, &pool).unwrap();
        assert_eq!(ranked.len(), 9);
        assert!(ranked.iter().all(|r| r.record.track_id.as_deref() != Some("t0")));

        // A profile seed has no identity, so nothing is excluded.
        let profile = Seed::from_profile(pool[0].features);
        assert_eq!(ranker.rank(&profile, &pool).unwrap().len(), 10);
    }

    #[test]
    fn ranking_does_not_touch_the_pool() {
        let pool = pool();
        let before = pool.clone();
        let _ = Ranker::default().rank(&Seed::from(&pool[3]), &pool).unwrap();
        assert_eq!(pool, before);
    }

    #[test]
    fn parallel_matches_sequential() {
        let pool: Vec<_> = pool().into_iter().cycle().take(500).collect();
        let seed = Seed::from_profile(seed_vector());
        let indices = |threshold: usize| -> Vec<usize> {
            Ranker::new(RankOptions {
                k: 50,
                parallel_threshold: threshold,
                ..RankOptions::default()
            })
            .rank(&seed, &pool)
            .unwrap()
            .iter()
            .map(|r| r.index)
            .collect()
        };
        assert_eq!(indices(usize::MAX), indices(1));
    }

    #[test]
    fn ranking_is_deterministic() {
        let pool = pool();
        let first = recommend(&seed_vector(), &pool, 10).unwrap();
        for _ in 0..5 {
            assert_eq!(recommend(&seed_vector(), &pool, 10).unwrap(), first);
        }
    }

    #[test]
    fn cancelled_flag_stops_ranking() {
        let pool = pool();
        let cancel = AtomicBool::new(true);
        let seed = Seed::from_profile(seed_vector());
        let result = Ranker::default().rank_cancellable(&seed, &pool, &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));

        let live = AtomicBool::new(false);
        assert!(Ranker::default().rank_cancellable(&seed, &pool, &live).is_ok());
    }
}
