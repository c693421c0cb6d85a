//! Candidate pools loaded from JSON files.
//!
//! A pool file is a JSON array of row objects, one per track:
//!
//! ```json
//! [{"track_name": "Gento", "artist_name": "SB19", "track_id": "3kq...",
//!   "danceability": 0.8, "energy": 0.7, "loudness": -5.0, "speechiness": 0.05,
//!   "acousticness": 0.1, "instrumentalness": 0.0, "liveness": 0.2,
//!   "valence": 0.9, "tempo": 120.0}]
//! ```
//!
//! Keys other than the identity fields and the nine features are ignored.
//! Every row is validated on load, so a pool in memory always holds
//! complete vectors.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::ranker::Seed;
use crate::vector::{CandidateRecord, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};

#[derive(Clone, Debug, PartialEq)]
pub struct Pool {
    label: String,
    records: Vec<CandidateRecord>,
}

impl Pool {
    pub fn new(label: impl Into<String>, records: Vec<CandidateRecord>) -> Self {
        Pool {
            label: label.into(),
            records,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let pool = Self::from_reader(path.display().to_string(), BufReader::new(file))?;
        info!(pool = %pool.label, tracks = pool.len(), "loaded pool");
        Ok(pool)
    }

    pub fn from_reader<R: Read>(label: impl Into<String>, reader: R) -> Result<Self> {
        let rows: Vec<Map<String, Value>> = serde_json::from_reader(reader)?;
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, row)| CandidateRecord::from_row(row).map_err(|e| e.at_row(i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Pool::new(label, records))
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.records)?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Exact, case-sensitive lookup by track name. The first match wins.
    pub fn find_by_name(&self, name: &str) -> Result<Seed> {
        let record = self
            .records
            .iter()
            .find(|r| r.track_name == name)
            .ok_or_else(|| Error::SeedNotFound {
                name: name.to_string(),
            })?;
        debug!(pool = %self.label, track = name, "resolved seed");
        Ok(Seed::from(record))
    }

    pub fn feature_means(&self) -> Result<[f64; FEATURE_COUNT]> {
        if self.is_empty() {
            return Err(Error::EmptyPool);
        }
        let mut sums = [0.0; FEATURE_COUNT];
        for record in &self.records {
            for (sum, value) in sums.iter_mut().zip(record.features.as_slice()) {
                *sum += value;
            }
        }
        let n = self.len() as f64;
        Ok(sums.map(|sum| sum / n))
    }

    pub fn feature_maxima(&self) -> Result<[f64; FEATURE_COUNT]> {
        if self.is_empty() {
            return Err(Error::EmptyPool);
        }
        let mut maxima = [f64::NEG_INFINITY; FEATURE_COUNT];
        for record in &self.records {
            for (max, value) in maxima.iter_mut().zip(record.features.as_slice()) {
                *max = max.max(*value);
            }
        }
        Ok(maxima)
    }

    /// The allowed range per feature for a hand-built profile: zero up to the
    /// pool maximum rounded to the nearest integer.
    pub fn profile_bounds(&self) -> Result<[(f64, f64); FEATURE_COUNT]> {
        Ok(self.feature_maxima()?.map(|max| (0.0, max.round())))
    }

    /// The pool's mean track, used as the starting point for a profile.
    pub fn default_profile(&self) -> Result<FeatureVector> {
        FeatureVector::new(self.feature_means()?)
    }

    /// Fill in a profile from user overrides, defaulting each missing feature
    /// to the pool mean.
    pub fn profile_with(&self, overrides: &[(&str, f64)]) -> Result<FeatureVector> {
        for (name, _) in overrides {
            if !FEATURE_NAMES.contains(name) {
                return Err(Error::malformed(*name, "is not a known feature"));
            }
        }
        let means = self.feature_means()?;
        let values = FEATURE_NAMES.iter().zip(means).map(|(name, mean)| {
            // last override for a feature wins
            let value = overrides
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .map_or(mean, |(_, v)| *v);
            (*name, value)
        });
        FeatureVector::from_pairs(values)
    }
}
