use serde::Serialize;

use crate::error::{Error, Result};
use crate::vector::{FeatureVector, MAX_FEATURE_MAGNITUDE};

pub trait DistanceCalculator: Send + Sync {
    fn name(&self) -> &'static str;

    fn calculate(&self, a: &[f64], b: &[f64]) -> Result<f64>;
}

fn check_inputs(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    for (i, x) in a.iter().chain(b.iter()).enumerate() {
        if !x.is_finite() || x.abs() > MAX_FEATURE_MAGNITUDE {
            let field = format!("component {}", i % a.len());
            return Err(Error::malformed(field, format!("is out of range ({x})")));
        }
    }
    Ok(())
}

/// Largest absolute component across both slices; 0 only if all are zero.
fn max_abs(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, |m, x| m.max(x.abs()))
}

// Differences are taken on inputs scaled into [-1, 1] and the scale is
// applied once at the end, so squares neither overflow nor underflow.

pub struct EuclideanDistance;

impl DistanceCalculator for EuclideanDistance {
    fn name(&self) -> &'static str {
        "euclidean"
    }

    fn calculate(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        check_inputs(a, b)?;
        let scale = max_abs(a.iter().chain(b.iter()).copied());
        if scale == 0.0 {
            return Ok(0.0);
        }
        let squares = a.iter().zip(b.iter()).map(|(x, y)| (x / scale - y / scale).powi(2));
        Ok(scale * squares.sum::<f64>().sqrt())
    }
}

pub struct ManhattanDistance;

impl DistanceCalculator for ManhattanDistance {
    fn name(&self) -> &'static str {
        "manhattan"
    }

    fn calculate(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        check_inputs(a, b)?;
        let scale = max_abs(a.iter().chain(b.iter()).copied());
        if scale == 0.0 {
            return Ok(0.0);
        }
        let diffs = a.iter().zip(b.iter()).map(|(x, y)| (x / scale - y / scale).abs());
        Ok(scale * diffs.sum::<f64>())
    }
}

/// `1 - cos(a, b)`.
///
/// A zero-magnitude vector has no direction, so its similarity to anything
/// is taken as 0 and the distance is 1. Each vector is divided by its own
/// largest component first, so any nonzero vector has a norm of at least 1.
/// Similarity is clamped to [-1, 1] to absorb rounding, which keeps the
/// distance inside [0, 2].
pub struct CosineDistance;

impl DistanceCalculator for CosineDistance {
    fn name(&self) -> &'static str {
        "cosine"
    }

    fn calculate(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        check_inputs(a, b)?;
        let scale_a = max_abs(a.iter().copied());
        let scale_b = max_abs(b.iter().copied());
        if scale_a == 0.0 || scale_b == 0.0 {
            return Ok(1.0);
        }

        let mut dot = 0.0;
        let mut norm_a = 0.0;
        let mut norm_b = 0.0;
        for (x, y) in a.iter().zip(b.iter()) {
            let (x, y) = (x / scale_a, y / scale_b);
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }
        let similarity = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
        Ok(1.0 - similarity)
    }
}

/// The three distances between a seed and one candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DistanceTriple {
    pub euclidean: f64,
    pub manhattan: f64,
    pub cosine: f64,
}

pub fn compute_distances_raw(a: &[f64], b: &[f64]) -> Result<DistanceTriple> {
    Ok(DistanceTriple {
        euclidean: EuclideanDistance.calculate(a, b)?,
        manhattan: ManhattanDistance.calculate(a, b)?,
        cosine: CosineDistance.calculate(a, b)?,
    })
}

pub fn compute_distances(
    seed: &FeatureVector,
    candidate: &FeatureVector,
) -> Result<DistanceTriple> {
    compute_distances_raw(seed.as_slice(), candidate.as_slice())
}
