use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub const FEATURE_COUNT: usize = 9;

/// Largest accepted absolute feature value. Keeps every distance finite.
pub const MAX_FEATURE_MAGNITUDE: f64 = 1e300;

/// Audio features in the order every vector stores them.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "danceability",
    "energy",
    "loudness",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
];

/// A track's audio profile. Every value is finite; the vector cannot be
/// changed after construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(into = "Map<String, Value>")]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Result<Self> {
        for (name, value) in FEATURE_NAMES.iter().zip(values.iter()) {
            if !value.is_finite() {
                return Err(Error::malformed(*name, format!("is not finite ({value})")));
            }
            if value.abs() > MAX_FEATURE_MAGNITUDE {
                return Err(Error::malformed(*name, format!("is out of range ({value})")));
            }
        }
        Ok(FeatureVector { values })
    }

    /// Read the nine features out of a row object. Keys other than the
    /// feature names are ignored.
    pub fn from_row(row: &Map<String, Value>) -> Result<Self> {
        let mut values = [0.0; FEATURE_COUNT];
        for (slot, name) in values.iter_mut().zip(FEATURE_NAMES) {
            *slot = match row.get(name) {
                None | Some(Value::Null) => return Err(Error::malformed(name, "is missing")),
                Some(Value::Number(n)) => n
                    .as_f64()
                    .ok_or_else(|| Error::malformed(name, "is not representable as f64"))?,
                Some(other) => {
                    return Err(Error::malformed(name, format!("is not numeric ({other})")))
                }
            };
        }
        Self::new(values)
    }

    /// Build from user-supplied `(name, value)` pairs, one per feature.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut values: [Option<f64>; FEATURE_COUNT] = [None; FEATURE_COUNT];
        for (name, value) in pairs {
            let idx = feature_index(name)
                .ok_or_else(|| Error::malformed(name, "is not a known feature"))?;
            if values[idx].replace(value).is_some() {
                return Err(Error::malformed(name, "was given more than once"));
            }
        }

        let mut out = [0.0; FEATURE_COUNT];
        for (i, value) in values.into_iter().enumerate() {
            out[i] = value.ok_or_else(|| Error::malformed(FEATURE_NAMES[i], "is missing"))?;
        }
        Self::new(out)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }
}

impl From<FeatureVector> for Map<String, Value> {
    fn from(vector: FeatureVector) -> Self {
        vector
            .iter()
            .map(|(name, value)| (name.to_string(), Value::from(value)))
            .collect()
    }
}

pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}

/// A track in a candidate pool: identity plus its feature vector.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateRecord {
    pub track_name: String,
    pub artist_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    #[serde(flatten)]
    pub features: FeatureVector,
}

impl CandidateRecord {
    pub fn new(
        track_name: impl Into<String>,
        artist_name: impl Into<String>,
        features: FeatureVector,
    ) -> Self {
        CandidateRecord {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            track_id: None,
            features,
        }
    }

    pub fn with_track_id(mut self, track_id: impl Into<String>) -> Self {
        self.track_id = Some(track_id.into());
        self
    }

    pub fn from_row(row: &Map<String, Value>) -> Result<Self> {
        let text = |key: &str| match row.get(key) {
            Some(Value::String(s)) => Ok(Some(s.clone())),
            None | Some(Value::Null) => Ok(None),
            Some(other) => Err(Error::malformed(key, format!("is not a string ({other})"))),
        };

        let track_name =
            text("track_name")?.ok_or_else(|| Error::malformed("track_name", "is missing"))?;
        let artist_name =
            text("artist_name")?.ok_or_else(|| Error::malformed("artist_name", "is missing"))?;
        let track_id = text("track_id")?;
        let features = FeatureVector::from_row(row)?;

        Ok(CandidateRecord {
            track_name,
            artist_name,
            track_id,
            features,
        })
    }
}

impl<'de> Deserialize<'de> for CandidateRecord {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let row = Map::deserialize(deserializer)?;
        CandidateRecord::from_row(&row).map_err(serde::de::Error::custom)
    }
}
