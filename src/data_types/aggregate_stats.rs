use serde::{Serialize, Serializer};

/// Value written in place of an allele fraction or depth that no caller reported
pub const UNKNOWN_SENTINEL: i64 = -1;

/// Cross-caller summary statistics for one annotated variant.
/// Each value is None when no contributing caller reported it; serialized as `UNKNOWN_SENTINEL`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AggregateStatistics {
    /// Maximum allele fraction across contributing callers
    #[serde(rename = "max_som_aaf", serialize_with = "serialize_fraction")]
    max_allele_fraction: Option<f64>,
    /// Minimum depth across contributing callers
    #[serde(serialize_with = "serialize_depth")]
    min_depth: Option<u64>,
    /// Maximum depth across contributing callers
    #[serde(serialize_with = "serialize_depth")]
    max_depth: Option<u64>
}

impl AggregateStatistics {
    /// Folds one caller's measurements into the running statistics.
    /// Absent measurements leave the corresponding statistic untouched.
    /// # Arguments
    /// * `allele_fraction` - the caller's allele fraction, if reported
    /// * `depth` - the caller's depth, if reported
    pub fn add_observation(&mut self, allele_fraction: Option<f64>, depth: Option<u64>) {
        if let Some(af) = allele_fraction {
            self.max_allele_fraction = Some(match self.max_allele_fraction {
                Some(current) => current.max(af),
                None => af
            });
        }

        if let Some(dp) = depth {
            self.min_depth = Some(self.min_depth.map_or(dp, |current| current.min(dp)));
            self.max_depth = Some(self.max_depth.map_or(dp, |current| current.max(dp)));
        }
    }

    // getters
    pub fn max_allele_fraction(&self) -> Option<f64> {
        self.max_allele_fraction
    }

    pub fn min_depth(&self) -> Option<u64> {
        self.min_depth
    }

    pub fn max_depth(&self) -> Option<u64> {
        self.max_depth
    }
}

fn serialize_fraction<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_f64(UNKNOWN_SENTINEL as f64)
    }
}

fn serialize_depth<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_i64(i64::try_from(*v).unwrap_or(i64::MAX)),
        None => serializer.serialize_i64(UNKNOWN_SENTINEL)
    }
}
