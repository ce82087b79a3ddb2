//! Runtime configuration for exchange runs.
//!
//! Configuration is layered: defaults, then an optional YAML file, then
//! `MHSM_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::nodata::{NodataConfig, NodataMismatchPolicy};
use crate::{ExchangeError, ExchangeResult};

/// Strategy used to relate triangles and pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MappingMethod {
    /// Exact triangle/pixel overlap areas.
    #[default]
    Surface,
    /// Each triangle goes to the pixel holding its centroid.
    Barycenter,
}

impl MappingMethod {
    /// Parse from string (case-insensitive). Unknown values fall back to `Surface`.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "barycenter" | "barycentre" | "centroid" => Self::Barycenter,
            _ => Self::Surface,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Surface => "surface",
            Self::Barycenter => "barycenter",
        }
    }
}

impl std::fmt::Display for MappingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the mesh is placed over the grid before mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMode {
    /// Translate the mesh so both bounding-box centers coincide.
    #[default]
    BoundingBoxCenter,
    /// Use mesh coordinates as they are.
    None,
}

impl AlignmentMode {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" | "off" | "false" => Self::None,
            _ => Self::BoundingBoxCenter,
        }
    }
}

/// Averaging used when pixels are reduced onto a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriangleWeighting {
    /// Plain mean of the valid pixels.
    #[default]
    Unweighted,
    /// Mean weighted by the overlap of each pixel with the triangle.
    AreaWeighted,
}

impl TriangleWeighting {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "area" | "area_weighted" | "weighted" => Self::AreaWeighted,
            _ => Self::Unweighted,
        }
    }
}

/// Reduction applied to the triangles that overlap one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PixelReducer {
    /// Unweighted mean of the valid triangle values.
    #[default]
    Mean,
    /// Mean weighted by overlap area.
    AreaWeightedMean,
    Median,
    Min,
    Max,
    Sum,
    /// First valid value in global triangle order.
    First,
    /// Number of overlapping triangles, valid or not.
    Count,
    /// Most frequent valid value; ties go to the smallest value.
    Mode,
}

impl PixelReducer {
    pub fn from_str(s: &str) -> Option<Self> {
        let reducer = match s.to_lowercase().as_str() {
            "mean" => Self::Mean,
            "area_weighted_mean" | "weighted_mean" | "weighted" => Self::AreaWeightedMean,
            "median" => Self::Median,
            "min" => Self::Min,
            "max" => Self::Max,
            "sum" => Self::Sum,
            "first" => Self::First,
            "count" => Self::Count,
            "mode" => Self::Mode,
            _ => return None,
        };
        Some(reducer)
    }
}

/// How invalid triangle values are written to a `.val` file, which has no
/// sentinel convention of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingValuePolicy {
    /// Write the configured NODATA sentinel; read back as invalid.
    #[default]
    Nodata,
    /// Write `0`, as the legacy SM tooling expects.
    Zero,
    /// Refuse to write a file containing invalid values.
    Reject,
}

impl MissingValuePolicy {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "zero" | "0" => Self::Zero,
            "reject" | "error" => Self::Reject,
            _ => Self::Nodata,
        }
    }
}

/// Mapping engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub method: MappingMethod,
    pub alignment: AlignmentMode,
    /// Spread per-triangle work over the rayon pool.
    pub parallel: bool,
    /// Maximum number of mappings kept in memory; 0 disables caching.
    pub cache_capacity: usize,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            method: MappingMethod::Surface,
            alignment: AlignmentMode::BoundingBoxCenter,
            parallel: true,
            cache_capacity: 8,
        }
    }
}

/// Aggregation settings for both directions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub triangle_weighting: TriangleWeighting,
    pub pixel_reducer: PixelReducer,
    /// When set, raster cells outside mean ± k·std are dropped before MH→SM.
    pub outlier_sigma: Option<f64>,
}

/// `.val` serialization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValConfig {
    /// Decimal places written per value.
    pub decimals: usize,
    pub missing_values: MissingValuePolicy,
}

impl Default for ValConfig {
    fn default() -> Self {
        Self {
            decimals: 6,
            missing_values: MissingValuePolicy::Nodata,
        }
    }
}

/// Comparator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Allowed corner drift, as a fraction of the cell size.
    pub corner_tolerance: f64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            corner_tolerance: 1e-6,
        }
    }
}

/// Top-level configuration threaded through every codec and pipeline call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub nodata: NodataConfig,
    pub mapping: MappingConfig,
    pub aggregation: AggregationConfig,
    pub val: ValConfig,
    pub compare: CompareConfig,
}

impl ExchangeConfig {
    /// Defaults overridden by `MHSM_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Parse a YAML document. Missing sections keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> ExchangeResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ExchangeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ExchangeError::io(path, e))?;
        Self::from_yaml_str(&text)
    }

    /// Apply `MHSM_*` environment variables on top of this configuration.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("MHSM_NODATA") {
            if let Ok(v) = val.parse() {
                self.nodata.value = v;
            }
        }

        if let Ok(val) = std::env::var("MHSM_NODATA_POLICY") {
            self.nodata.mismatch_policy = NodataMismatchPolicy::from_str(&val);
        }

        if let Ok(val) = std::env::var("MHSM_MAPPING_METHOD") {
            self.mapping.method = MappingMethod::from_str(&val);
        }

        if let Ok(val) = std::env::var("MHSM_ALIGNMENT") {
            self.mapping.alignment = AlignmentMode::from_str(&val);
        }

        if let Ok(val) = std::env::var("MHSM_PARALLEL") {
            self.mapping.parallel = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("MHSM_CACHE_CAPACITY") {
            if let Ok(n) = val.parse() {
                self.mapping.cache_capacity = n;
            }
        }

        if let Ok(val) = std::env::var("MHSM_TRIANGLE_WEIGHTING") {
            self.aggregation.triangle_weighting = TriangleWeighting::from_str(&val);
        }

        if let Ok(val) = std::env::var("MHSM_PIXEL_REDUCER") {
            if let Some(reducer) = PixelReducer::from_str(&val) {
                self.aggregation.pixel_reducer = reducer;
            }
        }

        if let Ok(val) = std::env::var("MHSM_OUTLIER_SIGMA") {
            self.aggregation.outlier_sigma = val.parse().ok();
        }

        if let Ok(val) = std::env::var("MHSM_VAL_DECIMALS") {
            if let Ok(n) = val.parse() {
                self.val.decimals = n;
            }
        }

        if let Ok(val) = std::env::var("MHSM_MISSING_VALUES") {
            self.val.missing_values = MissingValuePolicy::from_str(&val);
        }

        if let Ok(val) = std::env::var("MHSM_CORNER_TOLERANCE") {
            if let Ok(v) = val.parse() {
                self.compare.corner_tolerance = v;
            }
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ExchangeResult<()> {
        if self.nodata.value.is_infinite() {
            return Err(ExchangeError::InvalidConfig(
                "nodata sentinel must be finite or NaN".to_string(),
            ));
        }

        if let Some(k) = self.aggregation.outlier_sigma {
            if !(k.is_finite() && k > 0.0) {
                return Err(ExchangeError::InvalidConfig(format!(
                    "outlier_sigma must be > 0, got {}",
                    k
                )));
            }
        }

        if self.val.decimals > 17 {
            return Err(ExchangeError::InvalidConfig(
                "val.decimals must be <= 17".to_string(),
            ));
        }

        if !(self.compare.corner_tolerance.is_finite() && self.compare.corner_tolerance >= 0.0) {
            return Err(ExchangeError::InvalidConfig(
                "compare.corner_tolerance must be >= 0".to_string(),
            ));
        }

        Ok(())
    }
}
