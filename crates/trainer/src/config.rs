//! Deployment configuration.
//!
//! Loaded from TOML, or JSON when the file ends in `.json`. Fixed-point
//! values are pre-scaled integers or decimal strings such as `"0.5"`.

use decai_fixed::Fixed;
use decai_incentive::IncentiveParams;
use decai_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::errors::{Result, TrainerError};

/// Everything needed to deploy a collaborative trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub owner: Address,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Largest chunk a single growth call may carry.
    #[serde(default)]
    pub max_chunk_len: Option<usize>,
    pub classifier: ClassifierConfig,
    pub incentive: IncentiveConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Storage {
    #[default]
    Dense,
    Sparse,
}

/// Initial values of one perceptron unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Dense weights, or the dense prefix of sparse storage.
    #[serde(default)]
    pub weights: Vec<Fixed>,
    #[serde(default)]
    pub sparse_weights: Vec<(u32, Fixed)>,
    #[serde(default)]
    pub intercept: Fixed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentroidConfig {
    #[serde(default)]
    pub values: Vec<Fixed>,
    #[serde(default)]
    pub sparse_values: Vec<(u32, Fixed)>,
    #[serde(default)]
    pub sample_count: u64,
}

fn default_smoothing() -> Fixed {
    Fixed::ONE
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifierConfig {
    Perceptron {
        classifications: Vec<String>,
        #[serde(default)]
        storage: Storage,
        /// Required for sparse storage; dense storage takes the weight count.
        #[serde(default)]
        dimension: Option<u32>,
        learning_rate: Fixed,
        /// One unit for two classes, one per class otherwise. Missing units
        /// start at zero.
        #[serde(default)]
        units: Vec<UnitConfig>,
        #[serde(default)]
        feature_indices: Option<Vec<u32>>,
    },
    NearestCentroid {
        classifications: Vec<String>,
        #[serde(default)]
        storage: Storage,
        #[serde(default)]
        dimension: Option<u32>,
        centroids: Vec<CentroidConfig>,
        #[serde(default)]
        normalize_input: bool,
    },
    NaiveBayes {
        classifications: Vec<String>,
        dimension: u32,
        #[serde(default = "default_smoothing")]
        smoothing_factor: Fixed,
        #[serde(default)]
        class_sample_counts: Vec<u64>,
        /// `(feature, count)` pairs per class.
        #[serde(default)]
        feature_counts: Vec<Vec<(u32, u64)>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanismKind {
    Points,
    Stakeable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncentiveConfig {
    pub mechanism: MechanismKind,
    pub refund_wait_time: Timestamp,
    pub owner_claim_wait_time: Timestamp,
    pub any_address_claim_wait_time: Timestamp,
    #[serde(default)]
    pub cost_weight: u64,
}

impl IncentiveConfig {
    pub fn params(&self) -> IncentiveParams {
        IncentiveParams {
            refund_wait_time: self.refund_wait_time,
            owner_claim_wait_time: self.owner_claim_wait_time,
            any_address_claim_wait_time: self.any_address_claim_wait_time,
            cost_weight: Amount::from(self.cost_weight),
        }
    }
}

impl ClassifierConfig {
    pub fn classifications(&self) -> &[String] {
        match self {
            ClassifierConfig::Perceptron { classifications, .. }
            | ClassifierConfig::NearestCentroid { classifications, .. }
            | ClassifierConfig::NaiveBayes { classifications, .. } => classifications,
        }
    }

    fn validate(&self) -> Result<()> {
        let classes = self.classifications();
        if classes.is_empty() {
            return Err(config_error("at least one classification is required"));
        }
        let mut seen = HashSet::new();
        for name in classes {
            if name.is_empty() {
                return Err(config_error("classification names must not be empty"));
            }
            if !seen.insert(name.as_str()) {
                return Err(config_error(format!("duplicate classification {name:?}")));
            }
        }

        match self {
            ClassifierConfig::Perceptron {
                storage,
                dimension,
                units,
                feature_indices,
                ..
            } => {
                if classes.len() < 2 {
                    return Err(config_error("a perceptron needs at least two classes"));
                }
                let expected_units = if classes.len() == 2 { 1 } else { classes.len() };
                if units.len() > expected_units {
                    return Err(config_error(format!(
                        "{} classes take at most {} units, got {}",
                        classes.len(),
                        expected_units,
                        units.len()
                    )));
                }
                let dense_lens = units.iter().map(|u| u.weights.len());
                let dim = check_dimension(*storage, *dimension, dense_lens, "unit weights")?;
                if let Some(indices) = feature_indices {
                    if indices.len() != dim {
                        return Err(config_error(format!(
                            "feature_indices has {} entries for dimension {}",
                            indices.len(),
                            dim
                        )));
                    }
                }
            }
            ClassifierConfig::NearestCentroid {
                storage,
                dimension,
                centroids,
                ..
            } => {
                if centroids.len() != classes.len() {
                    return Err(config_error(format!(
                        "{} classes but {} centroids",
                        classes.len(),
                        centroids.len()
                    )));
                }
                let dense_lens = centroids.iter().map(|c| c.values.len());
                check_dimension(*storage, *dimension, dense_lens, "centroid values")?;
            }
            ClassifierConfig::NaiveBayes {
                dimension,
                smoothing_factor,
                class_sample_counts,
                feature_counts,
                ..
            } => {
                if *dimension == 0 {
                    return Err(config_error("naive bayes dimension must be non-zero"));
                }
                if !smoothing_factor.is_positive() {
                    return Err(config_error(format!(
                        "smoothing_factor must be positive, got {smoothing_factor}"
                    )));
                }
                if class_sample_counts.len() > classes.len() || feature_counts.len() > classes.len()
                {
                    return Err(config_error("more count rows than classifications"));
                }
            }
        }
        Ok(())
    }
}

/// Dense storage takes its dimension from the initial values, which must
/// agree, or from `dimension` when there are none; sparse storage needs an
/// explicit one covering every dense prefix.
fn check_dimension(
    storage: Storage,
    dimension: Option<u32>,
    dense_lens: impl Iterator<Item = usize>,
    what: &str,
) -> Result<usize> {
    let lens: Vec<usize> = dense_lens.collect();
    match storage {
        Storage::Dense => {
            let dim = match (lens.first(), dimension) {
                (Some(first), _) => *first,
                (None, Some(dim)) => dim as usize,
                (None, None) => {
                    return Err(config_error(format!(
                        "{what} are empty and no dimension is given"
                    )))
                }
            };
            if let Some(len) = lens.iter().find(|len| **len != dim) {
                return Err(config_error(format!(
                    "{what} lengths differ: expected {dim}, got {len}"
                )));
            }
            if let Some(declared) = dimension {
                if declared as usize != dim {
                    return Err(config_error(format!(
                        "{what} have {dim} entries but dimension is {declared}"
                    )));
                }
            }
            if dim == 0 {
                return Err(config_error(format!("{what} must not be empty")));
            }
            Ok(dim)
        }
        Storage::Sparse => {
            let dim = dimension
                .ok_or_else(|| config_error("sparse storage needs an explicit dimension"))?
                as usize;
            if let Some(len) = lens.iter().find(|len| **len > dim) {
                return Err(config_error(format!(
                    "{what} prefix of {len} exceeds dimension {dim}"
                )));
            }
            Ok(dim)
        }
    }
}

fn config_error(message: impl Into<String>) -> TrainerError {
    TrainerError::Config(message.into())
}

impl DeploymentConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| config_error(format!("failed to parse TOML: {e}")))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| config_error(format!("failed to parse JSON: {e}")))
    }

    /// Load and validate a deployment file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(target: "trainer", "loading deployment config from {}", path.display());
        let content = std::fs::read_to_string(path)
            .map_err(|e| TrainerError::Io(format!("failed to read {}: {e}", path.display())))?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_toml_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| config_error(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, content)
            .map_err(|e| TrainerError::Io(format!("failed to write {}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(config_error("deployment name must not be empty"));
        }
        if self.max_chunk_len == Some(0) {
            return Err(config_error("max_chunk_len must be positive"));
        }
        self.incentive
            .params()
            .validate()
            .map_err(|e| config_error(e.to_string()))?;
        self.classifier.validate()
    }
}
