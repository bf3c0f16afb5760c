//! One engine over every classifier variant.

use decai_fixed::Fixed;
use decai_types::ClassId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::centroid::NearestCentroid;
use crate::errors::{ClassifierError, Result};
use crate::features::Features;
use crate::naive_bayes::NaiveBayes;
use crate::perceptron::Perceptron;
use crate::serde_canon::hash_canonical_hex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classifier {
    Perceptron(Perceptron),
    NearestCentroid(NearestCentroid),
    NaiveBayes(NaiveBayes),
}

impl From<Perceptron> for Classifier {
    fn from(model: Perceptron) -> Self {
        Classifier::Perceptron(model)
    }
}

impl From<NearestCentroid> for Classifier {
    fn from(model: NearestCentroid) -> Self {
        Classifier::NearestCentroid(model)
    }
}

impl From<NaiveBayes> for Classifier {
    fn from(model: NaiveBayes) -> Self {
        Classifier::NaiveBayes(model)
    }
}

impl Classifier {
    pub fn kind(&self) -> &'static str {
        match self {
            Classifier::Perceptron(_) => "perceptron",
            Classifier::NearestCentroid(_) => "nearest_centroid",
            Classifier::NaiveBayes(_) => "naive_bayes",
        }
    }

    fn unsupported(&self, operation: &'static str) -> ClassifierError {
        ClassifierError::UnsupportedOperation {
            operation,
            variant: self.kind(),
        }
    }

    pub fn classifications(&self) -> &[String] {
        match self {
            Classifier::Perceptron(m) => m.classifications(),
            Classifier::NearestCentroid(m) => m.classifications(),
            Classifier::NaiveBayes(m) => m.classifications(),
        }
    }

    pub fn num_classes(&self) -> usize {
        self.classifications().len()
    }

    /// Index of a class by name.
    pub fn class_index(&self, name: &str) -> Option<ClassId> {
        self.classifications()
            .iter()
            .position(|c| c == name)
            .map(|i| i as ClassId)
    }

    pub fn dimension(&self) -> usize {
        match self {
            Classifier::Perceptron(m) => m.dimension(),
            Classifier::NearestCentroid(m) => m.dimension(),
            Classifier::NaiveBayes(m) => m.dimension(),
        }
    }

    pub fn predict(&self, data: &Features) -> Result<ClassId> {
        match self {
            Classifier::Perceptron(m) => m.predict(data),
            Classifier::NearestCentroid(m) => m.predict(data),
            Classifier::NaiveBayes(m) => m.predict(data),
        }
    }

    /// Apply one training step. On error nothing has changed.
    pub fn update(&mut self, data: &Features, classification: ClassId) -> Result<()> {
        match self {
            Classifier::Perceptron(m) => m.update(data, classification),
            Classifier::NearestCentroid(m) => m.update(data, classification),
            Classifier::NaiveBayes(m) => m.update(data, classification),
        }
    }

    /// Append a class. `sample_count` seeds the centroid weight or the naive
    /// Bayes prior; a perceptron ignores it.
    pub fn add_class(&mut self, name: String, sample_count: u64) -> Result<ClassId> {
        let class = match self {
            Classifier::Perceptron(m) => m.add_class(name)?,
            Classifier::NearestCentroid(m) => m.add_class(name, sample_count)?,
            Classifier::NaiveBayes(m) => m.add_class(name, sample_count)?,
        };
        info!(target: "classifier", kind = self.kind(), class, "class added");
        Ok(class)
    }

    pub fn extend_weights(&mut self, unit: usize, start: usize, chunk: &[Fixed]) -> Result<()> {
        match self {
            Classifier::Perceptron(m) => m.extend_weights(unit, start, chunk),
            _ => Err(self.unsupported("extend_weights")),
        }
    }

    pub fn extend_sparse_weights(&mut self, unit: usize, chunk: &[(u32, Fixed)]) -> Result<()> {
        match self {
            Classifier::Perceptron(m) => m.extend_sparse_weights(unit, chunk),
            _ => Err(self.unsupported("extend_sparse_weights")),
        }
    }

    pub fn set_intercept(&mut self, unit: usize, intercept: Fixed) -> Result<()> {
        match self {
            Classifier::Perceptron(m) => m.set_intercept(unit, intercept),
            _ => Err(self.unsupported("set_intercept")),
        }
    }

    pub fn extend_centroid(&mut self, class: ClassId, start: usize, chunk: &[Fixed]) -> Result<()> {
        match self {
            Classifier::NearestCentroid(m) => m.extend_centroid(class, start, chunk),
            _ => Err(self.unsupported("extend_centroid")),
        }
    }

    pub fn extend_sparse_centroid(&mut self, class: ClassId, chunk: &[(u32, Fixed)]) -> Result<()> {
        match self {
            Classifier::NearestCentroid(m) => m.extend_sparse_centroid(class, chunk),
            _ => Err(self.unsupported("extend_sparse_centroid")),
        }
    }

    pub fn extend_feature_counts(&mut self, class: ClassId, chunk: &[(u32, u64)]) -> Result<()> {
        match self {
            Classifier::NaiveBayes(m) => m.extend_feature_counts(class, chunk),
            _ => Err(self.unsupported("extend_feature_counts")),
        }
    }

    /// Consistency check run once chunked growth is complete.
    pub fn validate(&self) -> Result<()> {
        match self {
            Classifier::Perceptron(m) => m.validate(),
            Classifier::NearestCentroid(m) => m.validate(),
            Classifier::NaiveBayes(m) => m.validate(),
        }
    }

    /// BLAKE3 fingerprint of the canonical model encoding.
    pub fn model_hash(&self) -> Result<String> {
        hash_canonical_hex(self)
    }
}
