//! Two-phase construction of a collaborative trainer.
//!
//! The owner builds the classifier, ledger and incentive mechanism, grows the
//! model through chunked calls, then calls [`Deployment::finish`], which
//! consumes the builder. Once finished, nothing but the trainer's entry points
//! can mutate the components, and no growth operation is left.

use decai_classifier::{
    Centroid, Classifier, FeatureStore, NaiveBayes, NearestCentroid, Perceptron,
};
use decai_data_handler::DataLedger;
use decai_fixed::Fixed;
use decai_incentive::IncentiveMechanism;
use decai_types::{Address, ClassId};
use tracing::{debug, info};

use crate::config::{
    CentroidConfig, ClassifierConfig, DeploymentConfig, MechanismKind, Storage, UnitConfig,
};
use crate::errors::{Result, TrainerError};
use crate::trainer::CollaborativeTrainer;

#[derive(Debug, Clone)]
pub struct Deployment {
    owner: Address,
    name: String,
    description: String,
    classifier: Classifier,
    data_handler: DataLedger,
    incentive: IncentiveMechanism,
    max_chunk_len: Option<usize>,
}

impl Deployment {
    pub fn new(
        owner: Address,
        name: impl Into<String>,
        classifier: Classifier,
        incentive: IncentiveMechanism,
    ) -> Self {
        Self {
            owner,
            name: name.into(),
            description: String::new(),
            classifier,
            data_handler: DataLedger::new(),
            incentive,
            max_chunk_len: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Cap the number of entries each growth call may carry.
    pub fn with_max_chunk_len(mut self, max: usize) -> Self {
        self.max_chunk_len = Some(max);
        self
    }

    /// Build from a validated config, uploading initial values in chunks of
    /// `max_chunk_len`.
    pub fn from_config(config: &DeploymentConfig) -> Result<Self> {
        config.validate()?;
        let params = config.incentive.params();
        let incentive = match config.incentive.mechanism {
            MechanismKind::Points => IncentiveMechanism::points(params),
            MechanismKind::Stakeable => IncentiveMechanism::stakeable(params),
        };
        let mut deployment = Self::new(
            config.owner,
            config.name.clone(),
            empty_classifier(&config.classifier)?,
            incentive,
        )
        .with_description(config.description.clone());
        deployment.max_chunk_len = config.max_chunk_len;
        deployment.upload(&config.classifier)?;
        Ok(deployment)
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Model being built; callers resume interrupted uploads from its state.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn incentive(&self) -> &IncentiveMechanism {
        &self.incentive
    }

    fn check_chunk(&self, len: usize) -> Result<()> {
        match self.max_chunk_len {
            Some(max) if len > max => Err(TrainerError::ChunkTooLarge { len, max }),
            _ => Ok(()),
        }
    }

    pub fn add_class(&mut self, name: impl Into<String>, sample_count: u64) -> Result<ClassId> {
        Ok(self.classifier.add_class(name.into(), sample_count)?)
    }

    pub fn extend_weights(&mut self, unit: usize, start: usize, chunk: &[Fixed]) -> Result<()> {
        self.check_chunk(chunk.len())?;
        self.classifier.extend_weights(unit, start, chunk)?;
        debug!(target: "trainer", unit, start, len = chunk.len(), "weights chunk stored");
        Ok(())
    }

    pub fn extend_sparse_weights(&mut self, unit: usize, chunk: &[(u32, Fixed)]) -> Result<()> {
        self.check_chunk(chunk.len())?;
        Ok(self.classifier.extend_sparse_weights(unit, chunk)?)
    }

    pub fn set_intercept(&mut self, unit: usize, intercept: Fixed) -> Result<()> {
        Ok(self.classifier.set_intercept(unit, intercept)?)
    }

    pub fn extend_centroid(&mut self, class: ClassId, start: usize, chunk: &[Fixed]) -> Result<()> {
        self.check_chunk(chunk.len())?;
        self.classifier.extend_centroid(class, start, chunk)?;
        debug!(target: "trainer", class, start, len = chunk.len(), "centroid chunk stored");
        Ok(())
    }

    pub fn extend_sparse_centroid(&mut self, class: ClassId, chunk: &[(u32, Fixed)]) -> Result<()> {
        self.check_chunk(chunk.len())?;
        Ok(self.classifier.extend_sparse_centroid(class, chunk)?)
    }

    pub fn extend_feature_counts(&mut self, class: ClassId, chunk: &[(u32, u64)]) -> Result<()> {
        self.check_chunk(chunk.len())?;
        Ok(self.classifier.extend_feature_counts(class, chunk)?)
    }

    /// Sample count of a naive Bayes class (its prior weight).
    pub fn set_sample_count(&mut self, class: ClassId, sample_count: u64) -> Result<()> {
        match &mut self.classifier {
            Classifier::NaiveBayes(model) => Ok(model.set_sample_count(class, sample_count)?),
            other => Err(decai_classifier::ClassifierError::UnsupportedOperation {
                operation: "set_sample_count",
                variant: other.kind(),
            }
            .into()),
        }
    }

    fn chunk_size(&self) -> usize {
        self.max_chunk_len.unwrap_or(usize::MAX)
    }

    fn upload(&mut self, config: &ClassifierConfig) -> Result<()> {
        let size = self.chunk_size();
        match config {
            ClassifierConfig::Perceptron { units, .. } => {
                for (index, unit) in units.iter().enumerate() {
                    self.upload_unit(index, unit, size)?;
                }
            }
            ClassifierConfig::NearestCentroid { centroids, .. } => {
                for (class, centroid) in centroids.iter().enumerate() {
                    self.upload_centroid(class as ClassId, centroid, size)?;
                }
            }
            ClassifierConfig::NaiveBayes {
                class_sample_counts,
                feature_counts,
                ..
            } => {
                for (class, count) in class_sample_counts.iter().enumerate() {
                    self.set_sample_count(class as ClassId, *count)?;
                }
                for (class, counts) in feature_counts.iter().enumerate() {
                    for chunk in counts.chunks(size) {
                        self.extend_feature_counts(class as ClassId, chunk)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn upload_unit(&mut self, unit: usize, config: &UnitConfig, size: usize) -> Result<()> {
        for (i, chunk) in config.weights.chunks(size).enumerate() {
            self.extend_weights(unit, i * size, chunk)?;
        }
        for chunk in config.sparse_weights.chunks(size) {
            self.extend_sparse_weights(unit, chunk)?;
        }
        self.set_intercept(unit, config.intercept)
    }

    fn upload_centroid(&mut self, class: ClassId, config: &CentroidConfig, size: usize) -> Result<()> {
        for (i, chunk) in config.values.chunks(size).enumerate() {
            self.extend_centroid(class, i * size, chunk)?;
        }
        for chunk in config.sparse_values.chunks(size) {
            self.extend_sparse_centroid(class, chunk)?;
        }
        Ok(())
    }

    /// Validate the assembled model and hand every component to the trainer.
    pub fn finish(self) -> Result<CollaborativeTrainer> {
        self.classifier.validate()?;
        info!(
            target: "trainer",
            name = %self.name,
            owner = %self.owner,
            classifier = self.classifier.kind(),
            incentive = self.incentive.kind(),
            classes = self.classifier.num_classes(),
            "deployment finalised"
        );
        Ok(CollaborativeTrainer::new(
            self.owner,
            self.name,
            self.description,
            self.classifier,
            self.data_handler,
            self.incentive,
        ))
    }
}

/// Classifier with every class present and all values zero.
fn empty_classifier(config: &ClassifierConfig) -> Result<Classifier> {
    let classifier = match config {
        ClassifierConfig::Perceptron {
            classifications,
            storage,
            dimension,
            learning_rate,
            units,
            feature_indices,
        } => {
            let lens = units.iter().map(|u| u.weights.len());
            let template = zeroed_store(*storage, *dimension, lens);
            let mut model = if classifications.len() == 2 {
                Perceptron::binary(classifications.clone(), template, Fixed::ZERO, *learning_rate)?
            } else {
                Perceptron::multi_class(classifications.clone(), &template, *learning_rate)?
            };
            if let Some(indices) = feature_indices {
                model = model.with_feature_indices(indices.clone());
            }
            Classifier::from(model)
        }
        ClassifierConfig::NearestCentroid {
            classifications,
            storage,
            dimension,
            centroids,
            normalize_input,
        } => {
            let lens = centroids.iter().map(|c| c.values.len());
            let template = zeroed_store(*storage, *dimension, lens);
            let empty = centroids
                .iter()
                .map(|c| Centroid::new(template.clone(), c.sample_count))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            NearestCentroid::new(classifications.clone(), empty)?
                .with_normalized_input(*normalize_input)
                .into()
        }
        ClassifierConfig::NaiveBayes {
            classifications,
            dimension,
            smoothing_factor,
            ..
        } => NaiveBayes::new(classifications.clone(), *dimension, *smoothing_factor)?.into(),
    };
    Ok(classifier)
}

/// Dense zeros sized by the first initial vector (or `dimension`), or an
/// empty sparse store.
fn zeroed_store(
    storage: Storage,
    dimension: Option<u32>,
    mut dense_lens: impl Iterator<Item = usize>,
) -> FeatureStore {
    match storage {
        Storage::Dense => {
            let dim = dense_lens
                .next()
                .or(dimension.map(|d| d as usize))
                .unwrap_or(0);
            FeatureStore::dense(vec![Fixed::ZERO; dim])
        }
        Storage::Sparse => FeatureStore::sparse(dimension.unwrap_or(0)),
    }
}
