//! Incrementally trainable classifiers over fixed-point features.
//!
//! Modules:
//! - `features`: encoded input (dense, sparse, binary) and its validation
//! - `store`: dense and sparse per-feature storage
//! - `perceptron`: binary and one-vs-rest perceptron
//! - `centroid`: nearest-centroid classifier with cached magnitudes
//! - `naive_bayes`: multinomial naive Bayes with integer log2 scoring
//! - `classifier`: the tagged engine dispatching to each variant
//! - `serde_canon`: canonical JSON hashing for model fingerprints

pub mod centroid;
pub mod classifier;
pub mod errors;
pub mod features;
pub mod naive_bayes;
pub mod perceptron;
pub mod serde_canon;
pub mod store;

pub use centroid::{Centroid, NearestCentroid};
pub use classifier::Classifier;
pub use errors::{ClassifierError, Result};
pub use features::{Entries, Features};
pub use naive_bayes::NaiveBayes;
pub use perceptron::{LinearUnit, Perceptron};
pub use store::FeatureStore;

/// Class names must be non-empty and unique; index is the class id.
pub(crate) fn ensure_unique_classes(classifications: &[String]) -> Result<()> {
    if classifications.is_empty() {
        return Err(ClassifierError::InvalidParameters(
            "at least one class is required".into(),
        ));
    }
    for (index, name) in classifications.iter().enumerate() {
        ensure_new_class(&classifications[..index], name)?;
    }
    Ok(())
}

/// Reject `name` if it is empty or already present.
pub(crate) fn ensure_new_class(existing: &[String], name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ClassifierError::InvalidParameters(
            "class name must not be empty".into(),
        ));
    }
    match existing.iter().position(|c| c == name) {
        Some(index) => Err(ClassifierError::DuplicateClass {
            name: name.to_string(),
            index: index as u64,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_point_at_first_occurrence() {
        let names = vec!["A".to_string(), "B".to_string(), "A".to_string()];
        assert_eq!(
            ensure_unique_classes(&names).unwrap_err(),
            ClassifierError::DuplicateClass { name: "A".into(), index: 0 }
        );
        assert!(ensure_unique_classes(&[]).is_err());
        assert!(ensure_new_class(&names[..2], "").is_err());
    }
}
