//! Encoded feature input.
//!
//! Encoders upstream of the core produce already-scaled integers; this module
//! only validates them against a model's dimension and flattens every input
//! form into sorted `(index, value)` entries.

use decai_fixed::{normalize, Fixed};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::errors::{ClassifierError, Result};
use crate::serde_canon::hash_canonical;

/// One encoded sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Features {
    /// Every feature, in index order.
    Dense(Vec<Fixed>),
    /// `(index, value)` pairs; missing indices are zero.
    Sparse(Vec<(u32, Fixed)>),
    /// Indices of active features, each with value 1.0.
    Binary(Vec<u32>),
}

/// Flattened input: strictly increasing indices, duplicates summed.
pub type Entries = Vec<(u32, Fixed)>;

impl Features {
    /// Number of values carried by this input.
    pub fn len(&self) -> usize {
        match self {
            Features::Dense(v) => v.len(),
            Features::Sparse(v) => v.len(),
            Features::Binary(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// BLAKE3 over the canonical encoding; identifies the sample in the ledger.
    pub fn data_hash(&self) -> Result<[u8; 32]> {
        hash_canonical(self)
    }

    /// Validate against `dimension` and flatten.
    ///
    /// Dense input must have exactly `dimension` values; sparse and binary
    /// indices must be below it.
    pub fn entries(&self, dimension: usize) -> Result<Entries> {
        match self {
            Features::Dense(values) => {
                if values.len() != dimension {
                    return Err(ClassifierError::DimensionMismatch {
                        expected: dimension,
                        actual: values.len(),
                    });
                }
                Ok(values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| !v.is_zero())
                    .map(|(i, v)| (i as u32, *v))
                    .collect())
            }
            Features::Sparse(pairs) => merge(pairs.iter().copied(), dimension),
            Features::Binary(indices) => {
                merge(indices.iter().map(|&i| (i, Fixed::ONE)), dimension)
            }
        }
    }

    /// Select the upstream dimensions listed in `indices`, renumbering them
    /// `0..indices.len()`.
    ///
    /// Dense input must cover every selected index; sparse and binary inputs
    /// silently drop dimensions that are not selected.
    pub fn project(&self, indices: &[u32]) -> Result<Features> {
        match self {
            Features::Dense(values) => {
                let mut projected = Vec::with_capacity(indices.len());
                for &upstream in indices {
                    let value = values.get(upstream as usize).ok_or(
                        ClassifierError::IndexOutOfRange {
                            what: "feature",
                            index: u64::from(upstream),
                            len: values.len() as u64,
                        },
                    )?;
                    projected.push(*value);
                }
                Ok(Features::Dense(projected))
            }
            Features::Sparse(pairs) => Ok(Features::Sparse(select(
                pairs.iter().copied(),
                indices,
            ))),
            Features::Binary(active) => Ok(Features::Sparse(select(
                active.iter().map(|&i| (i, Fixed::ONE)),
                indices,
            ))),
        }
    }
}

fn select(pairs: impl Iterator<Item = (u32, Fixed)>, indices: &[u32]) -> Vec<(u32, Fixed)> {
    let position: HashMap<u32, u32> = indices
        .iter()
        .enumerate()
        .map(|(local, &upstream)| (upstream, local as u32))
        .collect();
    pairs
        .filter_map(|(i, v)| position.get(&i).map(|&local| (local, v)))
        .collect()
}

fn merge(pairs: impl Iterator<Item = (u32, Fixed)>, dimension: usize) -> Result<Entries> {
    let mut merged: BTreeMap<u32, Fixed> = BTreeMap::new();
    for (index, value) in pairs {
        if index as usize >= dimension {
            return Err(ClassifierError::IndexOutOfRange {
                what: "feature",
                index: u64::from(index),
                len: dimension as u64,
            });
        }
        let slot = merged.entry(index).or_insert(Fixed::ZERO);
        *slot = slot.try_add(value)?;
    }
    Ok(merged.into_iter().filter(|(_, v)| !v.is_zero()).collect())
}

/// Scale entries to unit length (zero input stays zero).
pub fn normalize_entries(entries: &Entries) -> Result<Entries> {
    let values: Vec<Fixed> = entries.iter().map(|(_, v)| *v).collect();
    let scaled = normalize(&values)?;
    Ok(entries
        .iter()
        .zip(scaled)
        .map(|((i, _), v)| (*i, v))
        .filter(|(_, v)| !v.is_zero())
        .collect())
}

/// Interpret entries as non-negative whole counts.
pub fn entries_as_counts(entries: &Entries) -> Result<Vec<(u32, u64)>> {
    entries
        .iter()
        .map(|(i, v)| {
            if v.is_negative() || !v.is_integral() {
                return Err(ClassifierError::InvalidInput(format!(
                    "feature {i} must be a non-negative whole count, got {v}"
                )));
            }
            Ok((*i, v.to_integer() as u64))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(s: &str) -> Fixed {
        s.parse().unwrap()
    }

    #[test]
    fn dense_input_must_match_dimension() {
        let input = Features::Dense(vec![fx("1"), fx("2")]);
        assert_eq!(
            input.entries(3).unwrap_err(),
            ClassifierError::DimensionMismatch { expected: 3, actual: 2 }
        );
        assert_eq!(input.entries(2).unwrap(), vec![(0, fx("1")), (1, fx("2"))]);
    }

    #[test]
    fn binary_duplicates_are_summed_and_sorted() {
        let input = Features::Binary(vec![4, 1, 4]);
        assert_eq!(input.entries(5).unwrap(), vec![(1, fx("1")), (4, fx("2"))]);
    }

    #[test]
    fn sparse_index_beyond_dimension_is_rejected() {
        let input = Features::Sparse(vec![(9, fx("1"))]);
        assert!(matches!(
            input.entries(5),
            Err(ClassifierError::IndexOutOfRange { what: "feature", index: 9, len: 5 })
        ));
    }

    #[test]
    fn projection_renumbers_selected_dimensions() {
        let dense = Features::Dense(vec![fx("1"), fx("2"), fx("3")]);
        assert_eq!(
            dense.project(&[2, 0]).unwrap(),
            Features::Dense(vec![fx("3"), fx("1")])
        );
        assert!(dense.project(&[7]).is_err());

        let binary = Features::Binary(vec![0, 2, 5]);
        assert_eq!(
            binary.project(&[5, 2]).unwrap(),
            Features::Sparse(vec![(1, fx("1")), (0, fx("1"))])
        );
    }

    #[test]
    fn data_hash_distinguishes_inputs() {
        let a = Features::Binary(vec![0, 1]);
        let b = Features::Binary(vec![1, 0]);
        assert_eq!(a.data_hash().unwrap(), a.clone().data_hash().unwrap());
        assert_ne!(a.data_hash().unwrap(), b.data_hash().unwrap());
    }

    #[test]
    fn counts_must_be_whole() {
        let entries = vec![(0, fx("2")), (3, fx("0.5"))];
        assert!(entries_as_counts(&entries).is_err());
        assert_eq!(entries_as_counts(&vec![(1, fx("3"))]).unwrap(), vec![(1, 3)]);
    }
}
