//! Dense and sparse storage for per-feature values.
//!
//! Storage choice only changes lookup cost: a sparse store answers zero for
//! any index it does not hold, exactly like an explicit zero in a dense one.

use decai_fixed::{Accumulator, Fixed};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{ClassifierError, Result};
use crate::features::Entries;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStore {
    /// One value per feature; the dimension is the vector length.
    Dense(Vec<Fixed>),
    /// Dense prefix followed by a map for the long tail of the vocabulary.
    Sparse {
        dimension: u32,
        prefix: Vec<Fixed>,
        entries: BTreeMap<u32, Fixed>,
    },
}

impl FeatureStore {
    pub fn dense(values: Vec<Fixed>) -> Self {
        FeatureStore::Dense(values)
    }

    pub fn sparse(dimension: u32) -> Self {
        FeatureStore::Sparse {
            dimension,
            prefix: Vec::new(),
            entries: BTreeMap::new(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, FeatureStore::Sparse { .. })
    }

    /// Number of features this store answers for.
    pub fn dimension(&self) -> usize {
        match self {
            FeatureStore::Dense(values) => values.len(),
            FeatureStore::Sparse { dimension, .. } => *dimension as usize,
        }
    }

    /// An all-zero store of the same shape.
    pub fn zeroed(&self) -> Self {
        match self {
            FeatureStore::Dense(values) => FeatureStore::Dense(vec![Fixed::ZERO; values.len()]),
            FeatureStore::Sparse { dimension, .. } => FeatureStore::sparse(*dimension),
        }
    }

    /// Value at `index`; zero when not stored.
    pub fn get(&self, index: u32) -> Fixed {
        match self {
            FeatureStore::Dense(values) => values.get(index as usize).copied().unwrap_or_default(),
            FeatureStore::Sparse {
                prefix, entries, ..
            } => match prefix.get(index as usize) {
                Some(v) => *v,
                None => entries.get(&index).copied().unwrap_or_default(),
            },
        }
    }

    /// Overwrite `index`. Callers validate the index against `dimension()`.
    pub(crate) fn set(&mut self, index: u32, value: Fixed) {
        match self {
            FeatureStore::Dense(values) => {
                if let Some(slot) = values.get_mut(index as usize) {
                    *slot = value;
                }
            }
            FeatureStore::Sparse {
                prefix, entries, ..
            } => {
                if let Some(slot) = prefix.get_mut(index as usize) {
                    *slot = value;
                } else if value.is_zero() {
                    entries.remove(&index);
                } else {
                    entries.insert(index, value);
                }
            }
        }
    }

    /// Indices holding a stored (possibly zero for the prefix) value.
    pub fn stored_indices(&self) -> Vec<u32> {
        match self {
            FeatureStore::Dense(values) => (0..values.len() as u32).collect(),
            FeatureStore::Sparse {
                prefix, entries, ..
            } => (0..prefix.len() as u32)
                .chain(entries.keys().copied())
                .collect(),
        }
    }

    /// Write `chunk` at positions `start..start + chunk.len()` of the dense
    /// part, appending where it runs past the end.
    ///
    /// Replaying the same chunk leaves the store unchanged; a `start` beyond
    /// the current length would leave a gap and is rejected.
    pub fn write_chunk(&mut self, start: usize, chunk: &[Fixed]) -> Result<()> {
        let (values, limit) = match self {
            FeatureStore::Dense(values) => (values, usize::MAX),
            FeatureStore::Sparse {
                dimension, prefix, ..
            } => (prefix, *dimension as usize),
        };
        if start > values.len() {
            return Err(ClassifierError::IndexOutOfRange {
                what: "chunk start",
                index: start as u64,
                len: values.len() as u64,
            });
        }
        let end = start + chunk.len();
        if end > limit {
            return Err(ClassifierError::DimensionMismatch {
                expected: limit,
                actual: end,
            });
        }
        for (offset, value) in chunk.iter().enumerate() {
            let position = start + offset;
            if position < values.len() {
                values[position] = *value;
            } else {
                values.push(*value);
            }
        }
        if let FeatureStore::Sparse {
            prefix, entries, ..
        } = self
        {
            // Indices now covered by the prefix must not linger in the map.
            let covered = prefix.len() as u32;
            entries.retain(|index, _| *index >= covered);
        }
        Ok(())
    }

    /// Set individual `(index, value)` pairs; every index must be in range.
    pub fn write_entries(&mut self, chunk: &[(u32, Fixed)]) -> Result<()> {
        let dimension = self.dimension();
        if let Some((index, _)) = chunk.iter().find(|(i, _)| *i as usize >= dimension) {
            return Err(ClassifierError::IndexOutOfRange {
                what: "feature",
                index: u64::from(*index),
                len: dimension as u64,
            });
        }
        for (index, value) in chunk {
            self.set(*index, *value);
        }
        Ok(())
    }

    /// `Σ self[i] · x[i]` over the input's non-zero entries.
    pub fn dot(&self, entries: &Entries) -> Result<Fixed> {
        let mut acc = Accumulator::new();
        for (index, value) in entries {
            acc.add_product(self.get(*index), *value)?;
        }
        Ok(acc.finish()?)
    }

    /// `Σ self[i]²`.
    pub fn squared_norm(&self) -> Result<Fixed> {
        let mut acc = Accumulator::new();
        match self {
            FeatureStore::Dense(values) => {
                for v in values {
                    acc.add_product(*v, *v)?;
                }
            }
            FeatureStore::Sparse {
                prefix, entries, ..
            } => {
                for v in prefix.iter().chain(entries.values()) {
                    acc.add_product(*v, *v)?;
                }
            }
        }
        Ok(acc.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(s: &str) -> Fixed {
        s.parse().unwrap()
    }

    #[test]
    fn sparse_lookup_defaults_to_zero() {
        let mut store = FeatureStore::sparse(100);
        store.write_chunk(0, &[fx("1"), fx("2")]).unwrap();
        store.write_entries(&[(50, fx("3"))]).unwrap();
        assert_eq!(store.get(1), fx("2"));
        assert_eq!(store.get(50), fx("3"));
        assert_eq!(store.get(99), Fixed::ZERO);
        assert_eq!(store.squared_norm().unwrap(), fx("14"));
    }

    #[test]
    fn dense_and_sparse_dot_agree() {
        let dense = FeatureStore::dense(vec![fx("0"), fx("5"), fx("-1")]);
        let mut sparse = FeatureStore::sparse(3);
        sparse.write_entries(&[(1, fx("5")), (2, fx("-1"))]).unwrap();
        let x = vec![(1, fx("2")), (2, fx("1"))];
        assert_eq!(dense.dot(&x).unwrap(), fx("9"));
        assert_eq!(sparse.dot(&x).unwrap(), fx("9"));
    }

    #[test]
    fn chunk_writes_are_idempotent_and_gapless() {
        let mut store = FeatureStore::dense(Vec::new());
        store.write_chunk(0, &[fx("1"), fx("2")]).unwrap();
        store.write_chunk(0, &[fx("1"), fx("2")]).unwrap();
        assert_eq!(store.dimension(), 2);
        store.write_chunk(2, &[fx("3")]).unwrap();
        assert_eq!(store.dimension(), 3);
        assert!(matches!(
            store.write_chunk(5, &[fx("9")]),
            Err(ClassifierError::IndexOutOfRange { what: "chunk start", .. })
        ));
    }

    #[test]
    fn sparse_prefix_cannot_exceed_dimension() {
        let mut store = FeatureStore::sparse(2);
        assert!(store.write_chunk(0, &[fx("1"), fx("1"), fx("1")]).is_err());
        assert!(store.write_entries(&[(2, fx("1"))]).is_err());
    }

    #[test]
    fn zero_writes_drop_sparse_entries() {
        let mut store = FeatureStore::sparse(10);
        store.write_entries(&[(7, fx("1"))]).unwrap();
        store.write_entries(&[(7, Fixed::ZERO)]).unwrap();
        assert!(store.stored_indices().is_empty());
    }
}
