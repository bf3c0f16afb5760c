//! Multinomial naive Bayes over feature counts.
//!
//! score(c) = log2(n_c / N) + Σ_f k_f · log2((count[c][f] + α) / (total_c + α·V))
//!
//! where `k_f` is the input count for feature `f`, `V` the vocabulary size and
//! `α` the additive smoothing factor. Logarithms use the integer-only
//! `Fixed::log2`, so scores are bit-identical everywhere.

use decai_fixed::{Accumulator, Fixed, FixedPointError};
use decai_types::ClassId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::errors::{class_out_of_range, ClassifierError, Result};
use crate::features::{entries_as_counts, Features};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNaiveBayes")]
pub struct NaiveBayes {
    classifications: Vec<String>,
    class_sample_counts: Vec<u64>,
    feature_counts: Vec<BTreeMap<u32, u64>>,
    /// Σ_f count[c][f] per class.
    class_feature_totals: Vec<u64>,
    /// Σ over every class.
    total_feature_count: u64,
    /// Vocabulary size `V`.
    dimension: u32,
    smoothing_factor: Fixed,
}

/// Wire form; totals are rebuilt from the per-class counts.
#[derive(Deserialize)]
struct RawNaiveBayes {
    classifications: Vec<String>,
    class_sample_counts: Vec<u64>,
    feature_counts: Vec<BTreeMap<u32, u64>>,
    dimension: u32,
    smoothing_factor: Fixed,
}

impl TryFrom<RawNaiveBayes> for NaiveBayes {
    type Error = ClassifierError;

    fn try_from(raw: RawNaiveBayes) -> Result<Self> {
        let classes = raw.classifications.len();
        if raw.class_sample_counts.len() != classes || raw.feature_counts.len() != classes {
            return Err(ClassifierError::InvalidParameters(format!(
                "{} classes but {} sample counts and {} feature count rows",
                classes,
                raw.class_sample_counts.len(),
                raw.feature_counts.len()
            )));
        }
        let mut model = Self::new(raw.classifications, raw.dimension, raw.smoothing_factor)?;
        for (class, (samples, counts)) in raw
            .class_sample_counts
            .into_iter()
            .zip(raw.feature_counts)
            .enumerate()
        {
            model.set_sample_count(class as ClassId, samples)?;
            let pairs: Vec<(u32, u64)> = counts.into_iter().collect();
            model.extend_feature_counts(class as ClassId, &pairs)?;
        }
        Ok(model)
    }
}

fn add_count(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b)
        .ok_or(ClassifierError::Arithmetic(FixedPointError::Overflow { op: "count" }))
}

fn count_to_fixed(count: u64) -> Result<Fixed> {
    let whole = i64::try_from(count)
        .map_err(|_| ClassifierError::Arithmetic(FixedPointError::Overflow { op: "count" }))?;
    Ok(Fixed::from_integer(whole)?)
}

impl NaiveBayes {
    /// Empty model: every class starts with zero samples and counts.
    pub fn new(classifications: Vec<String>, dimension: u32, smoothing_factor: Fixed) -> Result<Self> {
        crate::ensure_unique_classes(&classifications)?;
        if !smoothing_factor.is_positive() {
            return Err(ClassifierError::InvalidParameters(format!(
                "smoothing factor must be positive, got {smoothing_factor}"
            )));
        }
        if dimension == 0 {
            return Err(ClassifierError::InvalidParameters(
                "vocabulary size must be non-zero".into(),
            ));
        }
        let classes = classifications.len();
        Ok(Self {
            classifications,
            class_sample_counts: vec![0; classes],
            feature_counts: vec![BTreeMap::new(); classes],
            class_feature_totals: vec![0; classes],
            total_feature_count: 0,
            dimension,
            smoothing_factor,
        })
    }

    pub fn classifications(&self) -> &[String] {
        &self.classifications
    }

    pub fn class_sample_counts(&self) -> &[u64] {
        &self.class_sample_counts
    }

    pub fn feature_count(&self, class: ClassId, feature: u32) -> u64 {
        self.feature_counts
            .get(class as usize)
            .and_then(|counts| counts.get(&feature))
            .copied()
            .unwrap_or(0)
    }

    pub fn class_feature_total(&self, class: ClassId) -> u64 {
        self.class_feature_totals.get(class as usize).copied().unwrap_or(0)
    }

    pub fn total_feature_count(&self) -> u64 {
        self.total_feature_count
    }

    pub fn dimension(&self) -> usize {
        self.dimension as usize
    }

    pub fn smoothing_factor(&self) -> Fixed {
        self.smoothing_factor
    }

    fn counts(&self, data: &Features) -> Result<Vec<(u32, u64)>> {
        entries_as_counts(&data.entries(self.dimension())?)
    }

    pub fn predict(&self, data: &Features) -> Result<ClassId> {
        let counts = self.counts(data)?;
        let total_samples = self
            .class_sample_counts
            .iter()
            .try_fold(0u64, |acc, n| add_count(acc, *n))?;
        let smoothed_vocabulary = self.smoothing_factor.try_mul_int(i64::from(self.dimension))?;

        let mut best: Option<(ClassId, Fixed)> = None;
        for class in 0..self.classifications.len() {
            let samples = self.class_sample_counts[class];
            // With any data at all, a class that has never been seen cannot win.
            if total_samples > 0 && samples == 0 {
                continue;
            }
            let mut score = Accumulator::new();
            if total_samples > 0 {
                let prior = count_to_fixed(samples)?
                    .log2()?
                    .try_sub(count_to_fixed(total_samples)?.log2()?)?;
                score.add(prior)?;
            }
            let denominator = count_to_fixed(self.class_feature_totals[class])?
                .try_add(smoothed_vocabulary)?
                .log2()?;
            for (feature, k) in &counts {
                let numerator = count_to_fixed(self.feature_count(class as ClassId, *feature))?
                    .try_add(self.smoothing_factor)?
                    .log2()?;
                score.add_product(count_to_fixed(*k)?, numerator.try_sub(denominator)?)?;
            }
            let score = score.finish()?;
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((class as ClassId, score));
            }
        }
        Ok(best.map(|(class, _)| class).unwrap_or(0))
    }

    /// Count one more sample of `classification` with the given feature counts.
    pub fn update(&mut self, data: &Features, classification: ClassId) -> Result<()> {
        let classes = self.classifications.len();
        if classification as usize >= classes {
            return Err(class_out_of_range(classification, classes));
        }
        let counts = self.counts(data)?;
        let class = classification as usize;

        let added = counts.iter().try_fold(0u64, |acc, (_, k)| add_count(acc, *k))?;
        let samples = add_count(self.class_sample_counts[class], 1)?;
        let class_total = add_count(self.class_feature_totals[class], added)?;
        let total = add_count(self.total_feature_count, added)?;
        let mut writes = Vec::with_capacity(counts.len());
        for (feature, k) in &counts {
            writes.push((*feature, add_count(self.feature_count(classification, *feature), *k)?));
        }

        self.class_sample_counts[class] = samples;
        self.class_feature_totals[class] = class_total;
        self.total_feature_count = total;
        self.feature_counts[class].extend(writes);
        debug!(target: "classifier", classification, samples, "naive bayes counts updated");
        Ok(())
    }

    /// Append a class with a prior sample count; feature counts follow via
    /// `extend_feature_counts`.
    pub fn add_class(&mut self, name: String, sample_count: u64) -> Result<ClassId> {
        crate::ensure_new_class(&self.classifications, &name)?;
        self.classifications.push(name);
        self.class_sample_counts.push(sample_count);
        self.feature_counts.push(BTreeMap::new());
        self.class_feature_totals.push(0);
        Ok((self.classifications.len() - 1) as ClassId)
    }

    pub fn set_sample_count(&mut self, class: ClassId, sample_count: u64) -> Result<()> {
        let len = self.class_sample_counts.len();
        let slot = self
            .class_sample_counts
            .get_mut(class as usize)
            .ok_or_else(|| class_out_of_range(class, len))?;
        *slot = sample_count;
        Ok(())
    }

    /// Per-class vectors agree in length with the class list.
    pub fn validate(&self) -> Result<()> {
        let classes = self.classifications.len();
        let rows = [
            self.class_sample_counts.len(),
            self.feature_counts.len(),
            self.class_feature_totals.len(),
        ];
        if classes == 0 || rows.iter().any(|len| *len != classes) {
            return Err(ClassifierError::InvalidParameters(format!(
                "{classes} classes but per-class rows of {rows:?}"
            )));
        }
        Ok(())
    }

    /// Set `(feature, count)` pairs for a class, keeping totals consistent.
    /// Writing the same chunk twice has no further effect.
    pub fn extend_feature_counts(&mut self, class: ClassId, chunk: &[(u32, u64)]) -> Result<()> {
        let classes = self.classifications.len();
        if class as usize >= classes {
            return Err(class_out_of_range(class, classes));
        }
        if let Some((feature, _)) = chunk.iter().find(|(f, _)| *f >= self.dimension) {
            return Err(ClassifierError::IndexOutOfRange {
                what: "feature",
                index: u64::from(*feature),
                len: u64::from(self.dimension),
            });
        }

        // Later pairs for the same feature win.
        let writes: BTreeMap<u32, u64> = chunk.iter().copied().collect();
        let mut class_total = self.class_feature_totals[class as usize];
        let mut total = self.total_feature_count;
        for (feature, count) in &writes {
            let previous = self.feature_count(class, *feature);
            class_total = add_count(class_total - previous, *count)?;
            total = add_count(total - previous, *count)?;
        }

        let counts = &mut self.feature_counts[class as usize];
        for (feature, count) in &writes {
            if *count == 0 {
                counts.remove(feature);
            } else {
                counts.insert(*feature, *count);
            }
        }
        self.class_feature_totals[class as usize] = class_total;
        self.total_feature_count = total;
        Ok(())
    }
}
