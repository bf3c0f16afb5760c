//! Nearest-centroid classifier.
//!
//! `|c − x|² = |c|² − 2·c·x + |x|²`. The last term is the same for every
//! class, so ranking only needs the cached `|c|²` and one dot product per
//! class, which keeps sparse inputs cheap.

use decai_fixed::{div_round, Accumulator, Fixed, FixedPointError};
use decai_types::ClassId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{class_out_of_range, ClassifierError, Result};
use crate::features::{normalize_entries, Entries, Features};
use crate::store::FeatureStore;

/// Running mean of the samples seen for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCentroid")]
pub struct Centroid {
    values: FeatureStore,
    sample_count: u64,
    /// Cached `Σ values[i]²`.
    squared_magnitude: Fixed,
}

/// Wire form; the magnitude cache is recomputed rather than trusted.
#[derive(Deserialize)]
struct RawCentroid {
    values: FeatureStore,
    sample_count: u64,
}

impl TryFrom<RawCentroid> for Centroid {
    type Error = ClassifierError;

    fn try_from(raw: RawCentroid) -> Result<Self> {
        Self::new(raw.values, raw.sample_count)
    }
}

impl Centroid {
    pub fn new(values: FeatureStore, sample_count: u64) -> Result<Self> {
        let squared_magnitude = values.squared_norm()?;
        Ok(Self {
            values,
            sample_count,
            squared_magnitude,
        })
    }

    pub fn values(&self) -> &FeatureStore {
        &self.values
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn squared_magnitude(&self) -> Fixed {
        self.squared_magnitude
    }

    /// `|c|² − 2·c·x`, the class-dependent part of the squared distance.
    fn relative_distance(&self, x: &Entries) -> Result<Fixed> {
        let cross = self.values.dot(x)?.try_mul_int(2)?;
        Ok(self.squared_magnitude.try_sub(cross)?)
    }

    fn refresh_magnitude(&mut self) -> Result<()> {
        self.squared_magnitude = self.values.squared_norm()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNearestCentroid")]
pub struct NearestCentroid {
    classifications: Vec<String>,
    centroids: Vec<Centroid>,
    #[serde(default)]
    normalize_input: bool,
}

#[derive(Deserialize)]
struct RawNearestCentroid {
    classifications: Vec<String>,
    centroids: Vec<Centroid>,
    #[serde(default)]
    normalize_input: bool,
}

impl TryFrom<RawNearestCentroid> for NearestCentroid {
    type Error = ClassifierError;

    fn try_from(raw: RawNearestCentroid) -> Result<Self> {
        let model = Self::new(raw.classifications, raw.centroids)?
            .with_normalized_input(raw.normalize_input);
        model.validate()?;
        Ok(model)
    }
}

impl NearestCentroid {
    pub fn new(classifications: Vec<String>, centroids: Vec<Centroid>) -> Result<Self> {
        crate::ensure_unique_classes(&classifications)?;
        if centroids.len() != classifications.len() {
            return Err(ClassifierError::InvalidParameters(format!(
                "{} classes but {} centroids",
                classifications.len(),
                centroids.len()
            )));
        }
        Ok(Self {
            classifications,
            centroids,
            normalize_input: false,
        })
    }

    /// Normalise every input to unit length before use.
    pub fn with_normalized_input(mut self, normalize: bool) -> Self {
        self.normalize_input = normalize;
        self
    }

    pub fn classifications(&self) -> &[String] {
        &self.classifications
    }

    pub fn centroids(&self) -> &[Centroid] {
        &self.centroids
    }

    pub fn normalizes_input(&self) -> bool {
        self.normalize_input
    }

    pub fn dimension(&self) -> usize {
        self.centroids
            .first()
            .map_or(0, |centroid| centroid.values.dimension())
    }

    fn entries(&self, data: &Features) -> Result<Entries> {
        let entries = data.entries(self.dimension())?;
        if self.normalize_input {
            normalize_entries(&entries)
        } else {
            Ok(entries)
        }
    }

    fn predict_entries(&self, x: &Entries) -> Result<ClassId> {
        let mut best: Option<(ClassId, Fixed)> = None;
        for (class, centroid) in self.centroids.iter().enumerate() {
            let distance = centroid.relative_distance(x)?;
            if best.map_or(true, |(_, closest)| distance < closest) {
                best = Some((class as ClassId, distance));
            }
        }
        Ok(best.map(|(class, _)| class).unwrap_or(0))
    }

    pub fn predict(&self, data: &Features) -> Result<ClassId> {
        let x = self.entries(data)?;
        self.predict_entries(&x)
    }

    /// Fold `data` into the class mean:
    /// `c' = (c · n + x) / (n + 1)`, rounded half away from zero.
    pub fn update(&mut self, data: &Features, classification: ClassId) -> Result<()> {
        let len = self.classifications.len();
        if classification as usize >= len {
            return Err(class_out_of_range(classification, len));
        }
        let x = self.entries(data)?;
        let centroid = &self.centroids[classification as usize];
        let n = centroid.sample_count;
        let next_count = n
            .checked_add(1)
            .ok_or(FixedPointError::Overflow { op: "sample count" })?;

        // Every stored index decays toward zero; input indices also move.
        let mut indices = centroid.values.stored_indices();
        indices.extend(x.iter().map(|(i, _)| *i));
        indices.sort_unstable();
        indices.dedup();

        let mut writes = Vec::with_capacity(indices.len());
        let mut magnitude = Accumulator::new();
        let mut input = x.iter().peekable();
        for index in indices {
            let sample = match input.peek() {
                Some((i, v)) if *i == index => {
                    input.next();
                    *v
                }
                _ => Fixed::ZERO,
            };
            let weighted = i128::from(centroid.values.get(index).raw()) * i128::from(n)
                + i128::from(sample.raw());
            let mean = div_round(weighted, i128::from(next_count));
            let mean = i64::try_from(mean)
                .map(Fixed::from_raw)
                .map_err(|_| FixedPointError::Overflow { op: "centroid mean" })?;
            magnitude.add_product(mean, mean)?;
            writes.push((index, mean));
        }
        let squared_magnitude = magnitude.finish()?;

        let centroid = &mut self.centroids[classification as usize];
        for (index, value) in writes {
            centroid.values.set(index, value);
        }
        centroid.sample_count = next_count;
        centroid.squared_magnitude = squared_magnitude;
        debug!(
            target: "classifier",
            classification,
            sample_count = next_count,
            "centroid updated"
        );
        Ok(())
    }

    /// Append a class whose centroid is filled by later `extend_centroid`
    /// chunks (dense) or starts at zero over the shared dimension (sparse).
    pub fn add_class(&mut self, name: String, sample_count: u64) -> Result<ClassId> {
        crate::ensure_new_class(&self.classifications, &name)?;
        let values = match &self.centroids[0].values {
            FeatureStore::Dense(_) => FeatureStore::dense(Vec::new()),
            sparse => sparse.zeroed(),
        };
        self.centroids.push(Centroid::new(values, sample_count)?);
        self.classifications.push(name);
        Ok((self.classifications.len() - 1) as ClassId)
    }

    fn centroid_mut(&mut self, class: ClassId) -> Result<&mut Centroid> {
        let len = self.centroids.len();
        self.centroids
            .get_mut(class as usize)
            .ok_or_else(|| class_out_of_range(class, len))
    }

    /// Positional upload of a centroid's dense values.
    pub fn extend_centroid(&mut self, class: ClassId, start: usize, chunk: &[Fixed]) -> Result<()> {
        let centroid = self.centroid_mut(class)?;
        centroid.values.write_chunk(start, chunk)?;
        centroid.refresh_magnitude()
    }

    pub fn extend_sparse_centroid(&mut self, class: ClassId, chunk: &[(u32, Fixed)]) -> Result<()> {
        let centroid = self.centroid_mut(class)?;
        centroid.values.write_entries(chunk)?;
        centroid.refresh_magnitude()
    }

    /// One centroid per class, every centroid covering the same dimension.
    pub fn validate(&self) -> Result<()> {
        if self.centroids.is_empty() || self.centroids.len() != self.classifications.len() {
            return Err(ClassifierError::InvalidParameters(format!(
                "{} classes but {} centroids",
                self.classifications.len(),
                self.centroids.len()
            )));
        }
        let expected = self.dimension();
        for centroid in &self.centroids {
            if centroid.values.dimension() != expected {
                return Err(ClassifierError::DimensionMismatch {
                    expected,
                    actual: centroid.values.dimension(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(s: &str) -> Fixed {
        s.parse().unwrap()
    }

    fn dense(values: &[&str]) -> FeatureStore {
        FeatureStore::dense(values.iter().map(|s| fx(s)).collect())
    }

    fn alarm_weather() -> NearestCentroid {
        NearestCentroid::new(
            vec!["ALARM".into(), "WEATHER".into()],
            vec![
                Centroid::new(dense(&["-1", "-1"]), 1).unwrap(),
                Centroid::new(dense(&["1", "1"]), 1).unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn predicts_closest_centroid() {
        let model = alarm_weather();
        let alarm = Features::Dense(vec![fx("-1.5"), fx("-0.5")]);
        let weather = Features::Dense(vec![fx("0.5"), fx("1.5")]);
        assert_eq!(model.predict(&alarm).unwrap(), 0);
        assert_eq!(model.predict(&weather).unwrap(), 1);
    }

    #[test]
    fn equidistant_input_goes_to_lowest_class() {
        let model = alarm_weather();
        assert_eq!(model.predict(&Features::Dense(vec![fx("0"), fx("0")])).unwrap(), 0);
    }

    #[test]
    fn update_computes_running_mean() {
        let mut model = alarm_weather();
        model
            .update(&Features::Dense(vec![fx("3"), fx("0")]), 1)
            .unwrap();
        let c = &model.centroids()[1];
        assert_eq!(c.sample_count(), 2);
        assert_eq!(c.values().get(0), fx("2"));
        assert_eq!(c.values().get(1), fx("0.5"));
        assert_eq!(c.squared_magnitude(), fx("4.25"));
    }

    #[test]
    fn sparse_centroids_match_dense_behaviour() {
        let mut a = FeatureStore::sparse(4);
        a.write_entries(&[(0, fx("-1")), (1, fx("-1"))]).unwrap();
        let mut b = FeatureStore::sparse(4);
        b.write_entries(&[(0, fx("1")), (1, fx("1"))]).unwrap();
        let mut model = NearestCentroid::new(
            vec!["ALARM".into(), "WEATHER".into()],
            vec![Centroid::new(a, 1).unwrap(), Centroid::new(b, 1).unwrap()],
        )
        .unwrap();
        let x = Features::Sparse(vec![(0, fx("0.5")), (1, fx("1.5"))]);
        assert_eq!(model.predict(&x).unwrap(), 1);

        model.update(&Features::Binary(vec![3]), 1).unwrap();
        let c = &model.centroids()[1];
        assert_eq!(c.values().get(0), fx("0.5"));
        assert_eq!(c.values().get(3), fx("0.5"));
    }

    #[test]
    fn normalized_input_ignores_magnitude() {
        let model = NearestCentroid::new(
            vec!["X".into(), "Y".into()],
            vec![
                Centroid::new(dense(&["1", "0"]), 1).unwrap(),
                Centroid::new(dense(&["0", "1"]), 1).unwrap(),
            ],
        )
        .unwrap()
        .with_normalized_input(true);
        assert_eq!(model.predict(&Features::Dense(vec![fx("40"), fx("30")])).unwrap(), 0);
    }

    #[test]
    fn chunked_class_growth() {
        let mut model = alarm_weather();
        let class = model.add_class("OTHER".into(), 3).unwrap();
        assert_eq!(class, 2);
        assert!(model.validate().is_err());
        model.extend_centroid(class, 0, &[fx("5")]).unwrap();
        model.extend_centroid(class, 1, &[fx("5")]).unwrap();
        model.validate().unwrap();
        assert_eq!(model.centroids()[2].squared_magnitude(), fx("50"));
        assert!(matches!(
            model.add_class("ALARM".into(), 0),
            Err(ClassifierError::DuplicateClass { index: 0, .. })
        ));
    }

    #[test]
    fn decoding_recomputes_cache_and_checks_shape() {
        let model = alarm_weather();
        let json = serde_json::to_string(&model).unwrap();
        let tampered = json.replace(
            &format!("\"squared_magnitude\":{}", fx("2").raw()),
            "\"squared_magnitude\":0",
        );
        assert_ne!(tampered, json);
        let back: NearestCentroid = serde_json::from_str(&tampered).unwrap();
        assert_eq!(back, model);

        let no_centroids = r#"{"classifications":["A","B"],"centroids":[]}"#;
        assert!(serde_json::from_str::<NearestCentroid>(no_centroids).is_err());
    }
}
