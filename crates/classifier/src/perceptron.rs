//! Online perceptron.
//!
//! Two classes share one linear unit: `intercept + w·x > 0` predicts class 1.
//! With more classes each class owns a unit and the highest score wins, the
//! lowest class index breaking ties. A mistake moves the true class toward
//! `x` and the predicted class away from it by `learning_rate · x`.

use decai_fixed::Fixed;
use decai_types::ClassId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{class_out_of_range, ClassifierError, Result};
use crate::features::{Entries, Features};
use crate::store::FeatureStore;

/// Weights and bias of one decision function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearUnit {
    pub weights: FeatureStore,
    pub intercept: Fixed,
}

impl LinearUnit {
    pub fn new(weights: FeatureStore, intercept: Fixed) -> Self {
        Self { weights, intercept }
    }

    fn score(&self, x: &Entries) -> Result<Fixed> {
        Ok(self.weights.dot(x)?.try_add(self.intercept)?)
    }

    /// New `(index, weight)` values and intercept after adding `step · x`.
    fn planned_step(&self, x: &Entries, step: Fixed) -> Result<(Vec<(u32, Fixed)>, Fixed)> {
        let mut writes = Vec::with_capacity(x.len());
        for (index, value) in x {
            let delta = step.try_mul(*value)?;
            writes.push((*index, self.weights.get(*index).try_add(delta)?));
        }
        Ok((writes, self.intercept.try_add(step)?))
    }

    fn apply(&mut self, plan: (Vec<(u32, Fixed)>, Fixed)) {
        let (writes, intercept) = plan;
        for (index, value) in writes {
            self.weights.set(index, value);
        }
        self.intercept = intercept;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPerceptron")]
pub struct Perceptron {
    classifications: Vec<String>,
    units: Vec<LinearUnit>,
    learning_rate: Fixed,
    /// Upstream encoder dimensions fed to the weights, in weight order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_indices: Option<Vec<u32>>,
}

/// Wire form; every decoded model goes through [`Perceptron::from_units`].
#[derive(Deserialize)]
struct RawPerceptron {
    classifications: Vec<String>,
    units: Vec<LinearUnit>,
    learning_rate: Fixed,
    #[serde(default)]
    feature_indices: Option<Vec<u32>>,
}

impl TryFrom<RawPerceptron> for Perceptron {
    type Error = ClassifierError;

    fn try_from(raw: RawPerceptron) -> Result<Self> {
        let mut model = Self::from_units(raw.classifications, raw.units, raw.learning_rate)?;
        model.feature_indices = raw.feature_indices;
        model.validate()?;
        Ok(model)
    }
}

/// One unit for two classes, one per class otherwise.
fn expected_units(classes: usize) -> usize {
    if classes == 2 {
        1
    } else {
        classes
    }
}

impl Perceptron {
    /// Binary perceptron over `["class 0", "class 1"]`.
    pub fn binary(
        classifications: Vec<String>,
        weights: FeatureStore,
        intercept: Fixed,
        learning_rate: Fixed,
    ) -> Result<Self> {
        if classifications.len() != 2 {
            return Err(ClassifierError::InvalidParameters(format!(
                "binary perceptron needs exactly 2 classes, got {}",
                classifications.len()
            )));
        }
        Self::from_units(
            classifications,
            vec![LinearUnit::new(weights, intercept)],
            learning_rate,
        )
    }

    /// One-vs-rest perceptron with one unit per class, all starting from
    /// `template` zeroed.
    pub fn multi_class(
        classifications: Vec<String>,
        template: &FeatureStore,
        learning_rate: Fixed,
    ) -> Result<Self> {
        if classifications.len() < 3 {
            return Err(ClassifierError::InvalidParameters(format!(
                "multi-class perceptron needs at least 3 classes, got {}",
                classifications.len()
            )));
        }
        let units = classifications
            .iter()
            .map(|_| LinearUnit::new(template.zeroed(), Fixed::ZERO))
            .collect();
        Self::from_units(classifications, units, learning_rate)
    }

    /// Assemble from explicit units: one unit for two classes, otherwise one
    /// per class.
    pub fn from_units(
        classifications: Vec<String>,
        units: Vec<LinearUnit>,
        learning_rate: Fixed,
    ) -> Result<Self> {
        crate::ensure_unique_classes(&classifications)?;
        if classifications.len() < 2 {
            return Err(ClassifierError::InvalidParameters(format!(
                "a perceptron needs at least 2 classes, got {}",
                classifications.len()
            )));
        }
        let needed = expected_units(classifications.len());
        if units.len() != needed {
            return Err(ClassifierError::InvalidParameters(format!(
                "{} classes need {} linear units, got {}",
                classifications.len(),
                needed,
                units.len()
            )));
        }
        if !learning_rate.is_positive() {
            return Err(ClassifierError::InvalidParameters(format!(
                "learning rate must be positive, got {learning_rate}"
            )));
        }
        Ok(Self {
            classifications,
            units,
            learning_rate,
            feature_indices: None,
        })
    }

    /// Restrict input to the listed upstream encoder dimensions.
    pub fn with_feature_indices(mut self, indices: Vec<u32>) -> Self {
        self.feature_indices = Some(indices);
        self
    }

    pub fn classifications(&self) -> &[String] {
        &self.classifications
    }

    pub fn units(&self) -> &[LinearUnit] {
        &self.units
    }

    pub fn learning_rate(&self) -> Fixed {
        self.learning_rate
    }

    pub fn feature_indices(&self) -> Option<&[u32]> {
        self.feature_indices.as_deref()
    }

    pub fn is_binary(&self) -> bool {
        self.units.len() == 1
    }

    pub fn dimension(&self) -> usize {
        self.units.first().map_or(0, |unit| unit.weights.dimension())
    }

    fn entries(&self, data: &Features) -> Result<Entries> {
        match &self.feature_indices {
            Some(indices) => data.project(indices)?.entries(self.dimension()),
            None => data.entries(self.dimension()),
        }
    }

    fn predict_entries(&self, x: &Entries) -> Result<ClassId> {
        if self.is_binary() {
            let score = self.units[0].score(x)?;
            return Ok(if score.is_positive() { 1 } else { 0 });
        }
        let mut best: Option<(ClassId, Fixed)> = None;
        for (class, unit) in self.units.iter().enumerate() {
            let score = unit.score(x)?;
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((class as ClassId, score));
            }
        }
        Ok(best.map(|(class, _)| class).unwrap_or(0))
    }

    pub fn predict(&self, data: &Features) -> Result<ClassId> {
        let x = self.entries(data)?;
        self.predict_entries(&x)
    }

    /// Perceptron rule; a correct prediction leaves the model untouched.
    pub fn update(&mut self, data: &Features, classification: ClassId) -> Result<()> {
        if classification as usize >= self.classifications.len() {
            return Err(class_out_of_range(classification, self.classifications.len()));
        }
        let x = self.entries(data)?;
        let prediction = self.predict_entries(&x)?;
        if prediction == classification {
            debug!(target: "classifier", classification, "perceptron already correct");
            return Ok(());
        }

        let rate = self.learning_rate;
        if self.is_binary() {
            let step = if classification == 1 { rate } else { rate.try_neg()? };
            let plan = self.units[0].planned_step(&x, step)?;
            self.units[0].apply(plan);
        } else {
            let toward = self.units[classification as usize].planned_step(&x, rate)?;
            let away = self.units[prediction as usize].planned_step(&x, rate.try_neg()?)?;
            self.units[classification as usize].apply(toward);
            self.units[prediction as usize].apply(away);
        }
        debug!(
            target: "classifier",
            classification,
            prediction,
            "perceptron weights adjusted"
        );
        Ok(())
    }

    /// Append a class. Only multi-class perceptrons grow; the new unit
    /// starts at zero.
    pub fn add_class(&mut self, name: String) -> Result<ClassId> {
        if self.is_binary() {
            return Err(ClassifierError::UnsupportedOperation {
                operation: "add_class",
                variant: "binary perceptron",
            });
        }
        crate::ensure_new_class(&self.classifications, &name)?;
        let unit = LinearUnit::new(self.units[0].weights.zeroed(), Fixed::ZERO);
        self.units.push(unit);
        self.classifications.push(name);
        Ok((self.classifications.len() - 1) as ClassId)
    }

    fn unit_mut(&mut self, unit: usize) -> Result<&mut LinearUnit> {
        let len = self.units.len();
        self.units.get_mut(unit).ok_or(ClassifierError::IndexOutOfRange {
            what: "unit",
            index: unit as u64,
            len: len as u64,
        })
    }

    /// Positional weight upload for one unit.
    pub fn extend_weights(&mut self, unit: usize, start: usize, chunk: &[Fixed]) -> Result<()> {
        self.unit_mut(unit)?.weights.write_chunk(start, chunk)
    }

    pub fn extend_sparse_weights(&mut self, unit: usize, chunk: &[(u32, Fixed)]) -> Result<()> {
        self.unit_mut(unit)?.weights.write_entries(chunk)
    }

    pub fn set_intercept(&mut self, unit: usize, intercept: Fixed) -> Result<()> {
        self.unit_mut(unit)?.intercept = intercept;
        Ok(())
    }

    /// At least two classes with a matching unit count, all units sharing
    /// one non-zero dimension.
    pub fn validate(&self) -> Result<()> {
        let classes = self.classifications.len();
        if classes < 2 || self.units.len() != expected_units(classes) {
            return Err(ClassifierError::InvalidParameters(format!(
                "{} classes with {} linear units",
                classes,
                self.units.len()
            )));
        }
        let expected = self.dimension();
        if expected == 0 {
            return Err(ClassifierError::InvalidParameters(
                "perceptron weights are empty".into(),
            ));
        }
        for unit in &self.units {
            if unit.weights.dimension() != expected {
                return Err(ClassifierError::DimensionMismatch {
                    expected,
                    actual: unit.weights.dimension(),
                });
            }
        }
        if let Some(indices) = &self.feature_indices {
            if indices.len() != expected {
                return Err(ClassifierError::DimensionMismatch {
                    expected,
                    actual: indices.len(),
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

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sentiment() -> Perceptron {
        Perceptron::binary(
            names(&["NEGATIVE", "POSITIVE"]),
            FeatureStore::dense(vec![fx("0"), fx("5"), fx("-1")]),
            Fixed::ZERO,
            Fixed::ONE,
        )
        .unwrap()
    }

    #[test]
    fn binary_prediction_uses_sign_of_score() {
        let model = sentiment();
        assert_eq!(model.predict(&Features::Binary(vec![0, 1])).unwrap(), 1);
        assert_eq!(model.predict(&Features::Binary(vec![2])).unwrap(), 0);
        // Score exactly zero is class 0.
        assert_eq!(model.predict(&Features::Binary(vec![0])).unwrap(), 0);
    }

    #[test]
    fn mistake_moves_weights_by_learning_rate() {
        let mut model = sentiment();
        model.update(&Features::Binary(vec![0, 1]), 0).unwrap();
        let w = &model.units()[0].weights;
        assert_eq!(w.get(0), fx("-1"));
        assert_eq!(w.get(1), fx("4"));
        assert_eq!(w.get(2), fx("-1"));
        assert_eq!(model.units()[0].intercept, fx("-1"));
    }

    #[test]
    fn correct_prediction_is_a_no_op() {
        let mut model = sentiment();
        let before = model.clone();
        model.update(&Features::Binary(vec![1]), 1).unwrap();
        assert_eq!(model, before);
    }

    #[test]
    fn feature_indices_select_upstream_dimensions() {
        let model = Perceptron::binary(
            names(&["A", "B"]),
            FeatureStore::dense(vec![fx("1"), fx("-1")]),
            Fixed::ZERO,
            Fixed::ONE,
        )
        .unwrap()
        .with_feature_indices(vec![3, 0]);
        let upstream = Features::Dense(vec![fx("5"), fx("0"), fx("0"), fx("1")]);
        // 1·x[3] − 1·x[0] = −4
        assert_eq!(model.predict(&upstream).unwrap(), 0);
        assert!(model.predict(&Features::Dense(vec![fx("1")])).is_err());
    }

    #[test]
    fn multi_class_updates_true_and_predicted_units() {
        let template = FeatureStore::dense(vec![Fixed::ZERO; 2]);
        let mut model =
            Perceptron::multi_class(names(&["A", "B", "C"]), &template, Fixed::ONE).unwrap();
        let x = Features::Dense(vec![fx("1"), fx("0")]);
        // All scores tie at zero: lowest index wins.
        assert_eq!(model.predict(&x).unwrap(), 0);
        model.update(&x, 2).unwrap();
        assert_eq!(model.predict(&x).unwrap(), 2);
        assert_eq!(model.units()[0].weights.get(0), fx("-1"));
        assert_eq!(model.units()[2].weights.get(0), fx("1"));
    }

    #[test]
    fn class_out_of_range_is_rejected_without_mutation() {
        let mut model = sentiment();
        let before = model.clone();
        assert!(matches!(
            model.update(&Features::Binary(vec![0]), 2),
            Err(ClassifierError::IndexOutOfRange { what: "class", .. })
        ));
        assert_eq!(model, before);
    }

    #[test]
    fn single_class_is_rejected() {
        let unit = LinearUnit::new(FeatureStore::dense(vec![fx("1")]), Fixed::ZERO);
        assert!(matches!(
            Perceptron::from_units(names(&["ONLY"]), vec![unit], Fixed::ONE),
            Err(ClassifierError::InvalidParameters(_))
        ));
    }

    #[test]
    fn validate_rechecks_class_and_unit_counts() {
        let mut model = sentiment();
        model.classifications.truncate(1);
        assert!(matches!(
            model.validate(),
            Err(ClassifierError::InvalidParameters(_))
        ));
    }

    #[test]
    fn decoding_runs_constructor_checks() {
        let json = serde_json::to_string(&sentiment()).unwrap();
        let back: Perceptron = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sentiment());

        let no_units =
            r#"{"classifications":["A","B"],"units":[],"learning_rate":1000000000}"#;
        assert!(serde_json::from_str::<Perceptron>(no_units).is_err());
        let one_class = json.replace(r#"["NEGATIVE","POSITIVE"]"#, r#"["NEGATIVE"]"#);
        assert!(serde_json::from_str::<Perceptron>(&one_class).is_err());
    }

    #[test]
    fn binary_model_cannot_grow_classes() {
        let mut model = sentiment();
        assert!(matches!(
            model.add_class("NEUTRAL".into()),
            Err(ClassifierError::UnsupportedOperation { .. })
        ));
    }
}
