//! Property checks shared by every classifier variant

use decai_classifier::{
    Centroid, Classifier, FeatureStore, Features, NaiveBayes, NearestCentroid, Perceptron,
};
use decai_fixed::Fixed;
use proptest::prelude::*;

const DIM: usize = 4;

fn fixed_value() -> impl Strategy<Value = Fixed> {
    (-100_000_000_000i64..100_000_000_000).prop_map(Fixed::from_raw)
}

fn dense_input() -> impl Strategy<Value = Vec<Fixed>> {
    prop::collection::vec(fixed_value(), DIM)
}

fn perceptron(weights: Vec<Fixed>, intercept: Fixed, rate: Fixed) -> Perceptron {
    Perceptron::binary(
        vec!["NEGATIVE".into(), "POSITIVE".into()],
        FeatureStore::dense(weights),
        intercept,
        rate,
    )
    .unwrap()
}

fn centroids(a: Vec<Fixed>, b: Vec<Fixed>, count: u64) -> NearestCentroid {
    NearestCentroid::new(
        vec!["A".into(), "B".into()],
        vec![
            Centroid::new(FeatureStore::dense(a), count).unwrap(),
            Centroid::new(FeatureStore::dense(b), count).unwrap(),
        ],
    )
    .unwrap()
}

#[test]
fn test_sparse_and_dense_perceptrons_agree() {
    let dense = perceptron(
        vec![Fixed::ZERO, Fixed::from_integer(5).unwrap(), Fixed::from_integer(-1).unwrap()],
        Fixed::ZERO,
        Fixed::ONE,
    );
    let mut store = FeatureStore::sparse(3);
    store
        .write_entries(&[(1, Fixed::from_integer(5).unwrap()), (2, Fixed::from_integer(-1).unwrap())])
        .unwrap();
    let sparse = Perceptron::binary(
        vec!["NEGATIVE".into(), "POSITIVE".into()],
        store,
        Fixed::ZERO,
        Fixed::ONE,
    )
    .unwrap();
    for input in [vec![0, 1], vec![2], vec![1, 2, 2], vec![]] {
        let x = Features::Binary(input);
        assert_eq!(dense.predict(&x).unwrap(), sparse.predict(&x).unwrap());
    }
}

proptest! {
    #[test]
    fn prop_predict_is_idempotent(
        a in dense_input(),
        b in dense_input(),
        x in dense_input(),
    ) {
        let models: Vec<Classifier> = vec![
            perceptron(a.clone(), Fixed::ZERO, Fixed::ONE).into(),
            centroids(a, b, 3).into(),
        ];
        let x = Features::Dense(x);
        for model in models {
            let before = model.clone();
            let first = model.predict(&x).unwrap();
            let second = model.predict(&x).unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(&model, &before);
        }
    }

    #[test]
    fn prop_naive_bayes_predict_is_idempotent(
        counts in prop::collection::vec((0u32..DIM as u32, 1u64..50), 0..8),
        input in prop::collection::vec(0u32..DIM as u32, 0..6),
    ) {
        let mut model = NaiveBayes::new(vec!["A".into(), "B".into()], DIM as u32, Fixed::ONE).unwrap();
        model.set_sample_count(0, 2).unwrap();
        model.set_sample_count(1, 3).unwrap();
        model.extend_feature_counts(1, &counts).unwrap();
        let x = Features::Binary(input);
        prop_assert_eq!(model.predict(&x).unwrap(), model.predict(&x).unwrap());
    }

    #[test]
    fn prop_centroid_update_is_running_mean(
        a in dense_input(),
        b in dense_input(),
        x in dense_input(),
        count in 0u64..1_000,
        class in 0u64..2,
    ) {
        let mut model = centroids(a, b, count);
        let old = model.centroids()[class as usize].clone();
        model.update(&Features::Dense(x.clone()), class).unwrap();
        let new = &model.centroids()[class as usize];

        prop_assert_eq!(new.sample_count(), count + 1);
        for (i, xi) in x.iter().enumerate() {
            let exact_num = i128::from(old.values().get(i as u32).raw()) * i128::from(count)
                + i128::from(xi.raw());
            let got = i128::from(new.values().get(i as u32).raw()) * i128::from(count + 1);
            prop_assert!((got - exact_num).abs() <= i128::from(count + 1));
        }
        // The other class is untouched.
        let other = 1 - class as usize;
        prop_assert_eq!(model.centroids()[other].sample_count(), count);
    }

    #[test]
    fn prop_perceptron_step_is_exact(
        weights in dense_input(),
        intercept in fixed_value(),
        x in dense_input(),
        rate in (1i64..2_000_000_000).prop_map(Fixed::from_raw),
        label in 0u64..2,
    ) {
        let mut model = perceptron(weights.clone(), intercept, rate);
        let data = Features::Dense(x.clone());
        let predicted = model.predict(&data).unwrap();
        model.update(&data, label).unwrap();
        let unit = &model.units()[0];

        if predicted == label {
            for (i, w) in weights.iter().enumerate() {
                prop_assert_eq!(unit.weights.get(i as u32), *w);
            }
            prop_assert_eq!(unit.intercept, intercept);
        } else {
            let step = if label == 1 { rate } else { rate.try_neg().unwrap() };
            for (i, (w, xi)) in weights.iter().zip(&x).enumerate() {
                let expected = w.try_add(step.try_mul(*xi).unwrap()).unwrap();
                prop_assert_eq!(unit.weights.get(i as u32), expected);
            }
            prop_assert_eq!(unit.intercept, intercept.try_add(step).unwrap());
        }
    }
}
