use std::time::Duration;

use fedavg_orchestration::{
    aggregation::AggregationWarning, AggregateErr, Aggregator, FedAvg, ParameterSet,
    ParticipantId, Tensor, Update,
};
use tokio_test::{assert_err, assert_ok};

fn update(id: usize, samples: usize, w: &[f32], b: f32) -> Update {
    let mut params = ParameterSet::new();
    params.insert("layer.weight", Tensor::new(vec![2, w.len() / 2], w.to_vec()).unwrap());
    params.insert("layer.bias", Tensor::scalar(b));
    Update::new(ParticipantId(id), params, samples, Duration::from_millis(1))
}

#[test]
fn two_participants_scalar_average() {
    let mut a = ParameterSet::new();
    a.insert("w", Tensor::scalar(1.0));
    let mut b = ParameterSet::new();
    b.insert("w", Tensor::scalar(2.0));

    let agg = assert_ok!(FedAvg::new().combine(vec![
        Update::new(ParticipantId(0), a, 100, Duration::ZERO),
        Update::new(ParticipantId(1), b, 300, Duration::ZERO),
    ]));

    assert_eq!(agg.params.get("w").unwrap().values(), &[1.75]);
}

#[test]
fn output_is_the_sample_weighted_mean() {
    let updates = vec![
        update(4, 12, &[0.5, -1.0, 2.0, 0.0], 0.1),
        update(1, 250, &[1.5, 3.0, -2.0, 7.0], -0.4),
        update(9, 3, &[-8.0, 0.25, 1.0, 1.0], 2.0),
    ];

    let total: f64 = updates.iter().map(|u| u.sample_count() as f64).sum();
    let expected = |key: &str, i: usize| -> f64 {
        updates
            .iter()
            .map(|u| u.sample_count() as f64 / total * u.params().get(key).unwrap().values()[i] as f64)
            .sum()
    };
    let expected_weight: Vec<f64> = (0..4).map(|i| expected("layer.weight", i)).collect();
    let expected_bias = expected("layer.bias", 0);

    let agg = assert_ok!(FedAvg::new().combine(updates.clone()));
    let weight = agg.params.get("layer.weight").unwrap();
    assert_eq!(weight.shape(), &[2, 2]);

    for (got, want) in weight.values().iter().zip(&expected_weight) {
        assert!((*got as f64 - want).abs() < 1e-6, "{got} != {want}");
    }
    assert!((agg.params.get("layer.bias").unwrap().values()[0] as f64 - expected_bias).abs() < 1e-6);
    assert_eq!(agg.total_samples, 265);
}

#[test]
fn weights_sum_to_one() {
    let updates = (0..7)
        .map(|i| {
            let mut params = ParameterSet::new();
            params.insert("w", Tensor::scalar(1.0));
            Update::new(ParticipantId(i), params, 1 + i * 37, Duration::ZERO)
        })
        .collect();

    let agg = assert_ok!(FedAvg::new().combine(updates));
    let w = agg.params.get("w").unwrap().values()[0] as f64;
    assert!((w - 1.0).abs() < 1e-9);
}

#[test]
fn permutations_give_identical_results() {
    let updates: Vec<_> = (0..6)
        .map(|i| {
            let v = (i as f32 * 0.37).sin();
            update(i, 10 + i * 13, &[v, -v, v * 3.0, 1.0 / (1.0 + v)], v * v)
        })
        .collect();

    let expected = assert_ok!(FedAvg::new().combine(updates.clone()));

    let mut permuted = updates.clone();
    for shift in 1..updates.len() {
        permuted.rotate_left(1);
        permuted.swap(0, shift);
        assert_eq!(assert_ok!(FedAvg::new().combine(permuted.clone())), expected);
    }
}

#[test]
fn later_duplicate_determines_the_contribution() {
    let agg = assert_ok!(FedAvg::new().combine(vec![
        update(2, 100, &[9.0, 9.0], 9.0),
        update(5, 100, &[1.0, 1.0], 1.0),
        update(2, 100, &[3.0, 3.0], 3.0),
    ]));

    assert_eq!(agg.params.get("layer.bias").unwrap().values(), &[2.0]);
    assert_eq!(agg.contributors, vec![ParticipantId(2), ParticipantId(5)]);
    assert_eq!(
        agg.warnings,
        vec![AggregationWarning::DuplicateUpdate {
            participant: ParticipantId(2)
        }]
    );
}

#[test]
fn nothing_to_combine() {
    assert_eq!(assert_err!(FedAvg::new().combine(vec![])), AggregateErr::NoUpdates);
}
