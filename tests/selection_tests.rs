use labelkit::{
    select_for_labeling, HardMiningStrategy, Prediction, RandomSamplingStrategy, SelectionContext,
    SelectionError, StrategyKind,
};

fn context() -> SelectionContext<'static> {
    SelectionContext {
        workspace_id: "workspace-1",
        dataset_name: "support-tickets",
        category_name: "urgent",
    }
}

fn predictions(scores: &[f32]) -> Vec<Prediction> {
    scores
        .iter()
        .map(|&score| Prediction::new(score).unwrap())
        .collect()
}

#[test]
fn hard_mining_prefers_boundary_items() {
    let candidates = ["A", "B", "C", "D"];
    let preds = predictions(&[0.5, 0.9, 0.4, 0.1]);

    let picked =
        select_for_labeling(&HardMiningStrategy, &context(), &candidates, &preds, 2).unwrap();
    assert_eq!(picked, [&"A", &"C"]);
}

#[test]
fn tied_uncertainties_keep_input_order() {
    let candidates = ["X", "Y"];
    let preds = predictions(&[0.3, 0.7]);

    let picked =
        select_for_labeling(&HardMiningStrategy, &context(), &candidates, &preds, 1).unwrap();
    assert_eq!(picked, [&"X"]);
}

#[test]
fn never_returns_more_than_the_pool() {
    let candidates = ["A", "B", "C"];
    let preds = predictions(&[0.2, 0.6, 0.8]);

    for sample_size in 0..6 {
        let picked = select_for_labeling(
            &HardMiningStrategy,
            &context(),
            &candidates,
            &preds,
            sample_size,
        )
        .unwrap();
        assert_eq!(picked.len(), sample_size.min(candidates.len()));
    }
}

#[test]
fn mismatched_inputs_error_before_scoring() {
    let candidates = ["A"];
    let preds = predictions(&[0.5, 0.5]);

    let err = select_for_labeling(&HardMiningStrategy, &context(), &candidates, &preds, 1)
        .unwrap_err();
    assert!(matches!(err, SelectionError::LengthMismatch { .. }));
}

#[test]
fn strategies_are_swappable_by_configuration() {
    let candidates: Vec<usize> = (0..20).collect();
    let preds = predictions(&vec![0.5; 20]);

    for kind in [StrategyKind::HardMining, StrategyKind::RandomSampling] {
        let strategy = kind.build();
        let picked =
            select_for_labeling(strategy.as_ref(), &context(), &candidates, &preds, 5).unwrap();
        assert_eq!(picked.len(), 5);
    }
}

#[test]
fn candidates_are_opaque_to_the_ranker() {
    // The ranker never inspects candidate payloads, only their predictions.
    #[derive(Debug, PartialEq)]
    struct Document {
        uri: String,
    }

    let candidates = [
        Document { uri: "doc://1".into() },
        Document { uri: "doc://2".into() },
    ];
    let preds = predictions(&[0.9, 0.55]);

    let picked =
        select_for_labeling(&HardMiningStrategy, &context(), &candidates, &preds, 1).unwrap();
    assert_eq!(picked[0].uri, "doc://2");
}

#[test]
fn random_strategy_with_seed_is_reproducible_across_calls() {
    let candidates: Vec<usize> = (0..100).collect();
    let preds = predictions(&vec![0.5; 100]);
    let strategy = RandomSamplingStrategy::seeded(1234);

    let first = select_for_labeling(&strategy, &context(), &candidates, &preds, 10).unwrap();
    let second = select_for_labeling(&strategy, &context(), &candidates, &preds, 10).unwrap();
    assert_eq!(first, second);
}
