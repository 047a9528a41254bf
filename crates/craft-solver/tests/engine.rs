use craft_core::{
    ActionDefinition, BlockCategory, Catalog, ConditionContext, ConditionKind, CostVector,
    Puzzle, PuzzleState, Rules, ScalingStat, Stats, Targets, Track,
};
use craft_solver::search::StateSignature;
use craft_solver::{Search, SearchBudget, SolverParams, Verdict, recommend, search};
use std::time::Duration;

fn standard_puzzle() -> Puzzle {
    Puzzle::new(
        Targets::new(130.0, 130.0, 59),
        Rules::default(),
        Stats::default(),
        Catalog::standard().expect("bundled catalog"),
    )
}

fn deterministic_params() -> SolverParams {
    SolverParams::default().with_budget(SearchBudget::nodes_only(14, 200_000))
}

/// Replays `keys` from `start`, asserting survival stays above the floor
/// until the targets are met.
fn replay(
    puzzle: &Puzzle,
    ctx: &ConditionContext,
    start: &PuzzleState,
    keys: &[craft_core::ActionKey],
) -> PuzzleState {
    let mut state = start.clone();
    for (turn, key) in keys.iter().enumerate() {
        let action = puzzle.catalog.get(key).expect("rotation uses catalog keys");
        let (next, _) = state
            .apply(puzzle, action, &ctx.at(turn))
            .unwrap_or_else(|err| panic!("turn {turn}: {key} not playable: {err}"));
        state = next;
        if !puzzle.targets.met(&state) {
            assert!(
                !puzzle.is_dead(&state),
                "survival hit the floor on turn {turn} after {key}"
            );
        }
    }
    state
}

#[test]
fn fresh_puzzle_gets_a_rotation_that_finishes_alive() {
    let puzzle = standard_puzzle();
    let ctx = ConditionContext::default();
    let start = puzzle.initial_state();

    let verdict = recommend(&start, &puzzle, &ctx, &deterministic_params());
    let recommendation = verdict.recommendation().expect("a playable recommendation");
    assert_eq!(recommendation.rotation.actions[0], recommendation.action);
    assert!(recommendation.rotation.reaches_targets);

    let end = replay(&puzzle, &ctx, &start, &recommendation.rotation.actions);
    assert!(puzzle.targets.met(&end));
    assert!(end.survival() > 0);
    assert_eq!(end, recommendation.rotation.end_state);
}

#[test]
fn forecast_is_consumed_along_the_rotation() {
    let puzzle = standard_puzzle();
    let ctx = ConditionContext::from_kinds(
        ConditionKind::Good,
        &[
            ConditionKind::Excellent,
            ConditionKind::Poor,
            ConditionKind::Sturdy,
            ConditionKind::Normal,
            ConditionKind::Pliant,
            ConditionKind::Malleable,
            ConditionKind::Centered,
            ConditionKind::Good,
        ],
    );
    let start = puzzle.initial_state();
    let verdict = recommend(&start, &puzzle, &ctx, &deterministic_params());
    let recommendation = verdict.recommendation().expect("a playable recommendation");
    let end = replay(&puzzle, &ctx, &start, &recommendation.rotation.actions);
    assert!(puzzle.targets.met(&end));
}

#[test]
fn unaffordable_progress_yields_survival_diagnostics() {
    let heavy = |key: &str, track: Track| {
        ActionDefinition::new(key, CostVector::new(0, 20)).with_gain(
            track,
            40.0,
            ScalingStat::Control,
        )
    };
    let puzzle = Puzzle::new(
        Targets::new(130.0, 130.0, 59),
        Rules::default(),
        Stats::default(),
        Catalog::new(vec![
            heavy("hammer", Track::Completion),
            heavy("burnish", Track::Perfection),
            heavy("temper", Track::Completion),
        ])
        .unwrap(),
    );
    let state = puzzle.initial_state().with_survival(15, 59);

    match recommend(&state, &puzzle, &ConditionContext::default(), &deterministic_params()) {
        Verdict::NoLegalAction(diagnostics) => {
            assert_eq!(diagnostics.blocked.len(), 3);
            assert!(diagnostics.all_in(BlockCategory::Survival));
        }
        other => panic!("expected no legal action, got {other:?}"),
    }
}

#[test]
fn identical_inputs_give_identical_root_results() {
    let puzzle = standard_puzzle();
    let ctx = ConditionContext::from_kinds(ConditionKind::Normal, &[ConditionKind::Good]);
    let state = puzzle.initial_state().with_progress(45.0, 20.0).with_survival(38, 55);
    let params = deterministic_params();

    let first = search(&state, &puzzle, &ctx, &params);
    let second = search(&state, &puzzle, &ctx, &params);
    assert_eq!(first.best_action, second.best_action);
    assert_eq!(first.score.to_bits(), second.score.to_bits());
    assert_eq!(first.stats.nodes, second.stats.nodes);
}

#[test]
fn rotation_follows_the_recorded_best_actions() {
    let puzzle = standard_puzzle();
    let ctx = ConditionContext::default();
    let params = deterministic_params();
    let start = puzzle.initial_state();

    let mut engine = Search::new(&puzzle, &ctx, &params);
    let outcome = engine.run(&start);
    let first = outcome.best_action.clone().expect("playable root");
    assert_eq!(outcome.lines[0].key, first);

    // The root entry records the best raw line, before stall penalties.
    let best_raw = outcome
        .lines
        .iter()
        .map(|line| line.value)
        .fold(f64::NEG_INFINITY, f64::max);
    let root_key = engine.table().best_action(&start).expect("root entry stored");
    let root_line = outcome
        .lines
        .iter()
        .find(|line| &line.key == root_key)
        .expect("root entry names a root line");
    assert_eq!(root_line.value.to_bits(), best_raw.to_bits());
    let root_entry = engine.table().get(&StateSignature::of(&start)).unwrap();
    assert_eq!(root_entry.score.to_bits(), best_raw.to_bits());

    let rotation = craft_solver::rotation::reconstruct(
        engine.table(),
        &puzzle,
        &ctx,
        &start,
        &first,
        params.rotation_limit,
    );

    let mut state = start.clone();
    for (turn, key) in rotation.actions.iter().enumerate() {
        if turn > 0 {
            let recorded = engine
                .table()
                .get(&StateSignature::of(&state))
                .and_then(|entry| entry.best_action.clone());
            assert_eq!(recorded.as_ref(), Some(key), "turn {turn} diverged from the table");
        }
        let action = puzzle.catalog.get(key).unwrap();
        state = state.apply(&puzzle, action, &ctx.at(turn)).unwrap().0;
    }
    assert_eq!(state, rotation.end_state);
}

#[test]
fn lethal_strikes_are_avoided_when_a_safe_line_exists() {
    let puzzle = standard_puzzle();
    let ctx = ConditionContext::default();
    let state = puzzle.initial_state().with_survival(10, 59);

    let verdict = recommend(&state, &puzzle, &ctx, &deterministic_params());
    let recommendation = verdict.recommendation().expect("a playable recommendation");
    let action = puzzle.catalog.get(&recommendation.action).unwrap();
    let (next, _) = state.apply(&puzzle, action, &ctx.at(0)).unwrap();
    assert!(!puzzle.is_dead(&next));
}

#[test]
fn tiny_node_budget_still_recommends() {
    let puzzle = standard_puzzle();
    let params = SolverParams::default().with_budget(SearchBudget::nodes_only(16, 40));
    let verdict = recommend(
        &puzzle.initial_state(),
        &puzzle,
        &ConditionContext::default(),
        &params,
    );
    let recommendation = verdict.recommendation().expect("soft cutoff, not failure");
    assert!(recommendation.stats.budget_exhausted);
    assert!(!recommendation.alternatives.is_empty());
}

#[test]
fn wall_clock_budget_cuts_the_search_short() {
    let puzzle = standard_puzzle();
    let params = SolverParams::default().with_budget(SearchBudget {
        depth: 16,
        nodes: u64::MAX,
        time: Some(Duration::from_nanos(1)),
    });
    let verdict = recommend(
        &puzzle.initial_state(),
        &puzzle,
        &ConditionContext::default(),
        &params,
    );
    let recommendation = verdict.recommendation().expect("soft cutoff, not failure");
    assert!(recommendation.stats.budget_exhausted);
    assert!(!recommendation.rotation.is_empty());
    assert_eq!(recommendation.rotation.actions[0], recommendation.action);
}

#[test]
fn terminal_states_short_circuit() {
    let puzzle = standard_puzzle();
    let ctx = ConditionContext::default();
    let params = deterministic_params();

    let done = puzzle.initial_state().with_progress(130.0, 130.0);
    assert_eq!(recommend(&done, &puzzle, &ctx, &params), Verdict::Finished);

    let broken = puzzle.initial_state().with_survival(0, 40);
    assert_eq!(recommend(&broken, &puzzle, &ctx, &params), Verdict::Failed);
}

#[test]
fn low_runway_recommends_the_protected_stabilize() {
    let tap = ActionDefinition::new("tap", CostVector::new(0, 10)).with_gain(
        Track::Completion,
        13.0,
        ScalingStat::Craftsmanship,
    );
    let mend = ActionDefinition::new("mend", CostVector::new(88, 0)).with_restore(30, 0);
    let puzzle = Puzzle::new(
        Targets::new(130.0, 0.0, 50),
        Rules::default(),
        Stats::default(),
        Catalog::new(vec![tap, mend]).unwrap(),
    );
    let state = puzzle.initial_state().with_survival(5, 50);
    let verdict = recommend(&state, &puzzle, &ConditionContext::default(), &deterministic_params());
    let recommendation = verdict.recommendation().expect("mend is playable");
    assert_eq!(recommendation.action.as_str(), "mend");
    assert_eq!(recommendation.alternatives[0].stall_penalty, 0.0);
}
