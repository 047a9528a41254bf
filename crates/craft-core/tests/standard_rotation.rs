use craft_core::{
    BlockCategory, BuffKind, Catalog, Condition, ConditionContext, ConditionKind, Puzzle,
    PuzzleState, Rules, Stats, Targets,
};

fn standard_puzzle() -> Puzzle {
    Puzzle::new(
        Targets::new(130.0, 130.0, 59),
        Rules::default(),
        Stats::default(),
        Catalog::standard().expect("bundled catalog"),
    )
}

fn play(puzzle: &Puzzle, state: &PuzzleState, key: &str) -> PuzzleState {
    let action = puzzle.catalog.by_name(key).expect("action in catalog");
    let (next, _) = state
        .apply(puzzle, action, &Condition::NORMAL)
        .unwrap_or_else(|err| panic!("{key} should be playable: {err}"));
    next
}

#[test]
fn warded_rotation_reaches_both_targets() {
    let puzzle = standard_puzzle();
    let mut state = puzzle.initial_state();
    for key in [
        "ward",
        "bold_stroke",
        "bold_stroke",
        "bold_stroke",
        "finesse",
        "polish",
        "polish",
        "polish",
        "polish",
    ] {
        state = play(&puzzle, &state, key);
    }

    assert!(puzzle.targets.met(&state));
    assert_eq!(state.completion(), 135.0);
    assert!((state.perfection() - 172.5).abs() < 1e-9);
    assert_eq!(state.survival(), 3);
    assert_eq!(state.survival_max(), 50);
    assert_eq!(state.pool(), 233);
    assert_eq!(state.buffs().stacks(BuffKind::Momentum), 4);
    assert!(!state.buffs().is_active(BuffKind::Finesse));
    assert_eq!(state.step(), 9);
}

#[test]
fn flourish_needs_momentum_first() {
    let puzzle = standard_puzzle();
    let flourish = puzzle.catalog.by_name("flourish").unwrap();
    let start = puzzle.initial_state();
    let blocked = start
        .check(&puzzle, flourish, &Condition::NORMAL)
        .unwrap_err();
    assert_eq!(blocked.category(), BlockCategory::Precondition);

    let primed = play(&puzzle, &play(&puzzle, &start, "polish"), "polish");
    let (after, gains) = primed
        .apply(&puzzle, flourish, &Condition::NORMAL)
        .unwrap();
    assert!((gains.perfection - 20.0 * 1.4).abs() < 1e-9);
    assert_eq!(after.buffs().stacks(BuffKind::Momentum), 0);
}

#[test]
fn forecast_conditions_change_costs_and_gains() {
    let puzzle = standard_puzzle();
    let ctx = ConditionContext::from_kinds(
        ConditionKind::Excellent,
        &[ConditionKind::Sturdy, ConditionKind::Pliant],
    );
    let touch = puzzle.catalog.by_name("precise_touch").unwrap();
    let (state, gains) = puzzle
        .initial_state()
        .apply(&puzzle, touch, &ctx.at(0))
        .unwrap();
    assert!((gains.perfection - 150.0).abs() < 1e-9);
    assert_eq!(state.buffs().stacks(BuffKind::Momentum), 2);

    let stroke = puzzle.catalog.by_name("bold_stroke").unwrap();
    let (_, gains) = state.apply(&puzzle, stroke, &ctx.at(1)).unwrap();
    assert_eq!(gains.survival_spent, 5);

    let mend = puzzle.catalog.by_name("mend").unwrap();
    let (_, gains) = state.apply(&puzzle, mend, &ctx.at(2)).unwrap();
    assert_eq!(gains.pool_spent, 44);
}
