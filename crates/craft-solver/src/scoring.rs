//! Layered state evaluation.
//!
//! Layers are evaluated in a fixed order and summed; each is a fraction of
//! one target scaled by the combined target magnitude. A new term belongs to
//! exactly one layer.
//!
//! 1. progress toward each target, capped at the target
//! 2. target-met bonus
//! 3. value of useful buffs still held
//! 4. leftover-resource tiebreak
//! 5. overshoot past a target
//! 6. survivability, skipped once both targets are met
//! 7. step efficiency
//! 8. toxicity pressure

use crate::params::ScoreWeights;
use craft_core::{BuffKind, Puzzle, PuzzleState};
use serde::Serialize;

/// Buff durations beyond this many turns add no further value.
const BUFF_HORIZON: f64 = 4.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub progress: f64,
    pub target_met: f64,
    pub buff_value: f64,
    pub tiebreak: f64,
    pub overshoot: f64,
    pub survivability: f64,
    pub steps: f64,
    pub toxicity: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.progress
            + self.target_met
            + self.buff_value
            + self.tiebreak
            + self.overshoot
            + self.survivability
            + self.steps
            + self.toxicity
    }
}

pub fn score(state: &PuzzleState, puzzle: &Puzzle, weights: &ScoreWeights) -> f64 {
    breakdown(state, puzzle, weights).total()
}

/// Score for a state that cannot act at all: it keeps its progress but is
/// charged the death penalty, since the puzzle ends there unfinished.
pub fn failure_score(state: &PuzzleState, puzzle: &Puzzle, weights: &ScoreWeights) -> f64 {
    let mut layers = breakdown(state, puzzle, weights);
    if !puzzle.targets.met(state) {
        layers.survivability = -weights.death_penalty * puzzle.targets.magnitude();
    }
    layers.total()
}

pub fn breakdown(state: &PuzzleState, puzzle: &Puzzle, weights: &ScoreWeights) -> ScoreBreakdown {
    let magnitude = puzzle.targets.magnitude();
    let met = puzzle.targets.met(state);
    let survival_fraction = survival_fraction(state, puzzle);

    let progress = weights.progress
        * (track_fraction(state.completion(), puzzle.targets.completion)
            + track_fraction(state.perfection(), puzzle.targets.perfection))
        / 2.0;

    let target_met = if met { weights.target_met_bonus } else { 0.0 };

    let buff_value = if met {
        0.0
    } else {
        weights.buff_value * buff_strength(state, puzzle)
    };

    let pool_fraction = state.pool() as f64 / puzzle.rules.pool_max.max(1) as f64;
    let tiebreak = weights.tiebreak
        * (pool_fraction + if met { 0.0 } else { survival_fraction });

    let overshoot = -weights.overshoot
        * (excess_fraction(state.completion(), puzzle.targets.completion)
            + excess_fraction(state.perfection(), puzzle.targets.perfection));

    let survivability = if met {
        0.0
    } else if puzzle.is_dead(state) {
        -weights.death_penalty
    } else {
        -weights.low_survival * (1.0 - survival_fraction).powi(2)
    };

    let steps = -weights.step * state.step() as f64;

    let toxicity = match puzzle.rules.max_toxicity {
        Some(cap) if cap > 0 => {
            let pressure = (state.toxicity() as f64 / cap as f64).min(1.0);
            -weights.toxicity * pressure * pressure
        }
        _ => 0.0,
    };

    ScoreBreakdown {
        progress: progress * magnitude,
        target_met: target_met * magnitude,
        buff_value: buff_value * magnitude,
        tiebreak: tiebreak * magnitude,
        overshoot: overshoot * magnitude,
        survivability: survivability * magnitude,
        steps: steps * magnitude,
        toxicity: toxicity * magnitude,
    }
}

fn track_fraction(progress: f64, target: f64) -> f64 {
    if target <= 0.0 {
        1.0
    } else {
        (progress / target).min(1.0)
    }
}

fn excess_fraction(progress: f64, target: f64) -> f64 {
    if target <= 0.0 {
        0.0
    } else {
        (progress - target).max(0.0) / target
    }
}

/// Survival above the floor as a fraction of the starting span.
pub(crate) fn survival_fraction(state: &PuzzleState, puzzle: &Puzzle) -> f64 {
    let floor = puzzle.rules.survival_floor;
    let span = puzzle.targets.survival_ceiling.saturating_sub(floor).max(1) as f64;
    (state.survival().saturating_sub(floor) as f64 / span).clamp(0.0, 1.0)
}

/// Buffs only count while the track they feed is still short of target.
fn buff_strength(state: &PuzzleState, puzzle: &Puzzle) -> f64 {
    let completion_open = state.completion() < puzzle.targets.completion;
    let perfection_open = state.perfection() < puzzle.targets.perfection;
    let span = puzzle.targets.survival_ceiling.max(1) as f64;

    state
        .buffs()
        .iter()
        .map(|(kind, buff)| {
            let duration = (buff.remaining as f64).min(BUFF_HORIZON) / BUFF_HORIZON;
            match kind {
                BuffKind::Focus if completion_open => (buff.magnitude - 1.0).max(0.0) * duration,
                BuffKind::Finesse if perfection_open => {
                    (buff.magnitude - 1.0).max(0.0) * duration
                }
                BuffKind::Momentum if perfection_open => buff.stacks as f64 * buff.magnitude,
                BuffKind::Ward => (1.0 - buff.magnitude).max(0.0) * duration,
                BuffKind::Mend => buff.magnitude * buff.remaining as f64 / span,
                _ => 0.0,
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use craft_core::{BuffState, Catalog, Rules, Stats, Targets};

    fn puzzle() -> Puzzle {
        Puzzle::new(
            Targets::new(130.0, 130.0, 59),
            Rules::default(),
            Stats::default(),
            Catalog::standard().unwrap(),
        )
    }

    #[test]
    fn survival_is_ignored_once_targets_are_met() {
        let puzzle = puzzle();
        let weights = ScoreWeights::default();
        let finished = puzzle.initial_state().with_progress(130.0, 140.0);
        let drained = finished.clone().with_survival(0, 40);
        let full = finished.with_survival(40, 40);
        assert_eq!(
            score(&drained, &puzzle, &weights),
            score(&full, &puzzle, &weights)
        );
    }

    #[test]
    fn any_death_scores_below_any_finish() {
        let puzzle = puzzle();
        let weights = ScoreWeights::default();
        let nearly = puzzle
            .initial_state()
            .with_progress(129.9, 260.0)
            .with_survival(0, 59);
        let barely = puzzle
            .initial_state()
            .with_progress(130.0, 130.0)
            .with_survival(1, 59)
            .with_pool(0)
            .with_step(90);
        assert!(score(&nearly, &puzzle, &weights) < score(&barely, &puzzle, &weights));
    }

    #[test]
    fn layers_scale_with_target_magnitude() {
        let weights = ScoreWeights::default();
        let small = puzzle();
        let mut large = puzzle();
        large.targets = Targets::new(260.0, 260.0, 59);
        let a = small.initial_state().with_progress(65.0, 0.0).with_step(3);
        let b = large.initial_state().with_progress(130.0, 0.0).with_step(3);
        let ratio = score(&b, &large, &weights) / score(&a, &small, &weights);
        assert!((ratio - 2.0).abs() < 1e-9);
    }

    #[test]
    fn overshoot_costs_more_than_it_gains() {
        let puzzle = puzzle();
        let weights = ScoreWeights::default();
        let exact = puzzle.initial_state().with_progress(130.0, 60.0);
        let over = puzzle.initial_state().with_progress(180.0, 60.0);
        let layers = breakdown(&over, &puzzle, &weights);
        assert!(layers.overshoot < 0.0);
        assert!(score(&over, &puzzle, &weights) < score(&exact, &puzzle, &weights));
    }

    #[test]
    fn held_buffs_count_only_for_open_tracks() {
        let puzzle = puzzle();
        let weights = ScoreWeights::default();
        let focused = puzzle
            .initial_state()
            .with_buff(BuffKind::Focus, BuffState::timed(4, 1.5));
        assert!(breakdown(&focused, &puzzle, &weights).buff_value > 0.0);
        let done = focused.with_progress(130.0, 0.0);
        assert_eq!(breakdown(&done, &puzzle, &weights).buff_value, 0.0);
    }

    #[test]
    fn toxicity_pressure_grows_toward_cap() {
        let mut puzzle = puzzle();
        puzzle.rules.max_toxicity = Some(60);
        let weights = ScoreWeights::default();
        let low = breakdown(&puzzle.initial_state().with_toxicity(15), &puzzle, &weights);
        let high = breakdown(&puzzle.initial_state().with_toxicity(45), &puzzle, &weights);
        assert!(high.toxicity < low.toxicity);
        assert!(low.toxicity < 0.0);
    }

    #[test]
    fn stuck_state_is_charged_as_failure() {
        let puzzle = puzzle();
        let weights = ScoreWeights::default();
        let state = puzzle.initial_state().with_progress(100.0, 100.0);
        let stuck = failure_score(&state, &puzzle, &weights);
        assert!(stuck < score(&state, &puzzle, &weights) - 5.0 * puzzle.targets.magnitude());
    }
}
