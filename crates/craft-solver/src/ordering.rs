use crate::params::SolverParams;
use crate::scoring;
use craft_core::{
    ActionClass, ActionDefinition, ActionPreview, AppliedGains, BlockCategory, Condition,
    IneligibleAction, Puzzle, PuzzleState, Resolution, ResolvedCosts, Track,
};

/// One candidate after ranking. Blocked candidates keep their reason and sort
/// after every playable one.
#[derive(Debug, Clone)]
pub struct RankedAction<'p> {
    pub action: &'p ActionDefinition,
    pub priority: f64,
    pub outcome: Result<(PuzzleState, AppliedGains), IneligibleAction>,
}

impl<'p> RankedAction<'p> {
    pub fn is_eligible(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn child(&self) -> Option<&PuzzleState> {
        self.outcome.as_ref().ok().map(|(state, _)| state)
    }
}

/// Pre-search ranking plus the stall penalty that biases the final pick.
pub struct MoveOrderer<'p> {
    puzzle: &'p Puzzle,
    params: &'p SolverParams,
}

impl<'p> MoveOrderer<'p> {
    pub fn new(puzzle: &'p Puzzle, params: &'p SolverParams) -> Self {
        Self { puzzle, params }
    }

    /// Ranks `actions` by score gained this turn minus stall penalty. Output
    /// has the same length as the input; ties keep input order.
    pub fn order(
        &self,
        state: &PuzzleState,
        actions: &[&'p ActionDefinition],
        condition: &Condition,
    ) -> Vec<RankedAction<'p>> {
        let weights = &self.params.weights;
        let base = scoring::score(state, self.puzzle, weights);

        let mut ranked: Vec<(usize, RankedAction<'p>)> = actions
            .iter()
            .copied()
            .enumerate()
            .map(|(index, action)| {
                let outcome = state.apply(self.puzzle, action, condition);
                let priority = match &outcome {
                    Ok((child, _)) => {
                        scoring::score(child, self.puzzle, weights) - base
                            - self.stall_penalty(state, action, condition)
                    }
                    Err(_) => f64::NEG_INFINITY,
                };
                (
                    index,
                    RankedAction {
                        action,
                        priority,
                        outcome,
                    },
                )
            })
            .collect();

        ranked.sort_by(|(ia, a), (ib, b)| {
            b.priority
                .total_cmp(&a.priority)
                .then_with(|| ia.cmp(ib))
        });
        ranked.into_iter().map(|(_, entry)| entry).collect()
    }

    pub fn order_catalog(
        &self,
        state: &PuzzleState,
        condition: &Condition,
    ) -> Vec<RankedAction<'p>> {
        let actions: Vec<&'p ActionDefinition> = self.puzzle.catalog.iter().collect();
        self.order(state, &actions, condition)
    }

    /// Deduction for an action that spends a turn without moving a target.
    /// Progress actions are never penalised.
    pub fn stall_penalty(
        &self,
        state: &PuzzleState,
        action: &ActionDefinition,
        condition: &Condition,
    ) -> f64 {
        let class = action.class();
        if class.makes_progress() {
            return 0.0;
        }
        let unit = self.params.stall_weight * self.puzzle.targets.magnitude();

        let mut penalty = match class {
            ActionClass::Stabilize => {
                if self.stabilize_protected(state, condition) {
                    return 0.0;
                }
                if state.survival() >= state.survival_max() {
                    2.0 * unit
                } else {
                    unit
                }
            }
            ActionClass::Buff => {
                let refresh = action.grants.iter().any(|grant| {
                    !grant.kind.is_persistent() && state.buffs().remaining(grant.kind) > 1
                });
                if refresh { unit } else { 0.0 }
            }
            ActionClass::Utility => {
                if action.costs.toxicity < 0 && state.toxicity() == 0 {
                    unit
                } else {
                    0.0
                }
            }
            ActionClass::Progress | ActionClass::Perfection | ActionClass::Hybrid => 0.0,
        };

        if state.last_action() == Some(&action.key) {
            penalty += unit;
        }
        penalty
    }

    /// A stabilize action is exempt from the stall penalty while it can still
    /// raise survival and either every progress action would spend the last
    /// of the runway, or finishing needs more turns than the runway allows.
    pub fn stabilize_protected(&self, state: &PuzzleState, condition: &Condition) -> bool {
        if state.survival() >= state.survival_max() {
            return false;
        }
        let runway = state
            .survival()
            .saturating_sub(self.puzzle.rules.survival_floor);

        let progress_costs: Vec<u32> = self
            .puzzle
            .catalog
            .iter()
            .filter(|action| action.class().makes_progress())
            .filter(|action| !blocked_by_rule(state, self.puzzle, action, condition))
            .map(|action| ResolvedCosts::resolve(action, condition, state.buffs()).survival)
            .collect();

        if !progress_costs.is_empty() && progress_costs.iter().all(|cost| *cost >= runway) {
            return true;
        }

        let Some(per_turn) = progress_costs.iter().copied().filter(|cost| *cost > 0).min()
        else {
            return false;
        };
        let runway_turns = runway / per_turn;
        match self.turns_to_finish(state, condition) {
            Some(turns) => turns > runway_turns,
            None => true,
        }
    }

    /// Optimistic turns left: each open track repeats its best available gain.
    /// `None` when some open track has no action that advances it.
    pub fn turns_to_finish(&self, state: &PuzzleState, condition: &Condition) -> Option<u32> {
        let mut turns = 0u32;
        for track in [Track::Completion, Track::Perfection] {
            let remaining = self.puzzle.targets.target(track) - state.progress(track);
            if remaining <= 0.0 {
                continue;
            }
            let best = self
                .puzzle
                .catalog
                .iter()
                .filter(|action| !blocked_by_rule(state, self.puzzle, action, condition))
                .map(|action| {
                    ActionPreview::compute(
                        &self.puzzle.stats,
                        state.buffs(),
                        action,
                        condition,
                        Resolution::Expected,
                    )
                    .gain(track)
                })
                .fold(0.0_f64, f64::max);
            if best <= 0.0 {
                return None;
            }
            turns += (remaining / best - 1e-9).ceil().max(0.0) as u32;
        }
        Some(turns)
    }
}

/// Cooldowns and preconditions keep an action off the table regardless of
/// resources; pool or survival shortfalls do not.
fn blocked_by_rule(
    state: &PuzzleState,
    puzzle: &Puzzle,
    action: &ActionDefinition,
    condition: &Condition,
) -> bool {
    matches!(
        state.check(puzzle, action, condition).map_err(|err| err.category()),
        Err(BlockCategory::Cooldown | BlockCategory::Precondition)
    )
}
