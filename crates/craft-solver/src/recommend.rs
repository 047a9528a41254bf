use crate::diagnostics::Diagnostics;
use crate::params::SolverParams;
use crate::rotation::{self, Rotation};
use crate::search::{RootLine, Search, SearchStats};
use core::fmt;
use craft_core::{
    ActionClass, ActionKey, AppliedGains, ConditionContext, Puzzle, PuzzleState,
};
use serde::Serialize;
use tracing::{Level, event};

/// Short reason attached to a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rationale {
    /// Meets both targets this turn.
    Finish,
    Advance,
    Prepare,
    Stabilize,
    Cleanse,
}

impl Rationale {
    fn for_action(class: ActionClass, finishes: bool) -> Self {
        if finishes {
            return Rationale::Finish;
        }
        match class {
            ActionClass::Progress | ActionClass::Perfection | ActionClass::Hybrid => {
                Rationale::Advance
            }
            ActionClass::Buff => Rationale::Prepare,
            ActionClass::Stabilize => Rationale::Stabilize,
            ActionClass::Utility => Rationale::Cleanse,
        }
    }
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rationale::Finish => "finishes both targets",
            Rationale::Advance => "advances the targets",
            Rationale::Prepare => "sets up a buff for the next turns",
            Rationale::Stabilize => "restores survival runway",
            Rationale::Cleanse => "reduces toxicity",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternative {
    pub action: ActionKey,
    /// 0 for the weakest playable line, 100 for the strongest.
    pub quality: u8,
    pub value: f64,
    pub stall_penalty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub action: ActionKey,
    pub label: String,
    pub class: ActionClass,
    pub expected: AppliedGains,
    pub rationale: Rationale,
    pub follow_up: Option<ActionKey>,
    /// Every playable action, best first; includes the recommended one.
    pub alternatives: Vec<Alternative>,
    pub rotation: Rotation,
    pub score: f64,
    pub stats: SearchStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Recommend(Box<Recommendation>),
    /// Targets are already met.
    Finished,
    /// Survival is already at or below the floor.
    Failed,
    NoLegalAction(Diagnostics),
}

impl Verdict {
    pub fn recommendation(&self) -> Option<&Recommendation> {
        match self {
            Verdict::Recommend(recommendation) => Some(recommendation),
            _ => None,
        }
    }
}

/// Decides the next action for `state`. All tables live only for this call.
pub fn recommend(
    state: &PuzzleState,
    puzzle: &Puzzle,
    conditions: &ConditionContext,
    params: &SolverParams,
) -> Verdict {
    if puzzle.targets.met(state) {
        return Verdict::Finished;
    }
    if puzzle.is_dead(state) {
        return Verdict::Failed;
    }

    let mut search = Search::new(puzzle, conditions, params);
    let outcome = search.run(state);
    let Some(best) = outcome.lines.first() else {
        let diagnostics = Diagnostics::collect(state, puzzle, &conditions.current());
        log_no_legal_action(state, &diagnostics);
        return Verdict::NoLegalAction(diagnostics);
    };

    let Some(action) = puzzle.catalog.get(&best.key) else {
        let diagnostics = Diagnostics::collect(state, puzzle, &conditions.current());
        return Verdict::NoLegalAction(diagnostics);
    };

    let rotation = rotation::reconstruct(
        search.table(),
        puzzle,
        conditions,
        state,
        &best.key,
        params.rotation_limit,
    );
    let finishes = rotation.actions.len() == 1 && rotation.reaches_targets;

    let recommendation = Recommendation {
        action: best.key.clone(),
        label: action.label.clone(),
        class: action.class(),
        expected: best.gains,
        rationale: Rationale::for_action(action.class(), finishes),
        follow_up: rotation.follow_up().cloned(),
        alternatives: rate_alternatives(&outcome.lines),
        score: outcome.score,
        stats: outcome.stats,
        rotation,
    };
    log_recommendation(state, &recommendation);
    Verdict::Recommend(Box::new(recommendation))
}

/// Linear 0..=100 rating over stall-adjusted line values.
fn rate_alternatives(lines: &[RootLine]) -> Vec<Alternative> {
    let (min, max) = lines
        .iter()
        .map(RootLine::adjusted)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), value| {
            (lo.min(value), hi.max(value))
        });
    let spread = max - min;

    lines
        .iter()
        .map(|line| {
            let quality = if spread > f64::EPSILON {
                ((line.adjusted() - min) / spread * 100.0).round() as u8
            } else {
                100
            };
            Alternative {
                action: line.key.clone(),
                quality,
                value: line.value,
                stall_penalty: line.stall_penalty,
            }
        })
        .collect()
}

fn log_recommendation(state: &PuzzleState, recommendation: &Recommendation) {
    if !tracing::enabled!(Level::INFO) {
        return;
    }

    let rotation = recommendation
        .rotation
        .actions
        .iter()
        .map(ActionKey::as_str)
        .collect::<Vec<_>>()
        .join(",");

    event!(
        target: "craft_solver::recommend",
        Level::INFO,
        step = state.step(),
        survival = state.survival(),
        pool = state.pool(),
        chosen = %recommendation.action,
        rationale = %recommendation.rationale,
        alternatives = recommendation.alternatives.len(),
        rotation = %rotation,
        nodes = recommendation.stats.nodes,
        budget_exhausted = recommendation.stats.budget_exhausted,
    );
}

fn log_no_legal_action(state: &PuzzleState, diagnostics: &Diagnostics) {
    if !tracing::enabled!(Level::INFO) {
        return;
    }

    event!(
        target: "craft_solver::recommend",
        Level::INFO,
        step = state.step(),
        survival = state.survival(),
        pool = state.pool(),
        blocked = diagnostics.blocked.len(),
        summary = %diagnostics.summary(),
        "no legal action"
    );
}
