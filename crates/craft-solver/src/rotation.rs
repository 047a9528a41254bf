use crate::search::TranspositionTable;
use craft_core::{ActionKey, ConditionContext, Puzzle, PuzzleState};
use serde::Serialize;

/// Action sequence the search settled on, and where it leads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rotation {
    pub actions: Vec<ActionKey>,
    pub end_state: PuzzleState,
    pub reaches_targets: bool,
}

impl Rotation {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn follow_up(&self) -> Option<&ActionKey> {
        self.actions.get(1)
    }
}

/// Plays `first` from `root`, then follows the best action recorded in the
/// table for each successor. Never re-ranks: the walk stops where the table
/// has no recommendation, at a terminal state, or at `limit` actions.
pub fn reconstruct(
    table: &TranspositionTable,
    puzzle: &Puzzle,
    conditions: &ConditionContext,
    root: &PuzzleState,
    first: &ActionKey,
    limit: usize,
) -> Rotation {
    let mut actions = Vec::new();
    let mut current = root.clone();
    let mut next = Some(first.clone());

    while let Some(key) = next.take() {
        if actions.len() >= limit {
            break;
        }
        let Some(action) = puzzle.catalog.get(&key) else {
            break;
        };
        let condition = conditions.at(actions.len());
        let Ok((successor, _)) = current.apply(puzzle, action, &condition) else {
            break;
        };
        actions.push(key);
        current = successor;

        if puzzle.targets.met(&current) || puzzle.is_dead(&current) {
            break;
        }
        next = table.best_action(&current).cloned();
    }

    Rotation {
        reaches_targets: puzzle.targets.met(&current),
        actions,
        end_state: current,
    }
}
