use craft_core::{ActionKey, BlockCategory, Condition, IneligibleAction, Puzzle, PuzzleState};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockedAction {
    pub key: ActionKey,
    pub category: BlockCategory,
    pub reason: String,
}

/// Why each catalog action is unplayable from a given state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub blocked: Vec<BlockedAction>,
}

impl Diagnostics {
    pub fn collect(state: &PuzzleState, puzzle: &Puzzle, condition: &Condition) -> Self {
        let blocked = puzzle
            .catalog
            .iter()
            .filter_map(|action| match state.check(puzzle, action, condition) {
                Ok(_) => None,
                Err(err) => Some(blocked(action.key.clone(), &err)),
            })
            .collect();
        Self { blocked }
    }

    pub fn by_category(&self) -> BTreeMap<BlockCategory, Vec<ActionKey>> {
        let mut grouped: BTreeMap<BlockCategory, Vec<ActionKey>> = BTreeMap::new();
        for entry in &self.blocked {
            grouped
                .entry(entry.category)
                .or_default()
                .push(entry.key.clone());
        }
        grouped
    }

    pub fn all_in(&self, category: BlockCategory) -> bool {
        !self.blocked.is_empty() && self.blocked.iter().all(|entry| entry.category == category)
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    /// One line per category, e.g. `survival: bold_stroke, polish`.
    pub fn summary(&self) -> String {
        self.by_category()
            .iter()
            .map(|(category, keys)| {
                let keys = keys
                    .iter()
                    .map(ActionKey::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{category}: {keys}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn blocked(key: ActionKey, err: &IneligibleAction) -> BlockedAction {
    BlockedAction {
        key,
        category: err.category(),
        reason: err.to_string(),
    }
}
