use craft_core::{ActionKey, BuffKind, PuzzleState};
use std::collections::HashMap;

const PROGRESS_QUANTUM: f64 = 100.0;
const MAGNITUDE_QUANTUM: f64 = 1000.0;

/// Canonical key of a puzzle state. Progress is quantised to hundredths and
/// buff magnitudes to thousandths so expected-value noise collapses into one
/// entry; history is left out since it does not affect the future.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateSignature {
    pool: u32,
    survival: u32,
    survival_max: u32,
    completion: i64,
    perfection: i64,
    toxicity: u32,
    buffs: Vec<(BuffKind, u8, i64, u8)>,
    cooldowns: Vec<(ActionKey, u8)>,
    step: u32,
}

impl StateSignature {
    pub fn of(state: &PuzzleState) -> Self {
        Self {
            pool: state.pool(),
            survival: state.survival(),
            survival_max: state.survival_max(),
            completion: quantize(state.completion(), PROGRESS_QUANTUM),
            perfection: quantize(state.perfection(), PROGRESS_QUANTUM),
            toxicity: state.toxicity(),
            buffs: state
                .buffs()
                .iter()
                .map(|(kind, buff)| {
                    (
                        kind,
                        buff.remaining,
                        quantize(buff.magnitude, MAGNITUDE_QUANTUM),
                        buff.stacks,
                    )
                })
                .collect(),
            cooldowns: state
                .cooldowns()
                .iter()
                .map(|(key, turns)| (key.clone(), *turns))
                .collect(),
            step: state.step(),
        }
    }
}

fn quantize(value: f64, quantum: f64) -> i64 {
    (value * quantum).round() as i64
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableEntry {
    pub score: f64,
    pub best_action: Option<ActionKey>,
    /// Remaining depth the score was computed with.
    pub depth: u32,
}

/// Per-search memo of visited states. At equal depth the first result is
/// kept; a deeper result replaces a shallower one.
#[derive(Debug, Default)]
pub struct TranspositionTable {
    entries: HashMap<StateSignature, TableEntry>,
    hits: u64,
    misses: u64,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score of an entry searched at least as deep as `depth`.
    pub fn probe(&mut self, signature: &StateSignature, depth: u32) -> Option<f64> {
        match self.entries.get(signature) {
            Some(entry) if entry.depth >= depth => {
                self.hits += 1;
                Some(entry.score)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn store(
        &mut self,
        signature: StateSignature,
        score: f64,
        best_action: Option<ActionKey>,
        depth: u32,
    ) {
        if let Some(existing) = self.entries.get(&signature) {
            if existing.depth >= depth {
                return;
            }
        }
        self.entries.insert(
            signature,
            TableEntry {
                score,
                best_action,
                depth,
            },
        );
    }

    pub fn get(&self, signature: &StateSignature) -> Option<&TableEntry> {
        self.entries.get(signature)
    }

    pub fn best_action(&self, state: &PuzzleState) -> Option<&ActionKey> {
        self.entries
            .get(&StateSignature::of(state))
            .and_then(|entry| entry.best_action.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> (usize, u64, u64) {
        (self.entries.len(), self.hits, self.misses)
    }
}
