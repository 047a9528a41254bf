//! Bounded, memoised best-first search.
//!
//! The root expands every playable action. Interior nodes expand a beam of the
//! best-ranked children whose width shrinks the further the node is from the
//! horizon. Every interior result is written to the transposition table, and
//! rotations are read back from it rather than re-derived.

mod table;

pub use table::{StateSignature, TableEntry, TranspositionTable};

use crate::ordering::MoveOrderer;
use crate::params::SolverParams;
use crate::scoring;
use craft_core::{ActionKey, AppliedGains, ConditionContext, Puzzle, PuzzleState};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{Level, event};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchStats {
    pub nodes: u64,
    pub elapsed: Duration,
    pub depth: u32,
    pub table_entries: usize,
    pub table_hits: u64,
    pub budget_exhausted: bool,
}

/// A root action with the value its subtree reached.
#[derive(Debug, Clone, PartialEq)]
pub struct RootLine {
    pub key: ActionKey,
    pub value: f64,
    pub stall_penalty: f64,
    pub gains: AppliedGains,
}

impl RootLine {
    pub fn adjusted(&self) -> f64 {
        self.value - self.stall_penalty
    }
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Search value of the chosen root action.
    pub score: f64,
    /// Highest stall-adjusted root line; `None` when nothing is playable.
    /// The root's table entry keeps the best raw line instead, so this may
    /// differ from `table().best_action(root)`.
    pub best_action: Option<ActionKey>,
    /// Root lines ordered best first by adjusted value.
    pub lines: Vec<RootLine>,
    pub stats: SearchStats,
}

pub struct Search<'p> {
    puzzle: &'p Puzzle,
    conditions: &'p ConditionContext,
    params: &'p SolverParams,
    orderer: MoveOrderer<'p>,
    table: TranspositionTable,
    nodes: u64,
    started: Instant,
    exhausted: bool,
}

impl<'p> Search<'p> {
    pub fn new(
        puzzle: &'p Puzzle,
        conditions: &'p ConditionContext,
        params: &'p SolverParams,
    ) -> Self {
        Self {
            puzzle,
            conditions,
            params,
            orderer: MoveOrderer::new(puzzle, params),
            table: TranspositionTable::new(),
            nodes: 0,
            started: Instant::now(),
            exhausted: false,
        }
    }

    pub fn table(&self) -> &TranspositionTable {
        &self.table
    }

    pub fn run(&mut self, root: &PuzzleState) -> SearchOutcome {
        self.started = Instant::now();
        self.nodes = 0;
        self.exhausted = false;

        let depth = self.params.budget.depth.max(1);
        let condition = self.conditions.at(0);
        let ranked = self.orderer.order_catalog(root, &condition);

        let mut lines = Vec::new();
        let mut best_raw: Option<(f64, ActionKey)> = None;
        for entry in ranked {
            let Ok((child, gains)) = entry.outcome else {
                continue;
            };
            let value = self.expand(&child, 1, depth - 1);
            if best_raw.as_ref().is_none_or(|(best, _)| value > *best) {
                best_raw = Some((value, entry.action.key.clone()));
            }
            lines.push(RootLine {
                key: entry.action.key.clone(),
                value,
                stall_penalty: self.orderer.stall_penalty(root, entry.action, &condition),
                gains,
            });
        }

        // Stall penalties stay out of the table: the root entry records the
        // raw winner so deeper probes of this state see search values only.
        if let Some((value, key)) = &best_raw {
            self.table
                .store(StateSignature::of(root), *value, Some(key.clone()), depth);
        }

        lines.sort_by(|a, b| b.adjusted().total_cmp(&a.adjusted()));
        let best = lines.first();
        let outcome = SearchOutcome {
            score: best.map_or_else(
                || scoring::failure_score(root, self.puzzle, &self.params.weights),
                |line| line.value,
            ),
            best_action: best.map(|line| line.key.clone()),
            stats: self.stats(depth),
            lines,
        };

        if self.exhausted {
            event!(
                target: "craft_solver::search",
                Level::DEBUG,
                nodes = outcome.stats.nodes,
                elapsed_ms = outcome.stats.elapsed.as_millis() as u64,
                depth,
                "search budget exhausted; returning best line found so far"
            );
        }
        outcome
    }

    fn stats(&self, depth: u32) -> SearchStats {
        let (entries, hits, _) = self.table.stats();
        SearchStats {
            nodes: self.nodes,
            elapsed: self.started.elapsed(),
            depth,
            table_entries: entries,
            table_hits: hits,
            budget_exhausted: self.exhausted,
        }
    }

    fn budget_spent(&mut self) -> bool {
        if self.exhausted {
            return true;
        }
        let budget = &self.params.budget;
        let out_of_time = budget
            .time
            .is_some_and(|limit| self.started.elapsed() >= limit);
        if self.nodes >= budget.nodes || out_of_time {
            self.exhausted = true;
        }
        self.exhausted
    }

    /// Value of `state`, `ply` turns below the root with `depth` plies left.
    fn expand(&mut self, state: &PuzzleState, ply: usize, depth: u32) -> f64 {
        self.nodes += 1;
        let puzzle = self.puzzle;
        let weights = &self.params.weights;

        if puzzle.targets.met(state) || puzzle.is_dead(state) {
            return scoring::score(state, puzzle, weights);
        }

        let signature = StateSignature::of(state);
        if let Some(score) = self.table.probe(&signature, depth) {
            return score;
        }

        if depth == 0 {
            let score = scoring::score(state, puzzle, weights);
            self.table.store(signature, score, None, 0);
            return score;
        }

        if self.budget_spent() {
            return scoring::score(state, puzzle, weights);
        }

        let condition = self.conditions.at(ply);
        let width = self.params.beam.width(depth);
        let children: Vec<_> = self
            .orderer
            .order_catalog(state, &condition)
            .into_iter()
            .filter_map(|entry| {
                let key = entry.action.key.clone();
                entry.outcome.ok().map(|(child, _)| (key, child))
            })
            .take(width)
            .collect();

        if children.is_empty() {
            let score = scoring::failure_score(state, puzzle, weights);
            self.table.store(signature, score, None, depth);
            return score;
        }

        let mut best: Option<(f64, ActionKey)> = None;
        for (key, child) in children {
            let value = self.expand(&child, ply + 1, depth - 1);
            if best.as_ref().is_none_or(|(score, _)| value > *score) {
                best = Some((value, key));
            }
            if self.budget_spent() {
                break;
            }
        }

        match best {
            Some((score, key)) => {
                self.table.store(signature, score, Some(key), depth);
                score
            }
            None => scoring::score(state, puzzle, weights),
        }
    }
}

/// Runs one search from `state` with the budgets in `params`.
pub fn search(
    state: &PuzzleState,
    puzzle: &Puzzle,
    conditions: &ConditionContext,
    params: &SolverParams,
) -> SearchOutcome {
    Search::new(puzzle, conditions, params).run(state)
}
