use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use craft_core::{
    ActionDefinition, Catalog, CatalogError, Condition, ConditionContext, ConditionKind,
    HostSnapshot, Puzzle, PuzzleState, Resolution,
};
use craft_solver::{SolverParams, Verdict, recommend};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::config::{BenchmarkConfig, ResolvedOutputs, ScenarioConfig};

/// Plays every configured scenario to completion with live success and
/// crit rolls, asking the solver for each move.
pub struct PlayoutRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    scenarios: Vec<PreparedScenario>,
    params: SolverParams,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub playouts: usize,
    pub finished: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub scenarios: Vec<ScenarioSummary>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioSummary {
    pub name: String,
    pub runs: usize,
    pub finished: usize,
    pub failed: usize,
    pub stuck: usize,
    pub turn_limit: usize,
    pub turns: u64,
    pub decision_ms: f64,
}

impl ScenarioSummary {
    fn record(&mut self, result: &PlayoutResult) {
        self.runs += 1;
        self.turns += u64::from(result.turns);
        self.decision_ms += result.decision_ms;
        match result.outcome {
            Outcome::Finished => self.finished += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Stuck => self.stuck += 1,
            Outcome::TurnLimit => self.turn_limit += 1,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.finished as f64 / self.runs as f64
        }
    }

    fn avg_ms_per_decision(&self) -> f64 {
        if self.turns == 0 {
            0.0
        } else {
            self.decision_ms / self.turns as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Finished,
    Failed,
    Stuck,
    TurnLimit,
}

struct PreparedScenario {
    name: String,
    puzzle: Puzzle,
    start: PuzzleState,
    /// Conditions known up front from a snapshot; consumed before sampling.
    opening: Vec<Condition>,
    sampler: ConditionSampler,
    forecast_len: usize,
}

impl PreparedScenario {
    fn load(config: &ScenarioConfig) -> Result<Self, RunnerError> {
        let catalog = match &config.catalog {
            Some(path) => Catalog::from_path(path)?,
            None => Catalog::standard()?,
        };
        let sampler = ConditionSampler::new(config)?;

        let (puzzle, start, opening) = match (&config.snapshot, config.targets) {
            (Some(path), _) => {
                let json = fs::read_to_string(path)?;
                let snapshot =
                    HostSnapshot::from_json(&json).map_err(|source| RunnerError::Snapshot {
                        path: path.clone(),
                        source,
                    })?;
                let (puzzle, state, ctx) = snapshot.into_puzzle(catalog);
                let mut opening = vec![ctx.current()];
                opening.extend_from_slice(ctx.forecast());
                (puzzle, state, opening)
            }
            (None, Some(targets)) => {
                let puzzle = Puzzle::new(targets, config.rules, config.stats, catalog);
                let start = puzzle.initial_state();
                (puzzle, start, Vec::new())
            }
            (None, None) => {
                return Err(RunnerError::Scenario {
                    name: config.name.clone(),
                    message: "scenario has neither targets nor snapshot".to_string(),
                });
            }
        };

        Ok(Self {
            name: config.name.clone(),
            puzzle,
            start,
            opening,
            sampler,
            forecast_len: config.forecast_len,
        })
    }
}

/// Draws the condition for turns past the known window.
struct ConditionSampler {
    kinds: Vec<ConditionKind>,
    index: Option<WeightedIndex<f64>>,
}

impl ConditionSampler {
    fn new(config: &ScenarioConfig) -> Result<Self, RunnerError> {
        if config.conditions.is_empty() {
            return Ok(Self {
                kinds: Vec::new(),
                index: None,
            });
        }
        let kinds = config.conditions.iter().map(|w| w.kind).collect();
        let index = WeightedIndex::new(config.conditions.iter().map(|w| w.weight)).map_err(
            |err| RunnerError::Scenario {
                name: config.name.clone(),
                message: format!("invalid condition weights: {err}"),
            },
        )?;
        Ok(Self {
            kinds,
            index: Some(index),
        })
    }

    fn sample(&self, rng: &mut StdRng) -> Condition {
        match &self.index {
            Some(index) => Condition::of(self.kinds[index.sample(rng)]),
            None => Condition::NORMAL,
        }
    }
}

/// Running totals for one playout.
struct Tally {
    playout: usize,
    seed: u64,
    decision_ms: f64,
    rows: usize,
}

struct PlayoutResult {
    outcome: Outcome,
    turns: u32,
    decision_ms: f64,
    rows: usize,
}

impl PlayoutRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let scenarios = config
            .scenarios
            .iter()
            .map(PreparedScenario::load)
            .collect::<Result<Vec<_>, _>>()?;
        let params = config.search.solver_params();
        let logging_enabled = config.logging.enable_structured;

        Ok(Self {
            config,
            outputs,
            scenarios,
            params,
            logging_enabled,
        })
    }

    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.playouts.seed.unwrap_or(0));
        let mut rows_written = 0usize;
        let mut summaries = Vec::with_capacity(self.scenarios.len());

        for scenario in &self.scenarios {
            let mut summary = ScenarioSummary {
                name: scenario.name.clone(),
                ..ScenarioSummary::default()
            };
            for playout in 0..self.config.playouts.runs {
                let seed = rng.next_u64();
                let result = self.play(&mut writer, scenario, playout, seed)?;
                rows_written += result.rows;
                summary.record(&result);
            }
            summaries.push(summary);
        }

        writer.flush()?;
        write_summary_markdown(&self.outputs.summary_md, &self.config.run_id, &summaries)?;

        Ok(RunSummary {
            playouts: summaries.iter().map(|s| s.runs).sum(),
            finished: summaries.iter().map(|s| s.finished).sum(),
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            scenarios: summaries,
        })
    }

    fn play(
        &self,
        writer: &mut BufWriter<File>,
        scenario: &PreparedScenario,
        playout: usize,
        seed: u64,
    ) -> Result<PlayoutResult, RunnerError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let puzzle = &scenario.puzzle;
        let mut window: VecDeque<Condition> = scenario.opening.iter().copied().collect();
        let mut state = scenario.start.clone();
        let mut tally = Tally {
            playout,
            seed,
            decision_ms: 0.0,
            rows: 0,
        };

        for turn in 0..self.config.playouts.max_turns {
            while window.len() < scenario.forecast_len + 1 {
                window.push_back(scenario.sampler.sample(&mut rng));
            }
            let current = window[0];
            let forecast = window
                .iter()
                .skip(1)
                .take(scenario.forecast_len)
                .copied()
                .collect();
            let ctx = ConditionContext::new(current, forecast);

            let started = Instant::now();
            let verdict = recommend(&state, puzzle, &ctx, &self.params);
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            tally.decision_ms += elapsed_ms;

            let recommendation = match verdict {
                Verdict::Recommend(recommendation) => recommendation,
                Verdict::Finished => {
                    return self.finish(writer, scenario, &tally, &state, Outcome::Finished, turn);
                }
                Verdict::Failed => {
                    return self.finish(writer, scenario, &tally, &state, Outcome::Failed, turn);
                }
                Verdict::NoLegalAction(diagnostics) => {
                    if self.logging_enabled && tracing::enabled!(Level::INFO) {
                        event!(
                            target: "craft_bench::turn",
                            Level::INFO,
                            run_id = %self.config.run_id,
                            scenario = %scenario.name,
                            playout = playout as u32,
                            turn,
                            blocked = %diagnostics.summary(),
                            "playout stuck"
                        );
                    }
                    return self.finish(writer, scenario, &tally, &state, Outcome::Stuck, turn);
                }
            };

            let action = puzzle
                .catalog
                .get(&recommendation.action)
                .ok_or_else(|| RunnerError::Engine {
                    scenario: scenario.name.clone(),
                    turn,
                    message: format!("recommended unknown action '{}'", recommendation.action),
                })?;
            let resolution = roll(&mut rng, action, &current);
            let (next, applied) = state
                .apply_with(puzzle, action, &current, resolution)
                .map_err(|err| RunnerError::Engine {
                    scenario: scenario.name.clone(),
                    turn,
                    message: format!("recommended action '{}' rejected: {err}", action.key),
                })?;

            let (success, crit) = match resolution {
                Resolution::Rolled { success, crit } => (success, crit),
                Resolution::Expected => (true, false),
            };

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                event!(
                    target: "craft_bench::turn",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    scenario = %scenario.name,
                    playout = playout as u32,
                    turn,
                    condition = %current.kind,
                    action = %action.key,
                    success,
                    crit,
                    elapsed_ms
                );
            }

            let row = LogRow::Turn(TurnRow {
                run_id: self.config.run_id.clone(),
                scenario: scenario.name.clone(),
                playout,
                seed,
                turn,
                condition: current.kind,
                action: action.key.to_string(),
                rationale: recommendation.rationale.to_string(),
                follow_up: recommendation.follow_up.as_ref().map(ToString::to_string),
                rotation_len: recommendation.rotation.len(),
                success,
                crit,
                completion_gain: applied.completion,
                perfection_gain: applied.perfection,
                completion: next.completion(),
                perfection: next.perfection(),
                survival: next.survival(),
                survival_max: next.survival_max(),
                pool: next.pool(),
                toxicity: next.toxicity(),
                nodes: recommendation.stats.nodes,
                budget_exhausted: recommendation.stats.budget_exhausted,
                elapsed_ms,
            });
            write_row(writer, &row)?;
            tally.rows += 1;

            state = next;
            window.pop_front();
        }

        let turns = self.config.playouts.max_turns;
        let outcome = if puzzle.targets.met(&state) {
            Outcome::Finished
        } else if puzzle.is_dead(&state) {
            Outcome::Failed
        } else {
            Outcome::TurnLimit
        };
        self.finish(writer, scenario, &tally, &state, outcome, turns)
    }

    fn finish(
        &self,
        writer: &mut BufWriter<File>,
        scenario: &PreparedScenario,
        tally: &Tally,
        state: &PuzzleState,
        outcome: Outcome,
        turns: u32,
    ) -> Result<PlayoutResult, RunnerError> {
        let row = LogRow::Result(ResultRow {
            run_id: self.config.run_id.clone(),
            scenario: scenario.name.clone(),
            playout: tally.playout,
            seed: tally.seed,
            outcome,
            turns,
            completion: state.completion(),
            perfection: state.perfection(),
            survival: state.survival(),
            toxicity: state.toxicity(),
        });
        write_row(writer, &row)?;

        Ok(PlayoutResult {
            outcome,
            turns,
            decision_ms: tally.decision_ms,
            rows: tally.rows + 1,
        })
    }
}

/// Live draw for the action's success and crit chances under `condition`.
fn roll(rng: &mut StdRng, action: &ActionDefinition, condition: &Condition) -> Resolution {
    let success_chance =
        (action.success_chance + condition.modifiers.success_bonus).clamp(0.0, 1.0);
    let crit_chance = (action.crit.chance + action.mastery.crit_chance_bonus).clamp(0.0, 1.0);
    let success = rng.gen_bool(success_chance);
    let crit = success && rng.gen_bool(crit_chance);
    Resolution::Rolled { success, crit }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LogRow {
    Turn(TurnRow),
    Result(ResultRow),
}

#[derive(Debug, Serialize)]
struct TurnRow {
    run_id: String,
    scenario: String,
    playout: usize,
    seed: u64,
    turn: u32,
    condition: ConditionKind,
    action: String,
    rationale: String,
    follow_up: Option<String>,
    rotation_len: usize,
    success: bool,
    crit: bool,
    completion_gain: f64,
    perfection_gain: f64,
    completion: f64,
    perfection: f64,
    survival: u32,
    survival_max: u32,
    pool: u32,
    toxicity: u32,
    nodes: u64,
    budget_exhausted: bool,
    elapsed_ms: f64,
}

#[derive(Debug, Serialize)]
struct ResultRow {
    run_id: String,
    scenario: String,
    playout: usize,
    seed: u64,
    outcome: Outcome,
    turns: u32,
    completion: f64,
    perfection: f64,
    survival: u32,
    toxicity: u32,
}

fn write_row(writer: &mut BufWriter<File>, row: &LogRow) -> Result<(), RunnerError> {
    serde_json::to_writer(&mut *writer, row)?;
    writer.write_all(b"\n")?;
    Ok(())
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_summary_markdown(
    path: &Path,
    run_id: &str,
    summaries: &[ScenarioSummary],
) -> Result<(), RunnerError> {
    let mut out = String::new();
    let _ = writeln!(out, "# Playout summary: {run_id}\n");
    let _ = writeln!(
        out,
        "| scenario | runs | finished | failed | stuck | turn limit | success | avg turns | ms/decision |"
    );
    let _ = writeln!(out, "|---|---:|---:|---:|---:|---:|---:|---:|---:|");
    for s in summaries {
        let avg_turns = if s.runs == 0 {
            0.0
        } else {
            s.turns as f64 / s.runs as f64
        };
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {:.1}% | {:.1} | {:.2} |",
            s.name,
            s.runs,
            s.finished,
            s.failed,
            s.stuck,
            s.turn_limit,
            s.success_rate() * 100.0,
            avg_turns,
            s.avg_ms_per_decision()
        );
    }
    fs::write(path, out)?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("failed to load snapshot {path:?}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("scenario '{name}': {message}")]
    Scenario { name: String, message: String },
    #[error("scenario '{scenario}' turn {turn}: {message}")]
    Engine {
        scenario: String,
        turn: u32,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use craft_core::{CostVector, ScalingStat, Track};

    #[test]
    fn certain_actions_always_succeed() {
        let mut rng = StdRng::seed_from_u64(7);
        let action = ActionDefinition::new("steady", CostVector::new(0, 10)).with_gain(
            Track::Completion,
            30.0,
            ScalingStat::Craftsmanship,
        );
        for _ in 0..32 {
            assert_eq!(
                roll(&mut rng, &action, &Condition::NORMAL),
                Resolution::Rolled {
                    success: true,
                    crit: false
                }
            );
        }
    }

    #[test]
    fn centered_lifts_success_to_certain() {
        let mut rng = StdRng::seed_from_u64(11);
        let action = ActionDefinition::new("gamble", CostVector::new(0, 10))
            .with_gain(Track::Completion, 75.0, ScalingStat::Craftsmanship)
            .with_success_chance(0.75)
            .with_crit(1.0, 1.5);
        for _ in 0..32 {
            assert_eq!(
                roll(&mut rng, &action, &Condition::of(ConditionKind::Centered)),
                Resolution::Rolled {
                    success: true,
                    crit: true
                }
            );
        }
    }

    #[test]
    fn summary_rates_count_finished_runs() {
        let mut summary = ScenarioSummary::default();
        for outcome in [Outcome::Finished, Outcome::Failed, Outcome::Finished, Outcome::Stuck] {
            summary.record(&PlayoutResult {
                outcome,
                turns: 10,
                decision_ms: 5.0,
                rows: 11,
            });
        }
        assert_eq!(summary.runs, 4);
        assert_eq!(summary.finished, 2);
        assert!((summary.success_rate() - 0.5).abs() < 1e-12);
        assert!((summary.avg_ms_per_decision() - 0.5).abs() < 1e-12);
    }
}
