use crate::model::action::{ActionDefinition, ActionKey, Track};
use crate::model::buff::{BuffKind, BuffState, Buffs};
use crate::model::condition::Condition;
use crate::model::effect::{ActionPreview, Resolution, ResolvedCosts};
use crate::model::eligibility::IneligibleAction;
use crate::model::puzzle::Puzzle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of every puzzle variable at one turn. Transitions never mutate a
/// state; they return the successor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PuzzleStateRecord")]
pub struct PuzzleState {
    pool: u32,
    survival: u32,
    survival_max: u32,
    completion: f64,
    perfection: f64,
    toxicity: u32,
    buffs: Buffs,
    cooldowns: BTreeMap<ActionKey, u8>,
    step: u32,
    history: Vec<ActionKey>,
}

/// Wire form of a host-reported state, checked before it becomes a
/// [`PuzzleState`].
#[derive(Deserialize)]
struct PuzzleStateRecord {
    pool: u32,
    survival: u32,
    survival_max: u32,
    completion: f64,
    perfection: f64,
    #[serde(default)]
    toxicity: u32,
    #[serde(default)]
    buffs: Buffs,
    #[serde(default)]
    cooldowns: BTreeMap<ActionKey, u8>,
    #[serde(default)]
    step: u32,
    #[serde(default)]
    history: Vec<ActionKey>,
}

impl TryFrom<PuzzleStateRecord> for PuzzleState {
    type Error = String;

    fn try_from(record: PuzzleStateRecord) -> Result<Self, Self::Error> {
        if record.survival > record.survival_max {
            return Err(format!(
                "survival {} exceeds survival_max {}",
                record.survival, record.survival_max
            ));
        }
        for (track, value) in [
            ("completion", record.completion),
            ("perfection", record.perfection),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{track} must be a finite non-negative number, got {value}"));
            }
        }
        let mut cooldowns = record.cooldowns;
        cooldowns.retain(|_, turns| *turns > 0);

        Ok(Self {
            pool: record.pool,
            survival: record.survival,
            survival_max: record.survival_max,
            completion: record.completion,
            perfection: record.perfection,
            toxicity: record.toxicity,
            buffs: record.buffs,
            cooldowns,
            step: record.step,
            history: record.history,
        })
    }
}

/// What one transition actually changed, after clamping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliedGains {
    pub completion: f64,
    pub perfection: f64,
    pub pool_spent: u32,
    pub survival_spent: u32,
    pub survival_restored: u32,
    pub toxicity_delta: i32,
}

impl PuzzleState {
    pub fn new(pool: u32, survival_ceiling: u32) -> Self {
        Self {
            pool,
            survival: survival_ceiling,
            survival_max: survival_ceiling,
            completion: 0.0,
            perfection: 0.0,
            toxicity: 0,
            buffs: Buffs::new(),
            cooldowns: BTreeMap::new(),
            step: 0,
            history: Vec::new(),
        }
    }

    pub fn with_pool(mut self, pool: u32) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_survival(mut self, survival: u32, survival_max: u32) -> Self {
        self.survival_max = survival_max;
        self.survival = survival.min(survival_max);
        self
    }

    pub fn with_progress(mut self, completion: f64, perfection: f64) -> Self {
        self.completion = completion.max(0.0);
        self.perfection = perfection.max(0.0);
        self
    }

    pub fn with_toxicity(mut self, toxicity: u32) -> Self {
        self.toxicity = toxicity;
        self
    }

    pub fn with_buff(mut self, kind: BuffKind, buff: BuffState) -> Self {
        self.buffs.insert(kind, buff);
        self
    }

    pub fn with_cooldown(mut self, key: impl Into<ActionKey>, turns: u8) -> Self {
        let key = key.into();
        if turns == 0 {
            self.cooldowns.remove(&key);
        } else {
            self.cooldowns.insert(key, turns);
        }
        self
    }

    pub fn with_step(mut self, step: u32) -> Self {
        self.step = step;
        self
    }

    pub fn pool(&self) -> u32 {
        self.pool
    }

    pub fn survival(&self) -> u32 {
        self.survival
    }

    pub fn survival_max(&self) -> u32 {
        self.survival_max
    }

    pub fn completion(&self) -> f64 {
        self.completion
    }

    pub fn perfection(&self) -> f64 {
        self.perfection
    }

    pub fn progress(&self, track: Track) -> f64 {
        match track {
            Track::Completion => self.completion,
            Track::Perfection => self.perfection,
        }
    }

    pub fn toxicity(&self) -> u32 {
        self.toxicity
    }

    pub fn buffs(&self) -> &Buffs {
        &self.buffs
    }

    pub fn cooldowns(&self) -> &BTreeMap<ActionKey, u8> {
        &self.cooldowns
    }

    pub fn cooldown(&self, key: &ActionKey) -> u8 {
        self.cooldowns.get(key).copied().unwrap_or(0)
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn history(&self) -> &[ActionKey] {
        &self.history
    }

    pub fn last_action(&self) -> Option<&ActionKey> {
        self.history.last()
    }

    /// Resolved costs if `action` is playable here, else the first blocking
    /// reason in a fixed order: cooldown, condition, buff stacks, pool,
    /// survival, toxicity.
    pub fn check(
        &self,
        puzzle: &Puzzle,
        action: &ActionDefinition,
        condition: &Condition,
    ) -> Result<ResolvedCosts, IneligibleAction> {
        let turns = self.cooldown(&action.key);
        if turns > 0 {
            return Err(IneligibleAction::OnCooldown { turns });
        }

        if !action.requires_condition.is_empty()
            && !action.requires_condition.contains(&condition.kind)
        {
            return Err(IneligibleAction::ConditionUnmet {
                required: action.requires_condition.clone(),
                current: condition.kind,
            });
        }

        if let Some(consume) = action.consumes {
            let held = self.buffs.stacks(consume.kind);
            if held < consume.min_stacks {
                return Err(IneligibleAction::BuffPreconditionUnmet {
                    kind: consume.kind,
                    needed: consume.min_stacks,
                    held,
                });
            }
        }

        let costs = ResolvedCosts::resolve(action, condition, &self.buffs);
        if costs.pool > self.pool {
            return Err(IneligibleAction::InsufficientPool {
                need: costs.pool,
                have: self.pool,
            });
        }

        let runway = self.survival.saturating_sub(puzzle.rules.survival_floor);
        if costs.survival > runway {
            return Err(IneligibleAction::InsufficientSurvival {
                need: costs.survival,
                have: runway,
            });
        }

        if let Some(cap) = puzzle.rules.max_toxicity {
            let would_reach = self.toxicity_after(costs.toxicity);
            if costs.toxicity > 0 && would_reach > cap {
                return Err(IneligibleAction::ToxicityCap { would_reach, cap });
            }
        }

        Ok(costs)
    }

    pub fn is_eligible(
        &self,
        puzzle: &Puzzle,
        action: &ActionDefinition,
        condition: &Condition,
    ) -> bool {
        self.check(puzzle, action, condition).is_ok()
    }

    /// Catalog actions playable from this state, in catalog order.
    pub fn eligible_actions<'a>(
        &self,
        puzzle: &'a Puzzle,
        condition: &Condition,
    ) -> Vec<&'a ActionDefinition> {
        puzzle
            .catalog
            .iter()
            .filter(|action| self.is_eligible(puzzle, action, condition))
            .collect()
    }

    fn toxicity_after(&self, delta: i32) -> u32 {
        (i64::from(self.toxicity) + i64::from(delta)).clamp(0, i64::from(u32::MAX)) as u32
    }

    /// Applies `action` with success and crit folded in as expected value.
    pub fn apply(
        &self,
        puzzle: &Puzzle,
        action: &ActionDefinition,
        condition: &Condition,
    ) -> Result<(PuzzleState, AppliedGains), IneligibleAction> {
        self.apply_with(puzzle, action, condition, Resolution::Expected)
    }

    pub fn apply_with(
        &self,
        puzzle: &Puzzle,
        action: &ActionDefinition,
        condition: &Condition,
        resolution: Resolution,
    ) -> Result<(PuzzleState, AppliedGains), IneligibleAction> {
        let costs = self.check(puzzle, action, condition)?;
        let preview =
            ActionPreview::compute(&puzzle.stats, &self.buffs, action, condition, resolution);
        let rules = &puzzle.rules;
        let mut next = self.clone();
        let mut applied = AppliedGains {
            pool_spent: costs.pool,
            survival_spent: costs.survival,
            ..AppliedGains::default()
        };

        next.toxicity = self.toxicity_after(costs.toxicity);
        applied.toxicity_delta = next.toxicity as i32 - self.toxicity as i32;

        if let Some(consume) = action.consumes {
            next.buffs.take_stacks(consume.kind);
        }

        next.completion += preview.completion;
        next.perfection += preview.perfection;

        next.pool -= costs.pool;
        next.survival -= costs.survival;
        if action.restore.ceiling > 0 {
            next.survival_max = next
                .survival_max
                .saturating_add(action.restore.ceiling)
                .min(puzzle.targets.survival_ceiling.max(self.survival_max));
        }
        let before_restore = next.survival;
        next.survival = next
            .survival
            .saturating_add(action.restore.survival)
            .min(next.survival_max);

        if next.survival > rules.survival_floor {
            next.survival = next
                .survival
                .saturating_add(next.buffs.regen())
                .min(next.survival_max);
        }
        applied.survival_restored = next.survival.saturating_sub(before_restore);

        next.buffs.tick();
        for grant in &action.grants {
            next.buffs.grant(grant);
        }

        next.cooldowns.retain(|_, turns| {
            *turns = turns.saturating_sub(1);
            *turns > 0
        });
        if action.cooldown > 0 {
            next.cooldowns.insert(action.key.clone(), action.cooldown);
        }

        if !action.prevents_decay {
            next.survival_max = next.survival_max.saturating_sub(rules.ceiling_decay);
        }

        next.survival = next.survival.min(next.survival_max);
        next.completion = next.completion.min(puzzle.progress_cap(Track::Completion));
        next.perfection = next.perfection.min(puzzle.progress_cap(Track::Perfection));
        applied.completion = (next.completion - self.completion).max(0.0);
        applied.perfection = (next.perfection - self.perfection).max(0.0);

        next.step += 1;
        next.history.push(action.key.clone());
        Ok((next, applied))
    }
}
