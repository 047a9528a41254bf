//! Stat, condition and mastery math that turns an action definition into
//! concrete costs and gains.
//!
//! Integer resources round against the player: multiplied costs round up and
//! restores round down. Progress gains are kept as unrounded expected values.

use crate::model::action::{ActionDefinition, Track};
use crate::model::buff::Buffs;
use crate::model::condition::Condition;
use crate::model::puzzle::Stats;
use serde::{Deserialize, Serialize};

const ROUNDING_SLACK: f64 = 1e-9;

/// How chance-based parts of an action are settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Resolution {
    /// Success and crit contribute their expected value. The search only
    /// ever resolves this way.
    #[default]
    Expected,
    /// A live draw supplied by the caller.
    Rolled { success: bool, crit: bool },
}

impl Resolution {
    fn success_factor(self, chance: f64) -> f64 {
        match self {
            Resolution::Expected => chance,
            Resolution::Rolled { success, .. } => {
                if success {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    fn crit_factor(self, chance: f64, multiplier: f64) -> f64 {
        match self {
            Resolution::Expected => 1.0 + chance * (multiplier - 1.0),
            Resolution::Rolled { crit: true, .. } => multiplier,
            Resolution::Rolled { crit: false, .. } => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCosts {
    pub pool: u32,
    pub survival: u32,
    pub toxicity: i32,
}

impl ResolvedCosts {
    pub fn resolve(action: &ActionDefinition, condition: &Condition, buffs: &Buffs) -> Self {
        let mods = &condition.modifiers;
        let pool_base = action
            .costs
            .pool
            .saturating_sub(action.mastery.pool_cost_reduction);
        let survival_base = action
            .costs
            .survival
            .saturating_sub(action.mastery.survival_cost_reduction);
        Self {
            pool: round_cost(pool_base as f64 * mods.pool_cost),
            survival: round_cost(
                survival_base as f64 * mods.survival_cost * buffs.survival_cost_multiplier(),
            ),
            toxicity: action.costs.toxicity,
        }
    }
}

fn round_cost(value: f64) -> u32 {
    if value <= 0.0 {
        return 0;
    }
    (value - ROUNDING_SLACK).ceil().max(0.0) as u32
}

/// Costs and gains an action would produce from a given state, before any
/// clamping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPreview {
    pub costs: ResolvedCosts,
    pub completion: f64,
    pub perfection: f64,
    pub consumed_stacks: u8,
}

impl ActionPreview {
    pub fn compute(
        stats: &Stats,
        buffs: &Buffs,
        action: &ActionDefinition,
        condition: &Condition,
        resolution: Resolution,
    ) -> Self {
        let costs = ResolvedCosts::resolve(action, condition, buffs);

        let scratch;
        let (buffs, consumed) = match action.consumes {
            Some(consume) => {
                let mut remaining = buffs.clone();
                let taken = remaining.take_stacks(consume.kind);
                scratch = remaining;
                (&scratch, taken)
            }
            None => (buffs, 0),
        };
        let consume_bonus = action
            .consumes
            .map_or(1.0, |consume| 1.0 + consume.bonus_per_stack * consumed as f64);

        let mods = &condition.modifiers;
        let success =
            resolution.success_factor((action.success_chance + mods.success_bonus).min(1.0));
        let crit = resolution.crit_factor(
            (action.crit.chance + action.mastery.crit_chance_bonus).clamp(0.0, 1.0),
            action.crit.multiplier + action.mastery.crit_multiplier_bonus,
        );
        let shared = consume_bonus * success * crit;

        let mut preview = Self {
            costs,
            completion: 0.0,
            perfection: 0.0,
            consumed_stacks: consumed,
        };
        for gain in &action.gains {
            let base = gain.base * stats.factor(gain.scaling, action) * shared;
            match gain.track {
                Track::Completion => {
                    preview.completion += base * buffs.completion_multiplier() * mods.completion;
                }
                Track::Perfection => {
                    preview.perfection += base * buffs.perfection_multiplier() * mods.perfection;
                }
            }
        }
        preview
    }

    pub fn gain(&self, track: Track) -> f64 {
        match track {
            Track::Completion => self.completion,
            Track::Perfection => self.perfection,
        }
    }
}
