use crate::catalog::Catalog;
use crate::model::action::{ActionDefinition, ScalingStat, Track};
use crate::model::state::PuzzleState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Targets {
    pub completion: f64,
    pub perfection: f64,
    /// Survival ceiling at puzzle start; restores never exceed it.
    pub survival_ceiling: u32,
}

impl Targets {
    pub const fn new(completion: f64, perfection: f64, survival_ceiling: u32) -> Self {
        Self {
            completion,
            perfection,
            survival_ceiling,
        }
    }

    /// Combined target size every score layer scales against.
    pub fn magnitude(&self) -> f64 {
        (self.completion + self.perfection).max(1.0)
    }

    pub fn target(&self, track: Track) -> f64 {
        match track {
            Track::Completion => self.completion,
            Track::Perfection => self.perfection,
        }
    }

    pub fn met(&self, state: &PuzzleState) -> bool {
        state.completion() >= self.completion && state.perfection() >= self.perfection
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Survival at or below this value ends the puzzle.
    pub survival_floor: u32,
    /// Ceiling lost per turn unless the action prevents decay.
    pub ceiling_decay: u32,
    pub pool_max: u32,
    pub max_toxicity: Option<u32>,
    /// Progress clamps at `target * progress_cap_ratio`.
    pub progress_cap_ratio: f64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            survival_floor: 0,
            ceiling_decay: 1,
            pool_max: 400,
            max_toxicity: None,
            progress_cap_ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub craftsmanship: f64,
    pub control: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            craftsmanship: 100.0,
            control: 100.0,
        }
    }
}

impl Stats {
    pub fn value(&self, stat: ScalingStat) -> f64 {
        match stat {
            ScalingStat::Craftsmanship => self.craftsmanship,
            ScalingStat::Control => self.control,
        }
    }

    /// Stat contribution of one gain, normalised so a stat of 100 is 1.0.
    pub fn factor(&self, stat: ScalingStat, action: &ActionDefinition) -> f64 {
        self.value(stat) * (1.0 + action.mastery.stat_bonus_pct / 100.0) / 100.0
    }
}

/// The static environment of one decision: targets, rules, stats and catalog.
#[derive(Debug, Clone)]
pub struct Puzzle {
    pub targets: Targets,
    pub rules: Rules,
    pub stats: Stats,
    pub catalog: Catalog,
}

impl Puzzle {
    pub fn new(targets: Targets, rules: Rules, stats: Stats, catalog: Catalog) -> Self {
        Self {
            targets,
            rules,
            stats,
            catalog,
        }
    }

    pub fn initial_state(&self) -> PuzzleState {
        PuzzleState::new(self.rules.pool_max, self.targets.survival_ceiling)
    }

    pub fn progress_cap(&self, track: Track) -> f64 {
        self.targets.target(track) * self.rules.progress_cap_ratio.max(1.0)
    }

    pub fn is_dead(&self, state: &PuzzleState) -> bool {
        state.survival() <= self.rules.survival_floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::action::CostVector;

    #[test]
    fn magnitude_never_drops_below_one() {
        assert_eq!(Targets::new(0.0, 0.0, 40).magnitude(), 1.0);
        assert_eq!(Targets::new(130.0, 130.0, 59).magnitude(), 260.0);
    }

    #[test]
    fn mastery_raises_stat_factor() {
        let stats = Stats {
            craftsmanship: 200.0,
            control: 100.0,
        };
        let plain = ActionDefinition::new("a", CostVector::new(0, 10)).with_gain(
            Track::Completion,
            30.0,
            ScalingStat::Craftsmanship,
        );
        let mastered = plain.clone().with_mastery(crate::model::action::Mastery {
            stat_bonus_pct: 10.0,
            ..Default::default()
        });
        assert!((stats.factor(ScalingStat::Craftsmanship, &plain) - 2.0).abs() < 1e-9);
        assert!((stats.factor(ScalingStat::Craftsmanship, &mastered) - 2.2).abs() < 1e-9);
    }

    #[test]
    fn rules_fill_missing_fields_from_defaults() {
        let rules: Rules = serde_json::from_str(r#"{"max_toxicity": 60}"#).unwrap();
        assert_eq!(rules.max_toxicity, Some(60));
        assert_eq!(rules.pool_max, 400);
        assert_eq!(rules.ceiling_decay, 1);
    }
}
