use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relative weight of each score layer. Every layer is multiplied by the
/// combined target magnitude, so these are fractions of one full target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Reward for reaching both targets (default: 1.0 split across tracks)
    pub progress: f64,
    /// One-off bonus once both targets are met (default: 2.0)
    pub target_met_bonus: f64,
    /// Reward per unit of useful buff strength still held (default: 0.02)
    pub buff_value: f64,
    /// Leftover pool and survival, for ties only (default: 0.001)
    pub tiebreak: f64,
    /// Penalty per target-fraction of wasted progress (default: 0.05)
    pub overshoot: f64,
    /// Flat penalty for ending at or below the survival floor (default: 6.0)
    pub death_penalty: f64,
    /// Quadratic penalty on lost survival fraction (default: 0.3)
    pub low_survival: f64,
    /// Penalty per elapsed step (default: 0.002)
    pub step: f64,
    /// Quadratic penalty on toxicity fraction of the cap (default: 0.2)
    pub toxicity: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            progress: 1.0,
            target_met_bonus: 2.0,
            buff_value: 0.02,
            tiebreak: 0.001,
            overshoot: 0.05,
            death_penalty: 6.0,
            low_survival: 0.3,
            step: 0.002,
            toxicity: 0.2,
        }
    }
}

/// Interior beam width as a function of remaining depth. Nodes far from the
/// horizon expand few children; nodes near it expand up to `max_width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamConfig {
    pub max_width: usize,
    pub min_width: usize,
    /// Remaining-depth step after which the width drops by one.
    pub shrink_every: u32,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            max_width: 4,
            min_width: 1,
            shrink_every: 3,
        }
    }
}

impl BeamConfig {
    pub fn width(&self, remaining_depth: u32) -> usize {
        let min = self.min_width.max(1);
        let max = self.max_width.max(min);
        let shrink = (remaining_depth / self.shrink_every.max(1)) as usize;
        max.saturating_sub(shrink).clamp(min, max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    pub depth: u32,
    pub nodes: u64,
    /// `None` leaves the node budget as the only cutoff, which keeps results
    /// reproducible across machines.
    pub time: Option<Duration>,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            depth: 16,
            nodes: 200_000,
            time: Some(Duration::from_millis(2_000)),
        }
    }
}

impl SearchBudget {
    pub fn nodes_only(depth: u32, nodes: u64) -> Self {
        Self {
            depth,
            nodes,
            time: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverParams {
    pub weights: ScoreWeights,
    pub beam: BeamConfig,
    pub budget: SearchBudget,
    /// Stall penalty as a fraction of target magnitude (default: 0.05)
    pub stall_weight: f64,
    /// Upper bound on reconstructed rotation length.
    pub rotation_limit: usize,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            beam: BeamConfig::default(),
            budget: SearchBudget::default(),
            stall_weight: 0.05,
            rotation_limit: 64,
        }
    }
}

impl SolverParams {
    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beam_narrows_far_from_the_horizon() {
        let beam = BeamConfig::default();
        assert_eq!(beam.width(0), 4);
        assert_eq!(beam.width(2), 4);
        assert_eq!(beam.width(3), 3);
        assert_eq!(beam.width(7), 2);
        assert_eq!(beam.width(15), 1);
        assert_eq!(beam.width(40), 1);
    }

    #[test]
    fn death_outweighs_completion() {
        let weights = ScoreWeights::default();
        assert!(weights.death_penalty > weights.target_met_bonus + weights.progress);
    }
}
