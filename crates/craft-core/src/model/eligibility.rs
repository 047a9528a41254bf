use crate::model::buff::BuffKind;
use crate::model::condition::ConditionKind;
use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IneligibleAction {
    #[error("insufficient pool: needs {need}, has {have}")]
    InsufficientPool { need: u32, have: u32 },
    #[error("insufficient survival: needs {need}, has {have} above the floor")]
    InsufficientSurvival { need: u32, have: u32 },
    #[error("on cooldown for {turns} more turn(s)")]
    OnCooldown { turns: u8 },
    #[error("requires condition {required:?}, current is {current}")]
    ConditionUnmet {
        required: Vec<ConditionKind>,
        current: ConditionKind,
    },
    #[error("requires {needed} {kind} stack(s), holds {held}")]
    BuffPreconditionUnmet { kind: BuffKind, needed: u8, held: u8 },
    #[error("toxicity would reach {would_reach}, cap is {cap}")]
    ToxicityCap { would_reach: u32, cap: u32 },
}

impl IneligibleAction {
    pub fn category(&self) -> BlockCategory {
        match self {
            IneligibleAction::InsufficientPool { .. } => BlockCategory::Pool,
            IneligibleAction::InsufficientSurvival { .. } => BlockCategory::Survival,
            IneligibleAction::OnCooldown { .. } => BlockCategory::Cooldown,
            IneligibleAction::ConditionUnmet { .. }
            | IneligibleAction::BuffPreconditionUnmet { .. } => BlockCategory::Precondition,
            IneligibleAction::ToxicityCap { .. } => BlockCategory::Toxicity,
        }
    }
}

/// Coarse reason an action is blocked, reported when nothing is playable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    Pool,
    Survival,
    Cooldown,
    Precondition,
    Toxicity,
}

impl fmt::Display for BlockCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BlockCategory::Pool => "pool",
            BlockCategory::Survival => "survival",
            BlockCategory::Cooldown => "cooldown",
            BlockCategory::Precondition => "precondition",
            BlockCategory::Toxicity => "toxicity",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_and_buff_failures_share_a_category() {
        let condition = IneligibleAction::ConditionUnmet {
            required: vec![ConditionKind::Good],
            current: ConditionKind::Normal,
        };
        let buff = IneligibleAction::BuffPreconditionUnmet {
            kind: BuffKind::Momentum,
            needed: 1,
            held: 0,
        };
        assert_eq!(condition.category(), BlockCategory::Precondition);
        assert_eq!(buff.category(), BlockCategory::Precondition);
        assert_eq!(
            IneligibleAction::InsufficientSurvival { need: 10, have: 4 }.to_string(),
            "insufficient survival: needs 10, has 4 above the floor"
        );
    }
}
