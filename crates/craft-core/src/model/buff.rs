use crate::model::action::BuffGrant;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffKind {
    /// Completion gain multiplier.
    Focus,
    /// Perfection gain multiplier.
    Finesse,
    /// Persistent stacking bonus on perfection gains.
    Momentum,
    /// Survival cost multiplier.
    Ward,
    /// Survival regained at the end of each turn.
    Mend,
}

impl BuffKind {
    pub const MAX_STACKS: u8 = 10;

    /// Persistent kinds never expire; they accumulate stacks until consumed.
    pub const fn is_persistent(self) -> bool {
        matches!(self, BuffKind::Momentum)
    }
}

impl fmt::Display for BuffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BuffKind::Focus => "focus",
            BuffKind::Finesse => "finesse",
            BuffKind::Momentum => "momentum",
            BuffKind::Ward => "ward",
            BuffKind::Mend => "mend",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuffState {
    /// Turns left; always zero for persistent kinds.
    #[serde(default)]
    pub remaining: u8,
    pub magnitude: f64,
    #[serde(default = "default_stacks")]
    pub stacks: u8,
}

fn default_stacks() -> u8 {
    1
}

impl BuffState {
    pub const fn timed(remaining: u8, magnitude: f64) -> Self {
        Self {
            remaining,
            magnitude,
            stacks: 1,
        }
    }

    pub const fn stacked(stacks: u8, magnitude: f64) -> Self {
        Self {
            remaining: 0,
            magnitude,
            stacks,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Buffs {
    active: BTreeMap<BuffKind, BuffState>,
}

impl Buffs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: BuffKind, state: BuffState) {
        if kind.is_persistent() && state.stacks == 0 {
            self.active.remove(&kind);
            return;
        }
        if !kind.is_persistent() && state.remaining == 0 {
            self.active.remove(&kind);
            return;
        }
        self.active.insert(kind, state);
    }

    pub fn get(&self, kind: BuffKind) -> Option<&BuffState> {
        self.active.get(&kind)
    }

    pub fn is_active(&self, kind: BuffKind) -> bool {
        self.active.contains_key(&kind)
    }

    pub fn remaining(&self, kind: BuffKind) -> u8 {
        self.active.get(&kind).map_or(0, |buff| buff.remaining)
    }

    pub fn stacks(&self, kind: BuffKind) -> u8 {
        self.active.get(&kind).map_or(0, |buff| buff.stacks)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BuffKind, &BuffState)> + '_ {
        self.active.iter().map(|(kind, state)| (*kind, state))
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    fn magnitude_or(&self, kind: BuffKind, fallback: f64) -> f64 {
        self.active.get(&kind).map_or(fallback, |buff| buff.magnitude)
    }

    pub fn completion_multiplier(&self) -> f64 {
        self.magnitude_or(BuffKind::Focus, 1.0)
    }

    pub fn perfection_multiplier(&self) -> f64 {
        let momentum = self
            .active
            .get(&BuffKind::Momentum)
            .map_or(0.0, |buff| buff.stacks as f64 * buff.magnitude);
        self.magnitude_or(BuffKind::Finesse, 1.0) * (1.0 + momentum)
    }

    pub fn survival_cost_multiplier(&self) -> f64 {
        self.magnitude_or(BuffKind::Ward, 1.0)
    }

    /// Whole survival points regained per turn; fractional magnitude rounds down.
    pub fn regen(&self) -> u32 {
        self.active
            .get(&BuffKind::Mend)
            .map_or(0, |buff| buff.magnitude.max(0.0).floor() as u32)
    }

    /// Timed kinds refresh duration and magnitude; persistent kinds add stacks.
    pub fn grant(&mut self, grant: &BuffGrant) {
        if grant.kind.is_persistent() {
            let held = self.stacks(grant.kind);
            let stacks = held.saturating_add(grant.stacks).min(BuffKind::MAX_STACKS);
            self.insert(grant.kind, BuffState::stacked(stacks, grant.magnitude));
        } else {
            self.insert(grant.kind, BuffState::timed(grant.duration, grant.magnitude));
        }
    }

    /// Removes every stack of `kind`, returning how many were held.
    pub fn take_stacks(&mut self, kind: BuffKind) -> u8 {
        self.active.remove(&kind).map_or(0, |buff| buff.stacks)
    }

    /// One turn elapses for timed buffs; expired entries drop out.
    pub fn tick(&mut self) {
        self.active.retain(|kind, buff| {
            if kind.is_persistent() {
                return true;
            }
            buff.remaining = buff.remaining.saturating_sub(1);
            buff.remaining > 0
        });
    }
}
