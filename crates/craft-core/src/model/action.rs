use crate::model::buff::BuffKind;
use crate::model::condition::ConditionKind;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stable identifier of a catalog action. Cheap to clone; the search copies
/// keys into cooldown maps and transposition entries on every node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionKey(Arc<str>);

impl ActionKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActionKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Completion,
    Perfection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStat {
    Craftsmanship,
    Control,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostVector {
    #[serde(default)]
    pub pool: u32,
    #[serde(default)]
    pub survival: u32,
    /// Signed: negative values flush accumulated toxicity.
    #[serde(default)]
    pub toxicity: i32,
}

impl CostVector {
    pub const fn new(pool: u32, survival: u32) -> Self {
        Self {
            pool,
            survival,
            toxicity: 0,
        }
    }

    pub const fn with_toxicity(mut self, toxicity: i32) -> Self {
        self.toxicity = toxicity;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainSpec {
    pub track: Track,
    pub base: f64,
    pub scaling: ScalingStat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CritSpec {
    #[serde(default)]
    pub chance: f64,
    #[serde(default = "default_crit_multiplier")]
    pub multiplier: f64,
}

impl Default for CritSpec {
    fn default() -> Self {
        Self {
            chance: 0.0,
            multiplier: default_crit_multiplier(),
        }
    }
}

fn default_crit_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restore {
    #[serde(default)]
    pub survival: u32,
    #[serde(default)]
    pub ceiling: u32,
}

impl Restore {
    pub const fn is_empty(&self) -> bool {
        self.survival == 0 && self.ceiling == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuffGrant {
    pub kind: BuffKind,
    /// Ignored for persistent kinds.
    #[serde(default)]
    pub duration: u8,
    pub magnitude: f64,
    #[serde(default = "default_grant_stacks")]
    pub stacks: u8,
}

fn default_grant_stacks() -> u8 {
    1
}

/// Consumes every held stack of `kind`; gains scale by
/// `1 + bonus_per_stack * consumed`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuffConsume {
    pub kind: BuffKind,
    #[serde(default = "default_grant_stacks")]
    pub min_stacks: u8,
    #[serde(default)]
    pub bonus_per_stack: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Mastery {
    #[serde(default)]
    pub stat_bonus_pct: f64,
    #[serde(default)]
    pub pool_cost_reduction: u32,
    #[serde(default)]
    pub survival_cost_reduction: u32,
    #[serde(default)]
    pub crit_chance_bonus: f64,
    #[serde(default)]
    pub crit_multiplier_bonus: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionClass {
    Progress,
    Perfection,
    Hybrid,
    Buff,
    Stabilize,
    Utility,
}

impl ActionClass {
    pub const fn makes_progress(self) -> bool {
        matches!(
            self,
            ActionClass::Progress | ActionClass::Perfection | ActionClass::Hybrid
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionDefinition {
    pub key: ActionKey,
    pub label: String,
    pub costs: CostVector,
    pub gains: Vec<GainSpec>,
    pub success_chance: f64,
    pub crit: CritSpec,
    pub restore: Restore,
    pub grants: Vec<BuffGrant>,
    pub consumes: Option<BuffConsume>,
    /// Empty means usable under any condition.
    pub requires_condition: Vec<ConditionKind>,
    pub cooldown: u8,
    pub prevents_decay: bool,
    pub mastery: Mastery,
}

impl ActionDefinition {
    pub fn new(key: impl AsRef<str>, costs: CostVector) -> Self {
        let key = ActionKey::new(key);
        Self {
            label: key.as_str().to_string(),
            key,
            costs,
            gains: Vec::new(),
            success_chance: 1.0,
            crit: CritSpec::default(),
            restore: Restore::default(),
            grants: Vec::new(),
            consumes: None,
            requires_condition: Vec::new(),
            cooldown: 0,
            prevents_decay: false,
            mastery: Mastery::default(),
        }
    }

    pub fn with_gain(mut self, track: Track, base: f64, scaling: ScalingStat) -> Self {
        self.gains.push(GainSpec {
            track,
            base,
            scaling,
        });
        self
    }

    pub fn with_success_chance(mut self, chance: f64) -> Self {
        self.success_chance = chance;
        self
    }

    pub fn with_crit(mut self, chance: f64, multiplier: f64) -> Self {
        self.crit = CritSpec { chance, multiplier };
        self
    }

    pub fn with_restore(mut self, survival: u32, ceiling: u32) -> Self {
        self.restore = Restore { survival, ceiling };
        self
    }

    pub fn with_grant(mut self, kind: BuffKind, duration: u8, magnitude: f64) -> Self {
        self.grants.push(BuffGrant {
            kind,
            duration,
            magnitude,
            stacks: 1,
        });
        self
    }

    pub fn with_consume(mut self, kind: BuffKind, min_stacks: u8, bonus_per_stack: f64) -> Self {
        self.consumes = Some(BuffConsume {
            kind,
            min_stacks,
            bonus_per_stack,
        });
        self
    }

    pub fn with_required_conditions(mut self, kinds: &[ConditionKind]) -> Self {
        self.requires_condition = kinds.to_vec();
        self
    }

    pub fn with_cooldown(mut self, turns: u8) -> Self {
        self.cooldown = turns;
        self
    }

    pub fn with_prevents_decay(mut self, prevents: bool) -> Self {
        self.prevents_decay = prevents;
        self
    }

    pub fn with_mastery(mut self, mastery: Mastery) -> Self {
        self.mastery = mastery;
        self
    }

    pub fn gains_on(&self, track: Track) -> bool {
        self.gains.iter().any(|gain| gain.track == track)
    }

    pub fn grants_kind(&self, kind: BuffKind) -> bool {
        self.grants.iter().any(|grant| grant.kind == kind)
    }

    /// Derived from effects; restoring survival outranks every other effect.
    pub fn class(&self) -> ActionClass {
        if !self.restore.is_empty() || self.grants_kind(BuffKind::Mend) {
            return ActionClass::Stabilize;
        }
        match (
            self.gains_on(Track::Completion),
            self.gains_on(Track::Perfection),
        ) {
            (true, true) => ActionClass::Hybrid,
            (true, false) => ActionClass::Progress,
            (false, true) => ActionClass::Perfection,
            (false, false) if !self.grants.is_empty() => ActionClass::Buff,
            (false, false) => ActionClass::Utility,
        }
    }

    /// Structural checks shared by programmatic and JSON-loaded catalogs.
    pub fn validate(&self) -> Result<(), String> {
        if self.key.as_str().trim().is_empty() {
            return Err("key must not be empty".to_string());
        }
        let has_effect = !self.gains.is_empty()
            || !self.grants.is_empty()
            || !self.restore.is_empty()
            || self.consumes.is_some()
            || self.costs.toxicity < 0;
        if !has_effect {
            return Err("missing effect: no gains, grants, restore or consume".to_string());
        }
        if !(self.success_chance > 0.0 && self.success_chance <= 1.0) {
            return Err(format!(
                "success_chance {} outside (0, 1]",
                self.success_chance
            ));
        }
        if !(0.0..=1.0).contains(&self.crit.chance) || self.crit.multiplier < 1.0 {
            return Err("crit chance must be in [0, 1] with multiplier >= 1".to_string());
        }
        for gain in &self.gains {
            if !gain.base.is_finite() || gain.base <= 0.0 {
                return Err(format!("gain base {} must be positive", gain.base));
            }
        }
        for grant in &self.grants {
            if !grant.magnitude.is_finite() || grant.magnitude <= 0.0 {
                return Err(format!("{} magnitude must be positive", grant.kind));
            }
            if !grant.kind.is_persistent() && grant.duration == 0 {
                return Err(format!("{} grant needs a duration", grant.kind));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_is_derived_from_effects() {
        let touch = ActionDefinition::new("touch", CostVector::new(18, 10)).with_gain(
            Track::Perfection,
            25.0,
            ScalingStat::Control,
        );
        assert_eq!(touch.class(), ActionClass::Perfection);

        let mend = ActionDefinition::new("mend", CostVector::new(88, 0)).with_restore(30, 0);
        assert_eq!(mend.class(), ActionClass::Stabilize);

        let regen = ActionDefinition::new("steady", CostVector::new(96, 0)).with_grant(
            BuffKind::Mend,
            8,
            5.0,
        );
        assert_eq!(regen.class(), ActionClass::Stabilize);

        let focus = ActionDefinition::new("focus", CostVector::new(18, 0)).with_grant(
            BuffKind::Focus,
            4,
            1.5,
        );
        assert_eq!(focus.class(), ActionClass::Buff);
    }

    #[test]
    fn validate_rejects_effectless_entries() {
        let empty = ActionDefinition::new("noop", CostVector::new(5, 0));
        assert!(empty.validate().unwrap_err().contains("missing effect"));

        let flush = ActionDefinition::new("flush", CostVector::new(5, 0).with_toxicity(-10));
        assert!(flush.validate().is_ok());
        assert_eq!(flush.class(), ActionClass::Utility);
    }

    #[test]
    fn validate_rejects_timeless_timed_buff() {
        let broken = ActionDefinition::new("focus", CostVector::new(18, 0)).with_grant(
            BuffKind::Focus,
            0,
            1.5,
        );
        assert!(broken.validate().is_err());

        let stacks = ActionDefinition::new("stack", CostVector::new(18, 0)).with_grant(
            BuffKind::Momentum,
            0,
            0.1,
        );
        assert!(stacks.validate().is_ok());
    }
}
