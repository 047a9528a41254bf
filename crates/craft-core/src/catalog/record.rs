use super::CatalogError;
use crate::model::action::{
    ActionDefinition, ActionKey, BuffConsume, BuffGrant, CostVector, CritSpec, GainSpec, Mastery,
    Restore,
};
use crate::model::condition::ConditionKind;
use serde::Deserialize;

/// On-disk catalog document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CatalogFile {
    pub actions: Vec<ActionRecord>,
}

/// One catalog entry as written by hand. Required fields are optional here so
/// a missing one is reported against its key instead of as a parse error.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ActionRecord {
    key: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    costs: Option<CostVector>,
    #[serde(default)]
    gains: Vec<GainSpec>,
    #[serde(default)]
    success_chance: Option<f64>,
    #[serde(default)]
    crit: Option<CritSpec>,
    #[serde(default)]
    restore: Option<Restore>,
    #[serde(default)]
    grants: Vec<BuffGrant>,
    #[serde(default)]
    consumes: Option<BuffConsume>,
    #[serde(default)]
    requires_condition: Vec<ConditionKind>,
    #[serde(default)]
    cooldown: u8,
    #[serde(default)]
    prevents_decay: bool,
    #[serde(default)]
    mastery: Mastery,
}

impl ActionRecord {
    pub fn into_definition(self) -> Result<ActionDefinition, CatalogError> {
        let malformed = |reason: String| CatalogError::Malformed {
            key: ActionKey::new(&self.key),
            reason,
        };
        let Some(costs) = self.costs else {
            return Err(malformed("missing costs".to_string()));
        };

        let mut definition = ActionDefinition::new(&self.key, costs);
        if let Some(label) = &self.label {
            definition.label = label.clone();
        }
        definition.gains = self.gains.clone();
        definition.success_chance = self.success_chance.unwrap_or(1.0);
        definition.crit = self.crit.unwrap_or_default();
        definition.restore = self.restore.unwrap_or_default();
        definition.grants = self.grants.clone();
        definition.consumes = self.consumes;
        definition.requires_condition = self.requires_condition.clone();
        definition.cooldown = self.cooldown;
        definition.prevents_decay = self.prevents_decay;
        definition.mastery = self.mastery;

        definition.validate().map_err(malformed)?;
        Ok(definition)
    }
}
