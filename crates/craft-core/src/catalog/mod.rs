mod record;

use crate::model::action::{ActionClass, ActionDefinition, ActionKey};
use record::CatalogFile;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

const STANDARD_CATALOG: &str = include_str!("standard.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("malformed catalog entry `{key}`: {reason}")]
    Malformed { key: ActionKey, reason: String },
    #[error("duplicate catalog entry `{0}`")]
    Duplicate(ActionKey),
    #[error("catalog has no actions")]
    Empty,
}

/// Validated, ordered set of actions. Order is preserved so ties during
/// ranking resolve the same way on every run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    actions: Vec<ActionDefinition>,
}

impl Catalog {
    pub fn new(actions: Vec<ActionDefinition>) -> Result<Self, CatalogError> {
        if actions.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::with_capacity(actions.len());
        for action in &actions {
            action.validate().map_err(|reason| CatalogError::Malformed {
                key: action.key.clone(),
                reason,
            })?;
            if !seen.insert(action.key.clone()) {
                return Err(CatalogError::Duplicate(action.key.clone()));
            }
        }
        Ok(Self { actions })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let actions = file
            .actions
            .into_iter()
            .map(|record| record.into_definition())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(actions)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The bundled fifteen-action catalog.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::from_json(STANDARD_CATALOG)
    }

    pub fn get(&self, key: &ActionKey) -> Option<&ActionDefinition> {
        self.actions.iter().find(|action| &action.key == key)
    }

    pub fn by_name(&self, key: &str) -> Option<&ActionDefinition> {
        self.actions.iter().find(|action| action.key.as_str() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionDefinition> + '_ {
        self.actions.iter()
    }

    pub fn of_class(&self, class: ActionClass) -> impl Iterator<Item = &ActionDefinition> + '_ {
        self.actions.iter().filter(move |action| action.class() == class)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::buff::BuffKind;

    #[test]
    fn standard_catalog_loads() {
        let catalog = Catalog::standard().expect("bundled catalog is valid");
        assert_eq!(catalog.len(), 15);
        let refine = catalog.by_name("refine").unwrap();
        assert_eq!(refine.class(), ActionClass::Perfection);
        assert!(refine.grants_kind(BuffKind::Momentum));
        assert_eq!(catalog.by_name("mend").unwrap().class(), ActionClass::Stabilize);
        assert!(catalog.by_name("reinforce").unwrap().prevents_decay);
        assert_eq!(catalog.of_class(ActionClass::Buff).count(), 3);
    }

    #[test]
    fn entry_without_costs_is_malformed() {
        let json = r#"{"actions":[{"key":"ghost","gains":[{"track":"completion","base":10,"scaling":"craftsmanship"}]}]}"#;
        match Catalog::from_json(json) {
            Err(CatalogError::Malformed { key, reason }) => {
                assert_eq!(key.as_str(), "ghost");
                assert!(reason.contains("costs"));
            }
            other => panic!("expected malformed entry, got {other:?}"),
        }
    }

    #[test]
    fn entry_without_effect_is_malformed() {
        let json = r#"{"actions":[{"key":"idle","costs":{"pool":5}}]}"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(CatalogError::Malformed { .. })
        ));
    }

    #[test]
    fn unknown_buff_kind_fails_to_parse() {
        let json = r#"{"actions":[{"key":"x","costs":{"pool":5},"grants":[{"kind":"haste","duration":3,"magnitude":1.5}]}]}"#;
        assert!(matches!(Catalog::from_json(json), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let json = r#"{"actions":[
            {"key":"purge","costs":{"pool":5,"toxicity":-5}},
            {"key":"purge","costs":{"pool":9,"toxicity":-9}}
        ]}"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(CatalogError::Duplicate(key)) if key.as_str() == "purge"
        ));
    }
}
