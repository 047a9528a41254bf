use crate::catalog::Catalog;
use crate::model::condition::{Condition, ConditionContext};
use crate::model::puzzle::{Puzzle, Rules, Stats, Targets};
use crate::model::state::PuzzleState;
use serde::{Deserialize, Serialize};

/// Everything a host reports at the start of a turn. The catalog travels
/// separately since it rarely changes between turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSnapshot {
    pub state: PuzzleState,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub forecast: Vec<Condition>,
    pub targets: Targets,
    #[serde(default)]
    pub rules: Rules,
    #[serde(default)]
    pub stats: Stats,
}

impl HostSnapshot {
    pub fn capture(state: &PuzzleState, conditions: &ConditionContext, puzzle: &Puzzle) -> Self {
        HostSnapshot {
            state: state.clone(),
            condition: conditions.current(),
            forecast: conditions.forecast().to_vec(),
            targets: puzzle.targets,
            rules: puzzle.rules,
            stats: puzzle.stats,
        }
    }

    pub fn conditions(&self) -> ConditionContext {
        ConditionContext::new(self.condition, self.forecast.clone())
    }

    pub fn into_puzzle(self, catalog: Catalog) -> (Puzzle, PuzzleState, ConditionContext) {
        let conditions = self.conditions();
        let puzzle = Puzzle::new(self.targets, self.rules, self.stats, catalog);
        (puzzle, self.state, conditions)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::buff::{BuffKind, BuffState};
    use crate::model::condition::ConditionKind;

    #[test]
    fn minimal_host_document_parses_with_defaults() {
        let json = r#"{
            "state": {
                "pool": 320, "survival": 41, "survival_max": 55,
                "completion": 60.0, "perfection": 12.5,
                "buffs": {"focus": {"remaining": 2, "magnitude": 1.5}},
                "cooldowns": {"reinforce": 3}
            },
            "condition": {"kind": "good"},
            "forecast": [{"kind": "poor"}, {"kind": "excellent"}],
            "targets": {"completion": 130, "perfection": 130, "survival_ceiling": 59}
        }"#;
        let snapshot = HostSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.state.survival(), 41);
        assert_eq!(snapshot.state.buffs().remaining(BuffKind::Focus), 2);
        assert_eq!(snapshot.state.cooldown(&"reinforce".into()), 3);
        assert_eq!(snapshot.rules, Rules::default());

        let ctx = snapshot.conditions();
        assert_eq!(ctx.current().modifiers.perfection, 1.5);
        assert_eq!(ctx.at(2).kind, ConditionKind::Excellent);
        assert_eq!(ctx.at(3).kind, ConditionKind::Normal);
    }

    #[test]
    fn snapshot_json_round_trip() {
        let catalog = Catalog::standard().unwrap();
        let puzzle = Puzzle::new(
            Targets::new(130.0, 130.0, 59),
            Rules::default(),
            Stats::default(),
            catalog.clone(),
        );
        let state = puzzle
            .initial_state()
            .with_buff(BuffKind::Momentum, BuffState::stacked(3, 0.1))
            .with_step(4);
        let ctx = ConditionContext::from_kinds(ConditionKind::Sturdy, &[ConditionKind::Good]);
        let json = HostSnapshot::capture(&state, &ctx, &puzzle).to_json().unwrap();
        let (restored, restored_state, restored_ctx) =
            HostSnapshot::from_json(&json).unwrap().into_puzzle(catalog);
        assert_eq!(restored_state, state);
        assert_eq!(restored_ctx, ctx);
        assert_eq!(restored.targets, puzzle.targets);
    }

    fn host_state(state: &str) -> String {
        format!(
            r#"{{
                "state": {state},
                "targets": {{"completion": 130, "perfection": 130, "survival_ceiling": 59}}
            }}"#
        )
    }

    #[test]
    fn survival_above_its_ceiling_is_rejected() {
        let json = host_state(
            r#"{"pool": 400, "survival": 90, "survival_max": 40,
                "completion": 0.0, "perfection": 0.0}"#,
        );
        let err = HostSnapshot::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("survival 90 exceeds survival_max 40"));
    }

    #[test]
    fn negative_progress_is_rejected() {
        let json = host_state(
            r#"{"pool": 400, "survival": 30, "survival_max": 40,
                "completion": -5.0, "perfection": 0.0}"#,
        );
        let err = HostSnapshot::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("completion must be a finite non-negative number"));
    }

    #[test]
    fn survival_at_its_ceiling_is_accepted() {
        let json = host_state(
            r#"{"pool": 400, "survival": 40, "survival_max": 40,
                "completion": 0.0, "perfection": 12.5,
                "cooldowns": {"reinforce": 0}}"#,
        );
        let snapshot = HostSnapshot::from_json(&json).unwrap();
        assert_eq!(snapshot.state.survival(), 40);
        assert!(snapshot.state.cooldowns().is_empty());
    }
}
