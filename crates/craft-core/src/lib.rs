pub mod catalog;
pub mod model;
pub mod snapshot;

pub use catalog::{Catalog, CatalogError};
pub use model::action::{
    ActionClass, ActionDefinition, ActionKey, BuffConsume, BuffGrant, CostVector, CritSpec,
    GainSpec, Mastery, Restore, ScalingStat, Track,
};
pub use model::buff::{BuffKind, BuffState, Buffs};
pub use model::condition::{
    Condition, ConditionContext, ConditionKind, ConditionModifiers, MAX_FORECAST,
};
pub use model::effect::{ActionPreview, Resolution, ResolvedCosts};
pub use model::eligibility::{BlockCategory, IneligibleAction};
pub use model::puzzle::{Puzzle, Rules, Stats, Targets};
pub use model::state::{AppliedGains, PuzzleState};
pub use snapshot::HostSnapshot;
