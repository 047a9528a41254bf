pub mod diagnostics;
pub mod ordering;
pub mod params;
pub mod recommend;
pub mod rotation;
pub mod scoring;
pub mod search;

pub use diagnostics::{BlockedAction, Diagnostics};
pub use ordering::{MoveOrderer, RankedAction};
pub use params::{BeamConfig, ScoreWeights, SearchBudget, SolverParams};
pub use recommend::{Alternative, Rationale, Recommendation, Verdict, recommend};
pub use rotation::Rotation;
pub use scoring::ScoreBreakdown;
pub use search::{RootLine, Search, SearchOutcome, SearchStats, search};
