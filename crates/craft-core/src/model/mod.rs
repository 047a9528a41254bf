pub mod action;
pub mod buff;
pub mod condition;
pub mod effect;
pub mod eligibility;
pub mod puzzle;
pub mod state;
