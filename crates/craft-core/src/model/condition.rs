use core::fmt;
use serde::{Deserialize, Serialize};

/// Longest forecast a context keeps; later entries are dropped.
pub const MAX_FORECAST: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    #[default]
    Normal,
    Good,
    Excellent,
    Poor,
    Sturdy,
    Pliant,
    Malleable,
    Centered,
}

impl ConditionKind {
    pub const fn modifiers(self) -> ConditionModifiers {
        let base = ConditionModifiers::NEUTRAL;
        match self {
            ConditionKind::Normal => base,
            ConditionKind::Good => ConditionModifiers {
                perfection: 1.5,
                ..base
            },
            ConditionKind::Excellent => ConditionModifiers {
                perfection: 4.0,
                ..base
            },
            ConditionKind::Poor => ConditionModifiers {
                perfection: 0.5,
                ..base
            },
            ConditionKind::Sturdy => ConditionModifiers {
                survival_cost: 0.5,
                ..base
            },
            ConditionKind::Pliant => ConditionModifiers {
                pool_cost: 0.5,
                ..base
            },
            ConditionKind::Malleable => ConditionModifiers {
                completion: 1.5,
                ..base
            },
            ConditionKind::Centered => ConditionModifiers {
                success_bonus: 0.25,
                ..base
            },
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConditionKind::Normal => "normal",
            ConditionKind::Good => "good",
            ConditionKind::Excellent => "excellent",
            ConditionKind::Poor => "poor",
            ConditionKind::Sturdy => "sturdy",
            ConditionKind::Pliant => "pliant",
            ConditionKind::Malleable => "malleable",
            ConditionKind::Centered => "centered",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionModifiers {
    pub completion: f64,
    pub perfection: f64,
    pub pool_cost: f64,
    pub survival_cost: f64,
    pub success_bonus: f64,
}

impl ConditionModifiers {
    pub const NEUTRAL: ConditionModifiers = ConditionModifiers {
        completion: 1.0,
        perfection: 1.0,
        pool_cost: 1.0,
        survival_cost: 1.0,
        success_bonus: 0.0,
    };
}

impl Default for ConditionModifiers {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// A condition as seen by the resolver. Hosts may override the kind's
/// default modifiers when the live values differ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConditionRecord")]
pub struct Condition {
    pub kind: ConditionKind,
    pub modifiers: ConditionModifiers,
}

#[derive(Deserialize)]
struct ConditionRecord {
    kind: ConditionKind,
    #[serde(default)]
    modifiers: Option<ConditionModifiers>,
}

impl From<ConditionRecord> for Condition {
    fn from(record: ConditionRecord) -> Self {
        Self {
            kind: record.kind,
            modifiers: record
                .modifiers
                .unwrap_or_else(|| record.kind.modifiers()),
        }
    }
}

impl Condition {
    pub const NORMAL: Condition = Condition::of(ConditionKind::Normal);

    pub const fn of(kind: ConditionKind) -> Self {
        Self {
            kind,
            modifiers: kind.modifiers(),
        }
    }

    pub const fn with_modifiers(kind: ConditionKind, modifiers: ConditionModifiers) -> Self {
        Self { kind, modifiers }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl From<ConditionKind> for Condition {
    fn from(kind: ConditionKind) -> Self {
        Self::of(kind)
    }
}

/// Current condition plus the bounded forecast of the turns that follow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionContext {
    current: Condition,
    forecast: Vec<Condition>,
}

impl ConditionContext {
    pub fn new(current: Condition, mut forecast: Vec<Condition>) -> Self {
        forecast.truncate(MAX_FORECAST);
        Self { current, forecast }
    }

    pub fn steady(kind: ConditionKind) -> Self {
        Self::new(Condition::of(kind), Vec::new())
    }

    pub fn from_kinds(current: ConditionKind, forecast: &[ConditionKind]) -> Self {
        Self::new(
            Condition::of(current),
            forecast.iter().copied().map(Condition::of).collect(),
        )
    }

    pub fn current(&self) -> Condition {
        self.current
    }

    pub fn forecast(&self) -> &[Condition] {
        &self.forecast
    }

    /// Condition `offset` turns from now; unknown turns are `Normal`.
    pub fn at(&self, offset: usize) -> Condition {
        match offset {
            0 => self.current,
            n => self
                .forecast
                .get(n - 1)
                .copied()
                .unwrap_or(Condition::NORMAL),
        }
    }

    /// Context one turn later, consuming the head of the forecast.
    pub fn advance(&self) -> Self {
        let mut forecast = self.forecast.iter().copied();
        let current = forecast.next().unwrap_or(Condition::NORMAL);
        Self {
            current,
            forecast: forecast.collect(),
        }
    }
}
