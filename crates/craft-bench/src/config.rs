use craft_core::{ConditionKind, MAX_FORECAST, Rules, Stats, Targets};
use craft_solver::{BeamConfig, ScoreWeights, SearchBudget, SolverParams};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

const DEFAULT_MAX_TURNS: u32 = 60;
const DEFAULT_FORECAST_LEN: usize = 3;
const DEFAULT_SEARCH_DEPTH: u32 = 16;
const DEFAULT_SEARCH_NODES: u64 = 200_000;
const DEFAULT_TELEMETRY_FILE: &str = "telemetry.jsonl";
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    pub playouts: PlayoutConfig,
    pub scenarios: Vec<ScenarioConfig>,
    #[serde(default)]
    pub search: SearchConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.playouts.validate()?;
        validate_scenarios(&self.scenarios)?;
        self.search.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        self.logging.validate()?;
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        let summary_md = resolve_template(&self.run_id, &self.outputs.summary_md);
        let telemetry = match &self.logging.telemetry_jsonl {
            Some(template) => resolve_template(&self.run_id, template),
            None => summary_md
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
                .join(DEFAULT_TELEMETRY_FILE),
        };
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md,
            telemetry,
        }
    }
}

/// How many playouts to run per scenario and how long each may last.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlayoutConfig {
    pub seed: Option<u64>,
    pub runs: usize,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

impl PlayoutConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.runs == 0 {
            return Err(ValidationError::InvalidField {
                field: "playouts.runs".to_string(),
                message: "number of runs must be greater than zero".to_string(),
            });
        }

        if self.max_turns == 0 {
            return Err(ValidationError::InvalidField {
                field: "playouts.max_turns".to_string(),
                message: "max_turns must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}

/// One puzzle setup. Either `targets` or `snapshot` describes the start.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    pub name: String,
    #[serde(default)]
    pub targets: Option<Targets>,
    /// Host snapshot JSON to start from instead of a fresh puzzle.
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
    #[serde(default)]
    pub rules: Rules,
    #[serde(default)]
    pub stats: Stats,
    /// Catalog JSON; the bundled catalog is used when absent.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Sampling weights for conditions drawn during play. Empty means
    /// every turn is normal.
    #[serde(default)]
    pub conditions: Vec<ConditionWeight>,
    #[serde(default = "default_forecast_len")]
    pub forecast_len: usize,
}

impl ScenarioConfig {
    fn validate(&self, index: usize) -> Result<(), ValidationError> {
        let field = |suffix: &str| format!("scenarios[{index}].{suffix}");

        match (&self.targets, &self.snapshot) {
            (Some(_), Some(_)) => {
                return Err(ValidationError::InvalidField {
                    field: field("snapshot"),
                    message: "targets and snapshot are mutually exclusive".to_string(),
                });
            }
            (None, None) => {
                return Err(ValidationError::InvalidField {
                    field: field("targets"),
                    message: "either targets or snapshot must be specified".to_string(),
                });
            }
            (Some(targets), None) => {
                if targets.completion < 0.0 || targets.perfection < 0.0 {
                    return Err(ValidationError::InvalidField {
                        field: field("targets"),
                        message: "targets must not be negative".to_string(),
                    });
                }
                if targets.survival_ceiling <= self.rules.survival_floor {
                    return Err(ValidationError::InvalidField {
                        field: field("targets.survival_ceiling"),
                        message: "survival ceiling must be above the survival floor".to_string(),
                    });
                }
            }
            (None, Some(_)) => {}
        }

        if self.forecast_len > MAX_FORECAST {
            return Err(ValidationError::InvalidField {
                field: field("forecast_len"),
                message: format!("forecast may look at most {MAX_FORECAST} turns ahead"),
            });
        }

        for weight in &self.conditions {
            if !weight.weight.is_finite() || weight.weight < 0.0 {
                return Err(ValidationError::InvalidField {
                    field: field("conditions"),
                    message: format!("weight for '{}' must be a non-negative number", weight.kind),
                });
            }
        }
        if !self.conditions.is_empty() && self.conditions.iter().all(|w| w.weight == 0.0) {
            return Err(ValidationError::InvalidField {
                field: field("conditions"),
                message: "at least one condition weight must be positive".to_string(),
            });
        }

        Ok(())
    }
}

fn default_forecast_len() -> usize {
    DEFAULT_FORECAST_LEN
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct ConditionWeight {
    pub kind: ConditionKind,
    pub weight: f64,
}

/// Solver tuning applied to every decision of the run.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_search_depth")]
    pub depth: u32,
    #[serde(default = "default_search_nodes")]
    pub nodes: u64,
    /// Wall-clock cap per decision. Leave unset for reproducible runs.
    #[serde(default)]
    pub time_ms: Option<u64>,
    #[serde(default)]
    pub weights: ScoreWeights,
    #[serde(default)]
    pub beam: BeamConfig,
    #[serde(default)]
    pub stall_weight: Option<f64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_SEARCH_DEPTH,
            nodes: DEFAULT_SEARCH_NODES,
            time_ms: None,
            weights: ScoreWeights::default(),
            beam: BeamConfig::default(),
            stall_weight: None,
        }
    }
}

impl SearchConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.depth == 0 {
            return Err(ValidationError::InvalidField {
                field: "search.depth".to_string(),
                message: "search depth must be greater than zero".to_string(),
            });
        }

        if self.nodes == 0 {
            return Err(ValidationError::InvalidField {
                field: "search.nodes".to_string(),
                message: "node budget must be greater than zero".to_string(),
            });
        }

        if self.time_ms == Some(0) {
            return Err(ValidationError::InvalidField {
                field: "search.time_ms".to_string(),
                message: "time budget must be greater than zero when set".to_string(),
            });
        }

        if self.beam.min_width == 0 || self.beam.min_width > self.beam.max_width {
            return Err(ValidationError::InvalidField {
                field: "search.beam".to_string(),
                message: "beam widths must satisfy 1 <= min_width <= max_width".to_string(),
            });
        }

        if self.beam.shrink_every == 0 {
            return Err(ValidationError::InvalidField {
                field: "search.beam.shrink_every".to_string(),
                message: "shrink_every must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn solver_params(&self) -> SolverParams {
        let defaults = SolverParams::default();
        SolverParams {
            weights: self.weights,
            beam: self.beam,
            budget: SearchBudget {
                depth: self.depth,
                nodes: self.nodes,
                time: self.time_ms.map(Duration::from_millis),
            },
            stall_weight: self.stall_weight.unwrap_or(defaults.stall_weight),
            ..defaults
        }
    }
}

fn default_search_depth() -> u32 {
    DEFAULT_SEARCH_DEPTH
}

fn default_search_nodes() -> u64 {
    DEFAULT_SEARCH_NODES
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    /// Telemetry JSONL path (`{run_id}` allowed). Defaults to
    /// `telemetry.jsonl` beside the summary.
    #[serde(default)]
    pub telemetry_jsonl: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            telemetry_jsonl: None,
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
        if self
            .telemetry_jsonl
            .as_ref()
            .is_some_and(|path| path.trim().is_empty())
        {
            self.telemetry_jsonl = None;
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.level().is_none() {
            return Err(ValidationError::InvalidField {
                field: "logging.tracing_level".to_string(),
                message: format!("unknown tracing level '{}'", self.tracing_level),
            });
        }
        Ok(())
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_scenarios(scenarios: &[ScenarioConfig]) -> Result<(), ValidationError> {
    if scenarios.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "scenarios".to_string(),
            message: "at least one scenario must be specified".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for (index, scenario) in scenarios.iter().enumerate() {
        if scenario.name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: format!("scenarios[{index}].name"),
                message: "scenario name must not be empty".to_string(),
            });
        }

        if !scenario.name.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
            return Err(ValidationError::InvalidField {
                field: format!("scenarios[{}].name", scenario.name),
                message: "scenario name contains invalid characters".to_string(),
            });
        }

        if !seen.insert(scenario.name.as_str()) {
            return Err(ValidationError::InvalidField {
                field: "scenarios".to_string(),
                message: format!("scenario name '{}' defined more than once", scenario.name),
            });
        }

        scenario.validate(index)?;
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub telemetry: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
