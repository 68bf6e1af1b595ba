//! Engine configuration.
//!
//! Loaded from TOML, then overridden by `HAZARD_*` environment variables,
//! then validated. Every field has a default so a job file only needs the
//! parameters it changes.

use crate::error::ConfigError;
use crate::kernel::KernelParams;
use crate::scheduler::{RetryConfig, SchedulerConfig};
use hazard_core::realizations::SamplingMode;
use hazard_core::types::Imtls;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Log levels accepted by `log_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything.
    Trace,
    /// Per-task detail.
    Debug,
    /// Progress.
    #[default]
    Info,
    /// Retries and diagnostics.
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("unknown log level {s:?}")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

/// Where tasks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribute {
    /// Dedicated rayon thread pool.
    #[default]
    Rayon,
    /// Sequentially on the calling thread.
    Inline,
}

impl FromStr for Distribute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rayon" => Ok(Distribute::Rayon),
            "inline" | "no" => Ok(Distribute::Inline),
            _ => Err(format!("unknown distribution mode {s:?}")),
        }
    }
}

impl fmt::Display for Distribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribute::Rayon => f.write_str("rayon"),
            Distribute::Inline => f.write_str("inline"),
        }
    }
}

/// Calculation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed of the logic-tree sampler.
    pub random_seed: u64,
    /// N > 0 draws N samples; 0 defers to the source-model tree, which
    /// enumerates unless it declares its own sample count.
    pub number_of_logic_tree_samples: u32,
    /// Task weight budget; derived from `concurrent_tasks` when absent.
    pub max_task_weight: Option<f64>,
    /// Target number of tasks used to derive the budget.
    pub concurrent_tasks: usize,
    /// Threads of the worker pool.
    pub num_workers: usize,
    /// Pool implementation.
    pub distribute: Distribute,
    /// Retries of a transiently failing task.
    pub max_retries: u32,
    /// First retry delay, ms.
    pub retry_initial_delay_ms: u64,
    /// Retry delay cap, ms.
    pub retry_max_delay_ms: u64,
    /// Result channel polling interval, ms.
    pub poll_interval_ms: u64,
    /// Tolerance on branch weight sums.
    pub weight_tolerance: f64,
    /// Investigation time, years.
    pub investigation_time: f64,
    /// Ground-motion truncation, standard deviations.
    pub truncation_level: Option<f64>,
    /// Integration distance, km.
    pub maximum_distance: f64,
    /// Point-source gridding cell size, km.
    pub ps_grid_spacing: Option<f64>,
    /// Intensity measure types and levels.
    pub intensity_measure_types_and_levels: Imtls,
    /// Quantiles of the statistics.
    pub quantiles: Vec<f64>,
    /// Target probabilities of the hazard maps.
    pub poes: Vec<f64>,
    /// Length of the slowest-sources list.
    pub num_slowest_sources: usize,
    /// Default log level of the CLI.
    pub log_level: LogLevel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let cpus = num_cpus::get();
        Self {
            random_seed: 42,
            number_of_logic_tree_samples: 0,
            max_task_weight: None,
            concurrent_tasks: 2 * cpus,
            num_workers: cpus,
            distribute: Distribute::Rayon,
            max_retries: 3,
            retry_initial_delay_ms: 100,
            retry_max_delay_ms: 30_000,
            poll_interval_ms: 50,
            weight_tolerance: 1e-6,
            investigation_time: 50.0,
            truncation_level: None,
            maximum_distance: 200.0,
            ps_grid_spacing: None,
            intensity_measure_types_and_levels: Imtls::default(),
            quantiles: Vec::new(),
            poes: Vec::new(),
            num_slowest_sources: 10,
            log_level: LogLevel::Info,
        }
    }
}

impl EngineConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML document, without environment overrides.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileError`] on malformed TOML, or any validation error.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| ConfigError::FileError(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file and applies the `HAZARD_*` environment overrides.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileError`] when the file cannot be read or parsed,
    /// [`ConfigError::EnvError`] on unparsable overrides, or any validation
    /// error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("failed to read {}: {e}", path.display())))?;
        let mut config: EngineConfig =
            toml::from_str(&content).map_err(|e| ConfigError::FileError(format!("failed to parse TOML: {e}")))?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// [`ConfigError::EnvError`] when a variable cannot be parsed.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Applies overrides read through `lookup`.
    ///
    /// Recognised variables: `HAZARD_RANDOM_SEED`,
    /// `HAZARD_NUMBER_OF_LOGIC_TREE_SAMPLES`, `HAZARD_MAX_TASK_WEIGHT`,
    /// `HAZARD_CONCURRENT_TASKS`, `HAZARD_NUM_WORKERS`, `HAZARD_DISTRIBUTE`,
    /// `HAZARD_MAX_RETRIES` and `HAZARD_LOG_LEVEL`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::EnvError`] when a variable cannot be parsed.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "HAZARD_RANDOM_SEED")? {
            self.random_seed = v;
        }
        if let Some(v) = parse_var(&lookup, "HAZARD_NUMBER_OF_LOGIC_TREE_SAMPLES")? {
            self.number_of_logic_tree_samples = v;
        }
        if let Some(v) = parse_var(&lookup, "HAZARD_MAX_TASK_WEIGHT")? {
            self.max_task_weight = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "HAZARD_CONCURRENT_TASKS")? {
            self.concurrent_tasks = v;
        }
        if let Some(v) = parse_var(&lookup, "HAZARD_NUM_WORKERS")? {
            self.num_workers = v;
        }
        if let Some(v) = parse_var(&lookup, "HAZARD_DISTRIBUTE")? {
            self.distribute = v;
        }
        if let Some(v) = parse_var(&lookup, "HAZARD_MAX_RETRIES")? {
            self.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "HAZARD_LOG_LEVEL")? {
            self.log_level = v;
        }
        Ok(())
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] naming the first offending parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(w) = self.max_task_weight {
            if !(w.is_finite() && w > 0.0) {
                return invalid("max_task_weight", format!("must be positive, got {w}"));
            }
        }
        if self.concurrent_tasks == 0 {
            return invalid("concurrent_tasks", "must be at least 1".to_string());
        }
        if self.num_workers == 0 {
            return invalid("num_workers", "must be at least 1".to_string());
        }
        if self.poll_interval_ms == 0 {
            return invalid("poll_interval_ms", "must be at least 1".to_string());
        }
        if self.retry_max_delay_ms < self.retry_initial_delay_ms {
            return invalid(
                "retry_max_delay_ms",
                "must not be below retry_initial_delay_ms".to_string(),
            );
        }
        if !(self.weight_tolerance.is_finite() && self.weight_tolerance > 0.0) {
            return invalid("weight_tolerance", format!("must be positive, got {}", self.weight_tolerance));
        }
        if !(self.investigation_time.is_finite() && self.investigation_time > 0.0) {
            return invalid(
                "investigation_time",
                format!("must be positive, got {}", self.investigation_time),
            );
        }
        if let Some(t) = self.truncation_level {
            if !(t.is_finite() && t >= 0.0) {
                return invalid("truncation_level", format!("must be non-negative, got {t}"));
            }
        }
        if !(self.maximum_distance.is_finite() && self.maximum_distance > 0.0) {
            return invalid(
                "maximum_distance",
                format!("must be positive, got {}", self.maximum_distance),
            );
        }
        if let Some(s) = self.ps_grid_spacing {
            if !(s.is_finite() && s > 0.0) {
                return invalid("ps_grid_spacing", format!("must be positive, got {s}"));
            }
        }
        if let Some(q) = self.quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
            return invalid("quantiles", format!("{q} is outside [0, 1]"));
        }
        if let Some(p) = self.poes.iter().find(|p| !(**p > 0.0 && **p < 1.0)) {
            return invalid("poes", format!("{p} is outside (0, 1)"));
        }
        Ok(())
    }

    /// Sampling mode of the logic tree.
    pub fn sampling_mode(&self) -> SamplingMode {
        SamplingMode::from_samples(self.number_of_logic_tree_samples, self.random_seed)
    }

    /// Task weight budget.
    ///
    /// The configured `max_task_weight`, or `total_weight / concurrent_tasks`
    /// raised to at least `max_unit_weight` so that one rupture always fits.
    ///
    /// ```
    /// use hazard_engine::EngineConfig;
    ///
    /// let config = EngineConfig { concurrent_tasks: 4, ..EngineConfig::default() };
    /// assert_eq!(config.task_budget(1000.0, 2.0), 250.0);
    /// assert_eq!(config.task_budget(4.0, 2.0), 2.0);
    /// ```
    pub fn task_budget(&self, total_weight: f64, max_unit_weight: f64) -> f64 {
        match self.max_task_weight {
            Some(w) => w,
            None => (total_weight / self.concurrent_tasks as f64).max(max_unit_weight),
        }
    }

    /// Parameters of the hazard kernel.
    pub fn kernel_params(&self) -> KernelParams {
        KernelParams {
            investigation_time: self.investigation_time,
            truncation_level: self.truncation_level,
            maximum_distance: self.maximum_distance,
        }
    }

    /// Parameters of the scheduler.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            retry: RetryConfig::new()
                .max_retries(self.max_retries)
                .initial_delay(Duration::from_millis(self.retry_initial_delay_ms))
                .max_delay(Duration::from_millis(self.retry_max_delay_ms)),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

fn invalid(name: &'static str, reason: String) -> Result<(), ConfigError> {
    Err(ConfigError::InvalidParameter { name, reason })
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| ConfigError::EnvError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.concurrent_tasks, 2 * config.num_workers);
        assert_eq!(config.sampling_mode(), SamplingMode::Enumerate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            random_seed = 106
            number_of_logic_tree_samples = 5
            distribute = "inline"
            truncation_level = 3.0
            poes = [0.1, 0.02]

            [intensity_measure_types_and_levels]
            PGA = [0.05, 0.1, 0.2]
            "#,
        )
        .unwrap();
        assert_eq!(config.random_seed, 106);
        assert_eq!(config.distribute, Distribute::Inline);
        assert_eq!(config.intensity_measure_types_and_levels.num_levels(), 3);
        assert_eq!(
            config.sampling_mode(),
            SamplingMode::Sample {
                num_samples: 5,
                seed: 106
            }
        );
        assert_eq!(config.maximum_distance, 200.0);
    }

    #[test]
    fn test_invalid_levels_rejected() {
        let err = EngineConfig::from_toml_str(
            r#"
            [intensity_measure_types_and_levels]
            PGA = [0.2, 0.1]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::FileError(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("HAZARD_RANDOM_SEED", "7"),
            ("HAZARD_DISTRIBUTE", "inline"),
            ("HAZARD_MAX_TASK_WEIGHT", "1500.5"),
            ("HAZARD_LOG_LEVEL", "DEBUG"),
        ]);
        let mut config = EngineConfig::default();
        config
            .apply_env_with(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.distribute, Distribute::Inline);
        assert_eq!(config.max_task_weight, Some(1500.5));
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_env_with(|name| (name == "HAZARD_MAX_RETRIES").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvError { ref name, .. } if name == "HAZARD_MAX_RETRIES"));
    }

    #[test]
    fn test_validation() {
        let config = EngineConfig {
            quantiles: vec![0.5, 1.5],
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "quantiles", .. })
        ));
        let config = EngineConfig {
            max_task_weight: Some(0.0),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
        let config = EngineConfig {
            poes: vec![1.0],
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_budget_prefers_configured_value() {
        let config = EngineConfig {
            max_task_weight: Some(10.0),
            ..EngineConfig::default()
        };
        assert_eq!(config.task_budget(1e6, 50.0), 10.0);
    }
}
