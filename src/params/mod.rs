//! Typed, named parameters with JSON and command-line surfaces.
//!
//! Each named component owns a [`ParameterBox`] keyed by a prefix; a
//! [`ParameterRegistry`] aggregates the boxes of a program, applies
//! `{prefix: {name: value}}` JSON objects and `--prefix::name value`
//! command-line options, and generates help text. The boxes of the
//! core components are declared here, and every config type can be
//! built from its box with `from_parameters`.

mod registry;
mod value;

pub use registry::{Parameter, ParameterBox, ParameterRegistry, ParseOutcome};
pub use value::{ParamKind, ParamValue};

use std::time::Duration;

use crate::error::SearchError;
use crate::runners::{
    HillClimbingConfig, RunnerConfig, SaCooling, SimulatedAnnealingConfig, TabuSearchConfig,
};
use crate::solver::SolverConfig;

/// Parameters of the solver driver (`solver` prefix).
pub fn solver_parameters() -> ParameterBox {
    ParameterBox::new("solver", "local search driver")
        .declare(
            "init_trials",
            "number of states sampled for the initial state",
            ParamKind::Unsigned,
            Some(ParamValue::Unsigned(1)),
        )
        .declare(
            "random_state",
            "sample random initial states instead of constructing greedily",
            ParamKind::Bool,
            Some(ParamValue::Bool(true)),
        )
        .declare(
            "timeout",
            "wall-clock budget in seconds (unset: no timeout)",
            ParamKind::Float,
            None,
        )
}

/// Parameters shared by every runner (`runner` prefix).
pub fn runner_parameters() -> ParameterBox {
    ParameterBox::new("runner", "move runner budgets")
        .declare(
            "max_iterations",
            "hard cap on loop iterations",
            ParamKind::Unsigned,
            None,
        )
        .declare(
            "max_evaluations",
            "hard cap on delta-cost evaluations",
            ParamKind::Unsigned,
            None,
        )
}

/// Hill climbing parameters (`hc` prefix).
pub fn hc_parameters() -> ParameterBox {
    ParameterBox::new("hc", "hill climbing").declare(
        "max_idle_iterations",
        "iterations without improvement before stopping",
        ParamKind::Unsigned,
        None,
    )
}

/// Simulated annealing parameters (`sa` prefix).
pub fn sa_parameters() -> ParameterBox {
    ParameterBox::new("sa", "simulated annealing")
        .declare(
            "start_temperature",
            "initial temperature (non-positive: auto-estimate)",
            ParamKind::Float,
            Some(ParamValue::Float(0.0)),
        )
        .declare(
            "min_temperature",
            "stop threshold of the cooling schedule",
            ParamKind::Float,
            Some(ParamValue::Float(1e-4)),
        )
        .declare(
            "cooling_rate",
            "geometric cooling factor in (0, 1)",
            ParamKind::Float,
            Some(ParamValue::Float(0.95)),
        )
        .declare(
            "max_neighbors_sampled",
            "neighbors sampled per temperature",
            ParamKind::Unsigned,
            Some(ParamValue::Unsigned(100)),
        )
        .declare(
            "max_neighbors_accepted",
            "neighbors accepted per temperature (0: same as sampled)",
            ParamKind::Unsigned,
            Some(ParamValue::Unsigned(0)),
        )
        .declare(
            "neighbors_accepted_ratio",
            "accepted fraction per temperature (time-based mode)",
            ParamKind::Float,
            None,
        )
        .declare(
            "temperature_range",
            "start/final temperature ratio (time-based mode)",
            ParamKind::Float,
            None,
        )
        .declare(
            "expected_min_temperature",
            "expected final temperature (time-based mode)",
            ParamKind::Float,
            None,
        )
        .declare(
            "allowed_running_time",
            "wall-clock allowance in seconds (enables the time-based mode)",
            ParamKind::Float,
            None,
        )
}

/// Tabu search parameters (`ts` prefix).
pub fn ts_parameters() -> ParameterBox {
    ParameterBox::new("ts", "tabu search")
        .declare(
            "min_tenure",
            "minimum tabu tenure",
            ParamKind::Unsigned,
            Some(ParamValue::Unsigned(3)),
        )
        .declare(
            "max_tenure",
            "maximum tabu tenure",
            ParamKind::Unsigned,
            Some(ParamValue::Unsigned(7)),
        )
        .declare(
            "max_idle_iterations",
            "iterations without improvement before stopping",
            ParamKind::Unsigned,
            Some(ParamValue::Unsigned(100)),
        )
}

impl SolverConfig {
    /// Builds the driver config from a `solver` parameter box.
    pub fn from_parameters(params: &ParameterBox) -> Result<Self, SearchError> {
        let timeout = if params.is_set("timeout") {
            let seconds = params.get_float("timeout")?;
            if seconds <= 0.0 {
                return Err(SearchError::incorrect_parameter(
                    "solver::timeout",
                    "must be greater than zero",
                ));
            }
            Some(Duration::from_secs_f64(seconds))
        } else {
            None
        };
        Ok(SolverConfig {
            init_trials: params.get_unsigned("init_trials")? as u32,
            random_initial_state: params.get_bool("random_state")?,
            timeout,
        })
    }
}

impl RunnerConfig {
    /// Builds the shared budgets from a `runner` parameter box.
    pub fn from_parameters(params: &ParameterBox) -> Result<Self, SearchError> {
        Ok(RunnerConfig {
            max_iterations: if params.is_set("max_iterations") {
                Some(params.get_unsigned("max_iterations")?)
            } else {
                None
            },
            max_evaluations: if params.is_set("max_evaluations") {
                Some(params.get_unsigned("max_evaluations")?)
            } else {
                None
            },
        })
    }
}

impl HillClimbingConfig {
    /// Builds the config from an `hc` parameter box; the idle bound has
    /// no default and must be set.
    pub fn from_parameters(params: &ParameterBox) -> Result<Self, SearchError> {
        Ok(HillClimbingConfig {
            max_idle_iterations: params.get_unsigned("max_idle_iterations")?,
        })
    }
}

impl TabuSearchConfig {
    /// Builds the config from a `ts` parameter box.
    pub fn from_parameters(params: &ParameterBox) -> Result<Self, SearchError> {
        Ok(TabuSearchConfig {
            min_tenure: params.get_unsigned("min_tenure")?,
            max_tenure: params.get_unsigned("max_tenure")?,
            max_idle_iterations: params.get_unsigned("max_idle_iterations")?,
        })
    }
}

impl SimulatedAnnealingConfig {
    /// Builds the config from an `sa` parameter box. Setting
    /// `allowed_running_time` selects the time-based mode.
    pub fn from_parameters(params: &ParameterBox) -> Result<Self, SearchError> {
        let cooling = if params.is_set("allowed_running_time") {
            SaCooling::TimeBased {
                neighbors_accepted_ratio: if params.is_set("neighbors_accepted_ratio") {
                    Some(params.get_float("neighbors_accepted_ratio")?)
                } else {
                    None
                },
                temperature_range: if params.is_set("temperature_range") {
                    Some(params.get_float("temperature_range")?)
                } else {
                    None
                },
                expected_min_temperature: if params.is_set("expected_min_temperature") {
                    Some(params.get_float("expected_min_temperature")?)
                } else {
                    None
                },
                allowed_running_time: params.get_float("allowed_running_time")?,
            }
        } else {
            SaCooling::CounterBased
        };
        Ok(SimulatedAnnealingConfig {
            start_temperature: params.get_float("start_temperature")?,
            min_temperature: params.get_float("min_temperature")?,
            cooling_rate: params.get_float("cooling_rate")?,
            max_neighbors_sampled: params.get_unsigned("max_neighbors_sampled")?,
            max_neighbors_accepted: params.get_unsigned("max_neighbors_accepted")?,
            cooling,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_solver_config_from_parameters() {
        let mut params = solver_parameters();
        let config = SolverConfig::from_parameters(&params).unwrap();
        assert_eq!(config.init_trials, 1);
        assert!(config.random_initial_state);
        assert_eq!(config.timeout, None);

        params.set("timeout", ParamValue::Float(0.5)).unwrap();
        params.set("init_trials", ParamValue::Unsigned(10)).unwrap();
        let config = SolverConfig::from_parameters(&params).unwrap();
        assert_eq!(config.timeout, Some(Duration::from_millis(500)));
        assert_eq!(config.init_trials, 10);
    }

    #[test]
    fn test_negative_timeout_rejected() {
        let mut params = solver_parameters();
        params.set("timeout", ParamValue::Float(-1.0)).unwrap();
        assert!(matches!(
            SolverConfig::from_parameters(&params).unwrap_err(),
            SearchError::IncorrectParameterValue { .. }
        ));
    }

    #[test]
    fn test_runner_config_budgets_optional() {
        let mut params = runner_parameters();
        let config = RunnerConfig::from_parameters(&params).unwrap();
        assert_eq!(config.max_iterations, None);
        params.set("max_iterations", ParamValue::Unsigned(50)).unwrap();
        let config = RunnerConfig::from_parameters(&params).unwrap();
        assert_eq!(config.max_iterations, Some(50));
    }

    #[test]
    fn test_hc_requires_idle_bound() {
        let params = hc_parameters();
        assert_eq!(
            HillClimbingConfig::from_parameters(&params).unwrap_err(),
            SearchError::ParameterNotSet("hc::max_idle_iterations".into())
        );
    }

    #[test]
    fn test_ts_defaults() {
        let config = TabuSearchConfig::from_parameters(&ts_parameters()).unwrap();
        assert_eq!(config.min_tenure, 3);
        assert_eq!(config.max_tenure, 7);
    }

    #[test]
    fn test_sa_mode_selected_by_running_time() {
        let mut params = sa_parameters();
        let config = SimulatedAnnealingConfig::from_parameters(&params).unwrap();
        assert!(matches!(config.cooling, SaCooling::CounterBased));

        params
            .set("allowed_running_time", ParamValue::Float(10.0))
            .unwrap();
        params
            .set("temperature_range", ParamValue::Float(100.0))
            .unwrap();
        let config = SimulatedAnnealingConfig::from_parameters(&params).unwrap();
        match config.cooling {
            SaCooling::TimeBased {
                temperature_range,
                allowed_running_time,
                ..
            } => {
                assert_eq!(temperature_range, Some(100.0));
                assert_eq!(allowed_running_time, 10.0);
            }
            SaCooling::CounterBased => panic!("expected the time-based mode"),
        }
    }

    #[test]
    fn test_registry_end_to_end_cli() {
        let mut registry = ParameterRegistry::new()
            .with_box(solver_parameters())
            .with_box(runner_parameters())
            .with_box(sa_parameters());
        let args: Vec<String> = [
            "--solver::timeout=2.5",
            "--sa::start_temperature",
            "50",
            "--runner::max_evaluations",
            "100000",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let outcome = registry.parse_args(&args).unwrap();
        assert!(outcome.unknown.is_empty());

        let solver = SolverConfig::from_parameters(registry.find("solver").unwrap()).unwrap();
        assert_eq!(solver.timeout, Some(Duration::from_millis(2500)));
        let sa =
            SimulatedAnnealingConfig::from_parameters(registry.find("sa").unwrap()).unwrap();
        assert_eq!(sa.start_temperature, 50.0);
        let runner = RunnerConfig::from_parameters(registry.find("runner").unwrap()).unwrap();
        assert_eq!(runner.max_evaluations, Some(100_000));
    }

    #[test]
    fn test_registry_json_describe() {
        let registry = ParameterRegistry::new()
            .with_box(solver_parameters())
            .with_box(ts_parameters());
        let encoded = registry.to_json();
        assert_eq!(encoded["solver"]["init_trials"], json!(1));
        assert_eq!(encoded["ts"]["max_tenure"], json!(7));
        // unset parameters without defaults are absent
        assert!(encoded["solver"].get("timeout").is_none());
    }
}
