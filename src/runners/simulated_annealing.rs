//! Simulated annealing.
//!
//! Random move selection with Metropolis acceptance: non-worsening
//! moves always pass, worsening moves pass with probability
//! `exp(-delta / T)`. The temperature drops by a geometric factor each
//! time the per-temperature budget of sampled or accepted neighbors is
//! spent; the search ends at the minimum temperature, or — in the
//! time-based mode — when the wall-clock allowance runs out.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated
//!   Annealing"
//! - Cerny (1985), "Thermodynamical Approach to the Travelling Salesman
//!   Problem"

use std::time::{Duration, Instant};

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::{RunContext, Runner};
use crate::cost::CostValue;
use crate::error::SearchError;
use crate::explorer::{EvaluatedMove, NeighborhoodExplorer};
use crate::state::Model;

/// When the temperature drops and when the run stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SaCooling {
    /// Cool after the per-temperature sampled/accepted budgets; stop at
    /// `min_temperature`.
    CounterBased,
    /// Derive the per-temperature budgets from the evaluation budget
    /// and an expected number of temperatures, cool on a per-temperature
    /// time slice (or the accepted cap), and stop on total wall clock.
    TimeBased {
        /// Fraction of sampled neighbors that may be accepted per
        /// temperature; defaults to 1.
        neighbors_accepted_ratio: Option<f64>,
        /// Ratio `start_temperature / final_temperature`; either this
        /// or `expected_min_temperature` must be set.
        temperature_range: Option<f64>,
        /// Expected final temperature, used to derive the range when it
        /// is not given directly.
        expected_min_temperature: Option<f64>,
        /// Total wall-clock allowance, in seconds.
        allowed_running_time: f64,
    },
}

/// Simulated annealing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedAnnealingConfig {
    /// Initial temperature; a non-positive value requests the
    /// auto-estimate (maximum delta over a 100-move random probe).
    pub start_temperature: f64,
    /// Stop threshold of the counter-based mode; must be positive.
    pub min_temperature: f64,
    /// Geometric cooling factor, in (0, 1).
    pub cooling_rate: f64,
    /// Neighbors sampled per temperature (counter-based mode).
    pub max_neighbors_sampled: u64,
    /// Neighbors accepted per temperature; 0 means "same as sampled".
    pub max_neighbors_accepted: u64,
    /// Cooling/termination mode.
    pub cooling: SaCooling,
}

impl Default for SimulatedAnnealingConfig {
    fn default() -> Self {
        SimulatedAnnealingConfig {
            start_temperature: 0.0,
            min_temperature: 1e-4,
            cooling_rate: 0.95,
            max_neighbors_sampled: 100,
            max_neighbors_accepted: 0,
            cooling: SaCooling::CounterBased,
        }
    }
}

impl SimulatedAnnealingConfig {
    pub fn with_start_temperature(mut self, t: f64) -> Self {
        self.start_temperature = t;
        self
    }

    pub fn with_min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = t;
        self
    }

    pub fn with_cooling_rate(mut self, rate: f64) -> Self {
        self.cooling_rate = rate;
        self
    }

    pub fn with_max_neighbors_sampled(mut self, n: u64) -> Self {
        self.max_neighbors_sampled = n;
        self
    }

    pub fn with_max_neighbors_accepted(mut self, n: u64) -> Self {
        self.max_neighbors_accepted = n;
        self
    }

    pub fn with_cooling(mut self, cooling: SaCooling) -> Self {
        self.cooling = cooling;
        self
    }
}

/// The simulated annealing runner.
pub struct SimulatedAnnealing {
    config: SimulatedAnnealingConfig,
    temperature: f64,
    neighbors_sampled: u64,
    neighbors_accepted: u64,
    number_of_temperatures: u64,
    // effective per-temperature budgets (derived in the time-based mode)
    effective_sampled: u64,
    effective_accepted: u64,
    run_duration: Option<Duration>,
    per_temperature_time: Option<Duration>,
    run_start: Instant,
    temperature_start: Instant,
}

impl SimulatedAnnealing {
    pub fn new(config: SimulatedAnnealingConfig) -> Self {
        SimulatedAnnealing {
            config,
            temperature: 0.0,
            neighbors_sampled: 0,
            neighbors_accepted: 0,
            number_of_temperatures: 0,
            effective_sampled: 0,
            effective_accepted: 0,
            run_duration: None,
            per_temperature_time: None,
            run_start: Instant::now(),
            temperature_start: Instant::now(),
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn number_of_temperatures(&self) -> u64 {
        self.number_of_temperatures
    }

    fn cooling_needed(&self) -> bool {
        if self.neighbors_accepted >= self.effective_accepted {
            return true;
        }
        match self.per_temperature_time {
            Some(slice) => self.temperature_start.elapsed() >= slice,
            None => self.neighbors_sampled >= self.effective_sampled,
        }
    }

    fn cool(&mut self) {
        self.temperature *= self.config.cooling_rate;
        self.number_of_temperatures += 1;
        self.neighbors_sampled = 0;
        self.neighbors_accepted = 0;
        self.temperature_start = Instant::now();
    }
}

impl<M, E> Runner<M, E> for SimulatedAnnealing
where
    M: Model,
    E: NeighborhoodExplorer<State = M::State, Cost = M::Cost>,
{
    fn name(&self) -> &str {
        "simulated_annealing"
    }

    fn initialize_run(
        &mut self,
        ctx: &mut RunContext<M, E>,
        rng: &mut dyn RngCore,
    ) -> Result<(), SearchError> {
        if self.config.min_temperature <= 0.0 {
            return Err(SearchError::incorrect_parameter(
                "sa::min_temperature",
                "must be greater than zero",
            ));
        }
        if self.config.cooling_rate <= 0.0 || self.config.cooling_rate >= 1.0 {
            return Err(SearchError::incorrect_parameter(
                "sa::cooling_rate",
                "must lie in (0, 1)",
            ));
        }

        self.temperature = if self.config.start_temperature > 0.0 {
            self.config.start_temperature
        } else {
            // probe the neighborhood and start at the worst delta seen
            let mut max_delta = f64::NEG_INFINITY;
            for _ in 0..100 {
                match ctx.explorer.random_move(&ctx.current, rng) {
                    Ok(mv) => {
                        let delta = ctx.explorer.delta_cost(&ctx.current, &mv, None);
                        ctx.evaluations += 1;
                        max_delta = max_delta.max(delta.total.as_f64());
                    }
                    Err(_) => break,
                }
            }
            if max_delta > 0.0 {
                max_delta
            } else {
                1.0
            }
        };

        match &self.config.cooling {
            SaCooling::CounterBased => {
                if self.config.max_neighbors_sampled == 0 {
                    return Err(SearchError::incorrect_parameter(
                        "sa::max_neighbors_sampled",
                        "must be greater than zero",
                    ));
                }
                self.effective_sampled = self.config.max_neighbors_sampled;
                self.effective_accepted = if self.config.max_neighbors_accepted == 0 {
                    self.config.max_neighbors_sampled
                } else {
                    self.config.max_neighbors_accepted
                };
                self.run_duration = None;
                self.per_temperature_time = None;
            }
            SaCooling::TimeBased {
                neighbors_accepted_ratio,
                temperature_range,
                expected_min_temperature,
                allowed_running_time,
            } => {
                if *allowed_running_time <= 0.0 {
                    return Err(SearchError::incorrect_parameter(
                        "sa::allowed_running_time",
                        "must be greater than zero",
                    ));
                }
                let range = match (temperature_range, expected_min_temperature) {
                    (Some(range), _) => *range,
                    (None, Some(min)) if *min > 0.0 => self.temperature / min,
                    _ => {
                        return Err(SearchError::ParameterNotSet(
                            "sa::temperature_range".into(),
                        ))
                    }
                };
                if range <= 1.0 {
                    return Err(SearchError::incorrect_parameter(
                        "sa::temperature_range",
                        "must be greater than one",
                    ));
                }
                let expected_temperatures =
                    ((-range.ln() / self.config.cooling_rate.ln()).ceil() as u64).max(1);
                let max_evaluations = ctx
                    .config
                    .max_evaluations
                    .ok_or_else(|| SearchError::ParameterNotSet("runner::max_evaluations".into()))?;
                self.effective_sampled = (max_evaluations / expected_temperatures).max(1);
                self.effective_accepted = match neighbors_accepted_ratio {
                    Some(ratio) => {
                        ((self.effective_sampled as f64 * ratio) as u64).max(1)
                    }
                    None => self.effective_sampled,
                };
                let duration = Duration::from_secs_f64(*allowed_running_time);
                self.run_duration = Some(duration);
                self.per_temperature_time = Some(Duration::from_secs_f64(
                    allowed_running_time / expected_temperatures as f64,
                ));
            }
        }

        self.neighbors_sampled = 0;
        self.neighbors_accepted = 0;
        self.number_of_temperatures = 0;
        self.run_start = Instant::now();
        self.temperature_start = self.run_start;
        Ok(())
    }

    fn select_move(
        &mut self,
        ctx: &mut RunContext<M, E>,
        rng: &mut dyn RngCore,
    ) -> Result<EvaluatedMove<E::Move, M::Cost>, SearchError> {
        let mv = ctx.explorer.random_move(&ctx.current, rng)?;
        let cost = ctx.explorer.delta_cost(&ctx.current, &mv, None);
        ctx.evaluations += 1;
        self.neighbors_sampled += 1;
        Ok(EvaluatedMove::new(mv, cost))
    }

    fn acceptable_move(
        &mut self,
        ctx: &RunContext<M, E>,
        mv: &EvaluatedMove<E::Move, M::Cost>,
        rng: &mut dyn RngCore,
    ) -> bool {
        if ctx.non_worsening(&mv.cost) {
            return true;
        }
        let mut rng = rng;
        let delta = mv.cost.total.as_f64();
        rng.random::<f64>() < (-delta / self.temperature).exp()
    }

    fn complete_iteration(
        &mut self,
        _ctx: &mut RunContext<M, E>,
        _mv: &EvaluatedMove<E::Move, M::Cost>,
        accepted: bool,
        _rng: &mut dyn RngCore,
    ) {
        if accepted {
            self.neighbors_accepted += 1;
        }
        if self.cooling_needed() {
            self.cool();
        }
    }

    fn stop_criterion(&self, _ctx: &RunContext<M, E>) -> bool {
        match self.run_duration {
            Some(duration) => self.run_start.elapsed() >= duration,
            None => self.temperature <= self.config.min_temperature,
        }
    }

    fn terminate_run(&mut self, _ctx: &mut RunContext<M, E>) {}

    fn max_evaluations_expired(&self, ctx: &RunContext<M, E>) -> bool {
        // the time-based mode spreads the evaluation budget over the
        // schedule instead of cutting the run short
        if self.run_duration.is_some() {
            return false;
        }
        ctx.config
            .max_evaluations
            .is_some_and(|max| ctx.evaluations >= max)
    }

    fn status_string(&self) -> String {
        format!(
            "T = {:.4}, NS = {}, NA = {}",
            self.temperature, self.neighbors_sampled, self.neighbors_accepted
        )
    }
}
