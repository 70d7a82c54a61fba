//! Hill climbing.
//!
//! Random move selection; a move is applied only when it improves the
//! cost or leaves it unchanged, so sideways drift across plateaus is
//! possible. The search stops after a bound on idle iterations, at
//! which point the current state is a local optimum and becomes the
//! best.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{RunContext, Runner};
use crate::error::SearchError;
use crate::explorer::{EvaluatedMove, NeighborhoodExplorer};
use crate::state::Model;

/// Hill climbing parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HillClimbingConfig {
    /// Iterations without improvement before stopping. Must be
    /// positive.
    pub max_idle_iterations: u64,
}

impl HillClimbingConfig {
    pub fn with_max_idle_iterations(mut self, n: u64) -> Self {
        self.max_idle_iterations = n;
        self
    }
}

/// The hill climbing runner.
pub struct HillClimbing {
    config: HillClimbingConfig,
}

impl HillClimbing {
    pub fn new(config: HillClimbingConfig) -> Self {
        HillClimbing { config }
    }
}

impl<M, E> Runner<M, E> for HillClimbing
where
    M: Model,
    E: NeighborhoodExplorer<State = M::State, Cost = M::Cost>,
{
    fn name(&self) -> &str {
        "hill_climbing"
    }

    fn initialize_run(
        &mut self,
        _ctx: &mut RunContext<M, E>,
        _rng: &mut dyn RngCore,
    ) -> Result<(), SearchError> {
        if self.config.max_idle_iterations == 0 {
            return Err(SearchError::incorrect_parameter(
                "hc::max_idle_iterations",
                "must be greater than zero",
            ));
        }
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
        Ok(EvaluatedMove::new(mv, cost))
    }

    fn acceptable_move(
        &mut self,
        ctx: &RunContext<M, E>,
        mv: &EvaluatedMove<E::Move, M::Cost>,
        _rng: &mut dyn RngCore,
    ) -> bool {
        ctx.non_worsening(&mv.cost)
    }

    fn complete_iteration(
        &mut self,
        _ctx: &mut RunContext<M, E>,
        _mv: &EvaluatedMove<E::Move, M::Cost>,
        _accepted: bool,
        _rng: &mut dyn RngCore,
    ) {
    }

    fn stop_criterion(&self, ctx: &RunContext<M, E>) -> bool {
        ctx.idle_iterations() >= self.config.max_idle_iterations
    }

    fn terminate_run(&mut self, ctx: &mut RunContext<M, E>) {
        // the current state is a local optimum
        ctx.best = ctx.current.clone();
        ctx.best_cost = ctx.current_cost.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;
    use crate::runners::MoveRunner;
    use crate::test_utils::{queens_explorer, queens_manager};

    #[test]
    fn test_five_queens_solved_within_idle_bound() {
        let sm = queens_manager(5);
        let ne = queens_explorer(&sm);
        let mut solved = 0;
        for seed in 0..20 {
            let runner =
                HillClimbing::new(HillClimbingConfig::default().with_max_idle_iterations(100));
            let mut mr = MoveRunner::new(&sm, &ne, runner);
            let mut rng = create_rng(seed);
            let initial = sm.random_state(&mut rng);
            let outcome = mr.run(initial, &mut rng).unwrap();
            assert!(sm.check_consistency(&outcome.best));
            if outcome.best_cost.total == 0 {
                solved += 1;
            }
        }
        // sideways drift lets hill climbing solve small boards reliably
        assert!(solved >= 5, "only {solved}/20 runs reached a solution");
    }

    #[test]
    fn test_terminates_on_idle_bound() {
        let sm = queens_manager(6);
        let ne = queens_explorer(&sm);
        let runner =
            HillClimbing::new(HillClimbingConfig::default().with_max_idle_iterations(30));
        let mut mr = MoveRunner::new(&sm, &ne, runner);
        let mut rng = create_rng(7);
        let initial = sm.random_state(&mut rng);
        let outcome = mr.run(initial, &mut rng).unwrap();
        assert!(outcome.iterations - outcome.iteration_of_best >= 30);
    }

    #[test]
    fn test_best_equals_current_at_termination() {
        let sm = queens_manager(6);
        let ne = queens_explorer(&sm);
        let runner =
            HillClimbing::new(HillClimbingConfig::default().with_max_idle_iterations(40));
        let mut mr = MoveRunner::new(&sm, &ne, runner);
        let mut rng = create_rng(11);
        let initial = sm.random_state(&mut rng);
        let outcome = mr.run(initial, &mut rng).unwrap();
        // terminate_run promotes the current local optimum
        assert_eq!(
            outcome.best_cost,
            sm.cost_function_components(&outcome.best, None)
        );
    }

    #[test]
    fn test_zero_idle_bound_is_rejected() {
        let sm = queens_manager(5);
        let ne = queens_explorer(&sm);
        let runner = HillClimbing::new(HillClimbingConfig::default());
        let mut mr = MoveRunner::new(&sm, &ne, runner);
        let mut rng = create_rng(0);
        let initial = sm.random_state(&mut rng);
        let err = mr.run(initial, &mut rng).unwrap_err();
        assert!(matches!(err, SearchError::IncorrectParameterValue { .. }));
    }

    #[test]
    fn test_never_accepts_worsening_move() {
        let sm = queens_manager(8);
        let ne = queens_explorer(&sm);

        struct CostTrail {
            totals: std::sync::Arc<std::sync::Mutex<Vec<i64>>>,
        }
        impl crate::runners::RunnerObserver<i64> for CostTrail {
            fn on_made_move(&mut self, report: &crate::runners::RunReport<i64>) {
                self.totals.lock().unwrap().push(report.current_cost.total);
            }
        }
        let totals = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let runner =
            HillClimbing::new(HillClimbingConfig::default().with_max_idle_iterations(60));
        let mut mr = MoveRunner::new(&sm, &ne, runner).with_observer(Box::new(CostTrail {
            totals: totals.clone(),
        }));
        let mut rng = create_rng(19);
        let initial = sm.random_state(&mut rng);
        mr.run(initial, &mut rng).unwrap();
        let totals = totals.lock().unwrap();
        assert!(
            totals.windows(2).all(|w| w[1] <= w[0]),
            "current cost increased under hill climbing"
        );
    }
}
