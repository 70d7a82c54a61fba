//! Tabu search.
//!
//! Best-move selection with a short-term memory: recently applied moves
//! stay prohibited for a randomized number of iterations (the tenure),
//! keyed by a user-supplied inverse predicate. A prohibited move is let
//! through when it would improve the best-known cost (aspiration).
//!
//! # Reference
//!
//! Glover, F. (1989). "Tabu Search—Part I", *ORSA Journal on Computing*
//! 1(3), 190-206.

use std::cell::Cell;
use std::collections::VecDeque;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::{RunContext, Runner};
use crate::cost::CostStructure;
use crate::error::SearchError;
use crate::explorer::{EvaluatedMove, NeighborhoodExplorer};
use crate::state::Model;

/// Tabu search parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabuSearchConfig {
    /// Minimum iterations a move stays prohibited.
    pub min_tenure: u64,
    /// Maximum iterations a move stays prohibited (inclusive; the
    /// tenure is drawn uniformly from `[min_tenure, max_tenure]`).
    pub max_tenure: u64,
    /// Iterations without improvement before stopping.
    pub max_idle_iterations: u64,
}

impl Default for TabuSearchConfig {
    fn default() -> Self {
        TabuSearchConfig {
            min_tenure: 3,
            max_tenure: 7,
            max_idle_iterations: 100,
        }
    }
}

impl TabuSearchConfig {
    pub fn with_tenure(mut self, min: u64, max: u64) -> Self {
        self.min_tenure = min;
        self.max_tenure = max;
        self
    }

    pub fn with_max_idle_iterations(mut self, n: u64) -> Self {
        self.max_idle_iterations = n;
        self
    }
}

/// The tabu search runner.
///
/// `inverse` decides whether a candidate move undoes a listed one; a
/// candidate is prohibited when some unexpired list entry is its
/// inverse and aspiration does not hold.
pub struct TabuSearch<Mv> {
    config: TabuSearchConfig,
    inverse: Box<dyn Fn(&Mv, &Mv) -> bool + Send + Sync>,
    list: VecDeque<(Mv, u64)>,
    rejected_as_tabu: u64,
    aspiration_overrides: u64,
}

impl<Mv> TabuSearch<Mv> {
    pub fn new(
        config: TabuSearchConfig,
        inverse: impl Fn(&Mv, &Mv) -> bool + Send + Sync + 'static,
    ) -> Self {
        TabuSearch {
            config,
            inverse: Box::new(inverse),
            list: VecDeque::new(),
            rejected_as_tabu: 0,
            aspiration_overrides: 0,
        }
    }

    /// Current number of unexpired entries.
    pub fn tabu_list_len(&self) -> usize {
        self.list.len()
    }

    /// Moves rejected because of tabu status during this run.
    pub fn rejected_as_tabu(&self) -> u64 {
        self.rejected_as_tabu
    }

    /// Tabu moves let through by aspiration during this run.
    pub fn aspiration_overrides(&self) -> u64 {
        self.aspiration_overrides
    }

    /// Whether some unexpired entry is the inverse of `mv`.
    pub fn list_member(&self, mv: &Mv) -> bool {
        self.list.iter().any(|(listed, _)| (self.inverse)(mv, listed))
    }

    /// Drops entries whose tenure has elapsed.
    fn purge(&mut self, iteration: u64) {
        self.list.retain(|(_, expiry)| *expiry > iteration);
    }
}

impl<M, E> Runner<M, E> for TabuSearch<E::Move>
where
    M: Model,
    E: NeighborhoodExplorer<State = M::State, Cost = M::Cost>,
    E::Move: Send,
{
    fn name(&self) -> &str {
        "tabu_search"
    }

    fn initialize_run(
        &mut self,
        _ctx: &mut RunContext<M, E>,
        _rng: &mut dyn RngCore,
    ) -> Result<(), SearchError> {
        if self.config.max_tenure == 0 {
            return Err(SearchError::incorrect_parameter(
                "ts::max_tenure",
                "must be greater than zero",
            ));
        }
        if self.config.min_tenure > self.config.max_tenure {
            return Err(SearchError::incorrect_parameter(
                "ts::min_tenure",
                "must not exceed max_tenure",
            ));
        }
        if self.config.max_idle_iterations == 0 {
            return Err(SearchError::incorrect_parameter(
                "ts::max_idle_iterations",
                "must be greater than zero",
            ));
        }
        self.list.clear();
        self.rejected_as_tabu = 0;
        self.aspiration_overrides = 0;
        Ok(())
    }

    fn select_move(
        &mut self,
        ctx: &mut RunContext<M, E>,
        rng: &mut dyn RngCore,
    ) -> Result<EvaluatedMove<E::Move, M::Cost>, SearchError> {
        self.purge(ctx.iteration);

        let evaluations = Cell::new(0u64);
        let rejected = Cell::new(0u64);
        let aspired = Cell::new(0u64);
        let selected = {
            let list = &self.list;
            let inverse = &self.inverse;
            let sm = ctx.sm;
            let current = &ctx.current_cost;
            let best = &ctx.best_cost;
            ctx.explorer.select_best(
                &ctx.current,
                sm.ordering(),
                rng,
                |mv: &E::Move, delta: &CostStructure<M::Cost>| {
                    evaluations.set(evaluations.get() + 1);
                    let listed = list.iter().any(|(l, _)| inverse(mv, l));
                    if !listed {
                        return true;
                    }
                    // aspiration: the move would improve on the best
                    let candidate = current.clone() + delta;
                    if sm.compare(&candidate, best) == std::cmp::Ordering::Less {
                        aspired.set(aspired.get() + 1);
                        true
                    } else {
                        rejected.set(rejected.get() + 1);
                        false
                    }
                },
            )?
        };
        self.rejected_as_tabu += rejected.get();
        self.aspiration_overrides += aspired.get();

        let result = if selected.valid {
            selected
        } else {
            // every admissible move was prohibited; fall back to the
            // least bad move overall rather than stalling
            let evals = &evaluations;
            ctx.explorer
                .select_best(&ctx.current, ctx.sm.ordering(), rng, |_, _| {
                    evals.set(evals.get() + 1);
                    true
                })?
        };
        ctx.evaluations += evaluations.get();
        Ok(result)
    }

    fn acceptable_move(
        &mut self,
        _ctx: &RunContext<M, E>,
        _mv: &EvaluatedMove<E::Move, M::Cost>,
        _rng: &mut dyn RngCore,
    ) -> bool {
        // the selected move is always applied, worsening or not
        true
    }

    fn complete_iteration(
        &mut self,
        ctx: &mut RunContext<M, E>,
        mv: &EvaluatedMove<E::Move, M::Cost>,
        accepted: bool,
        rng: &mut dyn RngCore,
    ) {
        if !accepted {
            return;
        }
        let mut rng = rng;
        let tenure = rng.random_range(self.config.min_tenure..=self.config.max_tenure);
        self.list.push_front((mv.mv.clone(), ctx.iteration + tenure));
    }

    fn stop_criterion(&self, ctx: &RunContext<M, E>) -> bool {
        ctx.idle_iterations() >= self.config.max_idle_iterations
    }

    fn terminate_run(&mut self, _ctx: &mut RunContext<M, E>) {}

    fn status_string(&self) -> String {
        format!(
            "tabu = {}, tenure = [{}, {}]",
            self.list.len(),
            self.config.min_tenure,
            self.config.max_tenure
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;
    use crate::runners::{MoveRunner, RunnerConfig};
    use crate::test_utils::{queens_explorer, queens_manager};

    /// Swaps are self-inverse: the same unordered pair undoes itself.
    fn swap_inverse(a: &(usize, usize), b: &(usize, usize)) -> bool {
        a == b
    }

    #[test]
    fn test_ten_queens_improves_and_bounds_list() {
        let sm = queens_manager(10);
        let ne = queens_explorer(&sm);
        let runner = TabuSearch::new(
            TabuSearchConfig::default()
                .with_tenure(3, 7)
                .with_max_idle_iterations(1_000),
            swap_inverse,
        );
        let mut mr = MoveRunner::new(&sm, &ne, runner)
            .with_config(RunnerConfig::default().with_max_iterations(200));
        let mut rng = create_rng(42);
        let initial = sm.random_state(&mut rng);
        let initial_cost = sm.cost_function_components(&initial, None);
        let outcome = mr.run(initial, &mut rng).unwrap();

        assert!(outcome.best_cost.total <= initial_cost.total);
        // entries live at most max_tenure iterations
        assert!(mr.runner().tabu_list_len() <= 7);
        assert!(
            mr.runner().rejected_as_tabu() > 0,
            "no move was ever rejected as tabu"
        );
    }

    #[test]
    fn test_aspiration_fires_over_long_run() {
        let sm = queens_manager(10);
        let ne = queens_explorer(&sm);
        let mut overrides = 0;
        for seed in 0..5 {
            let runner = TabuSearch::new(
                // long tenures make prohibition frequent enough that an
                // improving tabu move eventually appears
                TabuSearchConfig::default()
                    .with_tenure(20, 30)
                    .with_max_idle_iterations(2_000),
                swap_inverse,
            );
            let mut mr = MoveRunner::new(&sm, &ne, runner)
                .with_config(RunnerConfig::default().with_max_iterations(2_000));
            let mut rng = create_rng(seed);
            let initial = sm.random_state(&mut rng);
            mr.run(initial, &mut rng).unwrap();
            overrides += mr.runner().aspiration_overrides();
        }
        assert!(overrides > 0, "aspiration never overrode tabu status");
    }

    #[test]
    fn test_escapes_local_optimum() {
        // steepest descent with a tabu list should solve 8-queens from
        // most starts, where strict descent would get stuck
        let sm = queens_manager(8);
        let ne = queens_explorer(&sm);
        let mut solved = 0;
        for seed in 0..5 {
            let runner = TabuSearch::new(
                TabuSearchConfig::default()
                    .with_tenure(3, 7)
                    .with_max_idle_iterations(300),
                swap_inverse,
            );
            let mut mr = MoveRunner::new(&sm, &ne, runner)
                .with_config(RunnerConfig::default().with_max_iterations(1_000));
            let mut rng = create_rng(seed);
            let initial = sm.random_state(&mut rng);
            let outcome = mr.run(initial, &mut rng).unwrap();
            if outcome.best_cost.total == 0 {
                solved += 1;
            }
        }
        assert!(solved >= 1, "no run solved the board");
    }

    #[test]
    fn test_prohibited_moves_only_applied_under_aspiration() {
        use crate::explorer::NeighborhoodExplorer;
        use crate::test_utils::QueensSwap;
        use std::sync::Mutex;

        /// Records every applied move.
        struct Recording<'a> {
            inner: QueensSwap<'a>,
            applied: Mutex<Vec<(usize, usize)>>,
        }

        impl NeighborhoodExplorer for Recording<'_> {
            type State = Vec<usize>;
            type Move = (usize, usize);
            type Cost = i64;

            fn random_move(
                &self,
                state: &Vec<usize>,
                rng: &mut dyn RngCore,
            ) -> Result<(usize, usize), SearchError> {
                self.inner.random_move(state, rng)
            }

            fn first_move(&self, state: &Vec<usize>) -> Result<(usize, usize), SearchError> {
                self.inner.first_move(state)
            }

            fn next_move(&self, state: &Vec<usize>, mv: &mut (usize, usize)) -> bool {
                self.inner.next_move(state, mv)
            }

            fn make_move(&self, state: &mut Vec<usize>, mv: &(usize, usize)) {
                self.applied.lock().unwrap().push(*mv);
                self.inner.make_move(state, mv);
            }

            fn feasible_move(&self, state: &Vec<usize>, mv: &(usize, usize)) -> bool {
                self.inner.feasible_move(state, mv)
            }

            fn delta_cost(
                &self,
                state: &Vec<usize>,
                mv: &(usize, usize),
                weights: Option<&[f64]>,
            ) -> crate::cost::CostStructure<i64> {
                self.inner.delta_cost(state, mv, weights)
            }
        }

        let sm = queens_manager(8);
        let ne = Recording {
            inner: crate::test_utils::queens_explorer(&sm),
            applied: Mutex::new(Vec::new()),
        };
        let tenure = 6;
        let runner = TabuSearch::new(
            TabuSearchConfig::default()
                .with_tenure(tenure, tenure)
                .with_max_idle_iterations(10_000),
            swap_inverse,
        );
        let mut mr = MoveRunner::new(&sm, &ne, runner)
            .with_config(RunnerConfig::default().with_max_iterations(300));
        let mut rng = create_rng(5);
        let initial = sm.random_state(&mut rng);
        mr.run(initial.clone(), &mut rng).unwrap();

        // replay the applied moves: a move repeated within its tenure
        // window must have produced a strict new best (aspiration), or
        // have been the all-prohibited fallback; the fallback never
        // fires here because the neighborhood (28 moves) outnumbers the
        // unexpired list entries (at most 6)
        let applied = ne.applied.lock().unwrap();
        let mut state = initial;
        let mut best = sm.cost_function_components(&state, None).total;
        for (k, mv) in applied.iter().enumerate() {
            let within_tenure = applied[k.saturating_sub(tenure as usize)..k]
                .iter()
                .any(|prev| prev == mv);
            state.swap(mv.0, mv.1);
            let cost = sm.cost_function_components(&state, None).total;
            if within_tenure {
                assert!(
                    cost < best,
                    "tabu move {mv:?} applied at step {k} without improving the best"
                );
            }
            best = best.min(cost);
        }
    }

    #[test]
    fn test_invalid_tenure_rejected() {
        let sm = queens_manager(5);
        let ne = queens_explorer(&sm);
        let runner = TabuSearch::new(
            TabuSearchConfig::default().with_tenure(9, 4),
            swap_inverse,
        );
        let mut mr = MoveRunner::new(&sm, &ne, runner);
        let mut rng = create_rng(0);
        let initial = sm.random_state(&mut rng);
        let err = mr.run(initial, &mut rng).unwrap_err();
        assert!(matches!(err, SearchError::IncorrectParameterValue { .. }));
    }

    #[test]
    fn test_tabu_entries_expire() {
        let sm = queens_manager(6);
        let ne = queens_explorer(&sm);
        let runner = TabuSearch::new(
            TabuSearchConfig::default()
                .with_tenure(1, 1)
                .with_max_idle_iterations(50),
            swap_inverse,
        );
        let mut mr = MoveRunner::new(&sm, &ne, runner)
            .with_config(RunnerConfig::default().with_max_iterations(60));
        let mut rng = create_rng(3);
        let initial = sm.random_state(&mut rng);
        mr.run(initial, &mut rng).unwrap();
        // with tenure 1, at most one entry survives the final purge
        assert!(mr.runner().tabu_list_len() <= 2);
    }
}
