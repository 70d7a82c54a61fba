//! Framework for trajectory-based metaheuristic local search.
//!
//! A problem implementer supplies a solution representation, a cost
//! model and a way to enumerate neighbor solutions; this crate supplies
//! the machinery that turns those into complete solvers:
//!
//! - **Cost layer**: named hard/soft cost components aggregated into
//!   [`CostStructure`](cost::CostStructure)s, comparable under a flat
//!   (weighted total) or hierarchical (lexicographic) policy.
//! - **State layer**: a user [`Model`](state::Model) wrapped by a
//!   [`StateManager`](state::StateManager) handling generation,
//!   evaluation and delta assembly.
//! - **Neighborhood exploration**: the six-primitive
//!   [`NeighborhoodExplorer`](explorer::NeighborhoodExplorer) trait with
//!   selection strategies and iterators layered on top, including
//!   rayon-parallel evaluation.
//! - **Multimodal combinators**: set-union and cartesian-product
//!   composition of heterogeneous neighborhoods over type-erased slots.
//! - **Runners**: hill climbing, simulated annealing (counter- and
//!   time-based cooling) and tabu search over a shared, interruptible
//!   Go loop with lifecycle observers.
//! - **Solver driver**: initialization, timeout interruption via a
//!   cooperative stop flag, wall-clock reporting.
//! - **Parameter registry**: typed named parameters with JSON and
//!   `--prefix::name value` command-line surfaces.
//!
//! # Example
//!
//! ```ignore
//! let mut sm = StateManager::new(MyModel::new(input));
//! sm.add_cost_component(FnCostComponent::hard("overlaps", 1, overlaps));
//! let ne = MyExplorer::new(&sm);
//! let runner = HillClimbing::new(
//!     HillClimbingConfig::default().with_max_idle_iterations(1_000),
//! );
//! let mr = MoveRunner::new(&sm, &ne, runner);
//! let mut solver = LocalSearchSolver::new(&sm, mr)
//!     .with_config(SolverConfig::default().with_timeout(Duration::from_secs(60)));
//! let result = solver.solve(&mut create_rng(42))?;
//! ```

pub mod cost;
pub mod error;
pub mod explorer;
pub mod multimodal;
pub mod params;
pub mod random;
pub mod runners;
pub mod solver;
pub mod state;

#[cfg(test)]
pub(crate) mod test_utils;

pub use cost::{CostComponent, CostOrdering, CostStructure, CostValue, FnCostComponent};
pub use error::SearchError;
pub use explorer::{EvaluatedMove, NeighborhoodExplorer, ParallelSelect};
pub use multimodal::{ActiveMove, CartesianProductExplorer, CompositeMove, SetUnionExplorer};
pub use runners::{
    HillClimbing, HillClimbingConfig, MoveRunner, RunnerConfig, RunnerObserver, SaCooling,
    SimulatedAnnealing, SimulatedAnnealingConfig, TabuSearch, TabuSearchConfig,
};
pub use solver::{LocalSearchSolver, SolveResult, SolverConfig};
pub use state::{Model, StateManager};
