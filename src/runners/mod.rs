//! Single-trajectory metaheuristic runners.
//!
//! A runner is a policy over the shared Go loop: it selects a candidate
//! move, decides acceptance, and decides when to stop. The loop itself
//! ([`MoveRunner`]) owns the current and best states, applies accepted
//! moves, enforces iteration/evaluation budgets, polls the cooperative
//! stop flag, and notifies observers.
//!
//! Concrete policies: [`HillClimbing`], [`SimulatedAnnealing`],
//! [`TabuSearch`].

mod hill_climbing;
mod simulated_annealing;
mod tabu_search;

pub use hill_climbing::{HillClimbing, HillClimbingConfig};
pub use simulated_annealing::{SaCooling, SimulatedAnnealing, SimulatedAnnealingConfig};
pub use tabu_search::{TabuSearch, TabuSearchConfig};

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cost::{CostStructure, CostValue};
use crate::error::SearchError;
use crate::explorer::{EvaluatedMove, NeighborhoodExplorer};
use crate::state::{Model, StateManager};

/// Budgets shared by every runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Hard cap on loop iterations; `None` means unbounded.
    pub max_iterations: Option<u64>,
    /// Hard cap on `delta_cost` evaluations; `None` means unbounded.
    pub max_evaluations: Option<u64>,
}

impl RunnerConfig {
    pub fn with_max_iterations(mut self, n: u64) -> Self {
        self.max_iterations = Some(n);
        self
    }

    pub fn with_max_evaluations(mut self, n: u64) -> Self {
        self.max_evaluations = Some(n);
        self
    }
}

/// Mutable search state shared between the Go loop and the runner
/// hooks.
pub struct RunContext<'a, M, E>
where
    M: Model,
    E: NeighborhoodExplorer<State = M::State, Cost = M::Cost>,
{
    pub sm: &'a StateManager<M>,
    pub explorer: &'a E,
    pub config: RunnerConfig,
    pub current: M::State,
    pub current_cost: CostStructure<M::Cost>,
    pub best: M::State,
    pub best_cost: CostStructure<M::Cost>,
    /// Completed loop iterations.
    pub iteration: u64,
    /// Iteration at which the best state was last improved.
    pub iteration_of_best: u64,
    /// `delta_cost` evaluations performed so far.
    pub evaluations: u64,
    started: Instant,
}

impl<'a, M, E> RunContext<'a, M, E>
where
    M: Model,
    E: NeighborhoodExplorer<State = M::State, Cost = M::Cost>,
{
    pub fn new(sm: &'a StateManager<M>, explorer: &'a E, initial: M::State) -> Self {
        let current_cost = sm.cost_function_components(&initial, None);
        RunContext {
            sm,
            explorer,
            config: RunnerConfig::default(),
            best: initial.clone(),
            best_cost: current_cost.clone(),
            current: initial,
            current_cost,
            iteration: 0,
            iteration_of_best: 0,
            evaluations: 0,
            started: Instant::now(),
        }
    }

    /// Iterations elapsed since the best state last improved.
    pub fn idle_iterations(&self) -> u64 {
        self.iteration - self.iteration_of_best
    }

    /// Wall-clock time since the run started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Compares two costs under the state manager's ordering.
    pub fn compare(
        &self,
        a: &CostStructure<M::Cost>,
        b: &CostStructure<M::Cost>,
    ) -> Ordering {
        self.sm.compare(a, b)
    }

    /// Whether a delta is non-worsening under the configured ordering.
    pub fn non_worsening(&self, delta: &CostStructure<M::Cost>) -> bool {
        self.sm.compare(delta, &CostStructure::zero()) != Ordering::Greater
    }
}

/// Policy hooks plugged into the Go loop.
pub trait Runner<M, E>
where
    M: Model,
    E: NeighborhoodExplorer<State = M::State, Cost = M::Cost>,
{
    /// Short name used in reports and logs.
    fn name(&self) -> &str;

    /// Validates parameters and resets per-run state. A
    /// `IncorrectParameterValue` here is fatal for the run.
    fn initialize_run(
        &mut self,
        ctx: &mut RunContext<M, E>,
        rng: &mut dyn RngCore,
    ) -> Result<(), SearchError>;

    /// Picks the candidate move for this iteration. `EmptyNeighborhood`
    /// ends the search. Implementations account their `delta_cost`
    /// calls in `ctx.evaluations`.
    fn select_move(
        &mut self,
        ctx: &mut RunContext<M, E>,
        rng: &mut dyn RngCore,
    ) -> Result<EvaluatedMove<E::Move, M::Cost>, SearchError>;

    /// Whether the selected move is applied to the current state.
    fn acceptable_move(
        &mut self,
        ctx: &RunContext<M, E>,
        mv: &EvaluatedMove<E::Move, M::Cost>,
        rng: &mut dyn RngCore,
    ) -> bool;

    /// Book-keeping at the end of each iteration, applied or not.
    fn complete_iteration(
        &mut self,
        ctx: &mut RunContext<M, E>,
        mv: &EvaluatedMove<E::Move, M::Cost>,
        accepted: bool,
        rng: &mut dyn RngCore,
    );

    /// Runner-specific stop condition, polled at the top of each
    /// iteration.
    fn stop_criterion(&self, ctx: &RunContext<M, E>) -> bool;

    /// Final adjustments when the loop ends.
    fn terminate_run(&mut self, ctx: &mut RunContext<M, E>);

    /// Whether the evaluation budget is exhausted. Runners that manage
    /// their own evaluation schedule may override this to disable the
    /// shared cap.
    fn max_evaluations_expired(&self, ctx: &RunContext<M, E>) -> bool {
        ctx.config
            .max_evaluations
            .is_some_and(|max| ctx.evaluations >= max)
    }

    /// One-line runner status for observers (`T = …`, tabu sizes, …).
    fn status_string(&self) -> String {
        String::new()
    }
}

/// Snapshot handed to observers at lifecycle events.
pub struct RunReport<'a, C: CostValue> {
    pub runner: &'a str,
    pub iteration: u64,
    pub idle_iterations: u64,
    pub current_cost: &'a CostStructure<C>,
    pub best_cost: &'a CostStructure<C>,
    pub elapsed: Duration,
    pub status: String,
}

/// Lifecycle notifications, invoked synchronously from the runner's
/// thread in event order: start, then per-iteration made-move (with a
/// new-best notification first when the move improved the best), then
/// end.
#[allow(unused_variables)]
pub trait RunnerObserver<C: CostValue>: Send {
    fn on_start(&mut self, report: &RunReport<C>) {}
    fn on_made_move(&mut self, report: &RunReport<C>) {}
    fn on_new_best(&mut self, report: &RunReport<C>) {}
    fn on_end(&mut self, report: &RunReport<C>) {}
}

/// Observer that forwards lifecycle events to `tracing`.
#[derive(Debug, Default)]
pub struct TraceObserver;

impl<C: CostValue> RunnerObserver<C> for TraceObserver {
    fn on_start(&mut self, report: &RunReport<C>) {
        info!(runner = report.runner, cost = %report.current_cost, "run started");
    }

    fn on_made_move(&mut self, report: &RunReport<C>) {
        debug!(
            runner = report.runner,
            iteration = report.iteration,
            idle = report.idle_iterations,
            current = %report.current_cost,
            best = %report.best_cost,
            status = %report.status,
            "made move"
        );
    }

    fn on_new_best(&mut self, report: &RunReport<C>) {
        info!(
            runner = report.runner,
            iteration = report.iteration,
            best = %report.best_cost,
            status = %report.status,
            "new best"
        );
    }

    fn on_end(&mut self, report: &RunReport<C>) {
        info!(
            runner = report.runner,
            iterations = report.iteration,
            best = %report.best_cost,
            elapsed_s = report.elapsed.as_secs_f64(),
            "run finished"
        );
    }
}

/// Result of one Go loop.
#[derive(Debug, Clone)]
pub struct RunOutcome<S, C> {
    pub best: S,
    pub best_cost: CostStructure<C>,
    pub iterations: u64,
    pub iteration_of_best: u64,
    pub evaluations: u64,
    /// True when the run ended because the stop flag was raised.
    pub interrupted: bool,
}

/// Drives a [`Runner`] policy over a neighborhood until a stop
/// condition, budget, or interruption ends the search.
pub struct MoveRunner<'a, M, E, R>
where
    M: Model,
    E: NeighborhoodExplorer<State = M::State, Cost = M::Cost>,
    R: Runner<M, E>,
{
    sm: &'a StateManager<M>,
    explorer: &'a E,
    runner: R,
    config: RunnerConfig,
    observers: Vec<Box<dyn RunnerObserver<M::Cost>>>,
}

enum Event {
    Start,
    MadeMove,
    NewBest,
    End,
}

impl<'a, M, E, R> MoveRunner<'a, M, E, R>
where
    M: Model,
    E: NeighborhoodExplorer<State = M::State, Cost = M::Cost>,
    R: Runner<M, E>,
{
    pub fn new(sm: &'a StateManager<M>, explorer: &'a E, runner: R) -> Self {
        MoveRunner {
            sm,
            explorer,
            runner,
            config: RunnerConfig::default(),
            observers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn RunnerObserver<M::Cost>>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs to a natural stop.
    pub fn run(
        &mut self,
        initial: M::State,
        rng: &mut dyn RngCore,
    ) -> Result<RunOutcome<M::State, M::Cost>, SearchError> {
        self.run_with_stop(initial, rng, None)
    }

    /// Runs until a natural stop or until `stop` is raised. The flag is
    /// polled once per iteration; the loop exits within one iteration
    /// of it being set and the best-so-far is returned.
    pub fn run_with_stop(
        &mut self,
        initial: M::State,
        rng: &mut dyn RngCore,
        stop: Option<&AtomicBool>,
    ) -> Result<RunOutcome<M::State, M::Cost>, SearchError> {
        let mut ctx = RunContext::new(self.sm, self.explorer, initial);
        ctx.config = self.config.clone();
        self.runner.initialize_run(&mut ctx, rng)?;
        self.notify(Event::Start, &ctx);

        let mut interrupted = false;
        loop {
            if let Some(flag) = stop {
                if flag.load(AtomicOrdering::Relaxed) {
                    interrupted = true;
                    break;
                }
            }
            if self.runner.stop_criterion(&ctx) {
                break;
            }
            if ctx
                .config
                .max_iterations
                .is_some_and(|max| ctx.iteration >= max)
            {
                break;
            }
            if self.runner.max_evaluations_expired(&ctx) {
                break;
            }

            let selected = match self.runner.select_move(&mut ctx, rng) {
                Ok(selected) => selected,
                Err(SearchError::EmptyNeighborhood) => break,
                Err(err) => {
                    debug!(runner = self.runner.name(), error = %err, "selection failed");
                    break;
                }
            };

            let accepted =
                selected.valid && self.runner.acceptable_move(&ctx, &selected, rng);
            if accepted {
                self.explorer.make_move(&mut ctx.current, &selected.mv);
                ctx.current_cost += &selected.cost;
                debug_assert!(
                    self.sm.check_consistency(&ctx.current),
                    "inconsistent state after applying {:?}",
                    selected.mv
                );
            }
            ctx.iteration += 1;
            self.runner
                .complete_iteration(&mut ctx, &selected, accepted, rng);
            if accepted && ctx.compare(&ctx.current_cost, &ctx.best_cost) == Ordering::Less {
                ctx.best = ctx.current.clone();
                ctx.best_cost = ctx.current_cost.clone();
                ctx.iteration_of_best = ctx.iteration;
                self.notify(Event::NewBest, &ctx);
            }
            self.notify(Event::MadeMove, &ctx);
        }

        self.runner.terminate_run(&mut ctx);
        self.notify(Event::End, &ctx);

        Ok(RunOutcome {
            best: ctx.best,
            best_cost: ctx.best_cost,
            iterations: ctx.iteration,
            iteration_of_best: ctx.iteration_of_best,
            evaluations: ctx.evaluations,
            interrupted,
        })
    }

    fn notify(&mut self, event: Event, ctx: &RunContext<M, E>) {
        if self.observers.is_empty() {
            return;
        }
        let report = RunReport {
            runner: self.runner.name(),
            iteration: ctx.iteration,
            idle_iterations: ctx.idle_iterations(),
            current_cost: &ctx.current_cost,
            best_cost: &ctx.best_cost,
            elapsed: ctx.elapsed(),
            status: self.runner.status_string(),
        };
        for observer in &mut self.observers {
            match event {
                Event::Start => observer.on_start(&report),
                Event::MadeMove => observer.on_made_move(&report),
                Event::NewBest => observer.on_new_best(&report),
                Event::End => observer.on_end(&report),
            }
        }
    }
}
