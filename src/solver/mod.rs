//! Solver driver: initialization, the Go call, and timeout handling.
//!
//! A [`LocalSearchSolver`] builds the initial state (best-of-`n` random
//! sampling or greedy construction), hands it to its
//! [`MoveRunner`](crate::runners::MoveRunner), and optionally arms a
//! one-shot wall-clock timeout. The timeout path spawns a scoped helper
//! thread owning the Go call and waits on a completion channel; when
//! the deadline fires first, the shared stop flag is raised and the
//! runner exits within one iteration with its best-so-far intact.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cost::CostStructure;
use crate::error::SearchError;
use crate::explorer::NeighborhoodExplorer;
use crate::runners::{MoveRunner, RunOutcome, Runner};
use crate::state::{Model, StateManager};

/// Driver parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Random states sampled for the initial state (best one kept).
    pub init_trials: u32,
    /// Sampled-random initialization when true, greedy otherwise.
    pub random_initial_state: bool,
    /// Wall-clock budget; `None` runs to the natural stop.
    pub timeout: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            init_trials: 1,
            random_initial_state: true,
            timeout: None,
        }
    }
}

impl SolverConfig {
    pub fn with_init_trials(mut self, n: u32) -> Self {
        self.init_trials = n;
        self
    }

    pub fn with_random_initial_state(mut self, random: bool) -> Self {
        self.random_initial_state = random;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// What a solve call returns: the best state, its re-derived cost, and
/// the wall clock spent.
#[derive(Debug, Clone)]
pub struct SolveResult<S, C> {
    pub state: S,
    pub cost: CostStructure<C>,
    pub wall_clock: Duration,
    pub outcome: RunOutcome<S, C>,
}

/// Orchestrates one runner over one problem instance.
pub struct LocalSearchSolver<'a, M, E, R>
where
    M: Model,
    E: NeighborhoodExplorer<State = M::State, Cost = M::Cost>,
    R: Runner<M, E>,
{
    sm: &'a StateManager<M>,
    runner: MoveRunner<'a, M, E, R>,
    config: SolverConfig,
    stop: Arc<AtomicBool>,
}

impl<'a, M, E, R> LocalSearchSolver<'a, M, E, R>
where
    M: Model,
    E: NeighborhoodExplorer<State = M::State, Cost = M::Cost>,
    R: Runner<M, E>,
{
    pub fn new(sm: &'a StateManager<M>, runner: MoveRunner<'a, M, E, R>) -> Self {
        LocalSearchSolver {
            sm,
            runner,
            config: SolverConfig::default(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn runner(&self) -> &MoveRunner<'a, M, E, R> {
        &self.runner
    }

    /// Requests early termination of the run in progress; the runner
    /// stops within one iteration.
    pub fn raise_timeout(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Handle on the stop flag, for termination from another thread.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Builds the initial state, runs the search (under the timeout if
    /// one is set), and returns the best state found.
    pub fn solve<G>(&mut self, rng: &mut G) -> Result<SolveResult<M::State, M::Cost>, SearchError>
    where
        G: RngCore + Send,
        M::State: Send,
        E: Sync,
        R: Send,
        M: Sync,
    {
        let started = Instant::now();
        let initial = self.find_initial_state(rng)?;
        self.run_go(initial, rng, started)
    }

    /// Like [`solve`](Self::solve), starting from a caller-supplied
    /// state instead of a generated one.
    pub fn resolve<G>(
        &mut self,
        initial: M::State,
        rng: &mut G,
    ) -> Result<SolveResult<M::State, M::Cost>, SearchError>
    where
        G: RngCore + Send,
        M::State: Send,
        E: Sync,
        R: Send,
        M: Sync,
    {
        let started = Instant::now();
        self.run_go(initial, rng, started)
    }

    /// Like [`resolve`](Self::resolve), decoding the initial solution
    /// through the model's JSON hook.
    pub fn resolve_json<G>(
        &mut self,
        initial: &Value,
        rng: &mut G,
    ) -> Result<SolveResult<M::State, M::Cost>, SearchError>
    where
        G: RngCore + Send,
        M::State: Send,
        E: Sync,
        R: Send,
        M: Sync,
    {
        let state = self.sm.state_from_json(initial)?;
        self.resolve(state, rng)
    }

    fn find_initial_state(&self, rng: &mut dyn RngCore) -> Result<M::State, SearchError> {
        if self.config.random_initial_state {
            let trials = self.config.init_trials.max(1);
            let (state, _) = self.sm.sample_state(trials, rng);
            Ok(state)
        } else {
            self.sm.greedy_state(0.0, 0)
        }
    }

    fn run_go<G>(
        &mut self,
        initial: M::State,
        rng: &mut G,
        started: Instant,
    ) -> Result<SolveResult<M::State, M::Cost>, SearchError>
    where
        G: RngCore + Send,
        M::State: Send,
        E: Sync,
        R: Send,
        M: Sync,
    {
        // a fresh solve forgets any previous interruption
        self.stop.store(false, Ordering::Relaxed);

        let outcome = match self.config.timeout {
            None => {
                let stop = Arc::clone(&self.stop);
                self.runner.run_with_stop(initial, rng, Some(stop.as_ref()))?
            }
            Some(timeout) => {
                let stop = Arc::clone(&self.stop);
                let (done_tx, done_rx) = mpsc::channel::<()>();
                let runner = &mut self.runner;
                thread::scope(|scope| {
                    let handle = {
                        let stop = Arc::clone(&stop);
                        scope.spawn(move || {
                            let result = runner.run_with_stop(initial, rng, Some(stop.as_ref()));
                            let _ = done_tx.send(());
                            result
                        })
                    };
                    if done_rx.recv_timeout(timeout).is_err() {
                        stop.store(true, Ordering::Relaxed);
                    }
                    match handle.join() {
                        Ok(result) => result,
                        Err(panic) => std::panic::resume_unwind(panic),
                    }
                })?
            }
        };

        let cost = self.sm.cost_function_components(&outcome.best, None);
        Ok(SolveResult {
            state: outcome.best.clone(),
            cost,
            wall_clock: started.elapsed(),
            outcome,
        })
    }
}
