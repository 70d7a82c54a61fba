//! Neighborhood exploration.
//!
//! A [`NeighborhoodExplorer`] enumerates, samples, applies and evaluates
//! the moves available from a state. Implementors provide the six
//! primitives; the framework layers selection strategies (first
//! improving, best with random tie-break, sampled variants) and
//! iterators on top of them.

mod iter;
mod select;

pub use iter::{NeighborhoodIter, SampleIter};
pub use select::ParallelSelect;

use rand::RngCore;

use crate::cost::{CostOrdering, CostStructure, CostValue};
use crate::error::SearchError;

/// A move paired with its evaluated delta cost.
///
/// `valid` is false for the sentinel produced when an enumeration ran to
/// completion without any move passing the acceptance test.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedMove<Mv, C> {
    pub mv: Mv,
    pub cost: CostStructure<C>,
    pub valid: bool,
}

impl<Mv, C: CostValue> EvaluatedMove<Mv, C> {
    /// A move together with its evaluation.
    pub fn new(mv: Mv, cost: CostStructure<C>) -> Self {
        EvaluatedMove {
            mv,
            cost,
            valid: true,
        }
    }

    /// Marks an evaluation as the not-accepted sentinel.
    pub fn invalidated(mv: Mv, cost: CostStructure<C>) -> Self {
        EvaluatedMove {
            mv,
            cost,
            valid: false,
        }
    }
}

impl<Mv: Default, C: CostValue> EvaluatedMove<Mv, C> {
    /// The empty sentinel.
    pub fn empty() -> Self {
        EvaluatedMove {
            mv: Mv::default(),
            cost: CostStructure::zero(),
            valid: false,
        }
    }
}

/// Enumerates and evaluates the neighborhood of a state.
///
/// The implementor defines the move type and the six primitives; the
/// provided methods build selection strategies from them. The delta-cost
/// contract is `cost(apply(s, m)) == cost(s) + delta_cost(s, m)`
/// componentwise, up to the approximate-equality tolerance.
pub trait NeighborhoodExplorer {
    /// The solution representation the moves act on.
    type State: Clone;

    /// The move representation. The framework never inspects it.
    type Move: Clone + PartialEq + std::fmt::Debug;

    /// The scalar cost type.
    type Cost: CostValue;

    /// Samples a move from the neighborhood of `state`.
    fn random_move(
        &self,
        state: &Self::State,
        rng: &mut dyn RngCore,
    ) -> Result<Self::Move, SearchError>;

    /// The canonical first move in enumeration order.
    fn first_move(&self, state: &Self::State) -> Result<Self::Move, SearchError>;

    /// Advances `mv` to the next move in enumeration order; `false`
    /// signals the end of the enumeration.
    fn next_move(&self, state: &Self::State, mv: &mut Self::Move) -> bool;

    /// Applies `mv` to `state` in place. `mv` must have been obtained
    /// from this very state (or one equivalent up to move semantics).
    fn make_move(&self, state: &mut Self::State, mv: &Self::Move);

    /// Whether applying `mv` leaves a feasible state.
    fn feasible_move(&self, state: &Self::State, mv: &Self::Move) -> bool {
        let _ = (state, mv);
        true
    }

    /// Componentwise change of the cost function if `mv` were applied.
    fn delta_cost(
        &self,
        state: &Self::State,
        mv: &Self::Move,
        weights: Option<&[f64]>,
    ) -> CostStructure<Self::Cost>;

    /// Enumerates the neighborhood and returns the first move whose
    /// evaluation satisfies `accept`. Fails with `EmptyNeighborhood`
    /// when there is no move at all; returns an invalid sentinel when
    /// moves exist but none is accepted.
    fn select_first<F>(
        &self,
        state: &Self::State,
        accept: F,
    ) -> Result<EvaluatedMove<Self::Move, Self::Cost>, SearchError>
    where
        F: FnMut(&Self::Move, &CostStructure<Self::Cost>) -> bool,
        Self: Sized,
    {
        select::select_first(self, state, accept)
    }

    /// Enumerates the neighborhood and returns the best-cost accepted
    /// move under `ordering`, breaking ties uniformly at random among
    /// the equally best via reservoir sampling.
    fn select_best<F>(
        &self,
        state: &Self::State,
        ordering: CostOrdering,
        rng: &mut dyn RngCore,
        accept: F,
    ) -> Result<EvaluatedMove<Self::Move, Self::Cost>, SearchError>
    where
        F: FnMut(&Self::Move, &CostStructure<Self::Cost>) -> bool,
        Self: Sized,
    {
        select::select_best(self, state, ordering, rng, accept)
    }

    /// Like [`select_first`](Self::select_first), over at most `samples`
    /// random draws.
    fn random_first<F>(
        &self,
        state: &Self::State,
        samples: usize,
        rng: &mut dyn RngCore,
        accept: F,
    ) -> Result<EvaluatedMove<Self::Move, Self::Cost>, SearchError>
    where
        F: FnMut(&Self::Move, &CostStructure<Self::Cost>) -> bool,
        Self: Sized,
    {
        select::random_first(self, state, samples, rng, accept)
    }

    /// Like [`select_best`](Self::select_best), over at most `samples`
    /// random draws.
    fn random_best<F>(
        &self,
        state: &Self::State,
        samples: usize,
        ordering: CostOrdering,
        rng: &mut dyn RngCore,
        accept: F,
    ) -> Result<EvaluatedMove<Self::Move, Self::Cost>, SearchError>
    where
        F: FnMut(&Self::Move, &CostStructure<Self::Cost>) -> bool,
        Self: Sized,
    {
        select::random_best(self, state, samples, ordering, rng, accept)
    }

    /// Input iterator over the full neighborhood, yielding evaluated
    /// moves from `first_move` onward.
    fn neighborhood_iter<'a>(&'a self, state: &'a Self::State) -> NeighborhoodIter<'a, Self>
    where
        Self: Sized,
    {
        NeighborhoodIter::new(self, state)
    }

    /// Iterator over up to `samples` random evaluated moves.
    fn sample_iter<'a>(
        &'a self,
        state: &'a Self::State,
        samples: usize,
        rng: &'a mut dyn RngCore,
    ) -> SampleIter<'a, Self>
    where
        Self: Sized,
    {
        SampleIter::new(self, state, samples, rng)
    }
}
