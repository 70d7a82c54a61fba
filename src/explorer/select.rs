//! Selection strategies over a neighborhood.

use std::cmp::Ordering;

use rand::{Rng, RngCore};
use rayon::prelude::*;

use super::{EvaluatedMove, NeighborhoodExplorer};
use crate::cost::{CostOrdering, CostStructure};
use crate::error::SearchError;

/// Incremental best-so-far tracker with uniform tie breaking: the k-th
/// equally best candidate replaces the incumbent with probability 1/k.
struct Reservoir<Mv, C> {
    best: Option<EvaluatedMove<Mv, C>>,
    ties: u32,
}

impl<Mv, C: crate::cost::CostValue> Reservoir<Mv, C> {
    fn new() -> Self {
        Reservoir {
            best: None,
            ties: 0,
        }
    }

    fn offer(
        &mut self,
        candidate: EvaluatedMove<Mv, C>,
        ordering: CostOrdering,
        rng: &mut dyn RngCore,
    ) {
        let mut rng = rng;
        match &self.best {
            None => {
                self.best = Some(candidate);
                self.ties = 1;
            }
            Some(incumbent) => match ordering.compare(&candidate.cost, &incumbent.cost) {
                Ordering::Less => {
                    self.best = Some(candidate);
                    self.ties = 1;
                }
                Ordering::Equal => {
                    self.ties += 1;
                    if rng.random_range(0..self.ties) == 0 {
                        self.best = Some(candidate);
                    }
                }
                Ordering::Greater => {}
            },
        }
    }

    fn into_best(self) -> Option<EvaluatedMove<Mv, C>> {
        self.best
    }
}

pub(super) fn select_first<E, F>(
    explorer: &E,
    state: &E::State,
    mut accept: F,
) -> Result<EvaluatedMove<E::Move, E::Cost>, SearchError>
where
    E: NeighborhoodExplorer,
    F: FnMut(&E::Move, &CostStructure<E::Cost>) -> bool,
{
    let mut mv = explorer.first_move(state)?;
    let mut fallback = None;
    loop {
        let cost = explorer.delta_cost(state, &mv, None);
        if accept(&mv, &cost) {
            return Ok(EvaluatedMove::new(mv, cost));
        }
        if fallback.is_none() {
            fallback = Some(EvaluatedMove::invalidated(mv.clone(), cost));
        }
        if !explorer.next_move(state, &mut mv) {
            break;
        }
    }
    // enumeration exhausted without an accepted move
    fallback.ok_or(SearchError::EmptyNeighborhood)
}

pub(super) fn select_best<E, F>(
    explorer: &E,
    state: &E::State,
    ordering: CostOrdering,
    rng: &mut dyn RngCore,
    mut accept: F,
) -> Result<EvaluatedMove<E::Move, E::Cost>, SearchError>
where
    E: NeighborhoodExplorer,
    F: FnMut(&E::Move, &CostStructure<E::Cost>) -> bool,
{
    let mut mv = explorer.first_move(state)?;
    let mut reservoir = Reservoir::new();
    let mut fallback = None;
    loop {
        let cost = explorer.delta_cost(state, &mv, None);
        if accept(&mv, &cost) {
            reservoir.offer(EvaluatedMove::new(mv.clone(), cost), ordering, rng);
        } else if fallback.is_none() {
            fallback = Some(EvaluatedMove::invalidated(mv.clone(), cost));
        }
        if !explorer.next_move(state, &mut mv) {
            break;
        }
    }
    match reservoir.into_best() {
        Some(best) => Ok(best),
        None => fallback.ok_or(SearchError::EmptyNeighborhood),
    }
}

pub(super) fn random_first<E, F>(
    explorer: &E,
    state: &E::State,
    samples: usize,
    rng: &mut dyn RngCore,
    mut accept: F,
) -> Result<EvaluatedMove<E::Move, E::Cost>, SearchError>
where
    E: NeighborhoodExplorer,
    F: FnMut(&E::Move, &CostStructure<E::Cost>) -> bool,
{
    let mut fallback = None;
    for _ in 0..samples {
        let mv = explorer.random_move(state, rng)?;
        let cost = explorer.delta_cost(state, &mv, None);
        if accept(&mv, &cost) {
            return Ok(EvaluatedMove::new(mv, cost));
        }
        if fallback.is_none() {
            fallback = Some(EvaluatedMove::invalidated(mv, cost));
        }
    }
    fallback.ok_or(SearchError::EmptyNeighborhood)
}

pub(super) fn random_best<E, F>(
    explorer: &E,
    state: &E::State,
    samples: usize,
    ordering: CostOrdering,
    rng: &mut dyn RngCore,
    mut accept: F,
) -> Result<EvaluatedMove<E::Move, E::Cost>, SearchError>
where
    E: NeighborhoodExplorer,
    F: FnMut(&E::Move, &CostStructure<E::Cost>) -> bool,
{
    let mut reservoir = Reservoir::new();
    let mut fallback = None;
    for _ in 0..samples {
        let mv = explorer.random_move(state, rng)?;
        let cost = explorer.delta_cost(state, &mv, None);
        if accept(&mv, &cost) {
            reservoir.offer(EvaluatedMove::new(mv, cost), ordering, rng);
        } else if fallback.is_none() {
            fallback = Some(EvaluatedMove::invalidated(mv, cost));
        }
    }
    match reservoir.into_best() {
        Some(best) => Ok(best),
        None => fallback.ok_or(SearchError::EmptyNeighborhood),
    }
}

/// Parallel counterparts of the selection strategies.
///
/// Moves are enumerated sequentially (enumeration order is a contract of
/// the explorer), evaluations run on the rayon pool. These are an
/// optional capability; the sequential methods define the semantics.
pub trait ParallelSelect: NeighborhoodExplorer {
    /// Parallel evaluation variant of
    /// [`select_first`](NeighborhoodExplorer::select_first). Commits the
    /// first accepted evaluation in completion order, which need not be
    /// the first in enumeration order.
    fn par_select_first<F>(
        &self,
        state: &Self::State,
        accept: F,
    ) -> Result<EvaluatedMove<Self::Move, Self::Cost>, SearchError>
    where
        Self: Sized + Sync,
        Self::State: Sync,
        Self::Move: Send + Sync,
        F: Fn(&Self::Move, &CostStructure<Self::Cost>) -> bool + Sync,
    {
        let moves = collect_moves(self, state)?;
        let found = moves
            .par_iter()
            .map(|mv| (mv, self.delta_cost(state, mv, None)))
            .find_any(|&(mv, ref cost)| accept(mv, cost));
        match found {
            Some((mv, cost)) => Ok(EvaluatedMove::new(mv.clone(), cost)),
            None => {
                let first = &moves[0];
                let cost = self.delta_cost(state, first, None);
                Ok(EvaluatedMove::invalidated(first.clone(), cost))
            }
        }
    }

    /// Parallel evaluation variant of
    /// [`select_best`](NeighborhoodExplorer::select_best); the reduction
    /// applies the same reservoir tie break as the sequential version.
    fn par_select_best<F>(
        &self,
        state: &Self::State,
        ordering: CostOrdering,
        rng: &mut dyn RngCore,
        accept: F,
    ) -> Result<EvaluatedMove<Self::Move, Self::Cost>, SearchError>
    where
        Self: Sized + Sync,
        Self::State: Sync,
        Self::Move: Send + Sync,
        F: Fn(&Self::Move, &CostStructure<Self::Cost>) -> bool + Sync,
    {
        let moves = collect_moves(self, state)?;
        let evaluated: Vec<(bool, EvaluatedMove<Self::Move, Self::Cost>)> = moves
            .into_par_iter()
            .map(|mv| {
                let cost = self.delta_cost(state, &mv, None);
                let accepted = accept(&mv, &cost);
                (accepted, EvaluatedMove::new(mv, cost))
            })
            .collect();
        let mut reservoir = Reservoir::new();
        let mut fallback = None;
        for (accepted, em) in evaluated {
            if accepted {
                reservoir.offer(em, ordering, rng);
            } else if fallback.is_none() {
                fallback = Some(EvaluatedMove::invalidated(em.mv, em.cost));
            }
        }
        match reservoir.into_best() {
            Some(best) => Ok(best),
            None => fallback.ok_or(SearchError::EmptyNeighborhood),
        }
    }
}

impl<E: NeighborhoodExplorer> ParallelSelect for E {}

fn collect_moves<E: NeighborhoodExplorer>(
    explorer: &E,
    state: &E::State,
) -> Result<Vec<E::Move>, SearchError> {
    let mut moves = Vec::new();
    let mut mv = explorer.first_move(state)?;
    loop {
        moves.push(mv.clone());
        if !explorer.next_move(state, &mut mv) {
            break;
        }
    }
    Ok(moves)
}
