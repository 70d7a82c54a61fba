//! Cartesian-product composition of neighborhoods.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use rand::RngCore;

use super::{BoxedMove, CompositeMove, SlotAdapter, SlotExplorer};
use crate::cost::{CostStructure, CostValue};
use crate::error::SearchError;
use crate::explorer::NeighborhoodExplorer;

type RelatedFn = Box<dyn Fn(&BoxedMove, &BoxedMove) -> bool + Send + Sync>;

/// Explorer over the cartesian product of several sub-neighborhoods.
///
/// A composite move carries one active move per slot and is applied as a
/// chain: slot 0's move on the starting state, slot 1's move on the
/// resulting state, and so on. Enumeration is depth-first with
/// backtracking over the slots, each slot enumerated against the state
/// produced by its predecessors.
///
/// Consecutive moves can be filtered with a relatedness predicate,
/// registered per pair of concrete move types (at most one per unordered
/// pair); unregistered pairs are always related.
pub struct CartesianProductExplorer<S, C> {
    slots: Vec<Box<dyn SlotExplorer<S, C>>>,
    related: HashMap<(TypeId, TypeId), RelatedFn>,
}

impl<S: Clone, C: CostValue> CartesianProductExplorer<S, C> {
    pub fn new() -> Self {
        CartesianProductExplorer {
            slots: Vec::new(),
            related: HashMap::new(),
        }
    }

    /// Appends a sub-explorer as the next slot of the chain.
    pub fn add<E>(mut self, explorer: E) -> Self
    where
        E: NeighborhoodExplorer<State = S, Cost = C> + Send + Sync + 'static,
        E::Move: Send + 'static,
    {
        self.slots.push(Box::new(SlotAdapter::new(explorer)));
        self
    }

    /// Registers the relatedness predicate for the move type pair
    /// `(M1, M2)`. Checks between a slot of type `M2` followed by one of
    /// type `M1` use the same predicate with flipped arguments.
    ///
    /// Panics if a predicate for the unordered pair is already present.
    pub fn with_related<M1, M2>(
        mut self,
        pred: impl Fn(&M1, &M2) -> bool + Send + Sync + 'static,
    ) -> Self
    where
        M1: Any + fmt::Debug + Clone + PartialEq + Send,
        M2: Any + fmt::Debug + Clone + PartialEq + Send,
    {
        let key = (TypeId::of::<M1>(), TypeId::of::<M2>());
        let rev = (key.1, key.0);
        assert!(
            !self.related.contains_key(&key) && !self.related.contains_key(&rev),
            "relatedness already registered for this move type pair"
        );
        self.related.insert(
            key,
            Box::new(move |a: &BoxedMove, b: &BoxedMove| {
                match (a.downcast_ref::<M1>(), b.downcast_ref::<M2>()) {
                    (Some(a), Some(b)) => pred(a, b),
                    _ => panic!(
                        "{}",
                        SearchError::InvalidMoveType {
                            expected: std::any::type_name::<(M1, M2)>(),
                        }
                    ),
                }
            }),
        );
        self
    }

    /// Number of composed sub-explorers.
    pub fn modality(&self) -> usize {
        self.slots.len()
    }

    /// Relatedness of the moves at consecutive slots `i` and `i + 1`.
    fn related(&self, prev_slot: usize, prev: &BoxedMove, next: &BoxedMove) -> bool {
        let a = self.slots[prev_slot].move_type_id();
        let b = self.slots[prev_slot + 1].move_type_id();
        if let Some(f) = self.related.get(&(a, b)) {
            f(prev, next)
        } else if let Some(f) = self.related.get(&(b, a)) {
            f(next, prev)
        } else {
            true
        }
    }

    fn related_to_prev(&self, i: usize, moves: &[Option<BoxedMove>], m: &BoxedMove) -> bool {
        if i == 0 {
            return true;
        }
        let Some(prev) = moves[i - 1].as_ref() else {
            return true;
        };
        self.related(i - 1, prev, m)
    }

    /// First move of slot `i` that is related to its predecessor, in
    /// enumeration order.
    fn first_related(
        &self,
        i: usize,
        moves: &[Option<BoxedMove>],
        states: &[S],
    ) -> Result<BoxedMove, SearchError> {
        let mut m = self.slots[i].first_move(&states[i])?;
        loop {
            if self.related_to_prev(i, moves, &m) {
                return Ok(m);
            }
            if !self.slots[i].next_move(&states[i], &mut m) {
                return Err(SearchError::EmptyNeighborhood);
            }
        }
    }

    /// Advances slot `i`'s current move to the next related one; `false`
    /// when the slot's enumeration is exhausted.
    fn advance_related(&self, i: usize, moves: &mut [Option<BoxedMove>], states: &[S]) -> bool {
        let (head, tail) = moves.split_at_mut(i);
        let Some(m) = tail[0].as_mut() else {
            return false;
        };
        loop {
            if !self.slots[i].next_move(&states[i], m) {
                return false;
            }
            if i == 0 {
                return true;
            }
            let Some(prev) = head[i - 1].as_ref() else {
                return true;
            };
            if self.related(i - 1, prev, m) {
                return true;
            }
        }
    }

    /// Advances slot `i`'s move during random enumeration: wraps around
    /// to `first_move` at the end and gives up upon returning to the
    /// slot's initial random move.
    fn advance_random_related(
        &self,
        i: usize,
        moves: &mut [Option<BoxedMove>],
        states: &[S],
        initial: &[Option<BoxedMove>],
    ) -> bool {
        let (head, tail) = moves.split_at_mut(i);
        let Some(m) = tail[0].as_mut() else {
            return false;
        };
        let Some(init) = initial[i].as_ref() else {
            return false;
        };
        loop {
            if !self.slots[i].next_move(&states[i], m) {
                match self.slots[i].first_move(&states[i]) {
                    Ok(first) => *m = first,
                    Err(_) => return false,
                }
            }
            if m == init {
                return false;
            }
            if i == 0 {
                return true;
            }
            let Some(prev) = head[i - 1].as_ref() else {
                return true;
            };
            if self.related(i - 1, prev, m) {
                return true;
            }
        }
    }

    /// Recomputes the chain state after slot `i`.
    fn push_state(&self, i: usize, moves: &[Option<BoxedMove>], states: &mut [S]) {
        let mut next = states[i].clone();
        if let Some(m) = &moves[i] {
            self.slots[i].make_move(&mut next, m);
        }
        states[i + 1] = next;
    }

    fn composite(&self, moves: Vec<Option<BoxedMove>>) -> CompositeMove {
        let mut composite = CompositeMove::inactive(self.slots.len());
        for (i, m) in moves.into_iter().enumerate() {
            if let Some(m) = m {
                composite.set_active(i, m);
            }
        }
        composite
    }

    fn write_back(&self, mv: &mut CompositeMove, moves: Vec<Option<BoxedMove>>) {
        *mv = self.composite(moves);
    }

    /// Debug-build check of the composite invariant: every slot active,
    /// every consecutive pair related on its chain state.
    fn debug_verify(&self, state: &S, mv: &CompositeMove) {
        if !cfg!(debug_assertions) {
            return;
        }
        let mut scratch = state.clone();
        for i in 0..self.slots.len() {
            assert!(mv.is_active(i), "composite slot {i} is not active");
            let Some(payload) = mv.payload(i) else {
                panic!("composite slot {i} has no payload");
            };
            if i > 0 {
                if let Some(prev) = mv.payload(i - 1) {
                    assert!(
                        self.related(i - 1, prev, payload),
                        "composite slots {} and {i} are unrelated",
                        i - 1
                    );
                }
            }
            if i + 1 < self.slots.len() {
                self.slots[i].make_move(&mut scratch, payload);
            }
        }
    }
}

impl<S: Clone, C: CostValue> Default for CartesianProductExplorer<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C> NeighborhoodExplorer for CartesianProductExplorer<S, C>
where
    S: Clone,
    C: CostValue,
{
    type State = S;
    type Move = CompositeMove;
    type Cost = C;

    fn first_move(&self, state: &S) -> Result<CompositeMove, SearchError> {
        let n = self.slots.len();
        if n == 0 {
            return Err(SearchError::EmptyNeighborhood);
        }
        let mut moves: Vec<Option<BoxedMove>> = vec![None; n];
        let mut states: Vec<S> = vec![state.clone(); n];
        let mut i = 0;
        'forward: loop {
            match self.first_related(i, &moves, &states) {
                Ok(m) => {
                    moves[i] = Some(m);
                    if i + 1 == n {
                        let composite = self.composite(moves);
                        self.debug_verify(state, &composite);
                        return Ok(composite);
                    }
                    self.push_state(i, &moves, &mut states);
                    i += 1;
                }
                Err(_) => loop {
                    if i == 0 {
                        return Err(SearchError::EmptyNeighborhood);
                    }
                    i -= 1;
                    if self.advance_related(i, &mut moves, &states) {
                        self.push_state(i, &moves, &mut states);
                        i += 1;
                        continue 'forward;
                    }
                },
            }
        }
    }

    fn next_move(&self, state: &S, mv: &mut CompositeMove) -> bool {
        let n = self.slots.len();
        if n == 0 {
            return false;
        }
        let mut moves = mv.payloads();
        let mut states: Vec<S> = vec![state.clone(); n];
        for i in 0..n - 1 {
            self.push_state(i, &moves, &mut states);
        }

        let mut i = n - 1;
        if self.advance_related(i, &mut moves, &states) {
            self.write_back(mv, moves);
            self.debug_verify(state, mv);
            return true;
        }

        'outer: loop {
            // backtrack to the closest slot that still has a related
            // next move
            loop {
                if i == 0 {
                    return false;
                }
                i -= 1;
                if self.advance_related(i, &mut moves, &states) {
                    self.push_state(i, &moves, &mut states);
                    i += 1;
                    break;
                }
            }
            // forward again with first moves
            loop {
                match self.first_related(i, &moves, &states) {
                    Ok(m) => {
                        moves[i] = Some(m);
                        if i + 1 == n {
                            self.write_back(mv, moves);
                            self.debug_verify(state, mv);
                            return true;
                        }
                        self.push_state(i, &moves, &mut states);
                        i += 1;
                    }
                    Err(_) => continue 'outer,
                }
            }
        }
    }

    fn random_move(&self, state: &S, rng: &mut dyn RngCore) -> Result<CompositeMove, SearchError> {
        let n = self.slots.len();
        if n == 0 {
            return Err(SearchError::EmptyNeighborhood);
        }
        let mut moves: Vec<Option<BoxedMove>> = vec![None; n];
        let mut initial: Vec<Option<BoxedMove>> = vec![None; n];
        let mut states: Vec<S> = vec![state.clone(); n];
        let mut i = 0;
        'forward: loop {
            // start the slot at a random move, then enumerate (wrapping
            // around) until one is related to the predecessor; give up
            // after a full cycle back to the initial draw
            let found = match self.slots[i].random_move(&states[i], rng) {
                Ok(first) => {
                    initial[i] = Some(first.clone());
                    moves[i] = Some(first);
                    if self.related_to_prev(i, &moves, initial_payload(&moves, i)) {
                        true
                    } else {
                        self.advance_random_related(i, &mut moves, &states, &initial)
                    }
                }
                Err(_) => false,
            };
            if found {
                if i + 1 == n {
                    let composite = self.composite(moves);
                    self.debug_verify(state, &composite);
                    return Ok(composite);
                }
                self.push_state(i, &moves, &mut states);
                i += 1;
            } else {
                loop {
                    if i == 0 {
                        return Err(SearchError::EmptyNeighborhood);
                    }
                    i -= 1;
                    if self.advance_random_related(i, &mut moves, &states, &initial) {
                        self.push_state(i, &moves, &mut states);
                        i += 1;
                        continue 'forward;
                    }
                }
            }
        }
    }

    fn make_move(&self, state: &mut S, mv: &CompositeMove) {
        for i in 0..mv.modality() {
            if !mv.is_active(i) {
                continue;
            }
            if let Some(payload) = mv.payload(i) {
                self.slots[i].make_move(state, payload);
            }
        }
    }

    fn feasible_move(&self, state: &S, mv: &CompositeMove) -> bool {
        let mut scratch = state.clone();
        for i in 0..mv.modality() {
            if !mv.is_active(i) {
                continue;
            }
            let Some(payload) = mv.payload(i) else {
                continue;
            };
            if !self.slots[i].feasible_move(&scratch, payload) {
                return false;
            }
            if i + 1 < mv.modality() {
                self.slots[i].make_move(&mut scratch, payload);
            }
        }
        true
    }

    fn delta_cost(
        &self,
        state: &S,
        mv: &CompositeMove,
        weights: Option<&[f64]>,
    ) -> CostStructure<C> {
        let mut sum = CostStructure::zero();
        let mut scratch = state.clone();
        for i in 0..mv.modality() {
            if !mv.is_active(i) {
                continue;
            }
            let Some(payload) = mv.payload(i) else {
                continue;
            };
            let delta = self.slots[i].delta_cost(&scratch, payload, weights);
            sum += &delta;
            if i + 1 < mv.modality() {
                self.slots[i].make_move(&mut scratch, payload);
            }
        }
        sum
    }
}

/// Payload of slot `i`; only called right after the slot was filled.
fn initial_payload(moves: &[Option<BoxedMove>], i: usize) -> &BoxedMove {
    match moves[i].as_ref() {
        Some(m) => m,
        None => unreachable!("slot {i} was just filled"),
    }
}
