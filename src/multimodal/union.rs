//! Set-union composition of neighborhoods.

use rand::{Rng, RngCore};

use super::{BoxedMove, CompositeMove, SlotAdapter, SlotExplorer};
use crate::cost::{CostStructure, CostValue};
use crate::error::SearchError;
use crate::explorer::NeighborhoodExplorer;

/// Explorer over the union of several sub-neighborhoods.
///
/// Every composite move has exactly one active slot; the remaining
/// slots are inactive placeholders. Enumeration order is slot 0's full
/// neighborhood, then slot 1's, and so on. Random sampling picks the
/// slot according to a bias vector (uniform by default) and falls
/// through to the remaining slots, round-robin, when the picked one is
/// empty.
pub struct SetUnionExplorer<S, C> {
    slots: Vec<Box<dyn SlotExplorer<S, C>>>,
    bias: Option<Vec<f64>>,
}

impl<S, C: CostValue> SetUnionExplorer<S, C> {
    pub fn new() -> Self {
        SetUnionExplorer {
            slots: Vec::new(),
            bias: None,
        }
    }

    /// Appends a sub-explorer as the next slot.
    pub fn add<E>(mut self, explorer: E) -> Self
    where
        E: NeighborhoodExplorer<State = S, Cost = C> + Send + Sync + 'static,
        E::Move: Send + 'static,
        S: Clone,
    {
        self.slots.push(Box::new(SlotAdapter::new(explorer)));
        self
    }

    /// Overrides the slot-selection bias. Entries need not sum to one;
    /// the length must match the number of slots added so far.
    pub fn with_bias(mut self, bias: Vec<f64>) -> Self {
        assert_eq!(
            bias.len(),
            self.slots.len(),
            "bias length must match modality"
        );
        assert!(bias.iter().all(|&b| b >= 0.0), "bias entries must be non-negative");
        assert!(bias.iter().sum::<f64>() > 0.0, "bias must not sum to zero");
        self.bias = Some(bias);
        self
    }

    /// Number of composed sub-explorers.
    pub fn modality(&self) -> usize {
        self.slots.len()
    }

    fn pick_slot(&self, rng: &mut dyn RngCore) -> usize {
        let mut rng = rng;
        match &self.bias {
            None => rng.random_range(0..self.slots.len()),
            Some(bias) => {
                let total: f64 = bias.iter().sum();
                let mut pick = rng.random_range(0.0..total);
                let mut selected = 0;
                while selected + 1 < bias.len() && pick > bias[selected] {
                    pick -= bias[selected];
                    selected += 1;
                }
                selected
            }
        }
    }

    fn active_payload<'m>(&self, mv: &'m CompositeMove) -> Option<(usize, &'m BoxedMove)> {
        let i = mv.active_index()?;
        Some((i, mv.payload(i)?))
    }
}

impl<S, C: CostValue> Default for SetUnionExplorer<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C> NeighborhoodExplorer for SetUnionExplorer<S, C>
where
    S: Clone,
    C: CostValue,
{
    type State = S;
    type Move = CompositeMove;
    type Cost = C;

    fn random_move(
        &self,
        state: &S,
        rng: &mut dyn RngCore,
    ) -> Result<CompositeMove, SearchError> {
        if self.slots.is_empty() {
            return Err(SearchError::EmptyNeighborhood);
        }
        let picked = self.pick_slot(rng);
        for offset in 0..self.slots.len() {
            let i = (picked + offset) % self.slots.len();
            if let Ok(payload) = self.slots[i].random_move(state, rng) {
                let mut composite = CompositeMove::inactive(self.slots.len());
                composite.set_active(i, payload);
                return Ok(composite);
            }
        }
        Err(SearchError::EmptyNeighborhood)
    }

    fn first_move(&self, state: &S) -> Result<CompositeMove, SearchError> {
        for (i, slot) in self.slots.iter().enumerate() {
            if let Ok(payload) = slot.first_move(state) {
                let mut composite = CompositeMove::inactive(self.slots.len());
                composite.set_active(i, payload);
                return Ok(composite);
            }
        }
        Err(SearchError::EmptyNeighborhood)
    }

    fn next_move(&self, state: &S, mv: &mut CompositeMove) -> bool {
        let Some(active) = mv.active_index() else {
            return false;
        };
        if let Some(payload) = mv.payload(active) {
            let mut payload = payload.clone();
            if self.slots[active].next_move(state, &mut payload) {
                mv.set_active(active, payload);
                return true;
            }
        }
        // active slot exhausted; move on to the first non-empty
        // subsequent slot
        for i in active + 1..self.slots.len() {
            if let Ok(payload) = self.slots[i].first_move(state) {
                mv.deactivate(active);
                mv.set_active(i, payload);
                return true;
            }
        }
        false
    }

    fn make_move(&self, state: &mut S, mv: &CompositeMove) {
        if let Some((i, payload)) = self.active_payload(mv) {
            self.slots[i].make_move(state, payload);
        }
    }

    fn feasible_move(&self, state: &S, mv: &CompositeMove) -> bool {
        match self.active_payload(mv) {
            Some((i, payload)) => self.slots[i].feasible_move(state, payload),
            None => true,
        }
    }

    fn delta_cost(
        &self,
        state: &S,
        mv: &CompositeMove,
        weights: Option<&[f64]>,
    ) -> CostStructure<C> {
        match self.active_payload(mv) {
            Some((i, payload)) => self.slots[i].delta_cost(state, payload, weights),
            None => CostStructure::zero(),
        }
    }
}
