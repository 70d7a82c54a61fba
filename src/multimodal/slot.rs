//! Type-erased sub-explorer handles.

use std::any::TypeId;

use rand::RngCore;

use super::BoxedMove;
use crate::cost::CostStructure;
use crate::error::SearchError;
use crate::explorer::NeighborhoodExplorer;

/// Object-safe mirror of the six explorer primitives, with moves passed
/// as erased payloads. One slot of a multimodal combinator.
pub trait SlotExplorer<S, C>: Send + Sync {
    fn random_move(&self, state: &S, rng: &mut dyn RngCore) -> Result<BoxedMove, SearchError>;

    fn first_move(&self, state: &S) -> Result<BoxedMove, SearchError>;

    fn next_move(&self, state: &S, mv: &mut BoxedMove) -> bool;

    fn make_move(&self, state: &mut S, mv: &BoxedMove);

    fn feasible_move(&self, state: &S, mv: &BoxedMove) -> bool;

    fn delta_cost(&self, state: &S, mv: &BoxedMove, weights: Option<&[f64]>) -> CostStructure<C>;

    /// Type id of the concrete move this slot produces, used to look up
    /// relatedness predicates.
    fn move_type_id(&self) -> TypeId;

    /// Name of the concrete move type, for diagnostics.
    fn move_type_name(&self) -> &'static str;
}

/// Adapts a concrete [`NeighborhoodExplorer`] into a [`SlotExplorer`].
///
/// A payload whose concrete type is not the adapted explorer's move type
/// is a programmer error (a composite built by one combinator was handed
/// to another) and panics with the rendered `InvalidMoveType` error.
pub struct SlotAdapter<E> {
    explorer: E,
}

impl<E> SlotAdapter<E> {
    pub fn new(explorer: E) -> Self {
        SlotAdapter { explorer }
    }
}

impl<E> SlotAdapter<E>
where
    E: NeighborhoodExplorer,
    E::Move: Send + 'static,
{
    fn expect<'m>(&self, mv: &'m BoxedMove) -> &'m E::Move {
        match mv.downcast_ref::<E::Move>() {
            Some(mv) => mv,
            None => panic!(
                "{}",
                SearchError::InvalidMoveType {
                    expected: std::any::type_name::<E::Move>(),
                }
            ),
        }
    }
}

impl<E> SlotExplorer<E::State, E::Cost> for SlotAdapter<E>
where
    E: NeighborhoodExplorer + Send + Sync,
    E::Move: Send + 'static,
{
    fn random_move(
        &self,
        state: &E::State,
        rng: &mut dyn RngCore,
    ) -> Result<BoxedMove, SearchError> {
        Ok(BoxedMove::new(self.explorer.random_move(state, rng)?))
    }

    fn first_move(&self, state: &E::State) -> Result<BoxedMove, SearchError> {
        Ok(BoxedMove::new(self.explorer.first_move(state)?))
    }

    fn next_move(&self, state: &E::State, mv: &mut BoxedMove) -> bool {
        match mv.downcast_mut::<E::Move>() {
            Some(mv) => self.explorer.next_move(state, mv),
            None => panic!(
                "{}",
                SearchError::InvalidMoveType {
                    expected: std::any::type_name::<E::Move>(),
                }
            ),
        }
    }

    fn make_move(&self, state: &mut E::State, mv: &BoxedMove) {
        let mv = self.expect(mv);
        self.explorer.make_move(state, mv);
    }

    fn feasible_move(&self, state: &E::State, mv: &BoxedMove) -> bool {
        self.explorer.feasible_move(state, self.expect(mv))
    }

    fn delta_cost(
        &self,
        state: &E::State,
        mv: &BoxedMove,
        weights: Option<&[f64]>,
    ) -> CostStructure<E::Cost> {
        self.explorer.delta_cost(state, self.expect(mv), weights)
    }

    fn move_type_id(&self) -> TypeId {
        TypeId::of::<E::Move>()
    }

    fn move_type_name(&self) -> &'static str {
        std::any::type_name::<E::Move>()
    }
}
