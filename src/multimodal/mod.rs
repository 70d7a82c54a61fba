//! Multimodal neighborhood composition.
//!
//! Several elementary neighborhoods can be treated as one by combining
//! their explorers:
//!
//! - [`SetUnionExplorer`] — one sub-neighborhood contributes per move;
//!   composite moves have exactly one active slot.
//! - [`CartesianProductExplorer`] — every sub-neighborhood contributes;
//!   composite moves are chains applied in slot order, optionally
//!   filtered by relatedness predicates between consecutive moves.
//!
//! Sub-explorers are held as type-erased [`SlotExplorer`] handles and
//! their moves travel as [`BoxedMove`] payloads inside a
//! [`CompositeMove`], so combinators of any modality are ordinary
//! runtime values. The price is one virtual dispatch per primitive
//! call.

mod active;
mod product;
mod slot;
mod union;

pub use active::{ActiveMove, AnyMove, BoxedMove, CompositeMove};
pub use product::CartesianProductExplorer;
pub use slot::{SlotAdapter, SlotExplorer};
pub use union::SetUnionExplorer;
