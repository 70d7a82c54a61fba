//! Cost modeling: scalar cost values, aggregate cost structures and
//! named cost components.
//!
//! A cost function is a set of [`CostComponent`]s, each either *hard*
//! (a constraint whose value counts as violations) or *soft* (an
//! objective term). The aggregate of one evaluation is a
//! [`CostStructure`], which carries the weighted total alongside the raw
//! per-component values so that both flat and hierarchical comparison
//! policies can be applied after the fact.

mod component;
mod structure;

pub use component::{CostComponent, FnCostComponent};
pub use structure::{CostOrdering, CostStructure, CostValue, COST_TOLERANCE};
