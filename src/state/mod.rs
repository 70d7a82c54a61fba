//! State management: user models and the cost-aggregating state manager.
//!
//! A [`Model`] supplies everything the framework cannot know about a
//! problem's solutions: how to build them, whether they are internally
//! consistent, and (optionally) greedy construction, distances and JSON
//! codecs. The [`StateManager`] wraps a model together with the
//! registered cost components and turns per-component values into
//! [`CostStructure`](crate::cost::CostStructure)s.

mod manager;
mod types;

pub use manager::{StateManager, DEFAULT_HARD_WEIGHT};
pub use types::Model;
