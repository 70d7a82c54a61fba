//! Cost aggregation and state generation.

use std::cmp::Ordering;

use num_traits::{FromPrimitive, Zero};
use rand::RngCore;
use serde_json::{json, Value};

use super::Model;
use crate::cost::{CostComponent, CostOrdering, CostStructure, CostValue};
use crate::error::SearchError;

/// Multiplier applied to hard-component values inside `total`, unless
/// overridden with [`StateManager::with_hard_weight`]. Changing it
/// rescales `total` but never affects the ordering of two states.
pub const DEFAULT_HARD_WEIGHT: i64 = 1000;

/// Couples a [`Model`] with the registered cost components.
///
/// All operations independent of any neighborhood definition live here:
/// random and greedy state generation, cost evaluation, consistency
/// checks and distances.
pub struct StateManager<M: Model> {
    model: M,
    components: Vec<Box<dyn CostComponent<M::State, M::Cost>>>,
    hard_weight: M::Cost,
    ordering: CostOrdering,
}

impl<M: Model> StateManager<M> {
    /// Wraps a model with an empty component registry, the default hard
    /// weight and flat cost ordering.
    pub fn new(model: M) -> Self {
        let hard_weight = M::Cost::from_i64(DEFAULT_HARD_WEIGHT)
            .expect("default hard weight must be representable in the cost type");
        StateManager {
            model,
            components: Vec::new(),
            hard_weight,
            ordering: CostOrdering::Flat,
        }
    }

    /// Overrides the hard-constraint multiplier.
    pub fn with_hard_weight(mut self, hard_weight: M::Cost) -> Self {
        self.hard_weight = hard_weight;
        self
    }

    /// Selects the comparison policy used by `compare` and
    /// `sample_state` (and, through them, by runners).
    pub fn with_ordering(mut self, ordering: CostOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn hard_weight(&self) -> M::Cost {
        self.hard_weight
    }

    pub fn ordering(&self) -> CostOrdering {
        self.ordering
    }

    /// Registers a component and returns its index.
    pub fn add_cost_component(
        &mut self,
        component: impl CostComponent<M::State, M::Cost> + 'static,
    ) -> usize {
        self.components.push(Box::new(component));
        self.components.len() - 1
    }

    /// Drops every registered component.
    pub fn clear_components(&mut self) {
        self.components.clear();
    }

    pub fn components(&self) -> &[Box<dyn CostComponent<M::State, M::Cost>>] {
        &self.components
    }

    pub fn component(&self, i: usize) -> &dyn CostComponent<M::State, M::Cost> {
        self.components[i].as_ref()
    }

    /// Index of the component with the given name.
    pub fn component_index(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c.name() == name)
    }

    /// Compares two costs under the configured ordering.
    pub fn compare(&self, a: &CostStructure<M::Cost>, b: &CostStructure<M::Cost>) -> Ordering {
        self.ordering.compare(a, b)
    }

    /// Builds a random state through the model.
    pub fn random_state(&self, rng: &mut dyn RngCore) -> M::State {
        self.model.random_state(rng)
    }

    /// Builds a greedy state through the model.
    pub fn greedy_state(&self, alpha: f64, k: u32) -> Result<M::State, SearchError> {
        self.model.greedy_state(alpha, k)
    }

    /// Generates `trials` random states and keeps the best under the
    /// configured ordering, returning it with its cost.
    pub fn sample_state(
        &self,
        trials: u32,
        rng: &mut dyn RngCore,
    ) -> (M::State, CostStructure<M::Cost>) {
        let mut best = self.model.random_state(rng);
        let mut best_cost = self.cost_function_components(&best, None);
        for _ in 1..trials {
            let candidate = self.model.random_state(rng);
            let cost = self.cost_function_components(&candidate, None);
            if self.compare(&cost, &best_cost) == Ordering::Less {
                best = candidate;
                best_cost = cost;
            }
        }
        (best, best_cost)
    }

    /// Evaluates every registered component on a state.
    ///
    /// Hard components contribute `hard_weight * value` to `total` and
    /// their raw value to `violations`; soft components contribute their
    /// raw value to `total` and `objective`. `components[i]` always holds
    /// the raw value. With an explicit `weights` vector the `weighted`
    /// field is filled as `Σ (hard ? hard_weight * w[i] * v[i] : w[i] * v[i])`
    /// and the result is marked weighted.
    pub fn cost_function_components(
        &self,
        state: &M::State,
        weights: Option<&[f64]>,
    ) -> CostStructure<M::Cost> {
        let values: Vec<M::Cost> = self.components.iter().map(|c| c.cost(state)).collect();
        self.aggregate(&values, weights)
    }

    /// Aggregates per-component values (or deltas) into a cost
    /// structure, using the same hard/soft weighting as
    /// [`cost_function_components`](Self::cost_function_components).
    /// This is the assembly step of the delta-cost protocol: explorers
    /// compute raw per-component changes and hand them here.
    pub fn assemble_delta(
        &self,
        values: &[M::Cost],
        weights: Option<&[f64]>,
    ) -> CostStructure<M::Cost> {
        self.aggregate(values, weights)
    }

    fn aggregate(&self, values: &[M::Cost], weights: Option<&[f64]>) -> CostStructure<M::Cost> {
        let mut hard = M::Cost::zero();
        let mut soft = M::Cost::zero();
        let mut weighted = 0.0;
        for (i, &value) in values.iter().enumerate() {
            let is_hard = self.components.get(i).map(|c| c.is_hard()).unwrap_or(false);
            if is_hard {
                hard = hard + value;
                if let Some(w) = weights {
                    weighted += self.hard_weight.as_f64()
                        * w.get(i).copied().unwrap_or(1.0)
                        * value.as_f64();
                }
            } else {
                soft = soft + value;
                if let Some(w) = weights {
                    weighted += w.get(i).copied().unwrap_or(1.0) * value.as_f64();
                }
            }
        }
        let total = self.hard_weight * hard + soft;
        if weights.is_some() {
            CostStructure::new_weighted(total, weighted, hard, soft, values.to_vec())
        } else {
            CostStructure::new(total, hard, soft, values.to_vec())
        }
    }

    /// Whether the cost has reached its lower bound; the tentative
    /// definition is "everything zero".
    pub fn lower_bound_reached(&self, cost: &CostStructure<M::Cost>) -> bool {
        cost.is_zero()
    }

    /// Whether the state's cost has reached the lower bound.
    pub fn optimal_state_reached(&self, state: &M::State) -> bool {
        self.lower_bound_reached(&self.cost_function_components(state, None))
    }

    /// Forwards to the model's consistency check.
    pub fn check_consistency(&self, state: &M::State) -> bool {
        self.model.check_consistency(state)
    }

    /// Forwards to the model's distance, if implemented.
    pub fn state_distance(&self, a: &M::State, b: &M::State) -> Result<u32, SearchError> {
        self.model.state_distance(a, b)
    }

    /// Encodes a state through the model's JSON hook.
    pub fn state_to_json(&self, state: &M::State) -> Result<Value, SearchError> {
        self.model.state_to_json(state)
    }

    /// Decodes a state through the model's JSON hook.
    pub fn state_from_json(&self, value: &Value) -> Result<M::State, SearchError> {
        self.model.state_from_json(value)
    }

    /// Per-component cost report: `{"components": {name: {cost, hard,
    /// weight}}, "total": …, "violations": …, "objective": …}`.
    pub fn cost_breakdown(&self, state: &M::State, weights: Option<&[f64]>) -> Value {
        let cost = self.cost_function_components(state, weights);
        let mut components = serde_json::Map::new();
        for (i, c) in self.components.iter().enumerate() {
            components.insert(
                c.name().to_string(),
                json!({
                    "cost": cost.component(i).as_f64(),
                    "hard": c.is_hard(),
                    "weight": c.weight().as_f64(),
                }),
            );
        }
        json!({
            "components": Value::Object(components),
            "total": cost.total.as_f64(),
            "violations": cost.violations.as_f64(),
            "objective": cost.objective.as_f64(),
        })
    }
}
