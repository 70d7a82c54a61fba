//! Named terms of the cost function.

use super::CostValue;

/// A single named term of the cost function.
///
/// Hard components model constraints: their value counts as violations
/// and is multiplied by the state manager's hard weight inside `total`.
/// Soft components model objective terms and contribute their raw value.
///
/// The problem input is captured by the implementing type (a field or a
/// closure capture), so the trait only sees states.
pub trait CostComponent<S, C: CostValue>: Send + Sync {
    /// Name of the component, unique within a state manager.
    fn name(&self) -> &str;

    /// Weight applied when an explicit weight vector is not supplied.
    fn weight(&self) -> C;

    /// Whether this component is a hard constraint.
    fn is_hard(&self) -> bool;

    /// Evaluates the component on a state.
    fn cost(&self, state: &S) -> C;
}

/// A [`CostComponent`] backed by a closure.
pub struct FnCostComponent<S, C> {
    name: String,
    weight: C,
    hard: bool,
    cost: Box<dyn Fn(&S) -> C + Send + Sync>,
}

impl<S, C: CostValue> FnCostComponent<S, C> {
    /// Builds a component from its parts.
    pub fn new(
        name: impl Into<String>,
        weight: C,
        hard: bool,
        cost: impl Fn(&S) -> C + Send + Sync + 'static,
    ) -> Self {
        FnCostComponent {
            name: name.into(),
            weight,
            hard,
            cost: Box::new(cost),
        }
    }

    /// Builds a hard (constraint) component.
    pub fn hard(
        name: impl Into<String>,
        weight: C,
        cost: impl Fn(&S) -> C + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, weight, true, cost)
    }

    /// Builds a soft (objective) component.
    pub fn soft(
        name: impl Into<String>,
        weight: C,
        cost: impl Fn(&S) -> C + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, weight, false, cost)
    }
}

impl<S, C: CostValue> CostComponent<S, C> for FnCostComponent<S, C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> C {
        self.weight
    }

    fn is_hard(&self) -> bool {
        self.hard
    }

    fn cost(&self, state: &S) -> C {
        (self.cost)(state)
    }
}
