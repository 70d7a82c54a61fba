//! Aggregate cost values and their comparison policies.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};
use serde::Serialize;

/// Absolute tolerance of the approximate comparison predicates.
///
/// Integer cost types compare exactly; floating types tolerate drift
/// accumulated by long chains of delta updates.
pub const COST_TOLERANCE: f64 = 1e-6;

/// Bound on the scalar cost type: totally ordered, signed additive, with
/// an additive identity. `i64` is the usual instantiation; `f64` works
/// as well.
pub trait CostValue:
    Signed
    + PartialOrd
    + Copy
    + FromPrimitive
    + ToPrimitive
    + fmt::Debug
    + fmt::Display
    + Send
    + Sync
    + 'static
{
    /// Lossy view of the value as `f64`, used by the approximate
    /// predicates and by weighted aggregation.
    fn as_f64(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }

    /// Equality up to [`COST_TOLERANCE`].
    fn approx_eq(self, other: Self) -> bool {
        (self.as_f64() - other.as_f64()).abs() <= COST_TOLERANCE
    }

    /// Total order with equality widened to [`COST_TOLERANCE`].
    fn approx_cmp(self, other: Self) -> Ordering {
        if self.approx_eq(other) {
            Ordering::Equal
        } else if self.as_f64() < other.as_f64() {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }

    /// Whether the value is zero up to [`COST_TOLERANCE`].
    fn approx_is_zero(self) -> bool {
        self.as_f64().abs() <= COST_TOLERANCE
    }
}

impl<T> CostValue for T where
    T: Signed
        + PartialOrd
        + Copy
        + FromPrimitive
        + ToPrimitive
        + fmt::Debug
        + fmt::Display
        + Send
        + Sync
        + 'static
{
}

/// Comparison policy applied to a pair of [`CostStructure`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CostOrdering {
    /// Compare the `weighted` field when both sides carry one, otherwise
    /// the `total` field.
    #[default]
    Flat,
    /// Lexicographic comparison of the raw `components`; the first
    /// differing element decides and later elements are ignored. The
    /// weighted path is never consulted.
    Hierarchical,
}

impl CostOrdering {
    /// Compares two cost structures under this policy.
    pub fn compare<C: CostValue>(self, a: &CostStructure<C>, b: &CostStructure<C>) -> Ordering {
        match self {
            CostOrdering::Flat => {
                if a.is_weighted && b.is_weighted {
                    if (a.weighted - b.weighted).abs() <= COST_TOLERANCE {
                        Ordering::Equal
                    } else if a.weighted < b.weighted {
                        Ordering::Less
                    } else {
                        Ordering::Greater
                    }
                } else {
                    a.total.approx_cmp(b.total)
                }
            }
            CostOrdering::Hierarchical => {
                let len = a.components.len().max(b.components.len());
                for i in 0..len {
                    let ca = a.components.get(i).copied().unwrap_or_else(C::zero);
                    let cb = b.components.get(i).copied().unwrap_or_else(C::zero);
                    match ca.approx_cmp(cb) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                Ordering::Equal
            }
        }
    }
}

/// Aggregated result of evaluating every cost component on one state (or
/// the componentwise change induced by one move).
///
/// `total = hard_weight * violations + objective` when assembled by a
/// state manager. `components[i]` is the raw value of the i-th component,
/// never pre-multiplied by weights. `weighted` carries the explicitly
/// weighted sum and is meaningful only when `is_weighted` is true.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostStructure<C> {
    pub total: C,
    pub violations: C,
    pub objective: C,
    pub weighted: f64,
    pub is_weighted: bool,
    pub components: Vec<C>,
}

impl<C: CostValue> CostStructure<C> {
    /// The additive identity: everything zero, unweighted, no components.
    pub fn zero() -> Self {
        CostStructure {
            total: C::zero(),
            violations: C::zero(),
            objective: C::zero(),
            weighted: 0.0,
            is_weighted: false,
            components: Vec::new(),
        }
    }

    /// Builds an unweighted structure; `weighted` mirrors `total`.
    pub fn new(total: C, violations: C, objective: C, components: Vec<C>) -> Self {
        CostStructure {
            total,
            violations,
            objective,
            weighted: total.as_f64(),
            is_weighted: false,
            components,
        }
    }

    /// Builds a structure carrying an explicitly weighted sum.
    pub fn new_weighted(
        total: C,
        weighted: f64,
        violations: C,
        objective: C,
        components: Vec<C>,
    ) -> Self {
        CostStructure {
            total,
            violations,
            objective,
            weighted,
            is_weighted: true,
            components,
        }
    }

    /// Number of component entries.
    pub fn size(&self) -> usize {
        self.components.len()
    }

    /// Raw value of the i-th component; indexes past the end read as zero
    /// (the padding convention of the arithmetic ops).
    pub fn component(&self, i: usize) -> C {
        self.components.get(i).copied().unwrap_or_else(C::zero)
    }

    /// Field-wise equality up to [`COST_TOLERANCE`], with the shorter
    /// component vector zero-padded.
    pub fn approx_eq(&self, other: &Self) -> bool {
        let len = self.components.len().max(other.components.len());
        self.total.approx_eq(other.total)
            && self.violations.approx_eq(other.violations)
            && self.objective.approx_eq(other.objective)
            && (0..len).all(|i| self.component(i).approx_eq(other.component(i)))
    }

    /// Whether every aggregate and every component is (approximately)
    /// zero. This is the default lower bound test of the state manager.
    pub fn is_zero(&self) -> bool {
        self.total.approx_is_zero()
            && self.violations.approx_is_zero()
            && self.objective.approx_is_zero()
            && self.components.iter().all(|c| c.approx_is_zero())
    }
}

impl<C: CostValue> Default for CostStructure<C> {
    fn default() -> Self {
        CostStructure::zero()
    }
}

impl<C: CostValue> AddAssign<&CostStructure<C>> for CostStructure<C> {
    fn add_assign(&mut self, other: &CostStructure<C>) {
        self.total = self.total + other.total;
        self.violations = self.violations + other.violations;
        self.objective = self.objective + other.objective;
        self.weighted += other.weighted;
        self.is_weighted = self.is_weighted && other.is_weighted;
        if self.components.len() < other.components.len() {
            self.components.resize(other.components.len(), C::zero());
        }
        for (i, &c) in other.components.iter().enumerate() {
            self.components[i] = self.components[i] + c;
        }
    }
}

impl<C: CostValue> SubAssign<&CostStructure<C>> for CostStructure<C> {
    fn sub_assign(&mut self, other: &CostStructure<C>) {
        self.total = self.total - other.total;
        self.violations = self.violations - other.violations;
        self.objective = self.objective - other.objective;
        self.weighted -= other.weighted;
        self.is_weighted = self.is_weighted && other.is_weighted;
        if self.components.len() < other.components.len() {
            self.components.resize(other.components.len(), C::zero());
        }
        for (i, &c) in other.components.iter().enumerate() {
            self.components[i] = self.components[i] - c;
        }
    }
}

impl<C: CostValue> Add<&CostStructure<C>> for CostStructure<C> {
    type Output = CostStructure<C>;

    fn add(mut self, other: &CostStructure<C>) -> CostStructure<C> {
        self += other;
        self
    }
}

impl<C: CostValue> Sub<&CostStructure<C>> for CostStructure<C> {
    type Output = CostStructure<C>;

    fn sub(mut self, other: &CostStructure<C>) -> CostStructure<C> {
        self -= other;
        self
    }
}

impl<C: CostValue> fmt::Display for CostStructure<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (viol: {}, obj: {}, comps: {{",
            self.total, self.violations, self.objective
        )?;
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, "}})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cs(total: i64, viol: i64, obj: i64, comps: &[i64]) -> CostStructure<i64> {
        CostStructure::new(total, viol, obj, comps.to_vec())
    }

    #[test]
    fn test_add_then_sub_restores() {
        let a = cs(12, 1, 2, &[1, 2, 3]);
        let b = cs(7, 0, 7, &[4, 5]);
        let roundtrip = (a.clone() + &b) - &b;
        assert!(roundtrip.approx_eq(&a));
    }

    #[test]
    fn test_add_pads_shorter_side() {
        let a = cs(1, 0, 1, &[1]);
        let b = cs(2, 0, 2, &[0, 2, 3]);
        let sum = a + &b;
        assert_eq!(sum.components, vec![1, 2, 3]);
        assert_eq!(sum.total, 3);
    }

    #[test]
    fn test_sub_pads_shorter_side() {
        let mut a = cs(5, 0, 5, &[5]);
        a -= &cs(1, 0, 1, &[1, 2]);
        assert_eq!(a.components, vec![4, -2]);
    }

    #[test]
    fn test_flat_ordering_uses_total_when_unweighted() {
        let a = cs(3, 0, 3, &[9, 9]);
        let b = cs(4, 0, 4, &[0, 0]);
        assert_eq!(CostOrdering::Flat.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_flat_ordering_prefers_weighted_when_both_weighted() {
        let a = CostStructure::new_weighted(10, 1.0, 0, 10, vec![10]);
        let b = CostStructure::new_weighted(1, 2.0, 0, 1, vec![1]);
        // a has the larger total but the smaller weighted sum
        assert_eq!(CostOrdering::Flat.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_flat_ordering_falls_back_when_one_side_unweighted() {
        let a = CostStructure::new_weighted(10, 1.0, 0, 10, vec![10]);
        let b = cs(1, 0, 1, &[1]);
        assert_eq!(CostOrdering::Flat.compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_hierarchical_first_differing_index_decides() {
        let a = cs(0, 0, 0, &[1, 0, 50]);
        let b = cs(0, 0, 0, &[1, 1, 0]);
        // index 1 decides; the much larger index 2 of `a` is ignored
        assert_eq!(CostOrdering::Hierarchical.compare(&a, &b), Ordering::Less);
        assert_eq!(CostOrdering::Hierarchical.compare(&b, &a), Ordering::Greater);
    }

    #[test]
    fn test_hierarchical_pads_missing_components() {
        let a = cs(0, 0, 0, &[1]);
        let b = cs(0, 0, 0, &[1, 0, 0]);
        assert_eq!(CostOrdering::Hierarchical.compare(&a, &b), Ordering::Equal);

        let c = cs(0, 0, 0, &[1, -1]);
        assert_eq!(CostOrdering::Hierarchical.compare(&c, &a), Ordering::Less);
    }

    #[test]
    fn test_hierarchical_ignores_weighted() {
        let a = CostStructure::new_weighted(0, 100.0, 0, 0, vec![0, 1]);
        let b = CostStructure::new_weighted(0, 1.0, 0, 0, vec![1, 0]);
        assert_eq!(CostOrdering::Hierarchical.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_float_drift_within_tolerance() {
        let mut acc: CostStructure<f64> = CostStructure::zero();
        let step = CostStructure::new(0.1, 0.0, 0.1, vec![0.1]);
        for _ in 0..10 {
            acc += &step;
        }
        let one = CostStructure::new(1.0, 0.0, 1.0, vec![1.0]);
        assert!(acc.approx_eq(&one));
        assert_eq!(CostOrdering::Flat.compare(&acc, &one), Ordering::Equal);
    }

    #[test]
    fn test_is_zero() {
        assert!(CostStructure::<i64>::zero().is_zero());
        assert!(cs(0, 0, 0, &[0, 0]).is_zero());
        assert!(!cs(0, 0, 0, &[0, 1]).is_zero());
        assert!(!cs(1, 0, 1, &[]).is_zero());
    }

    #[test]
    fn test_weighted_flag_propagation() {
        let w = CostStructure::new_weighted(1, 1.5, 0, 1, vec![1]);
        let u = cs(1, 0, 1, &[1]);
        let mixed = w.clone() + &u;
        assert!(!mixed.is_weighted);
        let both = w.clone() + &w;
        assert!(both.is_weighted);
        assert!((both.weighted - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_display() {
        let a = cs(12, 1, 2, &[1, 2]);
        assert_eq!(a.to_string(), "12 (viol: 1, obj: 2, comps: {1, 2})");
    }
}
