//! Moves tagged with an activity flag, and their type-erased form.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;

/// A move paired with a flag recording whether it participates in a
/// composite step.
///
/// Two inactive moves compare equal regardless of payload; ordering
/// places inactive moves before active ones.
#[derive(Debug, Clone)]
pub struct ActiveMove<M> {
    pub mv: M,
    pub active: bool,
}

impl<M> ActiveMove<M> {
    pub fn active(mv: M) -> Self {
        ActiveMove { mv, active: true }
    }

    pub fn inactive(mv: M) -> Self {
        ActiveMove { mv, active: false }
    }
}

impl<M: PartialEq> PartialEq for ActiveMove<M> {
    fn eq(&self, other: &Self) -> bool {
        if !self.active && !other.active {
            return true;
        }
        self.active == other.active && self.mv == other.mv
    }
}

impl<M: Eq> Eq for ActiveMove<M> {}

impl<M: Ord> PartialOrd for ActiveMove<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M: Ord> Ord for ActiveMove<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.active, other.active) {
            (false, false) => Ordering::Equal,
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (true, true) => self.mv.cmp(&other.mv),
        }
    }
}

/// Object-safe face of a concrete move type, so heterogeneous moves can
/// share one composite container.
pub trait AnyMove: Any + fmt::Debug + Send {
    fn clone_box(&self) -> Box<dyn AnyMove>;
    fn eq_box(&self, other: &dyn AnyMove) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<M> AnyMove for M
where
    M: Any + fmt::Debug + Clone + PartialEq + Send,
{
    fn clone_box(&self) -> Box<dyn AnyMove> {
        Box::new(self.clone())
    }

    fn eq_box(&self, other: &dyn AnyMove) -> bool {
        other
            .as_any()
            .downcast_ref::<M>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A clonable, comparable box around an erased move payload. Moves of
/// different concrete types never compare equal.
pub struct BoxedMove(Box<dyn AnyMove>);

impl BoxedMove {
    pub fn new<M>(mv: M) -> Self
    where
        M: Any + fmt::Debug + Clone + PartialEq + Send,
    {
        BoxedMove(Box::new(mv))
    }

    pub fn downcast_ref<M: Any>(&self) -> Option<&M> {
        self.0.as_any().downcast_ref::<M>()
    }

    pub fn downcast_mut<M: Any>(&mut self) -> Option<&mut M> {
        self.0.as_any_mut().downcast_mut::<M>()
    }

    pub fn is<M: Any>(&self) -> bool {
        self.downcast_ref::<M>().is_some()
    }
}

impl Clone for BoxedMove {
    fn clone(&self) -> Self {
        BoxedMove(self.0.clone_box())
    }
}

impl PartialEq for BoxedMove {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_box(other.0.as_ref())
    }
}

impl fmt::Debug for BoxedMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Move type of the multimodal combinators: one [`ActiveMove`] per slot,
/// with payloads filled in lazily as slots produce moves.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeMove {
    slots: Vec<ActiveMove<Option<BoxedMove>>>,
}

impl CompositeMove {
    /// An all-inactive composite of the given modality.
    pub(crate) fn inactive(modality: usize) -> Self {
        CompositeMove {
            slots: (0..modality).map(|_| ActiveMove::inactive(None)).collect(),
        }
    }

    /// Number of slots.
    pub fn modality(&self) -> usize {
        self.slots.len()
    }

    /// Whether slot `i` participates in this composite step.
    pub fn is_active(&self, i: usize) -> bool {
        self.slots[i].active
    }

    /// Index of the first active slot.
    pub fn active_index(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.active)
    }

    /// Number of active slots.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    /// Typed view of slot `i`'s payload.
    pub fn get<M: Any>(&self, i: usize) -> Option<&M> {
        self.slots[i].mv.as_ref().and_then(|b| b.downcast_ref())
    }

    pub(crate) fn payload(&self, i: usize) -> Option<&BoxedMove> {
        self.slots[i].mv.as_ref()
    }

    pub(crate) fn set_active(&mut self, i: usize, mv: BoxedMove) {
        self.slots[i] = ActiveMove::active(Some(mv));
    }

    pub(crate) fn deactivate(&mut self, i: usize) {
        self.slots[i].active = false;
    }

    pub(crate) fn payloads(&self) -> Vec<Option<BoxedMove>> {
        self.slots.iter().map(|s| s.mv.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_moves_compare_equal() {
        let a = ActiveMove::inactive(1);
        let b = ActiveMove::inactive(99);
        assert_eq!(a, b);
    }

    #[test]
    fn test_active_moves_compare_by_payload() {
        assert_eq!(ActiveMove::active(4), ActiveMove::active(4));
        assert_ne!(ActiveMove::active(4), ActiveMove::active(5));
        assert_ne!(ActiveMove::active(4), ActiveMove::inactive(4));
    }

    #[test]
    fn test_inactive_orders_before_active() {
        assert!(ActiveMove::inactive(100) < ActiveMove::active(0));
        assert!(ActiveMove::active(1) < ActiveMove::active(2));
        assert_eq!(
            ActiveMove::inactive(3).cmp(&ActiveMove::inactive(4)),
            Ordering::Equal
        );
    }

    #[test]
    fn test_boxed_move_equality() {
        let a = BoxedMove::new(7i64);
        let b = BoxedMove::new(7i64);
        let c = BoxedMove::new(8i64);
        assert_eq!(a, b);
        assert_ne!(a, c);
        // different concrete types never compare equal
        let d = BoxedMove::new(7i32);
        assert_ne!(a, d);
    }

    #[test]
    fn test_boxed_move_downcast() {
        let mut a = BoxedMove::new((1u32, 2u32));
        assert_eq!(a.downcast_ref::<(u32, u32)>(), Some(&(1, 2)));
        assert!(a.downcast_ref::<i64>().is_none());
        if let Some(pair) = a.downcast_mut::<(u32, u32)>() {
            pair.0 = 9;
        }
        assert_eq!(a.downcast_ref::<(u32, u32)>(), Some(&(9, 2)));
    }

    #[test]
    fn test_composite_accessors() {
        let mut cm = CompositeMove::inactive(3);
        assert_eq!(cm.modality(), 3);
        assert_eq!(cm.active_index(), None);
        cm.set_active(1, BoxedMove::new(42i64));
        assert_eq!(cm.active_index(), Some(1));
        assert_eq!(cm.active_count(), 1);
        assert_eq!(cm.get::<i64>(1), Some(&42));
        assert_eq!(cm.get::<i64>(0), None);
        cm.deactivate(1);
        assert_eq!(cm.active_index(), None);
    }

    #[test]
    fn test_composite_equality_ignores_inactive_payloads() {
        let mut a = CompositeMove::inactive(2);
        let mut b = CompositeMove::inactive(2);
        a.set_active(0, BoxedMove::new(1i64));
        b.set_active(0, BoxedMove::new(1i64));
        // differing payloads on inactive slots are invisible
        a.set_active(1, BoxedMove::new(10i64));
        a.deactivate(1);
        b.set_active(1, BoxedMove::new(20i64));
        b.deactivate(1);
        assert_eq!(a, b);
    }
}
