//! Neighborhood iterators.

use rand::RngCore;

use super::{EvaluatedMove, NeighborhoodExplorer};

/// Input iterator over the full neighborhood of a state.
///
/// Starts from `first_move`, advances with `next_move`, and evaluates
/// each move on the fly. An empty neighborhood yields nothing.
pub struct NeighborhoodIter<'a, E: NeighborhoodExplorer> {
    explorer: &'a E,
    state: &'a E::State,
    current: Option<E::Move>,
    started: bool,
}

impl<'a, E: NeighborhoodExplorer> NeighborhoodIter<'a, E> {
    pub(super) fn new(explorer: &'a E, state: &'a E::State) -> Self {
        NeighborhoodIter {
            explorer,
            state,
            current: None,
            started: false,
        }
    }
}

impl<E: NeighborhoodExplorer> Iterator for NeighborhoodIter<'_, E> {
    type Item = EvaluatedMove<E::Move, E::Cost>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            self.current = self.explorer.first_move(self.state).ok();
        } else if let Some(mv) = self.current.as_mut() {
            if !self.explorer.next_move(self.state, mv) {
                self.current = None;
            }
        }
        let mv = self.current.as_ref()?;
        let cost = self.explorer.delta_cost(self.state, mv, None);
        Some(EvaluatedMove::new(mv.clone(), cost))
    }
}

/// Iterator over up to `samples` random evaluated moves.
///
/// Stops early if the explorer reports an empty neighborhood.
pub struct SampleIter<'a, E: NeighborhoodExplorer> {
    explorer: &'a E,
    state: &'a E::State,
    remaining: usize,
    rng: &'a mut dyn RngCore,
}

impl<'a, E: NeighborhoodExplorer> SampleIter<'a, E> {
    pub(super) fn new(
        explorer: &'a E,
        state: &'a E::State,
        samples: usize,
        rng: &'a mut dyn RngCore,
    ) -> Self {
        SampleIter {
            explorer,
            state,
            remaining: samples,
            rng,
        }
    }
}

impl<E: NeighborhoodExplorer> Iterator for SampleIter<'_, E> {
    type Item = EvaluatedMove<E::Move, E::Cost>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let mv = self.explorer.random_move(self.state, self.rng).ok()?;
        let cost = self.explorer.delta_cost(self.state, &mv, None);
        Some(EvaluatedMove::new(mv, cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostStructure;
    use crate::error::SearchError;
    use crate::random::create_rng;
    use rand::Rng;
    use std::collections::HashSet;

    /// Moves are the integers `0..n`; enumeration order is ascending.
    struct Range {
        n: i64,
    }

    impl NeighborhoodExplorer for Range {
        type State = i64;
        type Move = i64;
        type Cost = i64;

        fn random_move(&self, _state: &i64, rng: &mut dyn RngCore) -> Result<i64, SearchError> {
            let mut rng = rng;
            if self.n == 0 {
                return Err(SearchError::EmptyNeighborhood);
            }
            Ok(rng.random_range(0..self.n))
        }

        fn first_move(&self, _state: &i64) -> Result<i64, SearchError> {
            if self.n == 0 {
                Err(SearchError::EmptyNeighborhood)
            } else {
                Ok(0)
            }
        }

        fn next_move(&self, _state: &i64, mv: &mut i64) -> bool {
            if *mv + 1 < self.n {
                *mv += 1;
                true
            } else {
                false
            }
        }

        fn make_move(&self, state: &mut i64, mv: &i64) {
            *state += mv;
        }

        fn delta_cost(
            &self,
            _state: &i64,
            mv: &i64,
            _weights: Option<&[f64]>,
        ) -> CostStructure<i64> {
            CostStructure::new(*mv, 0, *mv, vec![*mv])
        }
    }

    #[test]
    fn test_neighborhood_iter_visits_each_move_once() {
        let ne = Range { n: 6 };
        let visited: Vec<i64> = ne.neighborhood_iter(&0).map(|em| em.mv).collect();
        assert_eq!(visited, vec![0, 1, 2, 3, 4, 5]);
        let unique: HashSet<i64> = visited.into_iter().collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_neighborhood_iter_empty() {
        let ne = Range { n: 0 };
        assert_eq!(ne.neighborhood_iter(&0).count(), 0);
    }

    #[test]
    fn test_neighborhood_iter_evaluates() {
        let ne = Range { n: 3 };
        let costs: Vec<i64> = ne.neighborhood_iter(&0).map(|em| em.cost.total).collect();
        assert_eq!(costs, vec![0, 1, 2]);
    }

    #[test]
    fn test_sample_iter_length_and_domain() {
        let ne = Range { n: 4 };
        let mut rng = create_rng(8);
        let samples: Vec<i64> = ne.sample_iter(&0, 20, &mut rng).map(|em| em.mv).collect();
        assert_eq!(samples.len(), 20);
        assert!(samples.iter().all(|&m| (0..4).contains(&m)));
    }

    #[test]
    fn test_sample_iter_stops_on_empty() {
        let ne = Range { n: 0 };
        let mut rng = create_rng(8);
        assert_eq!(ne.sample_iter(&0, 5, &mut rng).count(), 0);
    }
}
