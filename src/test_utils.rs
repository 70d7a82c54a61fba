//! Shared N-queens fixture for runner and solver tests.
//!
//! States assign one column per row (`state[row] = column`), starting
//! from a random permutation; moves swap the column assignments of two
//! rows. Three hard components count pairs of attacking queens per
//! direction.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::cost::{CostStructure, FnCostComponent};
use crate::error::SearchError;
use crate::explorer::NeighborhoodExplorer;
use crate::state::{Model, StateManager};

pub struct Queens {
    pub n: usize,
}

/// Pairs of queens sharing a column.
pub fn column_conflicts(state: &[usize]) -> i64 {
    attacking_pairs(state, |_row, col| col as i64)
}

/// Pairs of queens sharing a primary (top-left to bottom-right)
/// diagonal.
pub fn primary_diagonal_conflicts(state: &[usize]) -> i64 {
    attacking_pairs(state, |row, col| col as i64 - row as i64)
}

/// Pairs of queens sharing a secondary diagonal.
pub fn secondary_diagonal_conflicts(state: &[usize]) -> i64 {
    attacking_pairs(state, |row, col| col as i64 + row as i64)
}

fn attacking_pairs(state: &[usize], key: impl Fn(usize, usize) -> i64) -> i64 {
    let mut count = 0;
    for i in 0..state.len() {
        for j in i + 1..state.len() {
            if key(i, state[i]) == key(j, state[j]) {
                count += 1;
            }
        }
    }
    count
}

impl Model for Queens {
    type State = Vec<usize>;
    type Cost = i64;

    fn random_state(&self, rng: &mut dyn RngCore) -> Vec<usize> {
        let mut rng = rng;
        let mut state: Vec<usize> = (0..self.n).collect();
        state.shuffle(&mut rng);
        state
    }

    fn check_consistency(&self, state: &Vec<usize>) -> bool {
        state.len() == self.n && state.iter().all(|&c| c < self.n)
    }

    fn state_distance(&self, a: &Vec<usize>, b: &Vec<usize>) -> Result<u32, SearchError> {
        Ok(a.iter().zip(b).filter(|(x, y)| x != y).count() as u32)
    }
}

/// State manager with the three hard conflict components registered.
pub fn queens_manager(n: usize) -> StateManager<Queens> {
    let mut sm = StateManager::new(Queens { n });
    sm.add_cost_component(FnCostComponent::hard("column", 1, |s: &Vec<usize>| {
        column_conflicts(s)
    }));
    sm.add_cost_component(FnCostComponent::hard(
        "primary_diagonal",
        1,
        |s: &Vec<usize>| primary_diagonal_conflicts(s),
    ));
    sm.add_cost_component(FnCostComponent::hard(
        "secondary_diagonal",
        1,
        |s: &Vec<usize>| secondary_diagonal_conflicts(s),
    ));
    sm
}

/// Swap of two rows' column assignments, enumerated lexicographically.
pub struct QueensSwap<'a> {
    sm: &'a StateManager<Queens>,
}

pub fn queens_explorer(sm: &StateManager<Queens>) -> QueensSwap<'_> {
    QueensSwap { sm }
}

impl QueensSwap<'_> {
    fn component_values(state: &[usize]) -> [i64; 3] {
        [
            column_conflicts(state),
            primary_diagonal_conflicts(state),
            secondary_diagonal_conflicts(state),
        ]
    }
}

impl NeighborhoodExplorer for QueensSwap<'_> {
    type State = Vec<usize>;
    type Move = (usize, usize);
    type Cost = i64;

    fn random_move(
        &self,
        state: &Vec<usize>,
        rng: &mut dyn RngCore,
    ) -> Result<(usize, usize), SearchError> {
        let mut rng = rng;
        let n = state.len();
        if n < 2 {
            return Err(SearchError::EmptyNeighborhood);
        }
        let i = rng.random_range(0..n - 1);
        let j = rng.random_range(i + 1..n);
        Ok((i, j))
    }

    fn first_move(&self, state: &Vec<usize>) -> Result<(usize, usize), SearchError> {
        if state.len() < 2 {
            return Err(SearchError::EmptyNeighborhood);
        }
        Ok((0, 1))
    }

    fn next_move(&self, state: &Vec<usize>, mv: &mut (usize, usize)) -> bool {
        let n = state.len();
        let (i, j) = *mv;
        if j + 1 < n {
            *mv = (i, j + 1);
            true
        } else if i + 2 < n {
            *mv = (i + 1, i + 2);
            true
        } else {
            false
        }
    }

    fn make_move(&self, state: &mut Vec<usize>, mv: &(usize, usize)) {
        state.swap(mv.0, mv.1);
    }

    fn delta_cost(
        &self,
        state: &Vec<usize>,
        mv: &(usize, usize),
        weights: Option<&[f64]>,
    ) -> CostStructure<i64> {
        let before = Self::component_values(state);
        let mut after_state = state.clone();
        after_state.swap(mv.0, mv.1);
        let after = Self::component_values(&after_state);
        let deltas: Vec<i64> = before.iter().zip(&after).map(|(b, a)| a - b).collect();
        self.sm.assemble_delta(&deltas, weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_conflict_counts_on_known_board() {
        // all queens on the main diagonal: every pair attacks along it
        let state = vec![0, 1, 2, 3];
        assert_eq!(column_conflicts(&state), 0);
        assert_eq!(primary_diagonal_conflicts(&state), 6);
        assert_eq!(secondary_diagonal_conflicts(&state), 0);
    }

    #[test]
    fn test_known_solution_has_zero_cost() {
        // a valid 5-queens placement
        let state = vec![0, 2, 4, 1, 3];
        let sm = queens_manager(5);
        let cost = sm.cost_function_components(&state, None);
        assert_eq!(cost.total, 0);
        assert!(cost.is_zero());
    }

    #[test]
    fn test_swap_enumeration_counts_pairs() {
        let sm = queens_manager(5);
        let ne = queens_explorer(&sm);
        let state = sm.model().random_state(&mut create_rng(1));
        let count = ne.neighborhood_iter(&state).count();
        assert_eq!(count, 5 * 4 / 2);
    }

    #[test]
    fn test_delta_matches_full_reevaluation() {
        let sm = queens_manager(7);
        let ne = queens_explorer(&sm);
        let mut rng = create_rng(99);
        for _ in 0..10 {
            let state = sm.model().random_state(&mut rng);
            let cost = sm.cost_function_components(&state, None);
            let mut mv = ne.first_move(&state).unwrap();
            loop {
                let delta = ne.delta_cost(&state, &mv, None);
                let mut moved = state.clone();
                ne.make_move(&mut moved, &mv);
                let recomputed = sm.cost_function_components(&moved, None);
                let predicted = cost.clone() + &delta;
                assert!(
                    predicted.approx_eq(&recomputed),
                    "delta mismatch for {mv:?}: {predicted} vs {recomputed}"
                );
                if !ne.next_move(&state, &mut mv) {
                    break;
                }
            }
        }
    }

    #[test]
    fn test_random_states_are_permutations() {
        let model = Queens { n: 8 };
        let mut rng = create_rng(5);
        for _ in 0..10 {
            let state = model.random_state(&mut rng);
            assert!(model.check_consistency(&state));
            let mut sorted = state.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..8).collect::<Vec<_>>());
        }
    }
}
