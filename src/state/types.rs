//! Core trait for problem models.

use rand::RngCore;
use serde_json::Value;

use crate::cost::CostValue;
use crate::error::SearchError;

/// User-supplied description of a problem's solution space.
///
/// The model owns (or borrows) the problem input; the framework never
/// manipulates the input directly. States must be cheaply clonable and
/// comparable, since runners keep a current and a best copy and the
/// multimodal combinators maintain chains of scratch states.
pub trait Model: Send + Sync {
    /// The solution representation.
    type State: Clone + PartialEq + std::fmt::Debug + Send;

    /// The scalar cost type.
    type Cost: CostValue;

    /// Builds a uniformly random solution.
    fn random_state(&self, rng: &mut dyn RngCore) -> Self::State;

    /// Builds a greedy solution.
    ///
    /// `alpha` and `k` control the restricted candidate list in
    /// GRASP-style construction: `alpha` admits candidates whose greedy
    /// value is within that fraction of the best, `k` caps the list
    /// length. Implementations are free to ignore either.
    fn greedy_state(&self, alpha: f64, k: u32) -> Result<Self::State, SearchError> {
        let _ = (alpha, k);
        Err(SearchError::NotImplemented("greedy_state"))
    }

    /// Whether the state's redundant data structures agree with the
    /// primary ones. Checked after moves in debug builds only.
    fn check_consistency(&self, state: &Self::State) -> bool;

    /// Distance between two states (e.g. Hamming distance).
    fn state_distance(&self, a: &Self::State, b: &Self::State) -> Result<u32, SearchError> {
        let _ = (a, b);
        Err(SearchError::NotImplemented("state_distance"))
    }

    /// Encodes a state as JSON.
    fn state_to_json(&self, state: &Self::State) -> Result<Value, SearchError> {
        let _ = state;
        Err(SearchError::NotImplemented("state_to_json"))
    }

    /// Decodes a state from JSON.
    fn state_from_json(&self, value: &Value) -> Result<Self::State, SearchError> {
        let _ = value;
        Err(SearchError::NotImplemented("state_from_json"))
    }
}
