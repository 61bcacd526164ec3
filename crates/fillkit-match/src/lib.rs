//! Picks the profile-backed option for a form field.
//!
//! The [`MatchEngine`] runs an ordered chain of strategies (direct leaf
//! comparison, category alias tables, a semantic fallback and an optional
//! remote collaborator) and returns the first candidate that clears its
//! stage minimum. Results always borrow the chosen option from the field
//! they were computed for.

mod engine;
pub mod freeform;
pub mod numeric;
pub mod remote;
pub mod similarity;
pub mod strategy;

pub use engine::{check_unit, Chosen, Evaluation, MatchEngine, MatchOptions, MatchResult, PolicyError, StageMinimums};
pub use freeform::{suggest_value, ValueSuggestion};
pub use remote::{
    validate_response, BoxedSuggestionSource, HttpSuggestionSource, RemoteError, RemoteStatus, SuggestionSource,
};
pub use strategy::{detect_category, referenced_leaves, BoxedStrategy, Candidate, FieldCategory, Strategy};
