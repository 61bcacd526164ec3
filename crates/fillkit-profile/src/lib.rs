//! Canonical user profiles.
//!
//! A [`ProfileNormalizer`] reads a loosely structured JSON object into a
//! [`CanonicalProfile`]: a fixed catalogue of `section.key` leaves, each with
//! a value and a confidence saying how it was obtained.

pub mod catalog;
mod coerce;
pub mod derive;
pub mod keywords;
mod leaf;
mod normalize;
pub mod suggest;

pub use coerce::parse_number;
pub use leaf::{Leaf, LeafValue, Section};
pub use normalize::{CanonicalProfile, ProfileNormalizer, RawProfile};
pub use suggest::{suggest_improvements, ProfileSuggestion};

/// Confidence levels assigned by the normalizer.
pub mod confidence {
    /// Canonical key present verbatim.
    pub const EXACT: f64 = 1.0;
    /// Value found under a recognized alias spelling.
    pub const ALIAS: f64 = 0.8;
    pub const INFERRED: f64 = 0.6;
    /// Dictionary guesses such as gender from a first name.
    pub const HEURISTIC: f64 = 0.3;
    pub const ABSENT: f64 = 0.0;
}
