//! The local stages of the strategy chain.

use fillkit_aliases::{contains_phrase, normalize_text};
use fillkit_profile::CanonicalProfile;
use fillkit_protocol::{FieldDescriptor, FieldOption, MatchMethod};

mod category;
mod direct;
mod semantic;

pub use category::{detect_category, CategoryStrategy, FieldCategory};
pub use direct::{referenced_leaves, DirectStrategy};
pub use semantic::SemanticStrategy;

/// A stage's preferred option, by index into `field.options`.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub index: usize,
    pub confidence: f64,
    pub reasoning: String,
}

impl Candidate {
    pub fn new(index: usize, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            index,
            confidence: clamp_confidence(confidence),
            reasoning: reasoning.into(),
        }
    }
}

/// One stage of the chain. Implementations are pure: the same field and
/// profile always produce the same candidate.
pub trait Strategy: Send + Sync {
    fn method(&self) -> MatchMethod;

    fn attempt(&self, field: &FieldDescriptor, profile: &CanonicalProfile) -> Option<Candidate>;
}

pub type BoxedStrategy<'r> = Box<dyn Strategy + 'r>;

pub(crate) fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Options a matcher may pick, with their index.
pub(crate) fn selectable(field: &FieldDescriptor) -> impl Iterator<Item = (usize, &FieldOption)> {
    field
        .options
        .iter()
        .enumerate()
        .filter(|(_, option)| option.is_selectable())
}

/// Whether `a` should replace the current best `b`: higher confidence, then
/// earlier index, then shorter option text.
pub(crate) fn outranks(a: &Candidate, b: &Candidate, options: &[FieldOption]) -> bool {
    if a.confidence != b.confidence {
        return a.confidence > b.confidence;
    }
    if a.index != b.index {
        return a.index < b.index;
    }
    let len = |i: usize| options.get(i).map(|o| o.text.chars().count()).unwrap_or(usize::MAX);
    len(a.index) < len(b.index)
}

/// Keep the best of a stream of candidates.
pub(crate) fn best_candidate<I>(candidates: I, options: &[FieldOption]) -> Option<Candidate>
where
    I: IntoIterator<Item = Candidate>,
{
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        if candidate.confidence <= 0.0 {
            continue;
        }
        let replace = match &best {
            Some(current) => outranks(&candidate, current, options),
            None => true,
        };
        if replace {
            best = Some(candidate);
        }
    }
    best
}

/// Normalized field context with a check for whole-token phrases.
pub(crate) struct Context {
    text: String,
}

impl Context {
    pub(crate) fn of(field: &FieldDescriptor) -> Self {
        Self {
            text: normalize_text(&field.context_text()),
        }
    }

    pub(crate) fn mentions(&self, phrase: &str) -> bool {
        contains_phrase(&self.text, &normalize_text(phrase))
    }

    pub(crate) fn mentions_any(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|p| self.mentions(p))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_go_to_the_earlier_option() {
        let options = vec![FieldOption::labelled("New York"), FieldOption::labelled("NY")];
        let a = Candidate::new(1, 0.9, "b");
        let b = Candidate::new(0, 0.9, "a");
        let best = best_candidate([a, b], &options).expect("candidate");
        assert_eq!(best.index, 0);
    }

    #[test]
    fn higher_confidence_wins_regardless_of_position() {
        let options = vec![FieldOption::labelled("A"), FieldOption::labelled("B")];
        let best = best_candidate(
            [Candidate::new(0, 0.5, "a"), Candidate::new(1, 0.51, "b")],
            &options,
        )
        .expect("candidate");
        assert_eq!(best.index, 1);
    }

    #[test]
    fn zero_and_nan_confidence_never_win() {
        let options = vec![FieldOption::labelled("A")];
        assert!(best_candidate([Candidate::new(0, f64::NAN, "x")], &options).is_none());
        assert!(best_candidate([Candidate::new(0, 0.0, "x")], &options).is_none());
    }

    #[test]
    fn context_matches_whole_tokens_only() {
        let field = FieldDescriptor::new("Statement of purpose");
        let ctx = Context::of(&field);
        assert!(!ctx.mentions("state"));
        assert!(ctx.mentions("statement"));
        assert!(ctx.mentions_any(&["nation", "purpose"]));
    }
}
