use std::time::Duration;

use fillkit_aliases::AliasRegistry;
use fillkit_profile::CanonicalProfile;
use fillkit_protocol::{FieldDescriptor, FieldOption, MatchMethod};
use serde::{Deserialize, Serialize};

use crate::remote::{BoxedSuggestionSource, RemoteStage, RemoteStatus};
use crate::strategy::{BoxedStrategy, Candidate, CategoryStrategy, DirectStrategy, SemanticStrategy};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("{name} must be a number within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },
}

/// Reject NaN and values outside `[0, 1]`.
pub fn check_unit(name: &'static str, value: f64) -> Result<f64, PolicyError> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(PolicyError::OutOfRange { name, value });
    }
    Ok(value)
}

/// Confidence a stage's candidate must exceed to end the chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageMinimums {
    pub direct: f64,
    pub category: f64,
    pub semantic: f64,
    pub remote: f64,
}

impl Default for StageMinimums {
    fn default() -> Self {
        Self {
            direct: 0.7,
            category: 0.5,
            semantic: 0.4,
            remote: 0.3,
        }
    }
}

impl StageMinimums {
    pub fn validate(&self) -> Result<(), PolicyError> {
        check_unit("direct_min", self.direct)?;
        check_unit("category_min", self.category)?;
        check_unit("semantic_min", self.semantic)?;
        check_unit("remote_min", self.remote)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub allow_remote: bool,
}

/// The option a result points at. `option` always borrows from the
/// descriptor the engine was given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Chosen<'f> {
    pub index: usize,
    pub option: &'f FieldOption,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult<'f> {
    pub chosen: Option<Chosen<'f>>,
    pub confidence: f64,
    pub method: MatchMethod,
    pub reasoning: String,
}

impl<'f> MatchResult<'f> {
    pub fn no_match(reasoning: impl Into<String>) -> Self {
        Self {
            chosen: None,
            confidence: 0.0,
            method: MatchMethod::None,
            reasoning: reasoning.into(),
        }
    }

    fn from_candidate(field: &'f FieldDescriptor, candidate: Candidate, method: MatchMethod) -> Self {
        match field.options.get(candidate.index) {
            Some(option) => Self {
                chosen: Some(Chosen {
                    index: candidate.index,
                    option,
                }),
                confidence: candidate.confidence,
                method,
                reasoning: candidate.reasoning,
            },
            None => Self::no_match(format!("{} stage pointed past the options", method.as_str())),
        }
    }

    pub fn option(&self) -> Option<&'f FieldOption> {
        self.chosen.map(|chosen| chosen.option)
    }

    pub fn index(&self) -> Option<usize> {
        self.chosen.map(|chosen| chosen.index)
    }

    pub fn is_match(&self) -> bool {
        self.chosen.is_some()
    }
}

/// A match result together with what the remote stage did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation<'f> {
    pub result: MatchResult<'f>,
    pub remote: RemoteStatus,
}

struct Stage<'r> {
    strategy: BoxedStrategy<'r>,
    minimum: f64,
}

/// Ordered strategy chain. The first stage whose best candidate clears its
/// minimum decides the result; later stages are not consulted.
pub struct MatchEngine<'r> {
    stages: Vec<Stage<'r>>,
    remote: Option<RemoteStage>,
    remote_minimum: f64,
}

impl<'r> MatchEngine<'r> {
    /// Direct, category and semantic stages with the default minimums.
    pub fn new(registry: &'r AliasRegistry) -> Self {
        Self::standard(registry, StageMinimums::default())
    }

    pub fn with_minimums(registry: &'r AliasRegistry, minimums: StageMinimums) -> Result<Self, PolicyError> {
        minimums.validate()?;
        Ok(Self::standard(registry, minimums))
    }

    fn standard(registry: &'r AliasRegistry, minimums: StageMinimums) -> Self {
        Self {
            stages: vec![
                Stage {
                    strategy: Box::new(DirectStrategy),
                    minimum: minimums.direct,
                },
                Stage {
                    strategy: Box::new(CategoryStrategy::new(registry)),
                    minimum: minimums.category,
                },
                Stage {
                    strategy: Box::new(SemanticStrategy),
                    minimum: minimums.semantic,
                },
            ],
            remote: None,
            remote_minimum: minimums.remote,
        }
    }

    /// An engine with no local stages; add them with [`push_stage`](Self::push_stage).
    pub fn empty(remote_minimum: f64) -> Result<Self, PolicyError> {
        Ok(Self {
            stages: Vec::new(),
            remote: None,
            remote_minimum: check_unit("remote_min", remote_minimum)?,
        })
    }

    /// Append a local stage after the existing ones.
    pub fn push_stage(&mut self, strategy: BoxedStrategy<'r>, minimum: f64) -> Result<(), PolicyError> {
        let minimum = check_unit("stage minimum", minimum)?;
        self.stages.push(Stage { strategy, minimum });
        Ok(())
    }

    pub fn with_remote(mut self, source: BoxedSuggestionSource, timeout: Duration) -> Self {
        self.remote = Some(RemoteStage { source, timeout });
        self
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn stage_methods(&self) -> Vec<MatchMethod> {
        self.stages.iter().map(|stage| stage.strategy.method()).collect()
    }

    /// Run the local stages only. Synchronous and deterministic.
    pub fn match_local<'f>(&self, field: &'f FieldDescriptor, profile: &CanonicalProfile) -> MatchResult<'f> {
        if field.options.is_empty() {
            return MatchResult::no_match("field has no options");
        }
        for stage in &self.stages {
            let method = stage.strategy.method();
            if let Some(candidate) = stage.strategy.attempt(field, profile) {
                if candidate.confidence > stage.minimum {
                    return MatchResult::from_candidate(field, candidate, method);
                }
                tracing::debug!(
                    target: "fillkit::match",
                    field = %field.key(),
                    stage = method.as_str(),
                    confidence = candidate.confidence,
                    minimum = stage.minimum,
                    "candidate below stage minimum"
                );
            }
        }
        MatchResult::no_match("no stage cleared its minimum")
    }

    /// Full chain; the remote stage runs only when allowed, configured and
    /// every local stage came up short.
    pub async fn match_field<'f>(
        &self,
        field: &'f FieldDescriptor,
        profile: &CanonicalProfile,
        opts: MatchOptions,
    ) -> MatchResult<'f> {
        self.evaluate(field, profile, opts).await.result
    }

    pub async fn evaluate<'f>(
        &self,
        field: &'f FieldDescriptor,
        profile: &CanonicalProfile,
        opts: MatchOptions,
    ) -> Evaluation<'f> {
        let local = self.match_local(field, profile);
        if local.is_match() || field.options.is_empty() || !opts.allow_remote {
            return Evaluation {
                result: local,
                remote: RemoteStatus::NotAttempted,
            };
        }
        let Some(remote) = &self.remote else {
            return Evaluation {
                result: local,
                remote: RemoteStatus::NotAttempted,
            };
        };
        let (candidate, status) = remote.consult(field, profile).await;
        let result = match candidate {
            Some(candidate) if candidate.confidence > self.remote_minimum => {
                MatchResult::from_candidate(field, candidate, MatchMethod::Ai)
            }
            Some(candidate) => {
                tracing::debug!(
                    target: "fillkit::match",
                    field = %field.key(),
                    stage = "ai",
                    confidence = candidate.confidence,
                    minimum = self.remote_minimum,
                    "candidate below stage minimum"
                );
                local
            }
            None => local,
        };
        Evaluation {
            result,
            remote: status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Strategy;

    struct Fixed(MatchMethod, usize, f64);

    impl Strategy for Fixed {
        fn method(&self) -> MatchMethod {
            self.0
        }

        fn attempt(&self, _field: &FieldDescriptor, _profile: &CanonicalProfile) -> Option<Candidate> {
            Some(Candidate::new(self.1, self.2, "fixed"))
        }
    }

    fn empty_profile() -> CanonicalProfile {
        let as_of = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        fillkit_profile::ProfileNormalizer::new(as_of).normalize(&Default::default())
    }

    #[test]
    fn first_stage_above_minimum_wins() {
        let mut engine = MatchEngine::empty(0.3).expect("engine");
        engine.push_stage(Box::new(Fixed(MatchMethod::Direct, 0, 0.6)), 0.7).expect("stage");
        engine.push_stage(Box::new(Fixed(MatchMethod::Category, 1, 0.55)), 0.5).expect("stage");
        engine.push_stage(Box::new(Fixed(MatchMethod::Semantic, 0, 0.9)), 0.4).expect("stage");
        let field = FieldDescriptor::new("x").with_options(["a", "b"]);
        let result = engine.match_local(&field, &empty_profile());
        assert_eq!(result.method, MatchMethod::Category);
        assert_eq!(result.index(), Some(1));
        assert!(std::ptr::eq(result.option().expect("option"), &field.options[1]));
    }

    #[test]
    fn minimum_must_be_exceeded_not_met() {
        let mut engine = MatchEngine::empty(0.3).expect("engine");
        engine.push_stage(Box::new(Fixed(MatchMethod::Direct, 0, 0.7)), 0.7).expect("stage");
        let field = FieldDescriptor::new("x").with_options(["a"]);
        let result = engine.match_local(&field, &empty_profile());
        assert_eq!(result.method, MatchMethod::None);
        assert_eq!(result.confidence, 0.0);
        assert!(result.option().is_none());
    }

    #[test]
    fn out_of_range_index_is_no_match() {
        let mut engine = MatchEngine::empty(0.3).expect("engine");
        engine.push_stage(Box::new(Fixed(MatchMethod::Direct, 9, 0.99)), 0.7).expect("stage");
        let field = FieldDescriptor::new("x").with_options(["a"]);
        let result = engine.match_local(&field, &empty_profile());
        assert!(result.option().is_none());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn invalid_minimums_fail_fast() {
        let registry = AliasRegistry::builtin();
        let bad = StageMinimums {
            semantic: f64::NAN,
            ..StageMinimums::default()
        };
        assert!(matches!(
            MatchEngine::with_minimums(registry, bad),
            Err(PolicyError::OutOfRange { name: "semantic_min", .. })
        ));
        assert!(MatchEngine::empty(1.2).is_err());
    }

    #[test]
    fn standard_chain_order() {
        let engine = MatchEngine::new(AliasRegistry::builtin());
        assert_eq!(
            engine.stage_methods(),
            vec![MatchMethod::Direct, MatchMethod::Category, MatchMethod::Semantic]
        );
        assert!(!engine.has_remote());
    }
}
