//! One sequential fill pass over the fields of a page.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fillkit_aliases::AliasRegistry;
use fillkit_match::{suggest_value, BoxedSuggestionSource, Evaluation, MatchEngine, MatchOptions, PolicyError};
use fillkit_profile::CanonicalProfile;
use fillkit_protocol::{FieldDescriptor, FieldIssue, FieldOption, MatchMethod};
use fillkit_widget::{Control, WidgetConfig, WidgetKind, WidgetSession};
use serde::Serialize;

use crate::config::PassSettings;
use crate::policy::{Decision, FillPolicy};

/// Cooperative cancellation, checked between fields.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A detected field, plus the live control when its options have to be
/// discovered or selected through a widget.
pub struct FieldTask<'c> {
    pub descriptor: FieldDescriptor,
    pub control: Option<&'c dyn Control>,
}

impl<'c> FieldTask<'c> {
    pub fn new(descriptor: FieldDescriptor) -> Self {
        Self {
            descriptor,
            control: None,
        }
    }

    pub fn with_control(mut self, control: &'c dyn Control) -> Self {
        self.control = Some(control);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    /// Selected through the widget adapter.
    Applied,
    /// Resolved; the host applies it.
    Matched,
    NeedsConfirmation,
    Skipped,
    Failed,
    Cancelled,
}

impl FieldStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldStatus::Applied => "applied",
            FieldStatus::Matched => "matched",
            FieldStatus::NeedsConfirmation => "needs_confirmation",
            FieldStatus::Skipped => "skipped",
            FieldStatus::Failed => "failed",
            FieldStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, FieldStatus::Applied | FieldStatus::Matched)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldOutcome {
    pub field: String,
    pub label: String,
    pub status: FieldStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<FieldOption>,
    /// Text to type into a freeform field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub confidence: f64,
    pub method: MatchMethod,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<FieldIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<WidgetKind>,
}

impl FieldOutcome {
    fn pending(descriptor: &FieldDescriptor) -> Self {
        Self {
            field: descriptor.key(),
            label: descriptor.label.clone(),
            status: FieldStatus::Skipped,
            option_index: None,
            option: None,
            value: None,
            confidence: 0.0,
            method: MatchMethod::None,
            reasoning: String::new(),
            issues: Vec::new(),
            widget: None,
        }
    }

    fn cancelled(descriptor: &FieldDescriptor) -> Self {
        Self {
            status: FieldStatus::Cancelled,
            reasoning: "pass cancelled before this field".into(),
            ..Self::pending(descriptor)
        }
    }

    fn record(&mut self, evaluation: &Evaluation<'_>) {
        let result = &evaluation.result;
        self.option_index = result.index();
        self.option = result.option().cloned();
        self.confidence = result.confidence;
        self.method = result.method;
        self.reasoning = result.reasoning.clone();
        if evaluation.remote.is_degraded() {
            self.issues.push(FieldIssue::RemoteUnavailable);
        }
    }

    fn settle(&mut self, status: FieldStatus, issue: Option<FieldIssue>) {
        self.status = status;
        if let Some(issue) = issue {
            self.issues.push(issue);
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    ProfileEnhancement,
    DataQuality,
    EnableRemote,
    RemoteUnavailable,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PassSummary {
    pub total: usize,
    pub applied: usize,
    pub matched: usize,
    pub needs_confirmation: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Filled fields over fields that were attempted.
    pub fill_rate: f64,
    pub average_confidence: f64,
    pub methods: BTreeMap<String, usize>,
    pub issues: BTreeMap<String, usize>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PassReport {
    pub outcomes: Vec<FieldOutcome>,
    pub summary: PassSummary,
}

/// Fields listed by name in a recommendation.
const RECOMMENDATION_FIELDS: usize = 5;
const REMOTE_HINT_MIN_UNFILLED: usize = 3;

fn summarize(outcomes: &[FieldOutcome], remote_allowed: bool) -> PassSummary {
    let mut summary = PassSummary {
        total: outcomes.len(),
        ..PassSummary::default()
    };
    let mut filled_confidence = 0.0;
    for outcome in outcomes {
        match outcome.status {
            FieldStatus::Applied => summary.applied += 1,
            FieldStatus::Matched => summary.matched += 1,
            FieldStatus::NeedsConfirmation => summary.needs_confirmation += 1,
            FieldStatus::Skipped => summary.skipped += 1,
            FieldStatus::Failed => summary.failed += 1,
            FieldStatus::Cancelled => summary.cancelled += 1,
        }
        if outcome.status.is_filled() {
            filled_confidence += outcome.confidence;
        }
        if outcome.method != MatchMethod::None {
            *summary.methods.entry(outcome.method.as_str().to_string()).or_default() += 1;
        }
        for issue in &outcome.issues {
            *summary.issues.entry(issue.as_str().to_string()).or_default() += 1;
        }
    }

    let filled = summary.applied + summary.matched;
    let attempted = summary.total - summary.cancelled;
    if attempted > 0 {
        summary.fill_rate = filled as f64 / attempted as f64;
    }
    if filled > 0 {
        summary.average_confidence = filled_confidence / filled as f64;
    }

    let unfilled: Vec<&FieldOutcome> = outcomes
        .iter()
        .filter(|o| matches!(o.status, FieldStatus::Skipped | FieldStatus::Failed))
        .collect();
    if !unfilled.is_empty() {
        summary.recommendations.push(Recommendation {
            kind: RecommendationKind::ProfileEnhancement,
            message: format!(
                "Consider adding profile data to improve matching for {} unfilled fields",
                unfilled.len()
            ),
            fields: unfilled.iter().take(RECOMMENDATION_FIELDS).map(|o| o.field.clone()).collect(),
        });
    }
    let low: Vec<String> = outcomes
        .iter()
        .filter(|o| o.issues.contains(&FieldIssue::LowConfidence))
        .map(|o| o.field.clone())
        .collect();
    if !low.is_empty() {
        summary.recommendations.push(Recommendation {
            kind: RecommendationKind::DataQuality,
            message: format!("{} fields matched below the confidence threshold; review the profile data behind them", low.len()),
            fields: low.into_iter().take(RECOMMENDATION_FIELDS).collect(),
        });
    }
    if !remote_allowed && unfilled.len() >= REMOTE_HINT_MIN_UNFILLED {
        summary.recommendations.push(Recommendation {
            kind: RecommendationKind::EnableRemote,
            message: "Enable remote suggestions to help with fields the local strategies could not match".into(),
            fields: Vec::new(),
        });
    }
    if summary.issues.contains_key(FieldIssue::RemoteUnavailable.as_str()) {
        summary.recommendations.push(Recommendation {
            kind: RecommendationKind::RemoteUnavailable,
            message: "Remote suggestions were unavailable; affected fields used local matching only".into(),
            fields: Vec::new(),
        });
    }
    summary
}

/// Runs fields one after another: resolve options, match, apply the
/// confidence policy, and select through the widget adapter when a control
/// is attached. No field's failure stops the pass.
pub struct Orchestrator<'r> {
    engine: MatchEngine<'r>,
    policy: FillPolicy,
    options: MatchOptions,
    widget: WidgetConfig,
    cancel: CancelHandle,
}

impl<'r> Orchestrator<'r> {
    pub fn new(engine: MatchEngine<'r>, settings: &PassSettings) -> Self {
        Self {
            engine,
            policy: settings.policy,
            options: settings.options,
            widget: settings.widget.clone(),
            cancel: CancelHandle::new(),
        }
    }

    pub fn from_settings(registry: &'r AliasRegistry, settings: &PassSettings) -> Result<Self, PolicyError> {
        let engine = MatchEngine::with_minimums(registry, settings.minimums)?;
        Ok(Self::new(engine, settings))
    }

    pub fn with_remote(mut self, source: BoxedSuggestionSource, timeout: Duration) -> Self {
        self.engine = self.engine.with_remote(source, timeout);
        self
    }

    pub fn engine(&self) -> &MatchEngine<'r> {
        &self.engine
    }

    pub fn policy(&self) -> FillPolicy {
        self.policy
    }

    /// Handle that stops the pass before its next field.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub async fn run_pass(&self, profile: &CanonicalProfile, tasks: &[FieldTask<'_>]) -> PassReport {
        let mut outcomes = Vec::with_capacity(tasks.len());
        for task in tasks {
            if self.cancel.is_cancelled() {
                outcomes.push(FieldOutcome::cancelled(&task.descriptor));
                continue;
            }
            let outcome = match task.control {
                Some(control) => self.through_widget(profile, &task.descriptor, control).await,
                None if task.descriptor.options.is_empty() => self.freeform(profile, &task.descriptor),
                None => self.with_static_options(profile, &task.descriptor).await,
            };
            tracing::debug!(
                target: "fillkit::pass",
                field = %outcome.field,
                status = outcome.status.as_str(),
                method = outcome.method.as_str(),
                confidence = outcome.confidence,
                "field processed"
            );
            outcomes.push(outcome);
        }
        let summary = summarize(&outcomes, self.options.allow_remote);
        tracing::info!(
            target: "fillkit::pass",
            total = summary.total,
            applied = summary.applied,
            matched = summary.matched,
            needs_confirmation = summary.needs_confirmation,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            fill_rate = summary.fill_rate,
            "fill pass finished"
        );
        PassReport { outcomes, summary }
    }

    fn gate(&self, outcome: &mut FieldOutcome) -> Decision {
        let decision = self.policy.decide(outcome.confidence);
        match decision {
            Decision::Apply => {}
            Decision::Confirm => outcome.settle(FieldStatus::NeedsConfirmation, Some(FieldIssue::LowConfidence)),
            Decision::Skip => outcome.settle(FieldStatus::Skipped, Some(FieldIssue::LowConfidence)),
        }
        decision
    }

    fn freeform(&self, profile: &CanonicalProfile, descriptor: &FieldDescriptor) -> FieldOutcome {
        let mut outcome = FieldOutcome::pending(descriptor);
        let Some(suggestion) = suggest_value(descriptor, profile) else {
            outcome.reasoning = "no profile leaf referenced by the field".into();
            outcome.settle(FieldStatus::Skipped, Some(FieldIssue::NoMatch));
            return outcome;
        };
        outcome.confidence = suggestion.confidence;
        outcome.method = MatchMethod::Direct;
        outcome.reasoning = format!("{} = \"{}\"", suggestion.source_key, suggestion.value);
        outcome.value = Some(suggestion.value);
        if self.gate(&mut outcome) == Decision::Apply {
            outcome.settle(FieldStatus::Matched, None);
        }
        outcome
    }

    async fn with_static_options(&self, profile: &CanonicalProfile, descriptor: &FieldDescriptor) -> FieldOutcome {
        let mut outcome = FieldOutcome::pending(descriptor);
        let evaluation = self.engine.evaluate(descriptor, profile, self.options).await;
        outcome.record(&evaluation);
        if !evaluation.result.is_match() {
            outcome.settle(FieldStatus::Skipped, Some(FieldIssue::NoMatch));
            return outcome;
        }
        if self.gate(&mut outcome) == Decision::Apply {
            outcome.settle(FieldStatus::Matched, None);
        }
        outcome
    }

    async fn through_widget(
        &self,
        profile: &CanonicalProfile,
        descriptor: &FieldDescriptor,
        control: &dyn Control,
    ) -> FieldOutcome {
        let mut outcome = FieldOutcome::pending(descriptor);
        let mut session = WidgetSession::new(control, self.widget.clone());
        outcome.widget = Some(session.kind());

        let resolved: FieldDescriptor;
        let descriptor = if descriptor.options.is_empty() {
            if !session.open().await {
                return widget_failed(outcome, &session);
            }
            let options = session.enumerate().await;
            if options.is_empty() {
                if session.failure().is_some() {
                    return widget_failed(outcome, &session);
                }
                session.close().await;
                outcome.reasoning = "control rendered no options".into();
                outcome.settle(FieldStatus::Skipped, Some(FieldIssue::NoMatch));
                return outcome;
            }
            resolved = FieldDescriptor {
                options,
                ..descriptor.clone()
            };
            &resolved
        } else {
            descriptor
        };

        let evaluation = self.engine.evaluate(descriptor, profile, self.options).await;
        outcome.record(&evaluation);
        let Some((index, option)) = evaluation.result.index().zip(evaluation.result.option()) else {
            session.close().await;
            outcome.settle(FieldStatus::Skipped, Some(FieldIssue::NoMatch));
            return outcome;
        };
        if self.gate(&mut outcome) != Decision::Apply {
            session.close().await;
            return outcome;
        }
        if !session.open().await || !session.select_index(index, option).await {
            return widget_failed(outcome, &session);
        }
        outcome.settle(FieldStatus::Applied, None);
        outcome
    }
}

fn widget_failed(mut outcome: FieldOutcome, session: &WidgetSession<'_>) -> FieldOutcome {
    let issue = session
        .failure()
        .map(|failure| failure.issue())
        .unwrap_or(FieldIssue::AdapterUnsupportedShape);
    if let Some(failure) = session.failure() {
        outcome.reasoning = if outcome.reasoning.is_empty() {
            failure.to_string()
        } else {
            format!("{}; widget: {failure}", outcome.reasoning)
        };
    }
    outcome.settle(FieldStatus::Failed, Some(issue));
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(field: &str, status: FieldStatus, confidence: f64, issues: &[FieldIssue]) -> FieldOutcome {
        FieldOutcome {
            status,
            confidence,
            method: if status.is_filled() { MatchMethod::Direct } else { MatchMethod::None },
            issues: issues.to_vec(),
            ..FieldOutcome::pending(&FieldDescriptor::new(field))
        }
    }

    #[test]
    fn summary_counts_and_rates() {
        let outcomes = vec![
            outcome("a", FieldStatus::Applied, 0.9, &[]),
            outcome("b", FieldStatus::Matched, 0.7, &[]),
            outcome("c", FieldStatus::Skipped, 0.0, &[FieldIssue::NoMatch]),
            outcome("d", FieldStatus::Cancelled, 0.0, &[]),
        ];
        let summary = summarize(&outcomes, false);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.cancelled, 1);
        assert!((summary.fill_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((summary.average_confidence - 0.8).abs() < 1e-9);
        assert_eq!(summary.methods.get("direct"), Some(&2));
        assert_eq!(summary.issues.get("no_match"), Some(&1));
        assert_eq!(summary.recommendations.len(), 1);
        assert_eq!(summary.recommendations[0].kind, RecommendationKind::ProfileEnhancement);
        assert_eq!(summary.recommendations[0].fields, vec!["c".to_string()]);
    }

    #[test]
    fn recommendations_cover_low_confidence_and_remote() {
        let outcomes = vec![
            outcome("a", FieldStatus::NeedsConfirmation, 0.6, &[FieldIssue::LowConfidence]),
            outcome("b", FieldStatus::Skipped, 0.0, &[FieldIssue::NoMatch, FieldIssue::RemoteUnavailable]),
            outcome("c", FieldStatus::Failed, 0.0, &[FieldIssue::AdapterTimeout]),
            outcome("d", FieldStatus::Skipped, 0.0, &[FieldIssue::NoMatch]),
        ];
        let kinds: Vec<_> = summarize(&outcomes, false).recommendations.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecommendationKind::ProfileEnhancement,
                RecommendationKind::DataQuality,
                RecommendationKind::EnableRemote,
                RecommendationKind::RemoteUnavailable,
            ]
        );
        let with_remote: Vec<_> = summarize(&outcomes, true).recommendations.iter().map(|r| r.kind).collect();
        assert!(!with_remote.contains(&RecommendationKind::EnableRemote));
    }

    #[test]
    fn empty_pass_summary() {
        let summary = summarize(&[], false);
        assert_eq!(summary.fill_rate, 0.0);
        assert_eq!(summary.average_confidence, 0.0);
        assert!(summary.recommendations.is_empty());
    }

    #[test]
    fn cancel_handle_is_shared() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_cancelled());
        clone.cancel();
        assert!(handle.is_cancelled());
    }
}
