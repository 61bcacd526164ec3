use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use fillkit_aliases::AliasRegistry;
use fillkit_match::{
    HttpSuggestionSource, MatchEngine, MatchOptions, RemoteError, RemoteStatus, SuggestionSource,
};
use fillkit_profile::{CanonicalProfile, ProfileNormalizer, RawProfile};
use fillkit_protocol::{FieldDescriptor, MatchMethod, SuggestionRequest};
use serde_json::{json, Value};

fn profile(value: Value) -> CanonicalProfile {
    let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).expect("date");
    ProfileNormalizer::new(as_of).normalize(&RawProfile::from(value))
}

fn engine() -> MatchEngine<'static> {
    MatchEngine::new(AliasRegistry::builtin())
}

const LOCAL_ONLY: MatchOptions = MatchOptions { allow_remote: false };
const WITH_REMOTE: MatchOptions = MatchOptions { allow_remote: true };

/// Answers every request with a fixed payload and counts calls.
struct CannedSource {
    calls: Arc<AtomicUsize>,
    payload: Value,
    delay: Duration,
}

impl CannedSource {
    fn new(payload: Value) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Self {
            calls: calls.clone(),
            payload,
            delay: Duration::ZERO,
        };
        (source, calls)
    }
}

#[async_trait]
impl SuggestionSource for CannedSource {
    async fn suggest(&self, _request: &SuggestionRequest) -> Result<Value, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.payload.clone())
    }
}

#[tokio::test]
async fn country_code_picks_matching_option() {
    let field = FieldDescriptor::new("Country").with_options(["USA", "CAN", "GBR"]);
    let result = engine()
        .match_field(&field, &profile(json!({"country": "USA"})), LOCAL_ONLY)
        .await;
    assert_eq!(result.option().map(|o| o.text.as_str()), Some("USA"));
    assert!(result.confidence >= 0.85, "confidence {}", result.confidence);
    assert!(matches!(result.method, MatchMethod::Direct | MatchMethod::Category));
}

#[tokio::test]
async fn state_code_picks_matching_option() {
    let field = FieldDescriptor::new("State").with_options(["CA", "NY", "TX"]);
    let result = engine()
        .match_field(&field, &profile(json!({"state": "NY", "country": "US"})), LOCAL_ONLY)
        .await;
    assert_eq!(result.option().map(|o| o.text.as_str()), Some("NY"));
    assert!(result.confidence >= 0.85, "confidence {}", result.confidence);
}

#[tokio::test]
async fn state_name_resolves_to_code_option() {
    let field = FieldDescriptor::new("State").with_options(["CA", "NY", "TX"]);
    let result = engine()
        .match_field(&field, &profile(json!({"state": "New York", "country": "US"})), LOCAL_ONLY)
        .await;
    assert_eq!(result.option().map(|o| o.text.as_str()), Some("NY"));
    assert_eq!(result.method, MatchMethod::Category);
}

#[tokio::test]
async fn newsletter_consent_answers_yes() {
    let field = FieldDescriptor::new("Subscribe to newsletter?").with_options(["Yes", "No"]);
    let result = engine()
        .match_field(&field, &profile(json!({"preferences": {"newsletter": true}})), LOCAL_ONLY)
        .await;
    assert_eq!(result.option().map(|o| o.text.as_str()), Some("Yes"));
    assert!(result.confidence >= 0.7, "confidence {}", result.confidence);
    assert_eq!(result.method, MatchMethod::Category);
}

#[tokio::test]
async fn industry_subcategories_match_in_both_directions() {
    let field = FieldDescriptor::new("Industry").with_options(["Technology", "Healthcare"]);
    for (value, expected) in [("Data Science", "Technology"), ("Nursing", "Healthcare")] {
        let result = engine()
            .match_field(&field, &profile(json!({"industry": value})), LOCAL_ONLY)
            .await;
        assert_eq!(result.option().map(|o| o.text.as_str()), Some(expected), "{value}: {}", result.reasoning);
        assert_eq!(result.method, MatchMethod::Category);
    }

    let field = FieldDescriptor::new("Industry").with_options(["Cybersecurity", "Nursing"]);
    let result = engine()
        .match_field(&field, &profile(json!({"industry": "Technology"})), LOCAL_ONLY)
        .await;
    assert_eq!(result.option().map(|o| o.text.as_str()), Some("Cybersecurity"));
    assert_eq!(result.method, MatchMethod::Category);
}

#[tokio::test]
async fn missing_industry_is_no_match() {
    let field = FieldDescriptor::new("Industry").with_options(["Technology", "Healthcare"]);
    let raw = json!({"firstName": "Sam", "lastName": "Lee", "jobTitle": "Technology lead"});
    let result = engine().match_field(&field, &profile(raw), LOCAL_ONLY).await;
    assert!(result.option().is_none());
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.method, MatchMethod::None);
}

#[tokio::test]
async fn years_of_experience_land_in_range() {
    let options = ["Entry (0-2)", "Mid (3-5)", "Senior (6-10)"];
    let raw = profile(json!({"yearsOfExperience": 8}));
    for label in ["Years of experience", "Experience level", ""] {
        let field = FieldDescriptor::new(label).with_options(options);
        let result = engine().match_field(&field, &raw, LOCAL_ONLY).await;
        assert_eq!(
            result.option().map(|o| o.text.as_str()),
            Some("Senior (6-10)"),
            "label {label:?}: {}",
            result.reasoning
        );
    }
}

#[test]
fn repeated_matching_is_identical() {
    let engine = engine();
    let raw = json!({"name": "Ada Byron", "country": "United Kingdom", "yearsOfExperience": 4, "income": 72000});
    let fields = [
        FieldDescriptor::new("Country").with_options(["France", "United Kingdom", "UK"]),
        FieldDescriptor::new("Annual income").with_options(["Under $50k", "$50k-$100k", "$100k+"]),
        FieldDescriptor::new("Experience").with_options(["0-2 years", "3-5 years", "6+ years"]),
        FieldDescriptor::new("Favourite colour").with_options(["Red", "Blue"]),
    ];
    for field in &fields {
        let first = serde_json::to_string(&engine.match_local(field, &profile(raw.clone()))).expect("json");
        for _ in 0..5 {
            let again = serde_json::to_string(&engine.match_local(field, &profile(raw.clone()))).expect("json");
            assert_eq!(first, again);
        }
    }
}

#[test]
fn alias_match_outscores_semantic_fallback() {
    let engine = engine();
    let canonical = profile(json!({"country": "USA"}));
    let options = ["Canada", "United States"];
    let categorized = FieldDescriptor::new("Country").with_options(options);
    let uncategorized = FieldDescriptor::new("Favourite place").with_options(options);

    let alias = engine.match_local(&categorized, &canonical);
    let fallback = engine.match_local(&uncategorized, &canonical);
    assert_eq!(alias.method, MatchMethod::Category);
    assert_eq!(alias.option().map(|o| o.text.as_str()), Some("United States"));
    assert!(alias.confidence >= fallback.confidence);
}

#[test]
fn chosen_option_is_an_element_of_the_field() {
    let engine = engine();
    let canonical = profile(json!({"country": "Canada", "gender": "female", "educationLevel": "Master's degree"}));
    let fields = [
        FieldDescriptor::new("Country").with_options(["Select...", "United States", "Canada"]),
        FieldDescriptor::new("Gender").with_options(["Male", "Female", "Other"]),
        FieldDescriptor::new("Highest education").with_options(["High school", "Bachelor's degree", "Master's degree"]),
    ];
    for field in &fields {
        let result = engine.match_local(field, &canonical);
        let chosen = result.option().expect("match");
        let index = result.index().expect("index");
        assert!(std::ptr::eq(chosen, &field.options[index]));
        assert!(field.options.iter().any(|o| std::ptr::eq(o, chosen)));
    }
}

#[tokio::test]
async fn remote_is_never_called_when_disallowed() {
    let (source, calls) = CannedSource::new(json!({"suggestions": [{"optionIndex": 0, "confidence": 0.9}]}));
    let engine = engine().with_remote(Box::new(source), Duration::from_millis(200));
    let field = FieldDescriptor::new("Team size").with_options(["1-10", "11-50"]);
    let evaluation = engine.evaluate(&field, &profile(json!({})), LOCAL_ONLY).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(evaluation.remote, RemoteStatus::NotAttempted);
    assert!(evaluation.result.option().is_none());
}

#[tokio::test]
async fn remote_is_skipped_when_a_local_stage_answers() {
    let (source, calls) = CannedSource::new(json!({"suggestions": [{"optionIndex": 0, "confidence": 0.9}]}));
    let engine = engine().with_remote(Box::new(source), Duration::from_millis(200));
    let field = FieldDescriptor::new("Country").with_options(["USA", "CAN"]);
    let result = engine
        .match_field(&field, &profile(json!({"country": "Canada"})), WITH_REMOTE)
        .await;
    assert_eq!(result.option().map(|o| o.text.as_str()), Some("CAN"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn remote_answers_when_local_stages_come_up_short() {
    let payload = json!({"suggestions": [
        {"optionIndex": 0, "confidence": 0.4, "reasoning": "weak"},
        {"optionIndex": 1, "confidence": 0.65, "reasoning": "small teams"}
    ]});
    let (source, calls) = CannedSource::new(payload);
    let engine = engine().with_remote(Box::new(source), Duration::from_millis(200));
    let field = FieldDescriptor::new("Team size").with_options(["1-10", "11-50"]);
    let evaluation = engine.evaluate(&field, &profile(json!({})), WITH_REMOTE).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(evaluation.remote, RemoteStatus::Answered);
    assert_eq!(evaluation.result.method, MatchMethod::Ai);
    assert_eq!(evaluation.result.index(), Some(1));
    assert!(std::ptr::eq(evaluation.result.option().expect("option"), &field.options[1]));
}

#[tokio::test]
async fn weak_remote_answer_is_ignored() {
    let (source, _calls) = CannedSource::new(json!({"suggestions": [{"optionIndex": 0, "confidence": 0.2}]}));
    let engine = engine().with_remote(Box::new(source), Duration::from_millis(200));
    let field = FieldDescriptor::new("Team size").with_options(["1-10", "11-50"]);
    let evaluation = engine.evaluate(&field, &profile(json!({})), WITH_REMOTE).await;
    assert_eq!(evaluation.remote, RemoteStatus::Answered);
    assert!(evaluation.result.option().is_none());
}

#[tokio::test]
async fn slow_remote_degrades_to_no_match() {
    let (mut source, calls) = CannedSource::new(json!({"suggestions": [{"optionIndex": 0, "confidence": 0.9}]}));
    source.delay = Duration::from_secs(5);
    let engine = engine().with_remote(Box::new(source), Duration::from_millis(50));
    let field = FieldDescriptor::new("Team size").with_options(["1-10", "11-50"]);
    let evaluation = tokio::time::timeout(
        Duration::from_secs(2),
        engine.evaluate(&field, &profile(json!({})), WITH_REMOTE),
    )
    .await
    .expect("bounded by the remote timeout");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(evaluation.remote.is_degraded());
    assert!(evaluation.result.option().is_none());
    assert_eq!(evaluation.result.confidence, 0.0);
}

#[tokio::test]
async fn malformed_remote_payload_degrades_to_no_match() {
    for payload in [
        json!({"suggestions": [{"optionIndex": 7, "confidence": 0.9}]}),
        json!({"suggestions": [{"optionIndex": 0, "confidence": "high"}]}),
        json!(["11-50"]),
    ] {
        let (source, _calls) = CannedSource::new(payload.clone());
        let engine = engine().with_remote(Box::new(source), Duration::from_millis(200));
        let field = FieldDescriptor::new("Team size").with_options(["1-10", "11-50"]);
        let evaluation = engine.evaluate(&field, &profile(json!({})), WITH_REMOTE).await;
        assert!(evaluation.remote.is_degraded(), "{payload} should degrade");
        assert!(evaluation.result.option().is_none());
    }
}

#[tokio::test]
async fn http_source_posts_request_and_reads_suggestions() {
    use httpmock::prelude::*;

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/suggest")
                .header("authorization", "Bearer secret")
                .json_body_partial(r#"{"fieldContext": "Team size"}"#);
            then.status(200)
                .json_body(json!({"suggestions": [{"optionIndex": 1, "confidence": 0.7}]}));
        })
        .await;

    let source = HttpSuggestionSource::new(server.url("/suggest"), Duration::from_secs(2), Some("secret".into()))
        .expect("source");
    let engine = engine().with_remote(Box::new(source), Duration::from_secs(2));
    let field = FieldDescriptor::new("Team size").with_options(["1-10", "11-50"]);
    let result = engine.match_field(&field, &profile(json!({})), WITH_REMOTE).await;
    mock.assert_async().await;
    assert_eq!(result.method, MatchMethod::Ai);
    assert_eq!(result.option().map(|o| o.text.as_str()), Some("11-50"));
}

#[tokio::test]
async fn http_error_status_degrades() {
    use httpmock::prelude::*;

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/suggest");
            then.status(503);
        })
        .await;
    let source = HttpSuggestionSource::new(server.url("/suggest"), Duration::from_secs(2), None).expect("source");
    let engine = engine().with_remote(Box::new(source), Duration::from_secs(2));
    let field = FieldDescriptor::new("Team size").with_options(["1-10", "11-50"]);
    let evaluation = engine.evaluate(&field, &profile(json!({})), WITH_REMOTE).await;
    assert_eq!(evaluation.remote, RemoteStatus::Unavailable("collaborator answered with status 503".into()));
    assert!(evaluation.result.option().is_none());
}
