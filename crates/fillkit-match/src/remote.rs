//! Optional remote suggestion collaborator. Its answers are untrusted: every
//! response is checked against the generated schema and the field's option
//! count before use, and any failure degrades to "no suggestion".

use std::time::Duration;

use async_trait::async_trait;
use fillkit_profile::CanonicalProfile;
use fillkit_protocol::{suggestion_response_schema, FieldDescriptor, SuggestionRequest, SuggestionResponse};
use jsonschema::{validator_for, Validator};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

use crate::strategy::{best_candidate, Candidate};

#[derive(thiserror::Error, Debug)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("collaborator answered with status {0}")]
    Status(u16),
    #[error("no answer within {0} ms")]
    Timeout(u64),
    #[error("invalid response: {0}")]
    Invalid(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

/// Anything that can answer a [`SuggestionRequest`] with raw JSON.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Value, RemoteError>;
}

pub type BoxedSuggestionSource = Box<dyn SuggestionSource>;

static RESPONSE_SCHEMA: Lazy<Validator> = Lazy::new(|| {
    let schema_value = suggestion_response_schema();
    validator_for(&schema_value).expect("valid suggestion schema")
});

/// Check a raw payload against the response schema, then make sure every
/// suggestion points at an existing option with a finite confidence in `[0, 1]`.
pub fn validate_response(raw: &Value, option_count: usize) -> Result<SuggestionResponse, RemoteError> {
    let schema_errors: Vec<_> = RESPONSE_SCHEMA
        .iter_errors(raw)
        .map(|err| format!("{}: {}", err.instance_path, err))
        .collect();
    if !schema_errors.is_empty() {
        return Err(RemoteError::Invalid(schema_errors.join("; ")));
    }
    let response: SuggestionResponse =
        serde_json::from_value(raw.clone()).map_err(|err| RemoteError::Invalid(err.to_string()))?;
    for (idx, suggestion) in response.suggestions.iter().enumerate() {
        if suggestion.option_index as usize >= option_count {
            return Err(RemoteError::Invalid(format!(
                "suggestions[{idx}].optionIndex {} is out of range for {option_count} options",
                suggestion.option_index
            )));
        }
        if !suggestion.confidence.is_finite() || !(0.0..=1.0).contains(&suggestion.confidence) {
            return Err(RemoteError::Invalid(format!(
                "suggestions[{idx}].confidence {} is outside [0, 1]",
                suggestion.confidence
            )));
        }
    }
    Ok(response)
}

/// What happened to the remote stage during one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RemoteStatus {
    #[default]
    NotAttempted,
    Answered,
    NoSuggestion,
    Unavailable(String),
}

impl RemoteStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, RemoteStatus::Unavailable(_))
    }
}

/// JSON-over-HTTP suggestion source.
pub struct HttpSuggestionSource {
    client: reqwest::Client,
    endpoint: String,
    bearer: Option<String>,
    timeout: Duration,
}

impl HttpSuggestionSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, bearer: Option<String>) -> Result<Self, RemoteError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(RemoteError::NotConfigured("empty endpoint".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RemoteError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            bearer: bearer.filter(|token| !token.trim().is_empty()),
            timeout,
        })
    }

    /// Like [`new`](Self::new), reading the bearer token from the environment
    /// variable named `api_key_env`.
    pub fn from_env(endpoint: impl Into<String>, timeout: Duration, api_key_env: Option<&str>) -> Result<Self, RemoteError> {
        let bearer = api_key_env.and_then(|name| std::env::var(name).ok());
        Self::new(endpoint, timeout, bearer)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SuggestionSource for HttpSuggestionSource {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Value, RemoteError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                RemoteError::Timeout(self.timeout.as_millis() as u64)
            } else {
                RemoteError::Transport(err.to_string())
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        response
            .json::<Value>()
            .await
            .map_err(|err| RemoteError::Invalid(err.to_string()))
    }
}

/// The remote stage of an engine: a source plus the bound on waiting for it.
pub(crate) struct RemoteStage {
    pub(crate) source: BoxedSuggestionSource,
    pub(crate) timeout: Duration,
}

impl RemoteStage {
    pub(crate) async fn consult(&self, field: &FieldDescriptor, profile: &CanonicalProfile) -> (Option<Candidate>, RemoteStatus) {
        let request = SuggestionRequest::new(field, profile.flat_view());
        let raw = match tokio::time::timeout(self.timeout, self.source.suggest(&request)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => return unavailable(field, err),
            Err(_) => return unavailable(field, RemoteError::Timeout(self.timeout.as_millis() as u64)),
        };
        let response = match validate_response(&raw, field.options.len()) {
            Ok(response) => response,
            Err(err) => return unavailable(field, err),
        };
        let candidates = response.suggestions.into_iter().filter_map(|suggestion| {
            let index = suggestion.option_index as usize;
            let option = field.options.get(index)?;
            if !option.is_selectable() {
                return None;
            }
            let reasoning = if suggestion.reasoning.trim().is_empty() {
                format!("remote suggestion for option \"{}\"", option.text)
            } else {
                format!("remote: {}", suggestion.reasoning.trim())
            };
            Some(Candidate::new(index, suggestion.confidence, reasoning))
        });
        match best_candidate(candidates, &field.options) {
            Some(candidate) => (Some(candidate), RemoteStatus::Answered),
            None => (None, RemoteStatus::NoSuggestion),
        }
    }
}

fn unavailable(field: &FieldDescriptor, err: RemoteError) -> (Option<Candidate>, RemoteStatus) {
    tracing::warn!(
        target: "fillkit::remote",
        field = %field.key(),
        error = %err,
        "remote suggestion unavailable; continuing with local result"
    );
    (None, RemoteStatus::Unavailable(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_well_formed_response() {
        let raw = json!({"suggestions": [{"optionIndex": 1, "confidence": 0.7, "reasoning": "job title"}]});
        let response = validate_response(&raw, 2).expect("valid");
        assert_eq!(response.suggestions[0].option_index, 1);
    }

    #[test]
    fn rejects_schema_violations() {
        for raw in [
            json!({"suggestions": [{"optionIndex": "one", "confidence": 0.7}]}),
            json!({"suggestions": [{"confidence": 0.7}]}),
            json!({"suggestions": [{"optionIndex": -1, "confidence": 0.7}]}),
            json!({"suggestions": [{"optionIndex": 0, "confidence": 1.5}]}),
            json!({"answer": "Technology"}),
            json!("Technology"),
        ] {
            assert!(
                matches!(validate_response(&raw, 3), Err(RemoteError::Invalid(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_out_of_range_index() {
        let raw = json!({"suggestions": [{"optionIndex": 5, "confidence": 0.9}]});
        let err = validate_response(&raw, 2).expect_err("out of range");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn empty_endpoint_is_not_configured() {
        let err = HttpSuggestionSource::new(" ", Duration::from_millis(100), None).err();
        assert!(matches!(err, Some(RemoteError::NotConfigured(_))));
    }
}
