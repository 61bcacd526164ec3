use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:-{2,}|\.{3}|(?:please\s+)?(?:select|choose|pick)\b|none selected\b)")
        .expect("placeholder regex")
});

/// One selectable entry of a dropdown, radio group or listbox, in rendering order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default, JsonSchema)]
pub struct FieldOption {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, alias = "checked")]
    pub selected: bool,
}

impl FieldOption {
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
            disabled: false,
            selected: false,
        }
    }

    /// Option whose submitted value equals its visible text.
    pub fn labelled(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(text.clone(), text)
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Prompt entries such as "Select...", "-- Choose --" or a blank first row.
    pub fn is_placeholder(&self) -> bool {
        let text = self.text.trim();
        if text.is_empty() {
            return self.value.trim().is_empty();
        }
        PLACEHOLDER_RE.is_match(text)
    }

    /// Whether a matcher may pick this option at all.
    pub fn is_selectable(&self) -> bool {
        !self.disabled && !self.is_placeholder()
    }
}

/// Surface description of a form control, as supplied by field discovery.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default, JsonSchema)]
pub struct FieldDescriptor {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default, alias = "ariaLabel")]
    pub aria_label: String,
    /// Control type as reported by the page (`select`, `radio`, `checkbox`, `text`, ...).
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Empty when the options are only discoverable by opening the widget.
    #[serde(default)]
    pub options: Vec<FieldOption>,
}

impl FieldDescriptor {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_options<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = texts.into_iter().map(FieldOption::labelled).collect();
        self
    }

    /// Stable identifier for reports: id, then name, then label.
    pub fn key(&self) -> String {
        [&self.id, &self.name, &self.label]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("field")
            .to_string()
    }

    /// Lowercased text a human would read to understand the field: label,
    /// ARIA label and placeholder, plus the name and id split into words.
    pub fn context_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for text in [&self.label, &self.aria_label, &self.placeholder] {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_lowercase());
            }
        }
        for ident in [&self.name, &self.id] {
            let words = humanize_identifier(ident);
            if !words.is_empty() && !parts.contains(&words) {
                parts.push(words);
            }
        }
        parts.join(" ")
    }

    pub fn is_freeform(&self) -> bool {
        self.options.is_empty()
            && matches!(
                self.kind.to_ascii_lowercase().as_str(),
                "text" | "email" | "tel" | "url" | "number" | "date" | "textarea" | "search"
            )
    }
}

/// `firstName`, `first_name` and `first-name` all become `first name`.
pub fn humanize_identifier(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    let mut prev_lower = false;
    for ch in ident.chars() {
        if ch == '_' || ch == '-' || ch == '.' || ch == '[' || ch == ']' || ch.is_whitespace() {
            out.push(' ');
            prev_lower = false;
        } else if ch.is_uppercase() && prev_lower {
            out.push(' ');
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            out.extend(ch.to_lowercase());
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stage of the strategy chain that produced a result.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Direct,
    Category,
    Semantic,
    Ai,
    #[default]
    None,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Direct => "direct",
            MatchMethod::Category => "category",
            MatchMethod::Semantic => "semantic",
            MatchMethod::Ai => "ai",
            MatchMethod::None => "none",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            MatchMethod::Direct => "Direct",
            MatchMethod::Category => "Category",
            MatchMethod::Semantic => "Semantic",
            MatchMethod::Ai => "AI suggestion",
            MatchMethod::None => "None",
        }
    }

    pub fn from_slug(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "direct" => MatchMethod::Direct,
            "category" => MatchMethod::Category,
            "semantic" => MatchMethod::Semantic,
            "ai" | "remote" => MatchMethod::Ai,
            _ => MatchMethod::None,
        }
    }
}

/// Per-field problem kinds. None of these abort a pass.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldIssue {
    NoMatch,
    LowConfidence,
    AdapterTimeout,
    AdapterUnsupportedShape,
    RemoteUnavailable,
}

impl FieldIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldIssue::NoMatch => "no_match",
            FieldIssue::LowConfidence => "low_confidence",
            FieldIssue::AdapterTimeout => "adapter_timeout",
            FieldIssue::AdapterUnsupportedShape => "adapter_unsupported_shape",
            FieldIssue::RemoteUnavailable => "remote_unavailable",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            FieldIssue::NoMatch => "No match",
            FieldIssue::LowConfidence => "Low confidence",
            FieldIssue::AdapterTimeout => "Widget timed out",
            FieldIssue::AdapterUnsupportedShape => "Unsupported widget",
            FieldIssue::RemoteUnavailable => "Suggestions unavailable",
        }
    }
}

// -------- Remote suggestion wire format --------

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct SuggestionOption {
    pub text: String,
    pub value: String,
}

/// Request sent to the remote suggestion collaborator.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub field_context: String,
    pub options: Vec<SuggestionOption>,
    /// Flat `section.key -> value` view of the canonical profile.
    pub profile_snapshot: BTreeMap<String, String>,
}

impl SuggestionRequest {
    pub fn new(
        field: &FieldDescriptor,
        profile_snapshot: BTreeMap<String, String>,
    ) -> Self {
        Self {
            field_context: field.context_text(),
            options: field
                .options
                .iter()
                .map(|opt| SuggestionOption {
                    text: opt.text.clone(),
                    value: opt.value.clone(),
                })
                .collect(),
            profile_snapshot,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub option_index: u32,
    #[schemars(range(min = 0.0, max = 1.0))]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, JsonSchema)]
pub struct SuggestionResponse {
    pub suggestions: Vec<Suggestion>,
}

/// JSON schema every remote response must satisfy before it is used.
///
/// # Panics
///
/// Panics if schema generation fails; this indicates a programming error.
pub fn suggestion_response_schema() -> serde_json::Value {
    let schema = schemars::schema_for!(SuggestionResponse);
    serde_json::to_value(&schema).expect("schema json")
}
