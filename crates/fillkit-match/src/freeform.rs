use fillkit_profile::{CanonicalProfile, LeafValue};
use fillkit_protocol::FieldDescriptor;
use serde::Serialize;

use crate::strategy::referenced_leaves;

/// Value to type into a field that has no options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueSuggestion {
    pub value: String,
    pub confidence: f64,
    /// Profile leaf the value came from.
    pub source_key: String,
}

/// Resolve a freeform field to the most trusted profile leaf its label names.
pub fn suggest_value(field: &FieldDescriptor, profile: &CanonicalProfile) -> Option<ValueSuggestion> {
    let mut best: Option<ValueSuggestion> = None;
    for path in referenced_leaves(field) {
        let leaf = profile.leaf(&path);
        if !leaf.is_present() || matches!(leaf.value, LeafValue::Bool(_)) {
            continue;
        }
        let Some(value) = leaf.value.render() else {
            continue;
        };
        if best.as_ref().is_some_and(|b| b.confidence >= leaf.confidence) {
            continue;
        }
        best = Some(ValueSuggestion {
            value,
            confidence: leaf.confidence,
            source_key: path,
        });
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fillkit_profile::{ProfileNormalizer, RawProfile};
    use serde_json::json;

    fn profile(value: serde_json::Value) -> CanonicalProfile {
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).expect("date");
        ProfileNormalizer::new(as_of).normalize(&RawProfile::from(value))
    }

    #[test]
    fn email_field_gets_profile_email() {
        let field = FieldDescriptor::new("Email address").with_kind("email");
        let suggestion = suggest_value(&field, &profile(json!({"email": "sam@example.com"}))).expect("value");
        assert_eq!(suggestion.value, "sam@example.com");
        assert_eq!(suggestion.confidence, 1.0);
        assert_eq!(suggestion.source_key, "contact.email");
    }

    #[test]
    fn most_trusted_leaf_wins() {
        let field = FieldDescriptor::new("").with_name("full_name");
        let suggestion = suggest_value(&field, &profile(json!({"firstName": "Ada", "lastName": "Byron"})))
            .expect("value");
        assert_eq!(suggestion.value, "Ada Byron");
        assert_eq!(suggestion.source_key, "identity.fullName");
    }

    #[test]
    fn unknown_label_suggests_nothing() {
        let field = FieldDescriptor::new("Favourite colour").with_kind("text");
        assert!(suggest_value(&field, &profile(json!({"email": "a@b.c"}))).is_none());
    }
}
