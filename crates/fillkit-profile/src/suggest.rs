use fillkit_aliases::{AliasCategory, AliasRegistry};
use serde::Serialize;

use crate::normalize::CanonicalProfile;

/// One hint for making a profile easier to match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSuggestion {
    pub id: String,
    pub leaf: String,
    pub message: String,
    pub confidence: f64,
}

/// Leaves forms ask for often enough that leaving them out costs matches.
const COMMONLY_REQUESTED: &[&str] = &[
    "identity.gender",
    "identity.maritalStatus",
    "education.educationLevel",
    "employment.employmentStatus",
];

/// Evaluate a normalized profile and return improvement hints: values the
/// alias tables cannot place, then commonly requested leaves that are empty.
pub fn suggest_improvements(profile: &CanonicalProfile, registry: &AliasRegistry) -> Vec<ProfileSuggestion> {
    let mut out = Vec::new();

    if let Some(country) = profile.text("address.country") {
        let mut hits = registry.resolve(AliasCategory::Country, &country);
        if hits.is_empty() {
            hits = registry.resolve_in_text(AliasCategory::Country, &country);
        }
        if hits.is_empty() {
            out.push(ProfileSuggestion {
                id: "format-address.country".into(),
                leaf: "address.country".into(),
                message: format!(
                    "Country \"{country}\" is not recognized; use the full name or ISO code (e.g. \"United States\" or \"US\")"
                ),
                confidence: 0.7,
            });
        }
    }

    if let Some(state) = profile.text("address.state") {
        let country = profile.text("address.country");
        if registry.resolve_region(&state, country.as_deref()).is_empty() {
            out.push(ProfileSuggestion {
                id: "format-address.state".into(),
                leaf: "address.state".into(),
                message: format!(
                    "State \"{state}\" is not recognized; use the full name or standard abbreviation (e.g. \"California\" or \"CA\")"
                ),
                confidence: 0.6,
            });
        }
    }

    for path in COMMONLY_REQUESTED {
        if !profile.leaf(path).is_present() {
            out.push(ProfileSuggestion {
                id: format!("missing-{path}"),
                leaf: (*path).to_string(),
                message: format!("Consider adding {path} to improve form filling accuracy"),
                confidence: 0.5,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProfileNormalizer, RawProfile};
    use chrono::NaiveDate;
    use serde_json::json;

    fn profile(value: serde_json::Value) -> CanonicalProfile {
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        ProfileNormalizer::new(as_of).normalize(&RawProfile::from(value))
    }

    #[test]
    fn unknown_country_and_state_are_flagged() {
        let p = profile(json!({
            "country": "Atlantis",
            "state": "Sunken Coast",
            "gender": "female",
            "maritalStatus": "single",
            "educationLevel": "PhD",
            "employmentStatus": "employed"
        }));
        let ids: Vec<String> = suggest_improvements(&p, AliasRegistry::builtin())
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["format-address.country", "format-address.state"]);
    }

    #[test]
    fn complete_profile_gets_no_hints() {
        let p = profile(json!({
            "country": "USA",
            "state": "California",
            "gender": "male",
            "maritalStatus": "married",
            "educationLevel": "Bachelor's",
            "employmentStatus": "full-time"
        }));
        assert!(suggest_improvements(&p, AliasRegistry::builtin()).is_empty());
    }

    #[test]
    fn missing_common_leaves_are_listed_in_order() {
        let p = profile(json!({"firstName": "Alex"}));
        let leaves: Vec<String> = suggest_improvements(&p, AliasRegistry::builtin())
            .into_iter()
            .map(|s| s.leaf)
            .collect();
        assert_eq!(leaves, COMMONLY_REQUESTED.iter().map(|p| p.to_string()).collect::<Vec<_>>());
    }
}
