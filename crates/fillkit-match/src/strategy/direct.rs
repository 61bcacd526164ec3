use fillkit_profile::catalog::LEAF_SPECS;
use fillkit_profile::{CanonicalProfile, Leaf, LeafValue};
use fillkit_protocol::{humanize_identifier, FieldDescriptor, MatchMethod};

use super::{best_candidate, selectable, Candidate, Context, Strategy};
use crate::similarity::text_similarity;

/// Curated label phrases for a leaf, on top of its humanized key.
struct DirectRule {
    leaf: &'static str,
    patterns: &'static [&'static str],
    excludes: &'static [&'static str],
}

const NAME_PARTS: &[&str] = &[
    "first", "last", "middle", "given", "family", "company", "user", "username", "business",
    "preferred", "nick", "school", "maiden", "file", "display",
];

const DIRECT_RULES: &[DirectRule] = &[
    DirectRule { leaf: "identity.title", patterns: &["title", "salutation", "honorific", "prefix"], excludes: &["job", "position", "course", "book"] },
    DirectRule { leaf: "identity.firstName", patterns: &["first name", "given name", "forename", "fname"], excludes: &[] },
    DirectRule { leaf: "identity.middleName", patterns: &["middle name", "middle initial"], excludes: &[] },
    DirectRule { leaf: "identity.lastName", patterns: &["last name", "surname", "family name", "lname"], excludes: &[] },
    DirectRule { leaf: "identity.fullName", patterns: &["full name", "your name", "name"], excludes: NAME_PARTS },
    DirectRule { leaf: "identity.preferredName", patterns: &["preferred name", "nickname"], excludes: &[] },
    DirectRule { leaf: "identity.gender", patterns: &["gender", "sex"], excludes: &[] },
    DirectRule { leaf: "identity.dateOfBirth", patterns: &["date of birth", "birth date", "birthday", "dob"], excludes: &[] },
    DirectRule { leaf: "identity.birthYear", patterns: &["birth year", "year of birth"], excludes: &[] },
    DirectRule { leaf: "identity.birthMonth", patterns: &["birth month", "month of birth"], excludes: &[] },
    DirectRule { leaf: "identity.birthDay", patterns: &["day of birth"], excludes: &[] },
    DirectRule { leaf: "identity.age", patterns: &["age", "your age"], excludes: &["range", "group", "bracket"] },
    DirectRule { leaf: "identity.ageRange", patterns: &["age range", "age group", "age bracket"], excludes: &[] },
    DirectRule { leaf: "identity.maritalStatus", patterns: &["marital status", "marital", "relationship status"], excludes: &[] },
    DirectRule { leaf: "contact.email", patterns: &["email", "e mail", "email address"], excludes: &[] },
    DirectRule { leaf: "contact.phone", patterns: &["phone", "telephone", "mobile", "cell"], excludes: &[] },
    DirectRule { leaf: "contact.website", patterns: &["website", "homepage", "portfolio"], excludes: &[] },
    DirectRule { leaf: "contact.preferredContact", patterns: &["preferred contact", "contact method"], excludes: &[] },
    DirectRule { leaf: "address.street", patterns: &["street", "street address", "address line 1", "address"], excludes: &["email", "line 2", "apartment", "web", "ip"] },
    DirectRule { leaf: "address.apartment", patterns: &["apartment", "suite", "unit", "address line 2"], excludes: &[] },
    DirectRule { leaf: "address.city", patterns: &["city", "town"], excludes: &[] },
    DirectRule { leaf: "address.state", patterns: &["state", "province", "region"], excludes: &[] },
    DirectRule { leaf: "address.zipCode", patterns: &["zip", "postal code", "postcode", "zip code"], excludes: &[] },
    DirectRule { leaf: "address.country", patterns: &["country", "nation"], excludes: &["code"] },
    DirectRule { leaf: "education.educationLevel", patterns: &["education", "education level", "degree", "highest level of education"], excludes: &["field", "institution", "year"] },
    DirectRule { leaf: "education.institution", patterns: &["school", "university", "college", "institution"], excludes: &[] },
    DirectRule { leaf: "education.graduationYear", patterns: &["graduation year", "year of graduation"], excludes: &[] },
    DirectRule { leaf: "education.fieldOfStudy", patterns: &["field of study", "major"], excludes: &[] },
    DirectRule { leaf: "employment.employmentStatus", patterns: &["employment status", "employment", "work status"], excludes: &["years", "length"] },
    DirectRule { leaf: "employment.company", patterns: &["company", "employer", "organization", "organisation"], excludes: &[] },
    DirectRule { leaf: "employment.jobTitle", patterns: &["job title", "position", "occupation", "role"], excludes: &[] },
    DirectRule { leaf: "employment.industry", patterns: &["industry", "sector"], excludes: &[] },
    DirectRule { leaf: "employment.yearsOfExperience", patterns: &["years of experience", "experience"], excludes: &["level"] },
    DirectRule { leaf: "employment.experienceLevel", patterns: &["experience level", "seniority", "career level"], excludes: &[] },
    DirectRule { leaf: "employment.income", patterns: &["income", "salary", "annual income"], excludes: &["range", "bracket"] },
    DirectRule { leaf: "employment.incomeBracket", patterns: &["income range", "income bracket", "salary range"], excludes: &[] },
    DirectRule { leaf: "skills.primaryLanguage", patterns: &["native language", "primary language", "first language", "language"], excludes: &["preferred", "programming"] },
    DirectRule { leaf: "preferences.preferredLanguage", patterns: &["preferred language"], excludes: &[] },
    DirectRule { leaf: "preferences.interests", patterns: &["interests", "hobbies"], excludes: &[] },
];

/// Leaves whose key or curated synonyms the field's label, name or id
/// mention, in catalogue order.
pub fn referenced_leaves(field: &FieldDescriptor) -> Vec<String> {
    let ctx = Context::of(field);
    if ctx.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for spec in LEAF_SPECS {
        let path = spec.path();
        let rule = DIRECT_RULES.iter().find(|rule| rule.leaf == path);
        if rule.is_some_and(|rule| ctx.mentions_any(rule.excludes)) {
            continue;
        }
        let mentioned = ctx.mentions(&humanize_identifier(spec.key))
            || rule.is_some_and(|rule| ctx.mentions_any(rule.patterns));
        if mentioned {
            out.push(path);
        }
    }
    out
}

pub(crate) fn leaf_values(leaf: &Leaf) -> Vec<String> {
    match &leaf.value {
        LeafValue::List(items) => items.clone(),
        other => other.render().into_iter().collect(),
    }
}

/// The field names a profile leaf outright; pick the option whose text or
/// value reads most like the leaf's value.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectStrategy;

impl Strategy for DirectStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::Direct
    }

    fn attempt(&self, field: &FieldDescriptor, profile: &CanonicalProfile) -> Option<Candidate> {
        let mut candidates = Vec::new();
        for path in referenced_leaves(field) {
            let leaf = profile.leaf(&path);
            if !leaf.is_present() || matches!(leaf.value, LeafValue::Bool(_)) {
                continue;
            }
            for value in leaf_values(leaf) {
                for (index, option) in selectable(field) {
                    let sim = text_similarity(&value, &option.text)
                        .max(text_similarity(&value, &option.value));
                    candidates.push(Candidate::new(
                        index,
                        sim * leaf.confidence,
                        format!(
                            "{path} = \"{value}\" vs option \"{}\" (similarity {sim:.2}, leaf confidence {:.2})",
                            option.text, leaf.confidence
                        ),
                    ));
                }
            }
        }
        let best = best_candidate(candidates, &field.options);
        tracing::debug!(
            target: "fillkit::match",
            field = %field.key(),
            stage = "direct",
            confidence = best.as_ref().map(|c| c.confidence).unwrap_or(0.0),
            "stage evaluated"
        );
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_reference_leaves_by_synonym_and_key() {
        let field = FieldDescriptor::new("Country of residence");
        assert_eq!(referenced_leaves(&field), vec!["address.country"]);
        let field = FieldDescriptor::new("").with_name("yearsOfExperience");
        assert_eq!(referenced_leaves(&field), vec!["employment.yearsOfExperience"]);
    }

    #[test]
    fn excludes_keep_job_titles_away_from_honorifics() {
        let field = FieldDescriptor::new("Job title");
        let leaves = referenced_leaves(&field);
        assert!(leaves.iter().any(|l| l == "employment.jobTitle"));
        assert!(!leaves.iter().any(|l| l == "identity.title"));
    }

    #[test]
    fn generic_name_only_when_no_part_is_named() {
        let generic = referenced_leaves(&FieldDescriptor::new("Name"));
        assert!(generic.iter().any(|l| l == "identity.fullName"));
        let first = referenced_leaves(&FieldDescriptor::new("First name"));
        assert!(first.iter().any(|l| l == "identity.firstName"));
        assert!(!first.iter().any(|l| l == "identity.fullName"));
    }
}
