use std::collections::BTreeSet;

use fillkit_aliases::{normalize_text, AliasCategory, AliasRegistry};
use fillkit_profile::{CanonicalProfile, Leaf};
use fillkit_protocol::{FieldDescriptor, FieldOption, MatchMethod};
use serde::Serialize;

use super::direct::leaf_values;
use super::{best_candidate, selectable, Candidate, Context, Strategy};
use crate::numeric::NumericRange;
use crate::similarity::text_similarity;

/// Yes/no questions and the preference leaf that answers each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentTopic {
    Newsletter,
    Marketing,
    Notifications,
    ShareData,
    /// Terms, privacy policy and similar acknowledgements.
    Terms,
}

impl ConsentTopic {
    fn leaf(&self) -> Option<&'static str> {
        match self {
            ConsentTopic::Newsletter => Some("preferences.newsletter"),
            ConsentTopic::Marketing => Some("preferences.marketing"),
            ConsentTopic::Notifications => Some("preferences.notifications"),
            ConsentTopic::ShareData => Some("preferences.shareData"),
            ConsentTopic::Terms => None,
        }
    }
}

/// Semantic category a field's label belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Consent(ConsentTopic),
    Gender,
    MaritalStatus,
    EducationLevel,
    EmploymentStatus,
    Experience,
    AgeRange,
    Income,
    Country,
    Region,
    Industry,
    Language,
    Interest,
}

impl FieldCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldCategory::Consent(_) => "yes_no",
            FieldCategory::Gender => "gender",
            FieldCategory::MaritalStatus => "marital_status",
            FieldCategory::EducationLevel => "education_level",
            FieldCategory::EmploymentStatus => "employment_status",
            FieldCategory::Experience => "experience",
            FieldCategory::AgeRange => "age_range",
            FieldCategory::Income => "income",
            FieldCategory::Country => "country",
            FieldCategory::Region => "region",
            FieldCategory::Industry => "industry",
            FieldCategory::Language => "language",
            FieldCategory::Interest => "interest",
        }
    }
}

struct CategoryRule {
    category: FieldCategory,
    patterns: &'static [&'static str],
    excludes: &'static [&'static str],
}

/// First matching rule wins, so consent questions are checked before the
/// topics they may mention.
const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule { category: FieldCategory::Consent(ConsentTopic::Newsletter), patterns: &["newsletter", "newsletters", "mailing list", "subscribe"], excludes: &[] },
    CategoryRule { category: FieldCategory::Consent(ConsentTopic::Marketing), patterns: &["marketing", "promotional", "promotions", "special offers", "offers"], excludes: &[] },
    CategoryRule { category: FieldCategory::Consent(ConsentTopic::Notifications), patterns: &["notifications", "notification", "alerts", "notify me"], excludes: &[] },
    CategoryRule { category: FieldCategory::Consent(ConsentTopic::ShareData), patterns: &["share my data", "share data", "share your data", "third parties", "third party"], excludes: &[] },
    CategoryRule { category: FieldCategory::Consent(ConsentTopic::Terms), patterns: &["terms", "terms and conditions", "privacy policy", "i agree", "i accept", "consent"], excludes: &[] },
    CategoryRule { category: FieldCategory::Gender, patterns: &["gender", "sex"], excludes: &[] },
    CategoryRule { category: FieldCategory::MaritalStatus, patterns: &["marital", "marital status", "relationship status", "civil status"], excludes: &[] },
    CategoryRule { category: FieldCategory::EducationLevel, patterns: &["education", "degree", "qualification", "schooling"], excludes: &["field", "year", "institution"] },
    CategoryRule { category: FieldCategory::EmploymentStatus, patterns: &["employment status", "employment", "work status", "employed"], excludes: &["years", "length"] },
    CategoryRule { category: FieldCategory::Experience, patterns: &["years of experience", "experience", "seniority", "skill level", "proficiency", "career level", "expertise"], excludes: &[] },
    CategoryRule { category: FieldCategory::AgeRange, patterns: &["age range", "age group", "age bracket", "age"], excludes: &[] },
    CategoryRule { category: FieldCategory::Income, patterns: &["income", "salary", "earnings", "compensation"], excludes: &[] },
    CategoryRule { category: FieldCategory::Country, patterns: &["country", "nationality", "citizenship", "nation"], excludes: &[] },
    CategoryRule { category: FieldCategory::Region, patterns: &["state", "province", "region", "territory"], excludes: &[] },
    CategoryRule { category: FieldCategory::Industry, patterns: &["industry", "sector"], excludes: &[] },
    CategoryRule { category: FieldCategory::Language, patterns: &["language", "languages", "mother tongue"], excludes: &["programming"] },
    CategoryRule { category: FieldCategory::Interest, patterns: &["interest", "interests", "hobbies", "hobby"], excludes: &[] },
];

/// Category named by the field's label, name or id, if any.
pub fn detect_category(field: &FieldDescriptor) -> Option<FieldCategory> {
    let ctx = Context::of(field);
    CATEGORY_RULES
        .iter()
        .find(|rule| ctx.mentions_any(rule.patterns) && !ctx.mentions_any(rule.excludes))
        .map(|rule| rule.category)
}

const EXACT_VARIANT: f64 = 0.95;
const IN_TEXT_YES_NO: f64 = 0.85;
const RANGE_EQUAL: f64 = 0.95;
const RANGE_CONTAINS: f64 = 0.9;
const SAME_GROUP: f64 = 0.6;
/// A subcategory names its parent less specifically than any variant.
const SUBCATEGORY: f64 = 0.75;
/// Terms checkboxes are assumed accepted, with this much confidence.
const ASSUMED_CONSENT: f64 = 0.9;

/// The label names a known category; resolve the profile's value through the
/// alias tables and look for the option that names the same canonical key.
#[derive(Debug, Clone, Copy)]
pub struct CategoryStrategy<'r> {
    registry: &'r AliasRegistry,
}

impl<'r> CategoryStrategy<'r> {
    pub fn new(registry: &'r AliasRegistry) -> Self {
        Self { registry }
    }

    fn candidates(&self, category: FieldCategory, field: &FieldDescriptor, profile: &CanonicalProfile) -> Vec<Candidate> {
        let mut out = Vec::new();
        match category {
            FieldCategory::Consent(topic) => self.consent(topic, field, profile, &mut out),
            FieldCategory::Gender => self.aliased(AliasCategory::Gender, "identity.gender", field, profile, &mut out),
            FieldCategory::MaritalStatus => self.aliased(AliasCategory::MaritalStatus, "identity.maritalStatus", field, profile, &mut out),
            FieldCategory::EducationLevel => self.aliased(AliasCategory::EducationLevel, "education.educationLevel", field, profile, &mut out),
            FieldCategory::EmploymentStatus => self.aliased(AliasCategory::EmploymentStatus, "employment.employmentStatus", field, profile, &mut out),
            FieldCategory::Industry => self.aliased(AliasCategory::Industry, "employment.industry", field, profile, &mut out),
            FieldCategory::Interest => self.aliased(AliasCategory::Interest, "preferences.interests", field, profile, &mut out),
            FieldCategory::Language => {
                for path in ["skills.primaryLanguage", "preferences.preferredLanguage", "skills.languages"] {
                    self.aliased(AliasCategory::Language, path, field, profile, &mut out);
                }
            }
            FieldCategory::Country => {
                self.aliased(AliasCategory::Country, "address.country", field, profile, &mut out);
                if out.is_empty() {
                    self.aliased(AliasCategory::Country, "address.countryCode", field, profile, &mut out);
                }
            }
            FieldCategory::Region => self.region(field, profile, &mut out),
            FieldCategory::Experience => {
                numeric("employment.yearsOfExperience", field, profile, &mut out);
                if out.is_empty() {
                    self.aliased(AliasCategory::SkillLevel, "employment.experienceLevel", field, profile, &mut out);
                }
            }
            FieldCategory::AgeRange => {
                numeric("identity.age", field, profile, &mut out);
                if out.is_empty() {
                    similar("identity.ageRange", field, profile, &mut out);
                }
            }
            FieldCategory::Income => {
                numeric("employment.income", field, profile, &mut out);
                if out.is_empty() {
                    similar("employment.incomeBracket", field, profile, &mut out);
                }
            }
        }
        out
    }

    /// Canonical keys a profile value refers to, and whether they were only
    /// reached through a subcategory.
    fn profile_keys(&self, category: AliasCategory, value: &str) -> (BTreeSet<String>, bool) {
        let hits = self.registry.resolve(category, value);
        if !hits.is_empty() {
            return (hits, false);
        }
        let hits = self.registry.resolve_in_text(category, value);
        if !hits.is_empty() {
            return (hits, false);
        }
        let parents = self.registry.resolve_subcategory(category, value);
        let via_subcategory = !parents.is_empty();
        (parents, via_subcategory)
    }

    fn aliased(&self, category: AliasCategory, path: &str, field: &FieldDescriptor, profile: &CanonicalProfile, out: &mut Vec<Candidate>) {
        let leaf = profile.leaf(path);
        if !leaf.is_present() {
            return;
        }
        for value in leaf_values(leaf) {
            let (keys, via_subcategory) = self.profile_keys(category, &value);
            let start = out.len();
            self.score_keys(category, &keys, path, &value, leaf, field, out);
            if via_subcategory {
                for candidate in &mut out[start..] {
                    candidate.confidence = candidate.confidence.min(SUBCATEGORY * leaf.confidence);
                    candidate.reasoning.push_str(&format!(" (\"{value}\" is a subcategory)"));
                }
            }
        }
    }

    fn region(&self, field: &FieldDescriptor, profile: &CanonicalProfile, out: &mut Vec<Candidate>) {
        let leaf = profile.leaf("address.state");
        if !leaf.is_present() {
            return;
        }
        let country = profile.text("address.country");
        for value in leaf_values(leaf) {
            let mut keys = self.registry.resolve_region(&value, country.as_deref());
            if keys.is_empty() {
                keys = self.registry.resolve_in_text(AliasCategory::Region, &value);
            }
            self.score_keys(AliasCategory::Region, &keys, "address.state", &value, leaf, field, out);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn score_keys(
        &self,
        category: AliasCategory,
        keys: &BTreeSet<String>,
        path: &str,
        value: &str,
        leaf: &Leaf,
        field: &FieldDescriptor,
        out: &mut Vec<Candidate>,
    ) {
        for (index, option) in selectable(field) {
            let mut best = 0.0_f64;
            let mut why = String::new();
            for text in option_texts(option) {
                let named = self.registry.resolve(category, text);
                // An option that exactly names some other key is not a partial hit.
                let names_other = !named.is_empty() && named.is_disjoint(keys);
                for key in keys {
                    let (score, reason) = if self.registry.is_exact_form(category, key, text) {
                        (EXACT_VARIANT, "is a variant of")
                    } else if let Some(len) = self
                        .registry
                        .matched_form_len(category, key, text)
                        .filter(|_| !names_other)
                    {
                        let total = normalize_text(text).chars().count().max(1);
                        (0.7 + 0.2 * (len.min(total) as f64 / total as f64), "mentions")
                    } else if !names_other && self.registry.is_subcategory_of(category, key, text) {
                        (SUBCATEGORY, "is a subcategory of")
                    } else if self.same_group(category, key, text) {
                        (SAME_GROUP, "shares a group with")
                    } else {
                        (0.0, "")
                    };
                    if score > best {
                        best = score;
                        why = format!(
                            "{} {path} = \"{value}\" resolves to \"{key}\"; option \"{}\" {reason} it",
                            category.as_str(),
                            option.text
                        );
                    }
                }
            }
            if best == 0.0 {
                let sim = option_texts(option)
                    .map(|text| text_similarity(value, text))
                    .fold(0.0, f64::max);
                if sim >= 0.8 {
                    best = 0.9 * sim;
                    why = format!(
                        "{} {path} = \"{value}\" reads like option \"{}\" (similarity {sim:.2})",
                        category.as_str(),
                        option.text
                    );
                }
            }
            if best > 0.0 {
                out.push(Candidate::new(index, best * leaf.confidence, why));
            }
        }
    }

    fn same_group(&self, category: AliasCategory, key: &str, text: &str) -> bool {
        let Some(group) = self.registry.group_of(category, key) else {
            return false;
        };
        if normalize_text(text) == normalize_text(group) {
            return true;
        }
        self.registry
            .resolve(category, text)
            .iter()
            .any(|other| other != key && self.registry.group_of(category, other) == Some(group))
    }

    fn consent(&self, topic: ConsentTopic, field: &FieldDescriptor, profile: &CanonicalProfile, out: &mut Vec<Candidate>) {
        let (answer, confidence, source) = match topic.leaf() {
            Some(path) => {
                let leaf = profile.leaf(path);
                match profile.boolean(path) {
                    Some(answer) => (answer, leaf.confidence, path),
                    None => return,
                }
            }
            None => (true, ASSUMED_CONSENT, "terms acknowledgement"),
        };
        let target = if answer { "yes" } else { "no" };
        let opposite = if answer { "no" } else { "yes" };
        for (index, option) in selectable(field) {
            let mut best = 0.0_f64;
            for text in option_texts(option) {
                if self.registry.is_exact_form(AliasCategory::BooleanIntent, target, text) {
                    best = best.max(EXACT_VARIANT);
                    continue;
                }
                let mentioned = self.registry.resolve_in_text(AliasCategory::BooleanIntent, text);
                if mentioned.contains(target) && !mentioned.contains(opposite) {
                    best = best.max(IN_TEXT_YES_NO);
                }
            }
            if best > 0.0 {
                out.push(Candidate::new(
                    index,
                    best * confidence,
                    format!("yes_no {source} = {answer}; option \"{}\" means {target}", option.text),
                ));
            }
        }
    }
}

fn option_texts(option: &FieldOption) -> impl Iterator<Item = &str> {
    [option.text.as_str(), option.value.as_str()]
        .into_iter()
        .filter(|t| !t.trim().is_empty())
}

fn numeric(path: &str, field: &FieldDescriptor, profile: &CanonicalProfile, out: &mut Vec<Candidate>) {
    let Some(value) = profile.number(path) else {
        return;
    };
    let confidence = profile.leaf(path).confidence;
    for (index, option) in selectable(field) {
        let Some(range) = option_texts(option).find_map(NumericRange::parse) else {
            continue;
        };
        let score = if range.is_exact() && range.contains(value) {
            RANGE_EQUAL
        } else if range.contains(value) {
            RANGE_CONTAINS
        } else {
            continue;
        };
        out.push(Candidate::new(
            index,
            score * confidence,
            format!(
                "{path} = {} falls in option \"{}\"",
                fillkit_profile::LeafValue::Number(value).render().unwrap_or_default(),
                option.text
            ),
        ));
    }
}

fn similar(path: &str, field: &FieldDescriptor, profile: &CanonicalProfile, out: &mut Vec<Candidate>) {
    let Some(value) = profile.text(path) else {
        return;
    };
    let confidence = profile.leaf(path).confidence;
    for (index, option) in selectable(field) {
        let sim = option_texts(option)
            .map(|text| text_similarity(&value, text))
            .fold(0.0, f64::max);
        if sim >= 0.8 {
            out.push(Candidate::new(
                index,
                0.9 * sim * confidence,
                format!("{path} = \"{value}\" reads like option \"{}\"", option.text),
            ));
        }
    }
}

impl Strategy for CategoryStrategy<'_> {
    fn method(&self) -> MatchMethod {
        MatchMethod::Category
    }

    fn attempt(&self, field: &FieldDescriptor, profile: &CanonicalProfile) -> Option<Candidate> {
        let category = detect_category(field)?;
        let best = best_candidate(self.candidates(category, field, profile), &field.options);
        tracing::debug!(
            target: "fillkit::match",
            field = %field.key(),
            stage = "category",
            category = category.as_str(),
            confidence = best.as_ref().map(|c| c.confidence).unwrap_or(0.0),
            "stage evaluated"
        );
        best
    }
}
