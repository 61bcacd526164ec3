use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Local, NaiveDate};
use fillkit_aliases::{AliasCategory, AliasRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::{LeafSpec, LEAF_SPECS};
use crate::coerce::coerce;
use crate::confidence::{ALIAS, EXACT, HEURISTIC, INFERRED};
use crate::derive;
use crate::keywords::extract_keywords;
use crate::leaf::{Leaf, LeafValue, Section, EMPTY_LEAF};

/// Loosely structured profile input: any JSON object, flat or nested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawProfile(pub Map<String, Value>);

impl From<Value> for RawProfile {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => RawProfile(map),
            _ => RawProfile::default(),
        }
    }
}

/// Immutable, confidence-annotated profile. Every catalogued leaf is present;
/// absent values are empty leaves with confidence 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalProfile {
    leaves: BTreeMap<String, Leaf>,
    #[serde(skip)]
    keywords: BTreeSet<String>,
}

impl CanonicalProfile {
    fn from_leaves(leaves: BTreeMap<String, Leaf>) -> Self {
        let mut keywords = BTreeSet::new();
        for leaf in leaves.values().filter(|leaf| leaf.is_present()) {
            if let Some(text) = leaf.value.render() {
                keywords.extend(extract_keywords(&text));
            }
        }
        Self { leaves, keywords }
    }

    /// Leaf at `section.key`; unknown paths read as empty.
    pub fn leaf(&self, path: &str) -> &Leaf {
        self.leaves.get(path).unwrap_or(&EMPTY_LEAF)
    }

    pub fn text(&self, path: &str) -> Option<String> {
        let leaf = self.leaf(path);
        leaf.is_present().then(|| leaf.value.render()).flatten()
    }

    pub fn number(&self, path: &str) -> Option<f64> {
        let leaf = self.leaf(path);
        leaf.is_present().then(|| leaf.value.as_number()).flatten()
    }

    pub fn boolean(&self, path: &str) -> Option<bool> {
        let leaf = self.leaf(path);
        leaf.is_present().then(|| leaf.value.as_bool()).flatten()
    }

    /// All leaves in path order, including empty ones.
    pub fn leaves(&self) -> impl Iterator<Item = (&str, &Leaf)> {
        self.leaves.iter().map(|(path, leaf)| (path.as_str(), leaf))
    }

    /// Leaves that carry a value.
    pub fn present(&self) -> impl Iterator<Item = (&str, &Leaf)> {
        self.leaves().filter(|(_, leaf)| leaf.is_present())
    }

    pub fn section(&self, section: Section) -> impl Iterator<Item = (&str, &Leaf)> {
        let prefix = format!("{}.", section.as_str());
        self.leaves()
            .filter(move |(path, _)| path.starts_with(&prefix))
    }

    /// `section.key -> value` for every present leaf.
    pub fn flat_view(&self) -> BTreeMap<String, String> {
        self.present()
            .filter_map(|(path, leaf)| leaf.value.render().map(|text| (path.to_string(), text)))
            .collect()
    }

    /// Content words drawn from every present leaf.
    pub fn keywords(&self) -> &BTreeSet<String> {
        &self.keywords
    }

    pub fn present_count(&self) -> usize {
        self.present().count()
    }
}

/// Builds [`CanonicalProfile`]s. Age-dependent leaves are computed against a
/// fixed reference date so the same input always gives the same profile.
#[derive(Debug, Clone, Copy)]
pub struct ProfileNormalizer<'r> {
    registry: &'r AliasRegistry,
    as_of: NaiveDate,
}

impl ProfileNormalizer<'static> {
    pub fn new(as_of: NaiveDate) -> Self {
        Self::with_registry(AliasRegistry::builtin(), as_of)
    }

    /// Normalizer pinned to the local date at construction time.
    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }
}

impl<'r> ProfileNormalizer<'r> {
    pub fn with_registry(registry: &'r AliasRegistry, as_of: NaiveDate) -> Self {
        Self { registry, as_of }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn normalize(&self, raw: &RawProfile) -> CanonicalProfile {
        let flat = flatten(&raw.0);
        let mut leaves: BTreeMap<String, Leaf> = LEAF_SPECS
            .iter()
            .map(|spec| (spec.path(), probe(&flat, spec)))
            .collect();
        self.infer(&mut leaves);
        tracing::debug!(
            target: "fillkit::profile",
            present = leaves.values().filter(|leaf| leaf.is_present()).count(),
            "normalized profile"
        );
        CanonicalProfile::from_leaves(leaves)
    }

    fn infer(&self, leaves: &mut BTreeMap<String, Leaf>) {
        self.infer_names(leaves);
        self.infer_birth(leaves);
        self.infer_gender(leaves);
        self.infer_codes(leaves);
        infer_languages(leaves);
        self.infer_derived(leaves);
    }

    fn infer_names(&self, leaves: &mut BTreeMap<String, Leaf>) {
        let first = present(leaves, "identity.firstName");
        let last = present(leaves, "identity.lastName");
        if let (Some(first), Some(last)) = (&first, &last) {
            let value = format!("{} {}", text_of(first), text_of(last));
            let conf = first.confidence.min(last.confidence);
            fill(leaves, "identity.fullName", LeafValue::Text(value), conf.min(INFERRED), "identity.firstName");
        }
        if let Some(full) = present(leaves, "identity.fullName") {
            let text = text_of(&full);
            let parts: Vec<&str> = text.split_whitespace().collect();
            if parts.len() >= 2 {
                let conf = full.confidence.min(INFERRED);
                fill(leaves, "identity.firstName", LeafValue::Text(parts[0].to_string()), conf, "identity.fullName");
                fill(leaves, "identity.lastName", LeafValue::Text(parts[parts.len() - 1].to_string()), conf, "identity.fullName");
            }
        }
    }

    fn infer_birth(&self, leaves: &mut BTreeMap<String, Leaf>) {
        if let Some(dob) = present(leaves, "identity.dateOfBirth") {
            if let Ok(date) = NaiveDate::parse_from_str(&text_of(&dob), "%Y-%m-%d") {
                let conf = dob.confidence.min(INFERRED);
                let src = "identity.dateOfBirth";
                fill(leaves, "identity.birthYear", LeafValue::Number(date.year() as f64), conf, src);
                fill(leaves, "identity.birthMonth", LeafValue::Number(date.month() as f64), conf, src);
                fill(leaves, "identity.birthDay", LeafValue::Number(date.day() as f64), conf, src);
                if let Some(age) = derive::age_on(date, self.as_of) {
                    fill(leaves, "identity.age", LeafValue::Number(age as f64), conf, src);
                }
            }
        }
        if let Some(year) = present(leaves, "identity.birthYear") {
            if let Some(y) = year.value.as_number() {
                let age = self.as_of.year() as f64 - y;
                if (0.0..=130.0).contains(&age) {
                    fill(leaves, "identity.age", LeafValue::Number(age), year.confidence.min(INFERRED), "identity.birthYear");
                }
            }
        }
        if let Some(age) = present(leaves, "identity.age") {
            if let Some(a) = age.value.as_number() {
                let year = self.as_of.year() as f64 - a;
                fill(leaves, "identity.birthYear", LeafValue::Number(year), age.confidence.min(INFERRED), "identity.age");
            }
        }
    }

    fn infer_gender(&self, leaves: &mut BTreeMap<String, Leaf>) {
        if let Some(title) = present(leaves, "identity.title") {
            if let Some(gender) = derive::gender_from_title(self.registry, &text_of(&title)) {
                fill(leaves, "identity.gender", LeafValue::Text(gender), title.confidence.min(INFERRED), "identity.title");
            }
        }
        if let Some(first) = present(leaves, "identity.firstName") {
            if let Some(gender) = derive::gender_from_first_name(&text_of(&first)) {
                fill(leaves, "identity.gender", LeafValue::Text(gender.to_string()), first.confidence.min(HEURISTIC), "identity.firstName");
            }
        }
        if let Some(gender) = present(leaves, "identity.gender") {
            if let Some(title) = derive::title_from_gender(&text_of(&gender)) {
                fill(leaves, "identity.title", LeafValue::Text(title.to_string()), gender.confidence.min(INFERRED), "identity.gender");
            }
        }
    }

    fn infer_codes(&self, leaves: &mut BTreeMap<String, Leaf>) {
        let country = present(leaves, "address.country");
        if let Some(country) = &country {
            let hits = self.registry.resolve(AliasCategory::Country, &text_of(country));
            if let Some(code) = single(&hits).and_then(|key| self.registry.code_of(AliasCategory::Country, key)) {
                fill(leaves, "address.countryCode", LeafValue::Text(code.to_string()), country.confidence.min(INFERRED), "address.country");
            }
        }
        if let Some(state) = present(leaves, "address.state") {
            let parent = country.as_ref().map(text_of);
            let hits = self.registry.resolve_region(&text_of(&state), parent.as_deref());
            if let Some(code) = single(&hits).and_then(|key| self.registry.code_of(AliasCategory::Region, key)) {
                fill(leaves, "address.stateCode", LeafValue::Text(code.to_string()), state.confidence.min(INFERRED), "address.state");
            }
        }
    }

    fn infer_derived(&self, leaves: &mut BTreeMap<String, Leaf>) {
        if let Some(age) = present(leaves, "identity.age") {
            if let Some(a) = age.value.as_number() {
                fill(leaves, "identity.ageRange", LeafValue::Text(derive::age_range(a).into()), age.confidence.min(INFERRED), "identity.age");
            }
        }
        if let Some(income) = present(leaves, "employment.income") {
            if let Some(i) = income.value.as_number() {
                fill(leaves, "employment.incomeBracket", LeafValue::Text(derive::income_bracket(i).into()), income.confidence.min(INFERRED), "employment.income");
            }
        }
        if let Some(years) = present(leaves, "employment.yearsOfExperience") {
            if let Some(y) = years.value.as_number() {
                fill(leaves, "employment.experienceLevel", LeafValue::Text(derive::experience_level(y).into()), years.confidence.min(INFERRED), "employment.yearsOfExperience");
            }
        }
        if let Some(level) = present(leaves, "education.educationLevel") {
            if let Some(group) = derive::category_of(self.registry, AliasCategory::EducationLevel, &text_of(&level)) {
                fill(leaves, "education.educationCategory", LeafValue::Text(group), level.confidence.min(INFERRED), "education.educationLevel");
            }
        }
        if let Some(status) = present(leaves, "employment.employmentStatus") {
            if let Some(group) = derive::category_of(self.registry, AliasCategory::EmploymentStatus, &text_of(&status)) {
                fill(leaves, "employment.employmentCategory", LeafValue::Text(group), status.confidence.min(INFERRED), "employment.employmentStatus");
            }
        }
    }
}

fn infer_languages(leaves: &mut BTreeMap<String, Leaf>) {
    if let Some(languages) = present(leaves, "skills.languages") {
        if let Some(first) = languages.value.as_list().first() {
            fill(leaves, "skills.primaryLanguage", LeafValue::Text(first.clone()), languages.confidence.min(INFERRED), "skills.languages");
        }
    }
}

fn present(leaves: &BTreeMap<String, Leaf>, path: &str) -> Option<Leaf> {
    leaves.get(path).filter(|leaf| leaf.is_present()).cloned()
}

fn text_of(leaf: &Leaf) -> String {
    leaf.value.render().unwrap_or_default()
}

fn single(set: &BTreeSet<String>) -> Option<&String> {
    (set.len() == 1).then(|| set.iter().next()).flatten()
}

/// Set `path` unless it already holds a value.
fn fill(leaves: &mut BTreeMap<String, Leaf>, path: &str, value: LeafValue, confidence: f64, from: &str) {
    let Some(slot) = leaves.get_mut(path) else {
        return;
    };
    if slot.is_present() {
        return;
    }
    *slot = Leaf::new(value, confidence, format!("derived:{from}"));
}

struct FlatEntry<'a> {
    /// Dotted location in the raw input.
    path: String,
    /// Last path segment.
    key: &'a str,
    depth: usize,
    value: &'a Value,
}

const MAX_DEPTH: usize = 3;

fn flatten(map: &Map<String, Value>) -> Vec<FlatEntry<'_>> {
    let mut out = Vec::new();
    flatten_into(map, "", 0, &mut out);
    out
}

fn flatten_into<'a>(map: &'a Map<String, Value>, prefix: &str, depth: usize, out: &mut Vec<FlatEntry<'a>>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Value::Object(inner) = value {
            if depth + 1 < MAX_DEPTH {
                flatten_into(inner, &path, depth + 1, out);
            }
        }
        out.push(FlatEntry {
            path,
            key: key.as_str(),
            depth,
            value,
        });
    }
}

fn squash(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Read one leaf: the canonical key verbatim (top level or under its
/// section) scores [`EXACT`], any alias spelling scores [`ALIAS`].
fn probe(flat: &[FlatEntry<'_>], spec: &LeafSpec) -> Leaf {
    let canonical_path = spec.path();
    let exact = flat
        .iter()
        .filter(|entry| entry.path == spec.key || entry.path == canonical_path)
        .find_map(|entry| coerce(spec.kind, entry.value).map(|value| (entry, value)));
    if let Some((entry, value)) = exact {
        return Leaf::new(value, EXACT, entry.path.clone());
    }

    let section_prefix = format!("{}.", spec.section.as_str());
    let rank = |entry: &FlatEntry<'_>| -> (usize, usize) {
        let place = if entry.depth == 0 {
            0
        } else if entry.path.starts_with(&section_prefix) {
            1
        } else {
            2
        };
        (place, entry.depth)
    };

    for alias in std::iter::once(spec.key).chain(spec.aliases.iter().copied()) {
        let wanted = squash(alias);
        let mut candidates: Vec<&FlatEntry<'_>> = flat
            .iter()
            .filter(|entry| squash(entry.key) == wanted)
            .collect();
        candidates.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.path.cmp(&b.path)));
        if let Some((entry, value)) = candidates
            .into_iter()
            .find_map(|entry| coerce(spec.kind, entry.value).map(|value| (entry, value)))
        {
            return Leaf::new(value, ALIAS, entry.path.clone());
        }
    }

    Leaf::empty()
}
