//! Pure range and lookup functions behind inferred and derived leaves.

use chrono::{Datelike, NaiveDate};
use fillkit_aliases::{AliasCategory, AliasRegistry};

const MALE_NAMES: &[&str] = &[
    "john", "michael", "david", "robert", "james", "william", "richard", "thomas", "daniel",
    "matthew", "christopher", "joseph",
];

const FEMALE_NAMES: &[&str] = &[
    "mary", "jennifer", "linda", "elizabeth", "barbara", "susan", "jessica", "sarah", "karen",
    "emily", "patricia", "lisa",
];

pub fn age_on(birth: NaiveDate, as_of: NaiveDate) -> Option<u32> {
    let mut years = as_of.year() - birth.year();
    if (as_of.month(), as_of.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

pub fn age_range(age: f64) -> &'static str {
    match age {
        a if a < 18.0 => "Under 18",
        a if a < 25.0 => "18-24",
        a if a < 35.0 => "25-34",
        a if a < 45.0 => "35-44",
        a if a < 55.0 => "45-54",
        a if a < 65.0 => "55-64",
        _ => "65+",
    }
}

pub fn income_bracket(income: f64) -> &'static str {
    match income {
        i if i < 25_000.0 => "Under $25,000",
        i if i < 50_000.0 => "$25,000-$49,999",
        i if i < 75_000.0 => "$50,000-$74,999",
        i if i < 100_000.0 => "$75,000-$99,999",
        i if i < 150_000.0 => "$100,000-$149,999",
        _ => "$150,000+",
    }
}

/// Seniority label for a number of years in work.
pub fn experience_level(years: f64) -> &'static str {
    match years {
        y if y <= 2.0 => "entry",
        y if y <= 5.0 => "mid",
        y if y <= 10.0 => "senior",
        _ => "lead",
    }
}

/// First-name dictionary lookup. A guess, never more.
pub fn gender_from_first_name(first_name: &str) -> Option<&'static str> {
    let lowered = first_name.trim().to_lowercase();
    let first = lowered.split_whitespace().next()?;
    if MALE_NAMES.contains(&first) {
        Some("male")
    } else if FEMALE_NAMES.contains(&first) {
        Some("female")
    } else {
        None
    }
}

/// Gender implied by an honorific such as "Mr" or "Mrs".
pub fn gender_from_title(registry: &AliasRegistry, title: &str) -> Option<String> {
    let hits = registry.resolve(AliasCategory::Gender, title);
    let mut iter = hits.into_iter();
    match (iter.next(), iter.next()) {
        (Some(key), None) if key == "male" || key == "female" => Some(key),
        _ => None,
    }
}

pub fn title_from_gender(gender: &str) -> Option<&'static str> {
    match gender.trim().to_lowercase().as_str() {
        "male" | "m" | "man" => Some("Mr"),
        "female" | "f" | "woman" => Some("Ms"),
        _ => None,
    }
}

/// The single canonical key `value` refers to in `category`, preferring the
/// most specific variant when the value mentions several.
pub fn canonical_key(registry: &AliasRegistry, category: AliasCategory, value: &str) -> Option<String> {
    let mut hits = registry.resolve(category, value);
    if hits.is_empty() {
        hits = registry.resolve_in_text(category, value);
    }
    hits.into_iter()
        .map(|key| {
            let len = registry.matched_form_len(category, &key, value).unwrap_or(0);
            (len, key)
        })
        // Longest match wins; among equals the alphabetically first key.
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)))
        .map(|(_, key)| key)
}

/// Group (education or employment category) of a free-text value.
pub fn category_of(registry: &AliasRegistry, category: AliasCategory, value: &str) -> Option<String> {
    let key = canonical_key(registry, category, value)?;
    registry.group_of(category, &key).map(str::to_string)
}
