//! Turning raw JSON values into typed leaf values. Anything that does not fit
//! the leaf's kind yields `None` and the leaf stays empty.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::catalog::LeafKind;
use crate::leaf::LeafValue;

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)\s*([kKmM])?\b").expect("number regex"));

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

pub(crate) fn coerce(kind: LeafKind, value: &Value) -> Option<LeafValue> {
    match kind {
        LeafKind::Text => text(value).map(LeafValue::Text),
        LeafKind::Number => number(value).map(LeafValue::Number),
        LeafKind::Bool => boolean(value).map(LeafValue::Bool),
        LeafKind::List => list(value).map(LeafValue::List),
        LeafKind::Date => date(value).map(|d| LeafValue::Text(d.format("%Y-%m-%d").to_string())),
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// First number in `input`, ignoring currency symbols and thousands
/// separators, with `k`/`m` suffixes expanded: `"$85,000"` is 85000 and
/// `"8 years"` is 8.
pub fn parse_number(input: &str) -> Option<f64> {
    let cleaned = input.replace(',', "");
    let caps = NUMBER_RE.captures(&cleaned)?;
    let base: f64 = caps.get(1)?.as_str().parse().ok()?;
    let scale = match caps.get(2).map(|m| m.as_str()) {
        Some("k") | Some("K") => 1_000.0,
        Some("m") | Some("M") => 1_000_000.0,
        _ => 1.0,
    };
    let out = base * scale;
    out.is_finite().then_some(out)
}

fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "on" | "checked" | "subscribed" => Some(true),
            "false" | "no" | "n" | "0" | "off" | "unchecked" | "unsubscribed" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn list(value: &Value) -> Option<Vec<String>> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => obj.get("name").and_then(text),
                other => text(other),
            })
            .collect(),
        Value::String(s) => s
            .split([',', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    (!items.is_empty()).then_some(items)
}

pub(crate) fn date(value: &Value) -> Option<NaiveDate> {
    let raw = value.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }
    // ISO timestamps: keep the date part.
    let candidate = raw.split('T').next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
}
