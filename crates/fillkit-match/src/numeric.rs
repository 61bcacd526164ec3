//! Numeric ranges written in option labels: `"18-24"`, `"$25k - $49k"`,
//! `"65+"`, `"Under 18"`, `"Senior (6-10)"`, `"10 or more"`.

use once_cell::sync::Lazy;
use regex::Regex;

const NUM: &str = r"\$?\s*(\d[\d,]*(?:\.\d+)?)\s*(?:([kKmM])\b)?";

static BETWEEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{NUM}\s*(?:-|–|—|to)\s*{NUM}")).expect("between regex")
});
static PLUS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"{NUM}\s*\+")).expect("plus regex"));
static BELOW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)(?:under|less than|fewer than|below|<)\s*{NUM}")).expect("below regex")
});
static ABOVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)(?:over|more than|greater than|above|>)\s*{NUM}")).expect("above regex")
});
static OR_MORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i){NUM}\s*(?:[a-z]+\s+)?(?:or|and)\s+(?:more|older|above|over|greater|higher)"
    ))
    .expect("or-more regex")
});
static OR_LESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i){NUM}\s*(?:[a-z]+\s+)?(?:or|and)\s+(?:less|fewer|under|below|younger|lower)"
    ))
    .expect("or-less regex")
});
static SINGLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"^\D*?{NUM}\D*$")).expect("single regex"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericRange {
    /// Inclusive on both ends.
    Between { low: f64, high: f64 },
    AtLeast(f64),
    Above(f64),
    AtMost(f64),
    Below(f64),
    Exactly(f64),
}

fn scale(suffix: Option<&str>) -> f64 {
    match suffix {
        Some("k") | Some("K") => 1_000.0,
        Some("m") | Some("M") => 1_000_000.0,
        _ => 1.0,
    }
}

fn number(caps: &regex::Captures<'_>, digits: usize, suffix: usize) -> Option<f64> {
    let raw = caps.get(digits)?.as_str().replace(',', "");
    let base: f64 = raw.parse().ok()?;
    Some(base * scale(caps.get(suffix).map(|m| m.as_str())))
}

impl NumericRange {
    /// Parse the first range expressed in `text`, if any.
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(caps) = BETWEEN_RE.captures(text) {
            let mut low = number(&caps, 1, 2)?;
            let high = number(&caps, 3, 4)?;
            // "$25-49k": a bare low end borrows the high end's suffix.
            if let (None, Some(suffix)) = (caps.get(2), caps.get(4)) {
                let scaled = low * scale(Some(suffix.as_str()));
                if scaled <= high {
                    low = scaled;
                }
            }
            return Some(NumericRange::Between {
                low: low.min(high),
                high: low.max(high),
            });
        }
        if let Some(caps) = PLUS_RE.captures(text) {
            return number(&caps, 1, 2).map(NumericRange::AtLeast);
        }
        if let Some(caps) = OR_MORE_RE.captures(text) {
            return number(&caps, 1, 2).map(NumericRange::AtLeast);
        }
        if let Some(caps) = OR_LESS_RE.captures(text) {
            return number(&caps, 1, 2).map(NumericRange::AtMost);
        }
        if let Some(caps) = BELOW_RE.captures(text) {
            return number(&caps, 1, 2).map(NumericRange::Below);
        }
        if let Some(caps) = ABOVE_RE.captures(text) {
            return number(&caps, 1, 2).map(NumericRange::Above);
        }
        if let Some(caps) = SINGLE_RE.captures(text) {
            return number(&caps, 1, 2).map(NumericRange::Exactly);
        }
        None
    }

    pub fn contains(&self, value: f64) -> bool {
        match *self {
            NumericRange::Between { low, high } => value >= low && value <= high,
            NumericRange::AtLeast(min) => value >= min,
            NumericRange::Above(min) => value > min,
            NumericRange::AtMost(max) => value <= max,
            NumericRange::Below(max) => value < max,
            NumericRange::Exactly(n) => value == n,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, NumericRange::Exactly(_))
    }
}
