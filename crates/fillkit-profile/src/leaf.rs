use serde::{Deserialize, Serialize};

/// Top-level sections of a canonical profile.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Identity,
    Contact,
    Address,
    Education,
    Employment,
    Skills,
    Preferences,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Identity,
        Section::Contact,
        Section::Address,
        Section::Education,
        Section::Employment,
        Section::Skills,
        Section::Preferences,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Identity => "identity",
            Section::Contact => "contact",
            Section::Address => "address",
            Section::Education => "education",
            Section::Employment => "employment",
            Section::Skills => "skills",
            Section::Preferences => "preferences",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LeafValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<String>),
}

impl LeafValue {
    pub fn is_empty(&self) -> bool {
        match self {
            LeafValue::Empty => true,
            LeafValue::Text(s) => s.is_empty(),
            LeafValue::List(items) => items.is_empty(),
            LeafValue::Number(_) | LeafValue::Bool(_) => false,
        }
    }

    /// Human-readable rendering used for text comparison and flat export.
    pub fn render(&self) -> Option<String> {
        match self {
            LeafValue::Empty => None,
            LeafValue::Text(s) if s.is_empty() => None,
            LeafValue::Text(s) => Some(s.clone()),
            LeafValue::Number(n) => Some(format_number(*n)),
            LeafValue::Bool(b) => Some(b.to_string()),
            LeafValue::List(items) if items.is_empty() => None,
            LeafValue::List(items) => Some(items.join(", ")),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            LeafValue::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            LeafValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LeafValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> &[String] {
        match self {
            LeafValue::List(items) => items,
            _ => &[],
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One profile value with how much the normalizer trusts it and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaf {
    pub value: LeafValue,
    pub confidence: f64,
    /// Raw key the value was read from, or `derived:<path>` for inferred leaves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,
}

pub(crate) static EMPTY_LEAF: Leaf = Leaf {
    value: LeafValue::Empty,
    confidence: 0.0,
    source_key: None,
};

impl Leaf {
    pub fn empty() -> Self {
        EMPTY_LEAF.clone()
    }

    pub fn new(value: LeafValue, confidence: f64, source_key: impl Into<String>) -> Self {
        if value.is_empty() {
            return Self::empty();
        }
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
            source_key: Some(source_key.into()),
        }
    }

    pub fn is_present(&self) -> bool {
        !self.value.is_empty() && self.confidence > 0.0
    }
}

impl Default for Leaf {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_collapse_to_absent_leaves() {
        let leaf = Leaf::new(LeafValue::Text(String::new()), 1.0, "firstName");
        assert!(!leaf.is_present());
        assert_eq!(leaf.confidence, 0.0);
        assert_eq!(leaf.source_key, None);
    }

    #[test]
    fn render_formats_whole_numbers_without_fraction() {
        assert_eq!(LeafValue::Number(8.0).render().as_deref(), Some("8"));
        assert_eq!(LeafValue::Number(3.5).render().as_deref(), Some("3.5"));
        assert_eq!(
            LeafValue::List(vec!["English".into(), "Spanish".into()])
                .render()
                .as_deref(),
            Some("English, Spanish")
        );
        assert_eq!(LeafValue::Empty.render(), None);
    }

    #[test]
    fn confidence_is_clamped() {
        let leaf = Leaf::new(LeafValue::Bool(true), 1.7, "newsletter");
        assert_eq!(leaf.confidence, 1.0);
    }
}
