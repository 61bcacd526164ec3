use serde::{Deserialize, Serialize};

/// Static structural signals of a control, captured once by the page side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlShape {
    /// Lowercase tag name (`select`, `div`, `input`, ...).
    pub tag: String,
    pub role: Option<String>,
    pub input_type: Option<String>,
    pub aria_autocomplete: Option<String>,
    pub aria_haspopup: Option<String>,
    pub aria_expanded: Option<bool>,
    pub classes: Vec<String>,
    pub multiple: bool,
    /// Submenus were found under the control (`.dropdown-submenu`,
    /// `[aria-haspopup="menu"]` children and the like).
    pub nested: bool,
}

impl ControlShape {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().trim().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_input_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }

    pub fn with_autocomplete(mut self, value: impl Into<String>) -> Self {
        self.aria_autocomplete = Some(value.into());
        self
    }

    pub fn with_haspopup(mut self, value: impl Into<String>) -> Self {
        self.aria_haspopup = Some(value.into());
        self
    }

    /// Whitespace separated class attribute.
    pub fn with_classes(mut self, class_attr: &str) -> Self {
        self.classes.extend(class_attr.split_whitespace().map(str::to_string));
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn nested(mut self) -> Self {
        self.nested = true;
        self
    }

    pub(crate) fn role_is(&self, role: &str) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.trim().eq_ignore_ascii_case(role))
    }

    /// `aria-autocomplete` is set to anything but `none`.
    pub(crate) fn autocompletes(&self) -> bool {
        self.aria_autocomplete
            .as_deref()
            .map(str::trim)
            .is_some_and(|v| !v.is_empty() && !v.eq_ignore_ascii_case("none"))
    }

    pub(crate) fn has_class_fragment(&self, fragments: &[&str]) -> bool {
        self.classes
            .iter()
            .any(|class| fragments.iter().any(|frag| class.contains(frag)))
    }
}
