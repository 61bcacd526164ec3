use serde::{Deserialize, Serialize};

use crate::shape::ControlShape;

/// Class-name fragments of widget libraries that filter options as the user types.
pub const SEARCHABLE_FINGERPRINTS: &[&str] = &[
    "react-select",
    "select2",
    "selectize",
    "chosen",
    "vue-select",
    "v-select",
    "ng-select",
    "MuiAutocomplete",
    "typeahead",
    "autocomplete",
];

/// Class-name fragments of click-to-open listboxes without a search input.
pub const LISTBOX_FINGERPRINTS: &[&str] = &[
    "MuiSelect",
    "ant-select",
    "el-select",
    "mat-select",
    "bootstrap-select",
    "dropdown",
    "listbox",
];

/// Class-name fragments of list virtualization libraries.
pub const VIRTUALIZED_FINGERPRINTS: &[&str] = &[
    "react-window",
    "react-virtualized",
    "ReactVirtualized",
    "virtual-list",
    "RecyclerListView",
];

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Standard,
    Searchable,
    CustomListbox,
    #[default]
    Unknown,
}

impl WidgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::Standard => "standard",
            WidgetKind::Searchable => "searchable",
            WidgetKind::CustomListbox => "custom_listbox",
            WidgetKind::Unknown => "unknown",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            WidgetKind::Standard => "Native select",
            WidgetKind::Searchable => "Searchable combobox",
            WidgetKind::CustomListbox => "Custom listbox",
            WidgetKind::Unknown => "Unknown",
        }
    }

    pub fn from_slug(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" | "select" | "native" => WidgetKind::Standard,
            "searchable" | "combobox" => WidgetKind::Searchable,
            "custom_listbox" | "listbox" | "custom" => WidgetKind::CustomListbox,
            _ => WidgetKind::Unknown,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, WidgetKind::Unknown)
    }
}

/// Kind plus the secondary traits that change how a session behaves.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Default)]
pub struct Classification {
    pub kind: WidgetKind,
    /// Only the rendered window of options can be enumerated.
    pub virtualized: bool,
    pub multi_level: bool,
}

/// Decide what a control is from its static shape. Pure: the same shape
/// always classifies the same way.
pub fn classify(shape: &ControlShape) -> Classification {
    Classification {
        kind: classify_kind(shape),
        virtualized: shape.has_class_fragment(VIRTUALIZED_FINGERPRINTS),
        multi_level: shape.nested
            || shape
                .aria_haspopup
                .as_deref()
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("menu")),
    }
}

fn classify_kind(shape: &ControlShape) -> WidgetKind {
    // Hosts may send the tag as the DOM reports it (`SELECT`).
    let tag = shape.tag.trim();
    if tag.eq_ignore_ascii_case("select") {
        return WidgetKind::Standard;
    }
    if shape.has_class_fragment(SEARCHABLE_FINGERPRINTS) {
        return WidgetKind::Searchable;
    }
    if shape.role_is("combobox") || shape.role_is("listbox") {
        return if shape.autocompletes() {
            WidgetKind::Searchable
        } else {
            WidgetKind::CustomListbox
        };
    }
    let text_input = tag.eq_ignore_ascii_case("input")
        && shape
            .input_type
            .as_deref()
            .map_or(true, |t| matches!(t.trim().to_ascii_lowercase().as_str(), "text" | "search"));
    if text_input && shape.autocompletes() {
        return WidgetKind::Searchable;
    }
    if shape.has_class_fragment(LISTBOX_FINGERPRINTS) {
        return WidgetKind::CustomListbox;
    }
    let popup = shape
        .aria_haspopup
        .as_deref()
        .map(|v| v.trim().to_ascii_lowercase());
    if matches!(popup.as_deref(), Some("listbox" | "true")) {
        return WidgetKind::CustomListbox;
    }
    WidgetKind::Unknown
}
