use async_trait::async_trait;
use fillkit_protocol::FieldOption;

use crate::shape::ControlShape;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("control is no longer attached to the page")]
    Detached,
    #[error("control does not support {0}")]
    Unsupported(&'static str),
    #[error("interaction failed: {0}")]
    Interaction(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
}

/// Page-side primitives for one control. Implementations perform a single
/// gesture or read and return; waiting, polling and timeouts belong to the
/// session driving them.
#[async_trait]
pub trait Control: Send + Sync {
    fn shape(&self) -> ControlShape;

    /// Click or focus whatever opens the control.
    async fn trigger(&self) -> Result<(), ControlError>;

    async fn is_expanded(&self) -> Result<bool, ControlError>;

    /// Options currently rendered, in rendering order.
    async fn rendered_options(&self) -> Result<Vec<FieldOption>, ControlError>;

    async fn clear_input(&self) -> Result<(), ControlError>;

    async fn type_char(&self, ch: char) -> Result<(), ControlError>;

    /// Activate the rendered option at `index` (click, or set value plus
    /// change event for native selects).
    async fn activate_option(&self, index: usize) -> Result<(), ControlError>;

    /// Visible text of the current selection.
    async fn selected_text(&self) -> Result<Option<String>, ControlError>;

    async fn press_key(&self, key: Key) -> Result<(), ControlError>;

    async fn click_outside(&self) -> Result<(), ControlError>;
}
