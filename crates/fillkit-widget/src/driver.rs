//! One gesture set per supported widget kind. Drivers loop until the page
//! reacts; the session bounds every call with a timeout.

use std::time::Duration;

use async_trait::async_trait;

use crate::control::{Control, ControlError, Key};
use crate::kind::WidgetKind;

/// Polls to wait for a click to take before falling back to Enter, and for
/// Escape to take before clicking outside.
const GRACE_POLLS: u32 = 4;

#[async_trait]
pub(crate) trait KindDriver: Send + Sync {
    /// Bring the control to where its options can be read.
    async fn open(&self, control: &dyn Control, poll: Duration) -> Result<(), ControlError>;

    /// Activate the rendered option at `index` and wait for the selection
    /// (or the control collapsing) to confirm it.
    async fn choose(&self, control: &dyn Control, index: usize, expected: &str, poll: Duration) -> Result<(), ControlError>;

    /// Collapse the control; `Ok(false)` when it stays open.
    async fn close(&self, control: &dyn Control, poll: Duration) -> Result<bool, ControlError>;
}

pub(crate) fn driver_for(kind: WidgetKind) -> Option<&'static dyn KindDriver> {
    match kind {
        WidgetKind::Standard => Some(&NativeSelect),
        WidgetKind::Searchable => Some(&SearchableCombobox),
        WidgetKind::CustomListbox => Some(&CustomListbox),
        WidgetKind::Unknown => None,
    }
}

struct NativeSelect;
struct SearchableCombobox;
struct CustomListbox;

#[async_trait]
impl KindDriver for NativeSelect {
    async fn open(&self, control: &dyn Control, _poll: Duration) -> Result<(), ControlError> {
        // Native options are readable without expanding the picker.
        control.rendered_options().await.map(|_| ())
    }

    async fn choose(&self, control: &dyn Control, index: usize, expected: &str, poll: Duration) -> Result<(), ControlError> {
        control.activate_option(index).await?;
        loop {
            if selection_is(control, expected).await? {
                return Ok(());
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn close(&self, _control: &dyn Control, _poll: Duration) -> Result<bool, ControlError> {
        Ok(true)
    }
}

#[async_trait]
impl KindDriver for CustomListbox {
    async fn open(&self, control: &dyn Control, poll: Duration) -> Result<(), ControlError> {
        expand(control, poll).await
    }

    async fn choose(&self, control: &dyn Control, index: usize, expected: &str, poll: Duration) -> Result<(), ControlError> {
        control.activate_option(index).await?;
        loop {
            if settled(control, expected).await? {
                return Ok(());
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn close(&self, control: &dyn Control, poll: Duration) -> Result<bool, ControlError> {
        collapse(control, poll).await
    }
}

#[async_trait]
impl KindDriver for SearchableCombobox {
    async fn open(&self, control: &dyn Control, poll: Duration) -> Result<(), ControlError> {
        expand(control, poll).await
    }

    async fn choose(&self, control: &dyn Control, index: usize, expected: &str, poll: Duration) -> Result<(), ControlError> {
        control.activate_option(index).await?;
        for _ in 0..GRACE_POLLS {
            if settled(control, expected).await? {
                return Ok(());
            }
            tokio::time::sleep(poll).await;
        }
        // Some comboboxes only commit the highlighted entry on Enter.
        control.press_key(Key::Enter).await?;
        loop {
            if settled(control, expected).await? {
                return Ok(());
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn close(&self, control: &dyn Control, poll: Duration) -> Result<bool, ControlError> {
        collapse(control, poll).await
    }
}

async fn expand(control: &dyn Control, poll: Duration) -> Result<(), ControlError> {
    if control.is_expanded().await? {
        return Ok(());
    }
    control.trigger().await?;
    while !control.is_expanded().await? {
        tokio::time::sleep(poll).await;
    }
    Ok(())
}

/// Escape first, then a click outside if the control is still open.
async fn collapse(control: &dyn Control, poll: Duration) -> Result<bool, ControlError> {
    if !control.is_expanded().await? {
        return Ok(true);
    }
    control.press_key(Key::Escape).await?;
    for _ in 0..GRACE_POLLS {
        tokio::time::sleep(poll).await;
        if !control.is_expanded().await? {
            return Ok(true);
        }
    }
    control.click_outside().await?;
    tokio::time::sleep(poll).await;
    Ok(!control.is_expanded().await?)
}

async fn settled(control: &dyn Control, expected: &str) -> Result<bool, ControlError> {
    Ok(!control.is_expanded().await? || selection_is(control, expected).await?)
}

async fn selection_is(control: &dyn Control, expected: &str) -> Result<bool, ControlError> {
    Ok(control
        .selected_text()
        .await?
        .is_some_and(|text| text.trim().eq_ignore_ascii_case(expected.trim())))
}
