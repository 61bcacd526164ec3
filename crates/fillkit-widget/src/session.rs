use std::time::Duration;

use fillkit_protocol::{FieldIssue, FieldOption};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::control::{Control, ControlError};
use crate::driver::{driver_for, KindDriver};
use crate::kind::{classify, Classification, WidgetKind};

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WidgetState {
    #[default]
    Closed,
    Opening,
    Open,
    Searching,
    Selecting,
    Error,
}

impl WidgetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetState::Closed => "closed",
            WidgetState::Opening => "opening",
            WidgetState::Open => "open",
            WidgetState::Searching => "searching",
            WidgetState::Selecting => "selecting",
            WidgetState::Error => "error",
        }
    }
}

/// Timing bounds for widget interaction, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WidgetConfig {
    pub open_timeout_ms: u64,
    pub search_timeout_ms: u64,
    pub select_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub keystroke_delay_ms: u64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            open_timeout_ms: 1000,
            search_timeout_ms: 2000,
            select_timeout_ms: 1000,
            poll_interval_ms: 50,
            keystroke_delay_ms: 0,
        }
    }
}

impl WidgetConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn select_timeout(&self) -> Duration {
        Duration::from_millis(self.select_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn keystroke_delay(&self) -> Duration {
        Duration::from_millis(self.keystroke_delay_ms)
    }
}

/// Why a session ended up in [`WidgetState::Error`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetFailure {
    #[error("{operation} did not finish within {after_ms} ms")]
    Timeout { operation: &'static str, after_ms: u64 },
    #[error("control shape is not a recognized widget")]
    UnsupportedShape,
    #[error("{operation} failed: {message}")]
    Control { operation: &'static str, message: String },
    #[error("no rendered option matches \"{text}\"")]
    OptionMissing { text: String },
}

impl WidgetFailure {
    pub fn issue(&self) -> FieldIssue {
        match self {
            WidgetFailure::Timeout { .. } => FieldIssue::AdapterTimeout,
            _ => FieldIssue::AdapterUnsupportedShape,
        }
    }

    fn control(operation: &'static str, err: ControlError) -> Self {
        WidgetFailure::Control {
            operation,
            message: err.to_string(),
        }
    }

    fn timeout(operation: &'static str, after: Duration) -> Self {
        WidgetFailure::Timeout {
            operation,
            after_ms: after.as_millis() as u64,
        }
    }
}

/// Per-control handle. Classification happens once at construction; every
/// operation is bounded by the configured timeouts and reports failure as a
/// value, moving the session to [`WidgetState::Error`].
pub struct WidgetSession<'c> {
    control: &'c dyn Control,
    classification: Classification,
    config: WidgetConfig,
    state: WidgetState,
    history: Vec<WidgetState>,
    failure: Option<WidgetFailure>,
}

impl<'c> WidgetSession<'c> {
    pub fn new(control: &'c dyn Control, config: WidgetConfig) -> Self {
        let classification = classify(&control.shape());
        Self {
            control,
            classification,
            config,
            state: WidgetState::Closed,
            history: vec![WidgetState::Closed],
            failure: None,
        }
    }

    pub fn kind(&self) -> WidgetKind {
        self.classification.kind
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    /// Every state the session has been in, oldest first.
    pub fn history(&self) -> &[WidgetState] {
        &self.history
    }

    pub fn failure(&self) -> Option<&WidgetFailure> {
        self.failure.as_ref()
    }

    fn driver(&self) -> Option<&'static dyn KindDriver> {
        driver_for(self.classification.kind)
    }

    fn transition(&mut self, next: WidgetState) {
        if self.state == next {
            return;
        }
        tracing::debug!(
            target: "fillkit::widget",
            kind = self.classification.kind.as_str(),
            from = self.state.as_str(),
            to = next.as_str(),
            "widget transition"
        );
        self.state = next;
        self.history.push(next);
    }

    fn fail(&mut self, failure: WidgetFailure) -> bool {
        tracing::warn!(
            target: "fillkit::widget",
            kind = self.classification.kind.as_str(),
            state = self.state.as_str(),
            failure = %failure,
            "widget interaction failed"
        );
        self.failure = Some(failure);
        self.transition(WidgetState::Error);
        false
    }

    /// Open the control so its options can be read. `true` once `Open`.
    pub async fn open(&mut self) -> bool {
        match self.state {
            WidgetState::Open => return true,
            WidgetState::Error => return false,
            _ => {}
        }
        let Some(driver) = self.driver() else {
            self.transition(WidgetState::Opening);
            return self.fail(WidgetFailure::UnsupportedShape);
        };
        self.transition(WidgetState::Opening);
        let budget = self.config.open_timeout();
        match timeout(budget, driver.open(self.control, self.config.poll_interval())).await {
            Ok(Ok(())) => {
                self.transition(WidgetState::Open);
                true
            }
            Ok(Err(err)) => self.fail(WidgetFailure::control("open", err)),
            Err(_) => self.fail(WidgetFailure::timeout("open", budget)),
        }
    }

    /// Options currently rendered, in rendering order. Empty unless `Open`.
    /// Virtualized lists only yield the rendered window.
    pub async fn enumerate(&mut self) -> Vec<FieldOption> {
        if self.state != WidgetState::Open {
            return Vec::new();
        }
        if self.classification.virtualized {
            tracing::debug!(
                target: "fillkit::widget",
                kind = self.classification.kind.as_str(),
                "virtualized list; enumerating rendered window only"
            );
        }
        let budget = self.config.open_timeout();
        match timeout(budget, self.control.rendered_options()).await {
            Ok(Ok(options)) => options,
            Ok(Err(err)) => {
                self.fail(WidgetFailure::control("enumerate", err));
                Vec::new()
            }
            Err(_) => {
                self.fail(WidgetFailure::timeout("enumerate", budget));
                Vec::new()
            }
        }
    }

    /// Type `text` into a searchable control and return the re-rendered
    /// options. Other kinds have nothing to search and yield an empty list.
    pub async fn search(&mut self, text: &str) -> Vec<FieldOption> {
        if self.state != WidgetState::Open {
            return Vec::new();
        }
        if self.classification.kind != WidgetKind::Searchable {
            tracing::debug!(
                target: "fillkit::widget",
                kind = self.classification.kind.as_str(),
                "search requested on a control without a search input"
            );
            return Vec::new();
        }
        self.transition(WidgetState::Searching);
        let control = self.control;
        let poll = self.config.poll_interval();
        let keystroke = self.config.keystroke_delay();
        let budget = self.config.search_timeout();
        let typed = async move {
            let before = control.rendered_options().await?;
            control.clear_input().await?;
            for ch in text.chars() {
                control.type_char(ch).await?;
                if !keystroke.is_zero() {
                    tokio::time::sleep(keystroke).await;
                }
            }
            loop {
                let now = control.rendered_options().await?;
                if now != before {
                    return Ok::<_, ControlError>(now);
                }
                tokio::time::sleep(poll).await;
            }
        };
        match timeout(budget, typed).await {
            Ok(Ok(options)) => {
                self.transition(WidgetState::Open);
                options
            }
            Ok(Err(err)) => {
                self.fail(WidgetFailure::control("search", err));
                Vec::new()
            }
            Err(_) => {
                // The filter may legitimately leave the list unchanged; take
                // one last bounded look before giving up.
                match timeout(self.config.open_timeout(), self.control.rendered_options()).await {
                    Ok(Ok(options)) => {
                        self.transition(WidgetState::Open);
                        options
                    }
                    _ => {
                        self.fail(WidgetFailure::timeout("search", budget));
                        Vec::new()
                    }
                }
            }
        }
    }

    /// Activate `option` and wait for the control to confirm it. `true`
    /// leaves the session `Closed`.
    pub async fn select(&mut self, option: &FieldOption) -> bool {
        self.select_at(None, option).await
    }

    /// Like [`select`](Self::select), but activates the rendered row at
    /// `index` while that row still shows `option`. Rows with identical
    /// text stay distinct this way.
    pub async fn select_index(&mut self, index: usize, option: &FieldOption) -> bool {
        self.select_at(Some(index), option).await
    }

    async fn select_at(&mut self, hint: Option<usize>, option: &FieldOption) -> bool {
        match self.state {
            WidgetState::Open => {}
            WidgetState::Closed => return self.already_selected(option).await,
            _ => return false,
        }
        let Some(driver) = self.driver() else {
            return self.fail(WidgetFailure::UnsupportedShape);
        };

        let mut rendered = self.enumerate().await;
        if self.state != WidgetState::Open {
            return false;
        }
        let mut index = hint
            .filter(|&i| rendered.get(i).is_some_and(|row| !row.disabled && same_option(row, option)))
            .or_else(|| position_of(&rendered, option));
        // A search re-renders the list, so the hint no longer applies.
        if index.is_none() && self.classification.kind == WidgetKind::Searchable {
            rendered = self.search(&option.text).await;
            if self.state != WidgetState::Open {
                return false;
            }
            index = position_of(&rendered, option);
        }
        let Some(index) = index else {
            return self.fail(WidgetFailure::OptionMissing {
                text: option.text.clone(),
            });
        };

        self.transition(WidgetState::Selecting);
        let budget = self.config.select_timeout();
        let poll = self.config.poll_interval();
        match timeout(budget, driver.choose(self.control, index, &rendered[index].text, poll)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return self.fail(WidgetFailure::control("select", err)),
            Err(_) => return self.fail(WidgetFailure::timeout("select", budget)),
        }
        // Multi-select and some listboxes stay open after a pick.
        match timeout(budget, driver.close(self.control, poll)).await {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) | Ok(Err(_)) | Err(_) => {
                tracing::debug!(
                    target: "fillkit::widget",
                    kind = self.classification.kind.as_str(),
                    "control still expanded after selection"
                );
            }
        }
        self.transition(WidgetState::Closed);
        true
    }

    async fn already_selected(&self, option: &FieldOption) -> bool {
        match timeout(self.config.select_timeout(), self.control.selected_text()).await {
            Ok(Ok(Some(text))) => text.trim().eq_ignore_ascii_case(option.text.trim()),
            _ => false,
        }
    }

    /// Collapse the control: Escape, then a click outside if needed.
    pub async fn close(&mut self) -> bool {
        let Some(driver) = self.driver() else {
            return self.state == WidgetState::Closed;
        };
        let budget = self.config.select_timeout();
        let outcome = match self.state {
            WidgetState::Closed => return true,
            WidgetState::Error => {
                // Best effort; the session stays failed.
                return matches!(
                    timeout(budget, driver.close(self.control, self.config.poll_interval())).await,
                    Ok(Ok(true))
                );
            }
            _ => timeout(budget, driver.close(self.control, self.config.poll_interval())).await,
        };
        match outcome {
            Ok(Ok(true)) => {
                self.transition(WidgetState::Closed);
                true
            }
            Ok(Ok(false)) => self.fail(WidgetFailure::Control {
                operation: "close",
                message: "control stayed expanded".into(),
            }),
            Ok(Err(err)) => self.fail(WidgetFailure::control("close", err)),
            Err(_) => self.fail(WidgetFailure::timeout("close", budget)),
        }
    }

    /// Walk a multi-level menu: each segment but the last reveals the next
    /// level, the last one is selected.
    pub async fn select_path(&mut self, path: &[&str]) -> bool {
        let Some((last, levels)) = path.split_last() else {
            return false;
        };
        if !levels.is_empty() && !self.classification.multi_level {
            tracing::debug!(
                target: "fillkit::widget",
                kind = self.classification.kind.as_str(),
                depth = path.len(),
                "control has no nested levels"
            );
            return false;
        }
        if !self.open().await {
            return false;
        }
        for segment in levels {
            let rendered = self.enumerate().await;
            let Some(index) = find_segment(&rendered, segment) else {
                self.close().await;
                return self.fail(WidgetFailure::OptionMissing {
                    text: (*segment).to_string(),
                });
            };
            let control = self.control;
            let poll = self.config.poll_interval();
            let budget = self.config.select_timeout();
            let reveal = async move {
                control.activate_option(index).await?;
                loop {
                    let now = control.rendered_options().await?;
                    if now != rendered {
                        return Ok::<_, ControlError>(());
                    }
                    tokio::time::sleep(poll).await;
                }
            };
            match timeout(budget, reveal).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return self.fail(WidgetFailure::control("select_path", err)),
                Err(_) => return self.fail(WidgetFailure::timeout("select_path", budget)),
            }
        }
        let rendered = self.enumerate().await;
        match find_segment(&rendered, last) {
            Some(index) => {
                let option = rendered[index].clone();
                self.select(&option).await
            }
            None => {
                self.close().await;
                self.fail(WidgetFailure::OptionMissing {
                    text: (*last).to_string(),
                })
            }
        }
    }
}

fn same_option(row: &FieldOption, option: &FieldOption) -> bool {
    row.text == option.text && row.value == option.value
}

/// First enabled row with the same text and value, then a case-insensitive
/// text match.
fn position_of(rendered: &[FieldOption], option: &FieldOption) -> Option<usize> {
    rendered
        .iter()
        .position(|o| !o.disabled && same_option(o, option))
        .or_else(|| {
            let wanted = option.text.trim();
            rendered
                .iter()
                .position(|o| !o.disabled && o.text.trim().eq_ignore_ascii_case(wanted))
        })
}

fn find_segment(rendered: &[FieldOption], segment: &str) -> Option<usize> {
    let needle = segment.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    rendered.iter().position(|o| {
        o.is_selectable() && (o.text.to_lowercase().contains(&needle) || o.value.to_lowercase().contains(&needle))
    })
}
