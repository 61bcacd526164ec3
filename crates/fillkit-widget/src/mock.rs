//! Scripted in-memory control for exercising sessions and passes without a page.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fillkit_protocol::FieldOption;

use crate::control::{Control, ControlError, Key};
use crate::shape::ControlShape;

#[derive(Debug, Default)]
struct MockState {
    triggered_at: Option<Instant>,
    typed: String,
    selected: Option<String>,
    /// Index into `levels` of the submenu currently shown.
    level: usize,
    actions: Vec<String>,
}

/// A control whose reactions follow a fixed script.
///
/// By default it expands as soon as it is triggered, collapses when an
/// option is activated or Escape is pressed, and filters its options by the
/// typed text when its shape is searchable.
#[derive(Debug)]
pub struct MockControl {
    shape: ControlShape,
    levels: Vec<Vec<FieldOption>>,
    expand_after: Option<Duration>,
    collapse_on_select: bool,
    escape_closes: bool,
    ignores_clicks: bool,
    fail_on: Option<&'static str>,
    state: Mutex<MockState>,
}

impl MockControl {
    pub fn new<I, S>(shape: ControlShape, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(FieldOption::labelled).collect();
        Self::with_options(shape, options)
    }

    pub fn with_options(shape: ControlShape, options: Vec<FieldOption>) -> Self {
        Self {
            shape,
            levels: vec![options],
            expand_after: Some(Duration::ZERO),
            collapse_on_select: true,
            escape_closes: true,
            ignores_clicks: false,
            fail_on: None,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Options revealed after activating an entry of the previous level.
    pub fn with_submenu<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.levels.push(options.into_iter().map(FieldOption::labelled).collect());
        self
    }

    pub fn expand_after(mut self, delay: Duration) -> Self {
        self.expand_after = Some(delay);
        self
    }

    pub fn never_expands(mut self) -> Self {
        self.expand_after = None;
        self
    }

    pub fn stays_open_on_select(mut self) -> Self {
        self.collapse_on_select = false;
        self
    }

    /// Escape is ignored; only a click outside collapses the control.
    pub fn ignores_escape(mut self) -> Self {
        self.escape_closes = false;
        self
    }

    /// Activating an option does nothing.
    pub fn ignores_clicks(mut self) -> Self {
        self.ignores_clicks = true;
        self
    }

    /// Make the named primitive (`trigger`, `rendered_options`, ...) fail.
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    /// Gestures received so far, e.g. `["trigger", "type:U", "activate:2"]`.
    pub fn actions(&self) -> Vec<String> {
        self.lock().actions.clone()
    }

    pub fn selected(&self) -> Option<String> {
        self.lock().selected.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, operation: &'static str) -> Result<(), ControlError> {
        if self.fail_on == Some(operation) {
            return Err(ControlError::Detached);
        }
        Ok(())
    }

    fn native(&self) -> bool {
        self.shape.tag == "select"
    }

    fn expanded(&self, state: &MockState) -> bool {
        match (state.triggered_at, self.expand_after) {
            (Some(at), Some(delay)) => at.elapsed() >= delay,
            _ => false,
        }
    }

    fn visible(&self, state: &MockState) -> Vec<FieldOption> {
        if !self.native() && !self.expanded(state) {
            return Vec::new();
        }
        let level = self.levels.get(state.level).cloned().unwrap_or_default();
        let needle = state.typed.trim().to_lowercase();
        if needle.is_empty() {
            return level;
        }
        level
            .into_iter()
            .filter(|o| o.text.to_lowercase().contains(&needle))
            .collect()
    }
}

#[async_trait]
impl Control for MockControl {
    fn shape(&self) -> ControlShape {
        self.shape.clone()
    }

    async fn trigger(&self) -> Result<(), ControlError> {
        self.check("trigger")?;
        let mut state = self.lock();
        state.actions.push("trigger".into());
        if state.triggered_at.is_none() {
            state.triggered_at = Some(Instant::now());
        }
        Ok(())
    }

    async fn is_expanded(&self) -> Result<bool, ControlError> {
        self.check("is_expanded")?;
        let state = self.lock();
        Ok(self.expanded(&state))
    }

    async fn rendered_options(&self) -> Result<Vec<FieldOption>, ControlError> {
        self.check("rendered_options")?;
        let state = self.lock();
        Ok(self.visible(&state))
    }

    async fn clear_input(&self) -> Result<(), ControlError> {
        self.check("clear_input")?;
        let mut state = self.lock();
        state.actions.push("clear".into());
        state.typed.clear();
        Ok(())
    }

    async fn type_char(&self, ch: char) -> Result<(), ControlError> {
        self.check("type_char")?;
        let mut state = self.lock();
        state.actions.push(format!("type:{ch}"));
        state.typed.push(ch);
        Ok(())
    }

    async fn activate_option(&self, index: usize) -> Result<(), ControlError> {
        self.check("activate_option")?;
        let mut state = self.lock();
        state.actions.push(format!("activate:{index}"));
        if self.ignores_clicks {
            return Ok(());
        }
        let visible = self.visible(&state);
        let Some(option) = visible.get(index) else {
            return Err(ControlError::Interaction(format!("no option at {index}")));
        };
        if state.level + 1 < self.levels.len() {
            state.level += 1;
            state.typed.clear();
            return Ok(());
        }
        state.selected = Some(option.text.clone());
        if self.collapse_on_select {
            state.triggered_at = None;
        }
        Ok(())
    }

    async fn selected_text(&self) -> Result<Option<String>, ControlError> {
        self.check("selected_text")?;
        Ok(self.lock().selected.clone())
    }

    async fn press_key(&self, key: Key) -> Result<(), ControlError> {
        self.check("press_key")?;
        let mut state = self.lock();
        match key {
            Key::Escape => {
                state.actions.push("escape".into());
                if self.escape_closes {
                    state.triggered_at = None;
                }
            }
            Key::Enter => {
                state.actions.push("enter".into());
                if let Some(first) = self.visible(&state).first() {
                    state.selected = Some(first.text.clone());
                    state.triggered_at = None;
                }
            }
        }
        Ok(())
    }

    async fn click_outside(&self) -> Result<(), ControlError> {
        self.check("click_outside")?;
        let mut state = self.lock();
        state.actions.push("click_outside".into());
        state.triggered_at = None;
        Ok(())
    }
}
