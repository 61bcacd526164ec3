//! Drive dropdown-like controls that do not expose their options up front.
//!
//! A [`WidgetSession`] wraps one [`Control`] (the page-side collaborator),
//! classifies it once into a [`WidgetKind`], and walks the
//! `Closed → Opening → Open → (Searching →) Selecting → Closed` state machine.
//! Every step is bounded by [`WidgetConfig`] timeouts; failures surface as
//! `false` or an empty option list and leave the session in `Error`.

pub mod control;
mod driver;
pub mod kind;
pub mod mock;
mod session;
pub mod shape;

pub use control::{Control, ControlError, Key};
pub use kind::{classify, Classification, WidgetKind};
pub use mock::MockControl;
pub use session::{WidgetConfig, WidgetFailure, WidgetSession, WidgetState};
pub use shape::ControlShape;
