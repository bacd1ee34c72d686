//! The host boundary the watcher engine acts through.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::ElementId;
use crate::page::Page;

/// Pointer-interaction signals the automator synthesizes, in dispatch
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerSignal {
    Hover,
    Press,
    Release,
    Click,
}

impl PointerSignal {
    /// The full synthesized sequence for one interaction.
    pub const SEQUENCE: [PointerSignal; 4] = [
        PointerSignal::Hover,
        PointerSignal::Press,
        PointerSignal::Release,
        PointerSignal::Click,
    ];
}

/// Errors from host interactions.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("element {0} not found")]
    NotFound(ElementId),

    #[error("element {0} is not connected")]
    Disconnected(ElementId),

    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

/// Access to the live page plus the two side-effecting actions the
/// automator needs. The engine reads everything else straight off the
/// snapshot and writes styling through [`Page`] mutators.
pub trait PageHost {
    fn page(&self) -> &Page;

    fn page_mut(&mut self) -> &mut Page;

    /// Deliver one synthesized pointer signal to a control.
    fn dispatch_pointer(
        &mut self,
        target: ElementId,
        signal: PointerSignal,
    ) -> Result<(), PageError>;

    /// Invoke the control's native activation (the fallback after the
    /// pointer sequence).
    fn activate(&mut self, target: ElementId) -> Result<(), PageError>;
}
