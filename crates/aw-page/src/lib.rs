//! Page-structure model for adwatch.
//!
//! This crate is the boundary between the watcher engine and the host
//! page. It provides:
//! - Typed element/page snapshot types with the visibility rules the
//!   classifier and automator share
//! - The fixed, ordered structural pattern lists (scan priority only;
//!   candidates are always deduplicated before use)
//! - The [`PageHost`] trait through which the engine reads page state and
//!   dispatches synthesized interactions
//! - [`ScriptedPage`], an in-memory host used by tests and the replay
//!   binary

pub mod element;
pub mod host;
pub mod page;
pub mod pattern;
pub mod scripted;

pub use element::{ComputedStyle, ElementId, MediaState, PageElement, Rect};
pub use host::{PageError, PageHost, PointerSignal};
pub use page::Page;
pub use pattern::Pattern;
pub use scripted::ScriptedPage;
