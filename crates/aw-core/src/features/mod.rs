//! Session-scoped ad mitigations: audio muting and visual blurring.

pub mod blur;
pub mod mute;

pub use blur::BlurApplier;
pub use mute::{MuteApplier, RestoreSnapshot};
