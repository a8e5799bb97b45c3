//! Binding core shared by every UI surface
//!
//! A [`StoryMount`] wires one story engine to one map slot and exposes the
//! state a set of story controls needs. UI crates only render it.

mod mount;
mod view_model;

pub use mount::StoryMount;
pub use view_model::{step_label, StoryViewModel};
