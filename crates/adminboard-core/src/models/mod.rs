//! Data models shared by the session core and its consumers.
//!
//! - `Profile`, `Role`: the authenticated identity and its access level
//! - `Section`: dashboard areas and which roles may open them

pub mod profile;
pub mod section;

pub use profile::{Profile, Role};
pub use section::{visible_sections, Section};
