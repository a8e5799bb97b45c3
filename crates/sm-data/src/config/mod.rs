//! Map and mount configuration

pub mod map_config;
pub mod mount_config;

pub use map_config::*;
pub use mount_config::*;
