//! Device profile and configuration file handling.
//!
//! The [`TargetProfile`] describes the display being driven. The
//! [`FileConfig`] groups it with compiler, preview and threading settings
//! and loads the lot from TOML.

mod file;
mod profile;

pub use file::{ConfigError, FileConfig};
pub use profile::TargetProfile;
