//! Utility modules for input validation

pub mod uri;

pub use uri::{file_uri, ImageSource};
