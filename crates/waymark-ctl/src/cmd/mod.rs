//! CLI command modules.

pub mod content;
pub mod http;
pub mod status;
pub mod token;
