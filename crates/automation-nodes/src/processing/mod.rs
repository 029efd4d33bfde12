//! Processing nodes
//!
//! Nodes that transform the payload flowing through a branch.

mod format_text;
mod http_fetch;
mod json_extract;
mod regex_replace;
mod run_command;

pub use format_text::FormatText;
pub use http_fetch::HttpFetch;
pub use json_extract::JsonExtract;
pub use regex_replace::RegexReplace;
pub use run_command::RunCommand;
