//! Output nodes
//!
//! Terminal side effects. Each returns the payload it received, which
//! becomes the branch's terminal payload.

mod clipboard_write;
mod collect;
mod notify;
mod open_url;
mod render_panel;
mod write_file;

pub use clipboard_write::ClipboardWrite;
pub use collect::Collect;
pub use notify::Notify;
pub use open_url::OpenUrl;
pub use render_panel::RenderPanel;
pub use write_file::WriteFile;
