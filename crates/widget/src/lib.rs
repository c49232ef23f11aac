mod config;
mod hotkey;
mod text_editor;
mod toolbar;

pub use crate::config::*;
pub use crate::hotkey::*;
pub use crate::text_editor::*;
pub use crate::toolbar::*;
