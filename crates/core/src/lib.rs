mod commands;
mod core;
mod normalize;
mod ops;
mod render;
mod serde_value;
mod transforms;

pub use crate::commands::*;
pub use crate::core::*;
pub use crate::normalize::*;
pub use crate::ops::*;
pub use crate::render::*;
pub use crate::serde_value::*;
