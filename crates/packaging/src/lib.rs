pub mod context;
pub mod dockerfile;
pub mod image_builder;

pub use context::*;
pub use dockerfile::*;
pub use image_builder::*;
