pub mod config;
pub mod error;
pub mod layer;
pub mod process;
pub mod service;

pub use config::*;
pub use error::*;
pub use layer::*;
pub use process::*;
pub use service::*;
