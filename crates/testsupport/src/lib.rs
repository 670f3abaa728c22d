pub mod daemon;
pub mod fixtures;
pub mod http_client;

pub use daemon::*;
pub use fixtures::*;
pub use http_client::*;
