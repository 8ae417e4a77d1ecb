pub mod config;
pub mod error;
pub mod model;
pub mod node;
pub mod routers;
pub mod transport;

pub use error::{Result, RouteLabError};
