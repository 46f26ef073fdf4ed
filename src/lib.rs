pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod logging;
pub mod session;
pub mod upload;
pub mod utils;

pub use error::GatewayError;
