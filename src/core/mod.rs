pub mod codec;
pub mod config;
pub mod cooking;
pub mod driver;
pub mod engine;
pub mod host;
pub mod matcher;
