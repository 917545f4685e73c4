pub mod app;
pub mod board;
pub mod config;
pub mod error;
pub mod gemini;
pub mod output;
pub mod plan;
pub mod projector;
pub mod server;
pub mod store;
pub mod trips;
