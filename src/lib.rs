pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod repositories;
pub mod services;
pub mod state;
