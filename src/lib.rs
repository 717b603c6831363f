pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod inventory;
pub mod jobs;
pub mod models;
pub mod pipeline;
pub mod scanner;
pub mod utils;
