pub mod cli;
pub mod models;
pub mod runtime;
pub mod services;
