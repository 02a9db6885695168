pub mod cli;
pub mod config;
pub mod error;
pub mod league;
pub mod server;
pub mod simulation;
