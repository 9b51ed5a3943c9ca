// src/lib.rs
pub mod agent;
pub mod app;
pub mod cert;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod discovery;
pub mod error;
pub mod flags;
pub mod types;
pub mod ui;
pub mod utils;
