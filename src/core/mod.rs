pub mod auth;
pub mod config;
pub mod display;
pub mod formatter;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod process;
pub mod providers;
