pub mod config_cmd;
pub mod output;
pub mod renderer;
pub mod status_cmd;
pub mod watch_cmd;
