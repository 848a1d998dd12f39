//! `hidaya` command-line interface: search, embed, ask, index, show and
//! ingest over a verse corpus.

pub mod app;
pub mod commands;
pub mod config;
pub mod output;

pub use app::App;
pub use commands::Cli;
pub use config::AppConfig;
