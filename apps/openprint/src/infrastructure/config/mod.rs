//! Configuration Module
//!
//! Environment-variable settings and symbol-file loading for the watcher.

mod settings;

pub use settings::{
    ChannelSettings, ConfigError, Credentials, DataFeed, WatcherConfig, load_symbol_file,
};
