//! `lucid` command line: settings, page sources and terminal rendering.

pub mod cli;
mod logging;
pub mod page_source;
pub mod paths;
pub mod settings_store;
pub mod terminal;

pub use cli::{run, Cli};
pub use logging::{init_tracing, log_config, LogConfig};
pub use paths::LucidPaths;
