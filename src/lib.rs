//! ChatLink Console - Main Library
//!
//! Terminal front end for the `chatlink` connection library.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **config**: YAML console configuration with environment overrides
//! - **logging**: tracing subscriber setup
//! - **commands**: parsing of console input lines
//! - **chatlink**: connection library (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use chatlink_console::bin_common::{load_config_from_env, ConfigType};
//! use chatlink_console::config::ConsoleConfig;
//! ```

// Re-export workspace libraries for convenience
pub use chatlink;

pub mod commands;
pub mod config;
pub mod logging;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
    pub use runner::{BinaryRunner, RunConfig};
}
