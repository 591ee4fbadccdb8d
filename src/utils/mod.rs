//! Common utilities and helpers

pub mod logging;
pub mod path;
pub mod time;

pub use logging::{LogFormat, LoggingSystem};
pub use path::{expand_inputs, shell_quote, shell_quote_path};
pub use time::{format_seconds, parse_seconds};
