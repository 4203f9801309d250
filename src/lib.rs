//! quickref library - Chrome API quick reference from the terminal
//!
//! This library exposes the suggestion history and tip refresh cores for
//! testing purposes; the binary is a thin shell over them.

pub mod alarms;
pub mod browser;
pub mod config;
pub mod error;
pub mod messages;
pub mod store;
pub mod suggestions;
pub mod tips;
pub mod worker;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::QuickrefError;
