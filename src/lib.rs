pub mod config;
pub mod cooldown;
pub mod daemon;
pub mod error;
pub mod logging;
pub mod store;

pub use error::{QuotebookError, Result};
