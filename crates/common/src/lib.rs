//! Common utilities and types shared across vardr crates.

pub mod error;
pub mod hash;
pub mod logging;
pub mod timestamp;

pub use error::{Error, Result};
pub use logging::{Level, LogBuffer, Logger};
pub use timestamp::Timestamp;
