//! Logger setup shared by the studio and tests.

mod init;

pub use init::{init_logging, LoggingConfig};
