//! CLI command implementations.

pub mod chains;
pub mod init;
pub mod scan;
pub mod watch;
