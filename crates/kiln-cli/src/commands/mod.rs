//! Command implementations.
//!
//! Each command lives in its own module and exposes an `execute` function
//! taking the parsed arguments.

pub mod build;
pub mod dev;
pub mod fix;
pub mod init;
pub(crate) mod utils;
pub mod validate;
pub mod watch;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
pub use fix::execute as fix_execute;
pub use init::execute as init_execute;
pub use validate::execute as validate_execute;
pub use watch::execute as watch_execute;
