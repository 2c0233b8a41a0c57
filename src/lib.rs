pub mod archive;
pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod notify;
pub mod remote;
pub mod schedule;
pub mod types;
pub mod util;

pub use error::{Result, VaultError};
pub use types::RunMode;
