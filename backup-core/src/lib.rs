pub mod backup;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;

pub use error::{BackupError, Result};
