//! Error types for the presence core
//!
//! Login predicates and permission advisories are ordinary values (see
//! [`crate::AuthResult`] and [`crate::PermissionAction`]); these errors only
//! cover configuration and malformed platform input.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Battery percentage out of range: {0}")]
    InvalidBatteryPercent(u32),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
