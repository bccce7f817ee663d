use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse profile: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid profile: {0}")]
    Invalid(String),
    #[error("profile not found: {}", .0.display())]
    ProfileNotFound(PathBuf),
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("capture device '{device}' is already owned by {owner}")]
    Busy { device: String, owner: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
