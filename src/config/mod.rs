mod config;
mod fields;

pub use config::{ConfigCreationError, ProvisioningConfig, Storage};
