pub mod config_validator;
pub mod package_path;

pub use config_validator::{validate_config, validate_raw_config};
pub use package_path::{PathError, validate_package_path};
