pub mod nuget_plugin;
pub mod package_locator;

pub use nuget_plugin::{NuGetPlugin, normalize_version, push_args};
pub use package_locator::{PACKAGE_EXTENSION, find_packages};
