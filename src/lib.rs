pub mod core;
pub mod plugins;
pub mod security;
pub mod testing;
pub mod validation;

pub use core::*;
pub use plugins::{NuGetPlugin, find_packages};
pub use security::{
    CommandError, CommandExecutor, HostResolver, SourceUrlError, SystemCommandExecutor,
};
pub use validation::PathError;
