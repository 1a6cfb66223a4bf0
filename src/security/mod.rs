pub mod command_executor;
pub mod token_manager;
pub mod url_validator;

pub use command_executor::{CommandError, CommandExecutor, SystemCommandExecutor};
pub use token_manager::{mask_secret_in, mask_token, redact_flag_value};
pub use url_validator::{
    HostResolver, SourceUrlError, SystemResolver, is_private_ip, validate_source_url,
};
