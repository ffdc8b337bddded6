pub mod check;
pub mod config;
pub mod import;

pub use check::{CheckCommands, handle_check_command};
pub use config::{ConfigCommands, handle_config_command};
pub use import::{ImportCommands, handle_import_command};
