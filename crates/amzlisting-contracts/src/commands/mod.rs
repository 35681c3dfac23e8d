mod command_registry;
mod parser;

pub use command_registry::SESSION_HELP;
pub use parser::{parse_command, SessionCommand};
