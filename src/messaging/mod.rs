mod bus;
mod console;
mod types;

pub use bus::MessageBus;
pub use console::{parse_command, spawn_console, CONSOLE_HELP};
pub use types::PianoMessage;
