//! CLI command implementations

mod assign;
mod devices;
mod presentation;
mod send;
mod watch;

pub use assign::{assign_command, default_command, unassign_command};
pub use devices::devices_command;
pub use presentation::{presentation_put_command, presentation_show_command};
pub use send::send_command;
pub use watch::watch_command;
