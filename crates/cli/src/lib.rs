//! Library side of the `reloadwatch` command
//!
//! Exposed so the command implementations can be tested directly.

pub mod cmd;
pub mod command;
pub mod logging;
pub mod settings;
