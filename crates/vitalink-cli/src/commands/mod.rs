//! Command implementations for the CLI.

mod alias;
mod config;
mod kinds;
mod pair;
mod read;

pub use alias::cmd_alias;
pub use config::cmd_config;
pub use kinds::cmd_kinds;
pub use pair::cmd_pair;
pub use read::cmd_read;
