pub mod cli;

pub use cli::{CliHandler, Cli, Commands, CliError};
