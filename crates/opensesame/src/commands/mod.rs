//! Command handlers: config -> bridge / store -> output formatting.

pub mod config_cmd;
pub mod points;
pub mod serve;

use opensesame_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the configuration selected by `--config`, or the default location.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(opensesame_config::load_config(global.config.as_deref())?)
}
