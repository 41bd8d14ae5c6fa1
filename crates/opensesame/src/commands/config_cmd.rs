//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = super::load(global)?;
            let rendered = match global.output {
                OutputFormat::Json => serde_json::to_string_pretty(&cfg.redacted())?,
                OutputFormat::JsonCompact => serde_json::to_string(&cfg.redacted())?,
                OutputFormat::Table | OutputFormat::Plain => cfg.to_toml_redacted()?,
            };
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let path = global
                .config
                .clone()
                .unwrap_or_else(opensesame_config::config_path);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
    }
}
