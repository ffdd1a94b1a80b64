use clap::{Args, Subcommand};

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("collection_label: {}", config.collection_label.value);
                        println!("  source: {}", config.collection_label.source);
                        println!();

                        println!("template_id: {}", config.template_id.value);
                        println!("  source: {}", config.template_id.source);
                        println!();

                        let token = if config.access_token.value.is_some() {
                            "********"
                        } else {
                            "(not set)"
                        };
                        println!("access_token: {}", token);
                        println!("  source: {}", config.access_token.source);
                        if let Some(expires_at) = config.token_expires_at {
                            println!("  expires: {}", expires_at.to_rfc3339());
                        }
                        if let Some(scopes) = &config.token_scopes {
                            println!("  scopes: {}", scopes.join(", "));
                        }
                        println!();

                        println!("value_input: {}", config.value_input.value.as_api_str());
                        println!("  source: {}", config.value_input.source);
                        println!();

                        println!("value_render: {}", config.value_render.value.as_api_str());
                        println!("  source: {}", config.value_render.source);
                        println!();

                        println!("timeout_secs: {}", config.timeout_secs.value);
                        println!("  source: {}", config.timeout_secs.source);
                        println!();

                        let layout = &config.layout.value;
                        println!(
                            "layout: {} rows {}-{}, {} column(s)",
                            layout.sheet,
                            layout.first_row,
                            layout.last_row,
                            layout.columns.len()
                        );
                        println!("  source: {}", config.layout.source);
                    }
                }
                Ok(())
            }
        }
    }
}
