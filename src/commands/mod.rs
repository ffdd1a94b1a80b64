use clap::ValueEnum;

mod config_cmd;
mod sheet;

pub use config_cmd::ConfigCommand;
pub use sheet::SheetCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
