use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "frontpage")]
#[command(about = "Front page aggregator for syndication feeds and git release histories")]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "FRONTPAGE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll every source and print its latest updates
    Poll {
        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,

        /// Interleave all sources into one newest-first list
        #[arg(long)]
        merged: bool,

        /// Only poll the named source
        #[arg(short, long)]
        source: Option<String>,
    },

    /// List configured sources
    Sources,

    /// Drop every cached update
    ClearCache,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_poll_flags() {
        let cli = Cli::try_parse_from([
            "frontpage", "--config", "site.toml", "poll", "--json", "--source", "news",
        ])
        .unwrap();

        assert_eq!(cli.config, "site.toml");
        match cli.command {
            Commands::Poll {
                json,
                merged,
                source,
            } => {
                assert!(json);
                assert!(!merged);
                assert_eq!(source.as_deref(), Some("news"));
            }
            _ => panic!("expected poll"),
        }
    }

    #[test]
    fn test_clear_cache_subcommand_name() {
        let cli = Cli::try_parse_from(["frontpage", "clear-cache"]).unwrap();
        assert!(matches!(cli.command, Commands::ClearCache));
    }
}
