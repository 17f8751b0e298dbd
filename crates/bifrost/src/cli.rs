//! CLI argument parsing with clap

use bifrost_update::Channel;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// bifrost-backups - Backup orchestration
#[derive(Parser, Debug)]
#[command(name = "bifrost-backups")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the updater config file
    #[arg(long, global = true, env = "BIFROST_UPDATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Update bifrost-backups to the latest release
    Update(UpdateArgs),
}

// Version command
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Update command
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Skip confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Release channel (stable, beta); overrides the config file
    #[arg(short = 'c', long)]
    pub channel: Option<Channel>,

    /// Do not restart after updating
    #[arg(long)]
    pub no_restart: bool,

    /// Only check for updates
    #[arg(long)]
    pub check: bool,
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
    fn test_update_flags() {
        let cli = Cli::parse_from([
            "bifrost-backups",
            "update",
            "-y",
            "--channel",
            "beta",
            "--no-restart",
        ]);

        match cli.command {
            Commands::Update(args) => {
                assert!(args.yes);
                assert_eq!(args.channel, Some(Channel::Beta));
                assert!(args.no_restart);
                assert!(!args.check);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_update_short_channel_flag() {
        let cli = Cli::try_parse_from([
            "bifrost-backups",
            "update",
            "-c",
            "beta",
            "--config",
            "/etc/bifrost/update.yaml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/etc/bifrost/update.yaml")));
        match cli.command {
            Commands::Update(args) => assert_eq!(args.channel, Some(Channel::Beta)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_update_rejects_unknown_channel() {
        let result = Cli::try_parse_from(["bifrost-backups", "update", "--channel", "nightly"]);
        assert!(result.is_err());
    }
}
