use std::path::PathBuf;

use clap::{Parser, Subcommand};
use prerend_observe::{LoggerFormat, LoggerLevel};

#[derive(Debug, Parser)]
#[command(name = "prerend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build a web application and prerender its routes to static HTML", long_about = None)]
pub struct Cli {
    /// JSON configuration file (default: ./prerend.json if present)
    #[arg(short, long, global = true, env = "PREREND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter expression, e.g. "debug" or "prerend_exec=trace,info"
    #[arg(long, global = true, env = "PREREND_LOG")]
    pub log_level: Option<LoggerLevel>,

    /// Log output format: text, json or journald
    #[arg(long, global = true)]
    pub log_format: Option<LoggerFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the steps, start the server and write the rendered pages
    Render {
        /// Build in production mode
        #[arg(short, long)]
        production: bool,
    },

    /// Render, then run the configured deploy command
    Deploy {
        /// Build in production mode
        #[arg(short, long)]
        production: bool,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_with_short_production_flag() {
        let cli = Cli::try_parse_from(["prerend", "render", "-p"]).unwrap();
        assert!(matches!(cli.command, Command::Render { production: true }));
        assert!(cli.config.is_none());
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "prerend",
            "deploy",
            "--config",
            "site.json",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Deploy { production: false }));
        assert_eq!(cli.config, Some(PathBuf::from("site.json")));
        assert_eq!(cli.log_level.unwrap().as_str(), "debug");
        assert_eq!(cli.log_format, Some(LoggerFormat::Json));
    }

    #[test]
    fn rejects_bad_log_level() {
        assert!(Cli::try_parse_from(["prerend", "--log-level", "app=loud", "config"]).is_err());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["prerend"]).is_err());
    }
}
