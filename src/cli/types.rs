//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::evaluate::EvaluateArgs;

#[derive(Parser, Debug)]
#[command(name = "glassscore")]
#[command(about = "GlassScore - loan applicant risk assessment", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file; replaces the .glassscore/ lookup and env overrides
    #[arg(short, long, global = true, env = "GLASSSCORE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a case file and stream evidence as JSON lines
    Evaluate(EvaluateArgs),

    /// Print the effective configuration as YAML (keys redacted)
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_evaluate_with_invalidations() {
        let cli = Cli::try_parse_from([
            "glassscore",
            "evaluate",
            "--case",
            "case.yaml",
            "--invalidate",
            "4=Reason: wrong person",
            "--invalidate",
            "7=stale",
        ])
        .unwrap();

        let Commands::Evaluate(args) = cli.command else {
            panic!("expected evaluate");
        };
        assert_eq!(args.case, PathBuf::from("case.yaml"));
        assert_eq!(
            args.invalidate,
            vec![
                (4, "Reason: wrong person".to_string()),
                (7, "stale".to_string())
            ]
        );
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_config_flag_is_global() {
        let cli = Cli::try_parse_from(["glassscore", "config", "--config", "custom.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Config));
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
    }

    #[test]
    fn test_malformed_invalidation_rejected() {
        assert!(Cli::try_parse_from(["glassscore", "evaluate", "--case", "c.yaml", "--invalidate", "four"]).is_err());
    }
}
