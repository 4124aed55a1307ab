//! Easel application shell.
//!
//! A headless front end over `easel-core`: loads configuration, builds a
//! session with the stock plugins and runs one command against it.

pub mod config;
pub mod error;
pub mod session;
pub mod shortcuts;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use session::{Session, SessionSummary};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for `easel`.
#[derive(Debug, Clone, Parser)]
#[command(name = "easel")]
#[command(about = "Headless easel scene editor")]
#[command(version)]
pub struct CliArgs {
    /// JSON config file; defaults are used when omitted
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Import a scene through the plugins and write it back out
    Convert { input: PathBuf, output: PathBuf },
    /// Print a summary of a scene document
    Info { input: PathBuf },
    /// List the keyboard shortcuts bound by the plugins
    Shortcuts,
}

/// Run one command; returns what should be printed.
pub async fn run(args: &CliArgs) -> AppResult<String> {
    let config = AppConfig::load_or_default(args.config.as_deref())?;
    let session = Session::new(&config)?;

    match &args.command {
        Command::Convert { input, output } => {
            session.open(input).await?;
            session.save(output).await?;
            Ok(format!("{} -> {}", input.display(), output.display()))
        }
        Command::Info { input } => {
            session.open(input).await?;
            let summary = session.summary()?;
            Ok(serde_json::to_string_pretty(&summary).unwrap_or_else(|e| e.to_string()))
        }
        Command::Shortcuts => Ok(shortcuts::render(&session.shortcuts())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_convert() {
        let args = CliArgs::parse_from(["easel", "-c", "cfg.json", "convert", "a.json", "b.json"]);
        assert_eq!(args.config, Some(PathBuf::from("cfg.json")));
        assert!(matches!(args.command, Command::Convert { .. }));
    }

    #[test]
    fn test_run_convert() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.json");
        let output = dir.path().join("b.json");
        fs::write(
            &input,
            r#"{ "objects": [ { "type": "rect", "width": 10, "height": 10 } ] }"#,
        )
        .unwrap();

        let args = CliArgs {
            config: None,
            command: Command::Convert {
                input: input.clone(),
                output: output.clone(),
            },
        };
        pollster::block_on(run(&args)).unwrap();
        assert!(fs::read_to_string(&output).unwrap().contains("\"rect\""));
    }

    #[test]
    fn test_run_shortcuts() {
        let args = CliArgs::parse_from(["easel", "shortcuts"]);
        let out = pollster::block_on(run(&args)).unwrap();
        assert!(out.contains("Ctrl+Y"));
    }
}
