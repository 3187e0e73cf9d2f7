//! cutover — zero-downtime blue-green deployments.
//!
//! # Usage
//!
//! ```text
//! cutover deploy production ./build/shop-1.4.2.tar.gz --sha256 <hex>
//! cutover status production
//! cutover rollback production
//! ```
//!
//! The process exit code tells calling automation how a run ended; see
//! `cutover_rollout::outcome` for the table.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cutover_rollout::outcome::EXIT_CONFIG;

mod commands;
mod logging;
mod signals;

use logging::LogFormat;

#[derive(Parser)]
#[command(
    name = "cutover",
    about = "cutover — zero-downtime blue-green deployments",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the tier configuration.
    #[arg(short, long, global = true, default_value = "cutover.toml")]
    config: PathBuf,

    /// Log line format (logs go to stderr).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy an artifact to the inactive slot of a tier and switch
    /// traffic to it once it passes the health and smoke gates.
    Deploy {
        /// Tier name from the configuration (e.g. production, staging).
        tier: String,
        /// Build to deploy: .tar.gz, .tgz, .tar, or an unpacked directory.
        artifact: PathBuf,
        /// Override the health gate timeout (e.g. "300s", "5m").
        #[arg(long)]
        timeout: Option<String>,
        /// Expected SHA-256 of the archive, checked before anything changes.
        #[arg(long)]
        sha256: Option<String>,
    },
    /// Show which slot is live and whether each slot's service is running.
    Status {
        tier: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Switch traffic back to the retained slot from the previous
    /// deployment.
    Rollback {
        tier: String,
        /// Override the health gate timeout.
        #[arg(long)]
        timeout: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // clap exits with 2 on usage errors, which would read as "install failed".
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { EXIT_CONFIG } else { 0 });
        }
    };
    logging::init(cli.log_format);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "cutover failed");
            eprintln!("error: {e:#}");
            EXIT_CONFIG
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Deploy {
            tier,
            artifact,
            timeout,
            sha256,
        } => {
            commands::deploy::deploy(&cli.config, &tier, artifact, timeout.as_deref(), sha256)
                .await
        }
        Commands::Status { tier, format } => {
            commands::status::status(&cli.config, &tier, &format).await
        }
        Commands::Rollback { tier, timeout } => {
            commands::rollback::rollback(&cli.config, &tier, timeout.as_deref()).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_deploy_with_options() {
        let cli = Cli::try_parse_from([
            "cutover",
            "deploy",
            "production",
            "./shop.tar.gz",
            "--timeout",
            "2m",
            "--sha256",
            "abc123",
            "--config",
            "/etc/cutover/cutover.toml",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("/etc/cutover/cutover.toml"));
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Deploy {
                tier,
                artifact,
                timeout,
                sha256,
            } => {
                assert_eq!(tier, "production");
                assert_eq!(artifact, PathBuf::from("./shop.tar.gz"));
                assert_eq!(timeout.as_deref(), Some("2m"));
                assert_eq!(sha256.as_deref(), Some("abc123"));
            }
            _ => panic!("expected deploy"),
        }
    }

    #[test]
    fn deploy_requires_an_artifact() {
        assert!(Cli::try_parse_from(["cutover", "deploy", "production"]).is_err());
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["cutover", "status", "staging"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("cutover.toml"));
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(matches!(cli.command, Commands::Status { ref format, .. } if format == "text"));
    }
}
