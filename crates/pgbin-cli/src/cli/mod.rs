//! CLI for the pgbin PostgreSQL installer hooks.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use pgbin_core::config::{self, Settings};
use pgbin_core::HostContext;
use std::path::PathBuf;

use commands::{
    run_checksum, run_completions, run_env, run_install, run_list_versions, run_recommend,
    run_target,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pgbin")]
#[command(about = "pgbin: install prebuilt PostgreSQL binaries", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List installable versions, newest first.
    ListVersions {
        /// Tool name (postgres, postgresql or pg).
        tool: String,
        /// Print `{"versions": [...]}` instead of one version per line.
        #[arg(long)]
        json: bool,
    },

    /// Download, verify and install a version, then initialize its data directory.
    Install {
        tool: String,
        version: String,
        /// Installation root; created if missing.
        dest: PathBuf,
    },

    /// Print environment exports for an installation.
    Env {
        /// Installation root.
        dest: PathBuf,
    },

    /// Show the artifact target resolved for this machine.
    Target,

    /// Compute the SHA-256 of a file with the platform's digest methods.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },

    /// Show the newest and oldest releases of the supported majors.
    Recommend,

    /// Generate shell completions on stdout.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        if let CliCommand::Completions { shell } = cli.command {
            return run_completions(shell);
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let ctx = HostContext::detect(Settings::from_env(&cfg))?;

        match cli.command {
            CliCommand::ListVersions { tool, json } => run_list_versions(&ctx, &tool, json)?,
            CliCommand::Install {
                tool,
                version,
                dest,
            } => run_install(&ctx, &tool, &version, &dest)?,
            CliCommand::Env { dest } => run_env(&ctx, &dest)?,
            CliCommand::Target => run_target(&ctx)?,
            CliCommand::Checksum { path } => run_checksum(&ctx, &path)?,
            CliCommand::Recommend => run_recommend(&ctx)?,
            CliCommand::Completions { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
