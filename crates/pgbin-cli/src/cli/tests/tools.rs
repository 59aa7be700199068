//! Tests for target, checksum, recommend and completions.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use clap_complete::Shell;
use std::path::Path;

#[test]
fn cli_parse_target() {
    assert!(matches!(parse(&["pgbin", "target"]), CliCommand::Target));
}

#[test]
fn cli_parse_checksum() {
    match parse(&["pgbin", "checksum", "archive.tar.gz"]) {
        CliCommand::Checksum { path } => assert_eq!(path, Path::new("archive.tar.gz")),
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_parse_recommend() {
    assert!(matches!(parse(&["pgbin", "recommend"]), CliCommand::Recommend));
}

#[test]
fn cli_parse_completions() {
    match parse(&["pgbin", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, Shell::Bash),
        _ => panic!("expected Completions"),
    }
}

#[test]
fn cli_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["pgbin", "frobnicate"]).is_err());
}
