//! CLI flag parsing and mapping onto resolved options.

use super::Cli;
use clap::Parser;
use lcodl_core::config::LcoConfig;
use lcodl_core::error::LcoError;
use lcodl_core::options::Options;
use lcodl_core::select::ReductionMode;
use std::path::PathBuf;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn cli_parse_minimal() {
    let cli = parse(&["lcodl", "-r", "123456"]);
    assert_eq!(cli.request_id, "123456");
    assert!(cli.directory.is_none());
    assert!(cli.filter.is_none());
    assert!(cli.numframes.is_none());
    assert!(cli.start.is_none());
    assert!(!cli.raw && !cli.count_only && !cli.zipfile && !cli.organize);
    assert!(cli.streams.is_none());
    assert!(cli.token.is_none());
}

#[test]
fn cli_parse_short_flags() {
    let cli = parse(&[
        "lcodl", "-r", "42", "-d", "/tmp/lco", "-f", "V", "-n", "2", "-s", "3", "-z",
    ]);
    assert_eq!(cli.request_id, "42");
    assert_eq!(cli.directory, Some(PathBuf::from("/tmp/lco")));
    assert_eq!(cli.filter.as_deref(), Some("V"));
    assert_eq!(cli.numframes, Some(2));
    assert_eq!(cli.start, Some(3));
    assert!(cli.zipfile);
}

#[test]
fn cli_parse_long_flags() {
    let cli = parse(&[
        "lcodl",
        "--requestid",
        "42",
        "--directory",
        "out",
        "--filter",
        "rp",
        "--numframes",
        "10",
        "--start",
        "2",
        "--raw",
        "--count_only",
        "--zipfile",
        "--streams",
        "3",
        "--token",
        "abc",
        "--organize",
    ]);
    assert_eq!(cli.directory, Some(PathBuf::from("out")));
    assert_eq!(cli.filter.as_deref(), Some("rp"));
    assert_eq!(cli.numframes, Some(10));
    assert!(cli.raw && cli.count_only && cli.zipfile && cli.organize);
    assert_eq!(cli.streams, Some(3));
    assert_eq!(cli.token.as_deref(), Some("abc"));
}

#[test]
fn cli_parse_negative_numframes() {
    let cli = parse(&["lcodl", "-r", "42", "-n", "-1"]);
    assert_eq!(cli.numframes, Some(-1));
}

#[test]
fn cli_requires_request_id() {
    assert!(Cli::try_parse_from(["lcodl", "-f", "V"]).is_err());
}

#[test]
fn cli_rejects_non_numeric_streams() {
    assert!(Cli::try_parse_from(["lcodl", "-r", "42", "--streams", "many"]).is_err());
}

#[test]
fn flags_resolve_into_options() {
    let cli = parse(&[
        "lcodl", "-r", "42", "-f", "V", "-n", "-1", "--raw", "--token", "abc",
    ]);
    let opts = Options::resolve(&cli.option_args(), &LcoConfig::default()).unwrap();
    assert_eq!(opts.request_id, "42");
    assert_eq!(opts.filter.as_deref(), Some("V"));
    assert_eq!(opts.max_per_filter, None);
    assert_eq!(opts.mode, ReductionMode::Raw);
    assert_eq!(opts.streams, 6);
    assert_eq!(opts.token, "abc");
}

#[test]
fn missing_token_fails_before_any_request() {
    let cli = parse(&["lcodl", "-r", "42"]);
    let err = Options::resolve(&cli.option_args(), &LcoConfig::default()).unwrap_err();
    assert!(matches!(err, LcoError::Auth(_)));
}

#[test]
fn zero_start_is_a_config_error() {
    let cli = parse(&["lcodl", "-r", "42", "-s", "0", "--token", "abc"]);
    let err = Options::resolve(&cli.option_args(), &LcoConfig::default()).unwrap_err();
    assert!(matches!(err, LcoError::Config(_)));
}
