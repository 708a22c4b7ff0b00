//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use apachedl_core::mirror::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};

/// Mirror Apache auto-index directory trees behind HTTP Basic auth.
///
/// Every link ending in `/` is mirrored recursively into the target directory;
/// any other link is downloaded as a single file. Partially downloaded files
/// are resumed on the next run.
#[derive(Parser, Debug)]
#[command(name = "apachedl")]
#[command(author, version, about)]
pub struct Args {
    /// Username for HTTP Basic auth (prompted when absent)
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Password for HTTP Basic auth (prompted when absent)
    #[arg(short = 'p', long = "pw")]
    pub password: Option<String>,

    /// Directory or file URL to mirror; may be repeated (prompted when absent)
    #[arg(short = 'l', long = "link")]
    pub links: Vec<String>,

    /// Local directory to mirror into (created when missing)
    #[arg(short = 't', long, default_value = ".")]
    pub target: PathBuf,

    /// Proxy URL for all requests, e.g. http://10.0.0.1:1234
    #[arg(long)]
    pub proxy: Option<String>,

    /// Skip files that already exist locally without contacting the server
    #[arg(short = 's', long)]
    pub skip: bool,

    /// TCP/TLS connect timeout in seconds
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: u64,

    /// Idle timeout between reads in seconds
    #[arg(long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout: u64,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["apachedl"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.name.is_none());
        assert!(args.password.is_none());
        assert!(args.links.is_empty());
        assert_eq!(args.target, PathBuf::from("."));
        assert!(args.proxy.is_none());
        assert!(!args.skip);
        assert_eq!(args.connect_timeout, 30);
        assert_eq!(args.read_timeout, 300);
        assert!(!args.no_progress);
    }

    #[test]
    fn test_cli_credentials_flags() {
        let args = Args::try_parse_from(["apachedl", "-n", "alice", "-p", "s3cret"]).unwrap();
        assert_eq!(args.name.as_deref(), Some("alice"));
        assert_eq!(args.password.as_deref(), Some("s3cret"));

        let args = Args::try_parse_from(["apachedl", "--name", "bob", "--pw", "hunter2"]).unwrap();
        assert_eq!(args.name.as_deref(), Some("bob"));
        assert_eq!(args.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_cli_link_is_repeatable_and_ordered() {
        let args = Args::try_parse_from([
            "apachedl",
            "-l",
            "https://files.example/a/",
            "--link",
            "https://files.example/b.iso",
        ])
        .unwrap();
        assert_eq!(
            args.links,
            vec!["https://files.example/a/", "https://files.example/b.iso"]
        );
    }

    #[test]
    fn test_cli_target_and_proxy() {
        let args = Args::try_parse_from([
            "apachedl",
            "-t",
            "/srv/mirror",
            "--proxy",
            "http://10.0.0.1:1234",
        ])
        .unwrap();
        assert_eq!(args.target, PathBuf::from("/srv/mirror"));
        assert_eq!(args.proxy.as_deref(), Some("http://10.0.0.1:1234"));
    }

    #[test]
    fn test_cli_skip_flag() {
        let args = Args::try_parse_from(["apachedl", "-s"]).unwrap();
        assert!(args.skip);

        let args = Args::try_parse_from(["apachedl", "--skip"]).unwrap();
        assert!(args.skip);
    }

    #[test]
    fn test_cli_timeouts() {
        let args = Args::try_parse_from([
            "apachedl",
            "--connect-timeout",
            "5",
            "--read-timeout",
            "60",
        ])
        .unwrap();
        assert_eq!(args.connect_timeout, 5);
        assert_eq!(args.read_timeout, 60);
    }

    #[test]
    fn test_cli_zero_timeout_rejected() {
        let result = Args::try_parse_from(["apachedl", "--connect-timeout", "0"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["apachedl", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["apachedl", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);

        let args = Args::try_parse_from(["apachedl", "--verbose", "--verbose"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["apachedl", "-q"]).unwrap();
        assert!(args.quiet);

        let args = Args::try_parse_from(["apachedl", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        // --help causes early exit, so we check it returns an error with Help kind
        let result = Args::try_parse_from(["apachedl", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let result = Args::try_parse_from(["apachedl", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["apachedl", "--invalid-flag"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
