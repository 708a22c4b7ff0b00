//! CLI entry point for apachedl.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use apachedl_core::mirror::{LogReporter, ProgressReporter, SpinnerReporter};
use apachedl_core::{ClientConfig, Credentials, Mirror, MirrorClient, MirrorOptions};
use clap::{CommandFactory, Parser};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let mut args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // Fill in whatever the flags left out from stdin
    let mut input = io::stdin().lock();
    if args.name.is_none() {
        args.name = Some(prompt("Username", &mut input)?);
    }
    if args.password.is_none() {
        args.password = Some(prompt("Password", &mut input)?);
    }
    if args.links.is_empty() {
        args.links = prompt_links(&mut input)?;
    }
    drop(input);

    if args.links.is_empty() {
        Args::command().print_help()?;
        println!();
        return Ok(());
    }

    debug!(
        links = ?args.links,
        target = %args.target.display(),
        proxy = ?args.proxy,
        skip = args.skip,
        "CLI arguments resolved"
    );
    info!("apachedl starting");

    let credentials = match (args.name.take(), args.password.take()) {
        (Some(name), password) if !name.is_empty() => {
            Some(Credentials::new(name, password.unwrap_or_default()))
        }
        _ => None,
    };
    let config = ClientConfig {
        credentials,
        proxy: args.proxy.clone(),
        connect_timeout: Duration::from_secs(args.connect_timeout),
        read_timeout: Duration::from_secs(args.read_timeout),
    };
    let client = MirrorClient::new(&config)?;

    let options = MirrorOptions {
        skip_existing: args.skip,
        ..MirrorOptions::default()
    };

    let spinner = if !args.quiet && !args.no_progress && io::stderr().is_terminal() {
        Some(Arc::new(SpinnerReporter::new()))
    } else {
        None
    };
    let reporter: Arc<dyn ProgressReporter> = match &spinner {
        Some(spinner) => Arc::clone(spinner) as Arc<dyn ProgressReporter>,
        None => Arc::new(LogReporter),
    };

    let mirror = Mirror::new(client, options).with_reporter(reporter);
    let result = mirror.mirror_all(&args.links, &args.target).await;

    if let Some(spinner) = &spinner {
        spinner.finish();
    }
    result.with_context(|| format!("mirror into {} failed", args.target.display()))?;

    let stats = mirror.stats();
    info!(
        directories = stats.directories(),
        completed = stats.files_completed(),
        skipped = stats.files_skipped(),
        failed = stats.failed(),
        retried = stats.retried(),
        bytes = stats.bytes(),
        "Mirror complete"
    );

    Ok(())
}

/// Reads one line after printing `label`; end of input reads as an empty line.
fn prompt(label: &str, input: &mut impl BufRead) -> Result<String> {
    eprint!("{label}: ");
    io::stderr().flush()?;
    let mut line = String::new();
    input.read_line(&mut line).context("failed to read stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Reads links until an empty line.
fn prompt_links(input: &mut impl BufRead) -> Result<Vec<String>> {
    let mut links = Vec::new();
    loop {
        let link = prompt("Link (empty to start)", input)?;
        let link = link.trim();
        if link.is_empty() {
            return Ok(links);
        }
        links.push(link.to_string());
    }
}
