use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use spindle_scanner::{
    CrawlResult, CrawlSink, FetchError, FetchOptions, RunConfig, TerminationPolicy,
};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{warn, Level};
use url::Url;

/// Load and parse seed URLs from a file
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read seeds file {}", path.display()))?;

    let urls: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_url_line(line.trim()))
        .collect();

    if urls.is_empty() {
        bail!("no valid URLs found in {}", path.display());
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if Url::parse(line).is_ok() {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    warn!("Skipping invalid URL '{}'", line);
    None
}

/// Host and seed list from the positionals, plus the seeds file if given.
pub fn collect_targets(matches: &ArgMatches) -> Result<(String, Vec<String>)> {
    let positionals: Vec<String> = matches
        .get_one::<String>("HOST")
        .into_iter()
        .chain(matches.get_many::<String>("URL").into_iter().flatten())
        .cloned()
        .collect();

    let seeds_file = matches.get_one::<std::path::PathBuf>("seeds-file");
    let required = if seeds_file.is_some() { 1 } else { 2 };
    if positionals.len() < required {
        bail!("invalid number of arguments: {}", positionals.len());
    }

    let mut positionals = positionals.into_iter();
    let host = positionals.next().unwrap_or_default();
    let mut seeds: Vec<String> = positionals.collect();

    if let Some(path) = seeds_file {
        seeds.extend(load_urls_from_file(path)?);
    }

    Ok((host, seeds))
}

pub fn build_run_config(matches: &ArgMatches) -> Result<RunConfig> {
    let workers = matches.get_one::<i64>("workers").copied().unwrap_or(5);
    if workers < 1 {
        bail!("at least 1 worker is required: {}", workers);
    }

    let timeout = matches.get_one::<i64>("timeout").copied().unwrap_or(30);
    if timeout < 0 {
        bail!("timeout must not be negative: {}", timeout);
    }

    let termination = match matches.get_one::<String>("termination").map(String::as_str) {
        Some("idle") => TerminationPolicy::IdleTimeout,
        _ => TerminationPolicy::Quiescent,
    };

    let request_timeout = match matches.get_one::<u64>("request-timeout").copied() {
        Some(0) => None,
        Some(seconds) => Some(Duration::from_secs(seconds)),
        None => FetchOptions::default().request_timeout,
    };

    let fetch = FetchOptions {
        accept_invalid_certs: matches.get_flag("insecure"),
        request_timeout,
        ..FetchOptions::default()
    };

    let (host, seeds) = collect_targets(matches)?;
    let mut config = RunConfig::new(host, seeds)
        .with_workers(workers as usize)
        .with_idle_timeout(Duration::from_secs(timeout as u64))
        .with_termination(termination)
        .with_fetch_options(fetch);
    if let Some(limit) = matches.get_one::<usize>("max-expansions") {
        config = config.with_max_pending_expansions(*limit);
    }

    config.validate()?;
    Ok(config)
}

/// One result as a JSON object indented with four spaces.
pub fn render_result(result: &CrawlResult) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    result.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}

pub fn verbosity_level(count: u8) -> Level {
    match count {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Logs go to stderr; stdout only carries JSON records.
pub fn init_tracing(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_max_level(verbosity_level(verbosity))
        .with_writer(io::stderr)
        .init();
}

/// Prints results to stdout and, when asked, fetch errors to stderr.
pub struct StdoutSink {
    print_errors: bool,
    printed: usize,
}

impl StdoutSink {
    pub fn new(print_errors: bool) -> Self {
        Self {
            print_errors,
            printed: 0,
        }
    }

    pub fn printed(&self) -> usize {
        self.printed
    }
}

impl CrawlSink for StdoutSink {
    fn on_result(&mut self, result: CrawlResult) {
        let rendered = match render_result(&result) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!("Could not render result for {}: {}", result.url, e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        match writeln!(stdout, "{}", rendered) {
            Ok(()) => self.printed += 1,
            Err(e) => warn!("Could not write result for {}: {}", result.url, e),
        }
    }

    fn on_error(&mut self, error: FetchError) {
        if self.print_errors {
            eprintln!("{} {}", "error:".red().bold(), error);
        }
    }
}
