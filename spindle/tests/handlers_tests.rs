use spindle::commands::command_argument_builder;
use spindle::handlers::*;
use spindle_scanner::{CrawlResult, TerminationPolicy};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn matches(args: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["spindle"];
    argv.extend_from_slice(args);
    command_argument_builder()
        .try_get_matches_from(argv)
        .unwrap()
}

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    let result = parse_url_line("example.com");
    assert_eq!(result, Some("http://example.com".to_string()));
}

#[test]
fn test_parse_url_line_invalid() {
    let result = parse_url_line("not a valid url!!!");
    assert_eq!(result, None);
}

#[test]
fn test_load_urls_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "https://example.com")?;
    writeln!(temp_file, "example.com/about")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "  https://example.com/contact  ")?;

    let urls = load_urls_from_file(temp_file.path())?;

    assert_eq!(
        urls,
        vec![
            "https://example.com",
            "http://example.com/about",
            "https://example.com/contact",
        ]
    );

    Ok(())
}

#[test]
fn test_load_urls_from_file_empty() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();

    let result = load_urls_from_file(temp_file.path());

    assert!(result.unwrap_err().to_string().contains("no valid URLs"));
}

#[test]
fn test_load_urls_from_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_urls_from_file(&dir.path().join("absent.txt"));

    assert!(result.unwrap_err().to_string().contains("failed to read seeds file"));
}

#[test]
fn test_build_run_config_from_positionals() {
    let args = matches(&[
        "-j",
        "8",
        "-t",
        "3",
        "example.com",
        "http://example.com/",
        "http://example.com/docs",
    ]);
    let config = build_run_config(&args).unwrap();

    assert_eq!(config.allowed_host, "example.com");
    assert_eq!(config.seeds, vec!["http://example.com/", "http://example.com/docs"]);
    assert_eq!(config.workers, 8);
    assert_eq!(config.idle_timeout, Duration::from_secs(3));
    assert_eq!(config.termination, TerminationPolicy::Quiescent);
    assert!(!config.fetch.accept_invalid_certs);
    assert_eq!(config.fetch.request_timeout, Some(Duration::from_secs(30)));
}

#[test]
fn test_build_run_config_optional_flags() {
    let args = matches(&[
        "-k",
        "--request-timeout",
        "0",
        "--termination",
        "idle",
        "--max-expansions",
        "16",
        "example.com",
        "http://example.com/",
    ]);
    let config = build_run_config(&args).unwrap();

    assert!(config.fetch.accept_invalid_certs);
    assert_eq!(config.fetch.request_timeout, None);
    assert_eq!(config.termination, TerminationPolicy::IdleTimeout);
    assert_eq!(config.max_pending_expansions, 16);
}

#[test]
fn test_build_run_config_with_seeds_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "example.com/a")?;
    writeln!(temp_file, "http://example.com/b")?;
    let path = temp_file.path().to_string_lossy().to_string();

    let args = matches(&["-H", &path, "example.com"]);
    let config = build_run_config(&args)?;

    assert_eq!(config.seeds, vec!["http://example.com/a", "http://example.com/b"]);
    Ok(())
}

#[test]
fn test_zero_workers_rejected() {
    let args = matches(&["-j", "0", "example.com", "http://example.com/"]);
    let err = build_run_config(&args).unwrap_err();
    assert_eq!(err.to_string(), "at least 1 worker is required: 0");
}

#[test]
fn test_negative_timeout_rejected() {
    let args = matches(&["-t", "-5", "example.com", "http://example.com/"]);
    let err = build_run_config(&args).unwrap_err();
    assert_eq!(err.to_string(), "timeout must not be negative: -5");
}

#[test]
fn test_largest_timeout_accepted() {
    let args = matches(&["-t", "9223372036854775807", "example.com", "http://example.com/"]);
    let config = build_run_config(&args).unwrap();
    assert_eq!(config.idle_timeout, Duration::from_secs(i64::MAX as u64));
}

#[test]
fn test_oversized_expansion_limit_rejected() {
    let args = matches(&[
        "--max-expansions",
        "18446744073709551615",
        "example.com",
        "http://example.com/",
    ]);
    let err = build_run_config(&args).unwrap_err();
    assert!(err.to_string().contains("max pending expansions must be at most"));
}

#[test]
fn test_host_without_seed_rejected() {
    let args = matches(&["example.com"]);
    let err = build_run_config(&args).unwrap_err();
    assert_eq!(err.to_string(), "invalid number of arguments: 1");
}

#[test]
fn test_invalid_seed_rejected() {
    let args = matches(&["example.com", "/not/absolute"]);
    let err = build_run_config(&args).unwrap_err();
    assert!(err.to_string().contains("/not/absolute"));
}

#[test]
fn test_render_result_uses_four_space_indent() {
    let mut result = CrawlResult::new("http://example.com/".to_string());
    result.links.insert("/about".to_string());
    result.assets.insert("/logo.png".to_string());

    let rendered = render_result(&result).unwrap();
    let expected = r#"{
    "URL": "http://example.com/",
    "Links": [
        "/about"
    ],
    "Assets": [
        "/logo.png"
    ]
}"#;
    assert_eq!(rendered, expected);
}

#[test]
fn test_verbosity_levels() {
    use tracing::Level;
    assert_eq!(verbosity_level(0), Level::WARN);
    assert_eq!(verbosity_level(1), Level::INFO);
    assert_eq!(verbosity_level(2), Level::DEBUG);
    assert_eq!(verbosity_level(7), Level::TRACE);
}
