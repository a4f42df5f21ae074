use clap::{arg, ArgAction};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("spindle")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("spindle")
        .about("Crawl every page reachable on one host and print each page's links and assets as JSON")
        .override_usage("spindle [OPTIONS] HOST URL [URL]...")
        .styles(CLAP_STYLING)
        .arg(
            arg!([HOST])
                .help("Only URLs on this host (host[:port], case-insensitive) are followed"),
        )
        .arg(
            arg!([URL] ...)
                .help("Seed URLs to start crawling from"),
        )
        .arg(
            arg!(-j --"workers" <NUM_WORKERS>)
                .required(false)
                .help("Number of concurrent fetch workers")
                .value_parser(clap::value_parser!(i64))
                .allow_negative_numbers(true)
                .default_value("5"),
        )
        .arg(
            arg!(-t --"timeout" <SECONDS>)
                .required(false)
                .help("Seconds a worker waits for new work before it goes idle")
                .value_parser(clap::value_parser!(i64))
                .allow_negative_numbers(true)
                .default_value("30"),
        )
        .arg(
            arg!(-e --"print-errors")
                .required(false)
                .help("Print fetch errors to stderr")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(-H --"seeds-file" <PATH>)
                .required(false)
                .help("Path to a newline-delimited file of seed URLs")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            arg!(-k --"insecure")
                .required(false)
                .help("Accept invalid TLS certificates")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"request-timeout" <SECONDS>)
                .required(false)
                .help("Per-request HTTP timeout in seconds (0 disables it)")
                .value_parser(clap::value_parser!(u64))
                .default_value("30"),
        )
        .arg(
            arg!(--"termination" <POLICY>)
                .required(false)
                .help("quiescent: stop when no work is left anywhere; idle: each worker stops after one idle timeout")
                .value_parser(["quiescent", "idle"])
                .default_value("quiescent"),
        )
        .arg(
            arg!(--"max-expansions" <N>)
                .required(false)
                .help("Upper bound on link expansion tasks in flight")
                .value_parser(clap::value_parser!(usize))
                .default_value("256"),
        )
        .arg(
            arg!(-v --"verbose")
                .required(false)
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let matches = command_argument_builder()
            .try_get_matches_from(["spindle", "a.test", "http://a.test/"])
            .unwrap();

        assert_eq!(matches.get_one::<i64>("workers"), Some(&5));
        assert_eq!(matches.get_one::<i64>("timeout"), Some(&30));
        assert_eq!(
            matches.get_one::<String>("termination").map(String::as_str),
            Some("quiescent")
        );
        assert!(!matches.get_flag("print-errors"));
        assert_eq!(matches.get_count("verbose"), 0);
    }

    #[test]
    fn test_negative_timeout_reaches_validation() {
        let matches = command_argument_builder()
            .try_get_matches_from(["spindle", "-t", "-1", "a.test", "http://a.test/"])
            .unwrap();
        assert_eq!(matches.get_one::<i64>("timeout"), Some(&-1));
    }

    #[test]
    fn test_unknown_termination_rejected() {
        let result = command_argument_builder().try_get_matches_from([
            "spindle",
            "--termination",
            "never",
            "a.test",
            "http://a.test/",
        ]);
        assert!(result.is_err());
    }
}
