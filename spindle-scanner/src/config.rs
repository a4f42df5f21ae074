use crate::error::{Result, ScanError};
use std::time::Duration;
use tokio::sync::Semaphore;
use url::{Host, Url};

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_PENDING_EXPANSIONS: usize = 256;

/// How a run decides it is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminationPolicy {
    /// Stop once no URL is queued, being fetched, or being expanded.
    #[default]
    Quiescent,
    /// Each worker stops after one idle timeout without receiving a URL.
    /// Best-effort: a fetch that outlasts the window elsewhere can still
    /// produce links after every other worker has gone.
    IdleTimeout,
}

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub accept_invalid_certs: bool,
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            accept_invalid_certs: false,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            user_agent: concat!("spindle/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Read-only settings for one crawl run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub allowed_host: String,
    pub workers: usize,
    pub idle_timeout: Duration,
    pub seeds: Vec<String>,
    pub termination: TerminationPolicy,
    pub max_pending_expansions: usize,
    pub fetch: FetchOptions,
}

impl RunConfig {
    pub fn new<I, S>(allowed_host: impl Into<String>, seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_host: allowed_host.into(),
            workers: DEFAULT_WORKERS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            seeds: seeds.into_iter().map(Into::into).collect(),
            termination: TerminationPolicy::default(),
            max_pending_expansions: DEFAULT_MAX_PENDING_EXPANSIONS,
            fetch: FetchOptions::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_termination(mut self, termination: TerminationPolicy) -> Self {
        self.termination = termination;
        self
    }

    pub fn with_max_pending_expansions(mut self, limit: usize) -> Self {
        self.max_pending_expansions = limit;
        self
    }

    pub fn with_fetch_options(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.allowed_host.trim().is_empty() {
            return Err(ScanError::Config("allowed host must not be empty".to_string()));
        }
        if self.workers < 1 {
            return Err(ScanError::Config(format!(
                "at least 1 worker is required: {}",
                self.workers
            )));
        }
        if self.max_pending_expansions < 1 {
            return Err(ScanError::Config(
                "max pending expansions must be at least 1".to_string(),
            ));
        }
        if self.max_pending_expansions > Semaphore::MAX_PERMITS {
            return Err(ScanError::Config(format!(
                "max pending expansions must be at most {}: {}",
                Semaphore::MAX_PERMITS,
                self.max_pending_expansions
            )));
        }
        self.canonical_allowed_host()?;
        if self.seeds.is_empty() {
            return Err(ScanError::Config("at least one seed URL is required".to_string()));
        }
        self.canonical_seeds().map(|_| ())
    }

    /// Validates and rewrites the host and seeds into the form URL parsing
    /// produces, which is the form scope checks and the visited set compare.
    pub fn prepared(mut self) -> Result<Self> {
        self.validate()?;
        self.allowed_host = self.canonical_allowed_host()?;
        self.seeds = self.canonical_seeds()?;
        Ok(self)
    }

    /// The allowed host as the URL parser would print it: lowercased, IDNA
    /// encoded, with an explicit port kept.
    pub fn canonical_allowed_host(&self) -> Result<String> {
        let raw = self.allowed_host.trim();
        let (host, port) = match raw.rsplit_once(':') {
            Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                (host, Some(port))
            }
            _ => (raw, None),
        };

        let host = Host::parse(host).map_err(|source| ScanError::InvalidUrl {
            url: self.allowed_host.clone(),
            source,
        })?;
        Ok(match port {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    /// Seeds in parsed form, which is also the form the visited set keys on.
    pub fn canonical_seeds(&self) -> Result<Vec<String>> {
        self.seeds
            .iter()
            .map(|seed| {
                Url::parse(seed)
                    .map(String::from)
                    .map_err(|source| ScanError::InvalidUrl {
                        url: seed.clone(),
                        source,
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::new("a.test", ["http://a.test/"]);
        assert_eq!(config.workers, 5);
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.termination, TerminationPolicy::Quiescent);
        assert!(!config.fetch.accept_invalid_certs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = RunConfig::new("a.test", ["http://a.test/"]).with_workers(0);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
        assert!(err.to_string().contains("at least 1 worker"));
    }

    #[test]
    fn test_zero_idle_timeout_allowed() {
        let config = RunConfig::new("a.test", ["http://a.test/"]).with_idle_timeout(Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_seeds_rejected() {
        let config = RunConfig::new("a.test", Vec::<String>::new());
        assert!(matches!(config.validate(), Err(ScanError::Config(_))));
    }

    #[test]
    fn test_empty_host_rejected() {
        let config = RunConfig::new("  ", ["http://a.test/"]);
        assert!(matches!(config.validate(), Err(ScanError::Config(_))));
    }

    #[test]
    fn test_invalid_seed_rejected() {
        let config = RunConfig::new("a.test", ["http://a.test/", "/relative/only"]);
        match config.validate() {
            Err(ScanError::InvalidUrl { url, .. }) => assert_eq!(url, "/relative/only"),
            other => panic!("expected InvalidUrl, got {:?}", other),
        }
    }

    #[test]
    fn test_expansion_limit_above_semaphore_capacity_rejected() {
        let config = RunConfig::new("a.test", ["http://a.test/"])
            .with_max_pending_expansions(usize::MAX);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
        assert!(err.to_string().contains("at most"));

        let config = RunConfig::new("a.test", ["http://a.test/"])
            .with_max_pending_expansions(Semaphore::MAX_PERMITS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_allowed_host_is_normalized() {
        let host = |raw: &str| {
            RunConfig::new(raw, ["http://a.test/"])
                .canonical_allowed_host()
                .unwrap()
        };
        assert_eq!(host("A.Test"), "a.test");
        assert_eq!(host("A.Test:8080"), "a.test:8080");
        assert_eq!(host("bücher.example"), "xn--bcher-kva.example");
        assert_eq!(host("[::1]:3000"), "[::1]:3000");
        assert_eq!(host("127.0.0.1:9000"), "127.0.0.1:9000");
    }

    #[test]
    fn test_unparseable_allowed_host_rejected() {
        let config = RunConfig::new("a test", ["http://a.test/"]);
        match config.validate() {
            Err(ScanError::InvalidUrl { url, .. }) => assert_eq!(url, "a test"),
            other => panic!("expected InvalidUrl, got {:?}", other),
        }
    }

    #[test]
    fn test_prepared_config_holds_canonical_forms() {
        let config = RunConfig::new("A.TEST", ["HTTP://A.TEST"]).prepared().unwrap();
        assert_eq!(config.allowed_host, "a.test");
        assert_eq!(config.seeds, vec!["http://a.test/".to_string()]);
    }

    #[test]
    fn test_canonical_seeds_use_parsed_form() {
        let config = RunConfig::new("a.test", ["http://a.test", "HTTP://A.TEST/b"]);
        assert_eq!(
            config.canonical_seeds().unwrap(),
            vec!["http://a.test/".to_string(), "http://a.test/b".to_string()]
        );
    }
}
