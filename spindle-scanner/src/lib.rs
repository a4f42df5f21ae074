pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod result;
pub mod scope;
pub mod visited;

pub use config::{FetchOptions, RunConfig, TerminationPolicy};
pub use crawler::{CollectSink, CrawlSink, Crawler, Expansion, WorkerState};
pub use error::{FetchError, FetchFailure, ScanError};
pub use fetch::{Fetch, HttpFetcher};
pub use result::{CrawlResult, CrawlSummary};
pub use visited::VisitedSet;
