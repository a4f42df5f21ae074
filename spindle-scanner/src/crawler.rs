use crate::config::{RunConfig, TerminationPolicy};
use crate::error::{FetchError, Result};
use crate::extract::extract;
use crate::fetch::{Fetch, HttpFetcher};
use crate::frontier::{Frontier, FrontierClosed, Next};
use crate::result::{CrawlResult, CrawlStats, CrawlSummary};
use crate::scope::{in_scope, resolve};
use crate::visited::VisitedSet;
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};
use url::Url;

/// Shortest idle wait under [`TerminationPolicy::Quiescent`]. Closing the
/// frontier wakes waiters, so the window only paces the debug log.
const QUIESCENT_MIN_WAIT: Duration = Duration::from_millis(50);

/// Consumer of the two output streams. Called from a single collector task,
/// in arrival order.
pub trait CrawlSink: Send + 'static {
    fn on_result(&mut self, result: CrawlResult);
    fn on_error(&mut self, error: FetchError);
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub results: Vec<CrawlResult>,
    pub errors: Vec<FetchError>,
}

impl CrawlSink for CollectSink {
    fn on_result(&mut self, result: CrawlResult) {
        self.results.push(result);
    }

    fn on_error(&mut self, error: FetchError) {
        self.errors.push(error);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Fetching,
    Expanding,
    Stopped,
}

/// What happened to one discovered link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// First sighting of an in-scope URL; it goes onto the frontier.
    Admitted(Url),
    Duplicate(Url),
    OutOfScope(Url),
    /// Page URL or link could not be parsed. Dropped without an error event.
    Unparseable(url::ParseError),
}

/// Resolves `link` against `page_url`, checks scope, then admits it.
/// Out-of-scope URLs never touch the visited set.
pub async fn expand_link(
    page_url: &str,
    link: &str,
    allowed_host: &str,
    visited: &VisitedSet,
) -> Expansion {
    let absolute = match resolve(page_url, link) {
        Ok(url) => url,
        Err(err) => return Expansion::Unparseable(err),
    };

    if !in_scope(allowed_host, &absolute) {
        return Expansion::OutOfScope(absolute);
    }

    if visited.try_admit(absolute.as_str()).await {
        Expansion::Admitted(absolute)
    } else {
        Expansion::Duplicate(absolute)
    }
}

struct Shared<F> {
    config: Arc<RunConfig>,
    fetcher: Arc<F>,
    frontier: Arc<Frontier>,
    visited: VisitedSet,
    stats: CrawlStats,
    expansion_permits: Arc<Semaphore>,
    expansions: TaskTracker,
    cancel: CancellationToken,
}

impl<F> Shared<F> {
    fn idle_wait(&self) -> Duration {
        match self.config.termination {
            TerminationPolicy::IdleTimeout => self.config.idle_timeout,
            TerminationPolicy::Quiescent => self.config.idle_timeout.max(QUIESCENT_MIN_WAIT),
        }
    }

    fn should_stop_when_idle(&self) -> bool {
        match self.config.termination {
            TerminationPolicy::IdleTimeout => true,
            TerminationPolicy::Quiescent => self.frontier.outstanding() == 0,
        }
    }
}

/// The crawl coordinator: a fixed pool of workers over one shared frontier,
/// with a collector forwarding results and fetch errors to a [`CrawlSink`].
pub struct Crawler<F = HttpFetcher> {
    config: Arc<RunConfig>,
    fetcher: Arc<F>,
    cancel: CancellationToken,
}

impl Crawler<HttpFetcher> {
    pub fn new(config: RunConfig) -> Result<Self> {
        let config = config.prepared()?;
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Ok(Self::assemble(config, fetcher))
    }
}

impl<F: Fetch> Crawler<F> {
    pub fn with_fetcher(config: RunConfig, fetcher: F) -> Result<Self> {
        Ok(Self::assemble(config.prepared()?, fetcher))
    }

    fn assemble(config: RunConfig, fetcher: F) -> Self {
        Self {
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
            cancel: CancellationToken::new(),
        }
    }

    /// The run settings in canonical form.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Cancelling stops every worker at its next suspension point. The token
    /// belongs to this crawler; once cancelled, later runs stop immediately.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Crawls until the termination policy ends the run (or it is cancelled)
    /// and returns the sink with the run's counters.
    pub async fn run<S: CrawlSink>(&self, sink: S) -> Result<(S, CrawlSummary)> {
        let seeds = self.config.canonical_seeds()?;
        let workers = self.config.workers;

        info!(
            "Starting crawl of {} with {} workers ({} seeds, {:?} termination)",
            self.config.allowed_host,
            workers,
            seeds.len(),
            self.config.termination
        );

        let shared = Arc::new(Shared {
            config: self.config.clone(),
            fetcher: self.fetcher.clone(),
            frontier: Frontier::new(self.config.termination == TerminationPolicy::Quiescent),
            visited: VisitedSet::new(),
            stats: CrawlStats::default(),
            expansion_permits: Arc::new(Semaphore::new(self.config.max_pending_expansions)),
            expansions: TaskTracker::new(),
            cancel: self.cancel.clone(),
        });

        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let collector = tokio::spawn(collect(results_rx, errors_rx, sink));

        for seed in seeds {
            if shared.visited.try_admit(&seed).await {
                CrawlStats::bump(&shared.stats.seeds_admitted);
                enqueue(&shared, seed);
            } else {
                debug!("Duplicate seed {} ignored", seed);
                CrawlStats::bump(&shared.stats.duplicates);
            }
        }
        if shared.frontier.outstanding() == 0 {
            shared.frontier.close();
        }

        let mut worker_handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            worker_handles.push(tokio::spawn(run_worker(
                worker_id,
                shared.clone(),
                results_tx.clone(),
                errors_tx.clone(),
            )));
        }
        // workers own the only senders left; the collector ends with them
        drop(results_tx);
        drop(errors_tx);

        if let Err(e) = try_join_all(worker_handles).await {
            self.cancel.cancel();
            shared.frontier.close();
            return Err(e.into());
        }

        let discarded = shared.frontier.close();
        if discarded > 0 {
            warn!("{} queued URLs were never fetched", discarded);
            shared
                .stats
                .dropped_after_shutdown
                .fetch_add(discarded, std::sync::atomic::Ordering::Relaxed);
        }

        // expansions still running push into the closed frontier and are
        // counted as dropped
        shared.expansions.close();
        shared.expansions.wait().await;

        let sink = collector.await?;
        let summary = shared.stats.snapshot();
        info!(
            "Crawl complete. {} pages fetched, {} fetch errors, {} links admitted, {} duplicates, {} out of scope",
            summary.pages_fetched,
            summary.fetch_errors,
            summary.links_admitted,
            summary.duplicates,
            summary.out_of_scope
        );

        Ok((sink, summary))
    }
}

fn enqueue<F>(shared: &Shared<F>, url: String) {
    match shared.frontier.push(url) {
        Ok(()) => {}
        Err(FrontierClosed(url)) => {
            warn!("Frontier already closed, dropping {}", url);
            CrawlStats::bump(&shared.stats.dropped_after_shutdown);
        }
    }
}

fn transition(worker_id: usize, from: WorkerState, to: WorkerState) -> WorkerState {
    trace!("Worker {}: {:?} -> {:?}", worker_id, from, to);
    to
}

async fn run_worker<F: Fetch>(
    worker_id: usize,
    shared: Arc<Shared<F>>,
    results: UnboundedSender<CrawlResult>,
    errors: UnboundedSender<FetchError>,
) {
    debug!("Worker {} started", worker_id);
    let mut state = WorkerState::Idle;

    loop {
        let next = tokio::select! {
            _ = shared.cancel.cancelled() => {
                debug!("Worker {} cancelled", worker_id);
                break;
            }
            next = shared.frontier.next(shared.idle_wait()) => next,
        };

        let (url, ticket) = match next {
            Next::Url(url, ticket) => (url, ticket),
            Next::Closed => break,
            Next::Idle if shared.should_stop_when_idle() => {
                debug!(
                    "Worker {} idle for {:?}, stopping",
                    worker_id, shared.config.idle_timeout
                );
                break;
            }
            Next::Idle => {
                debug!(
                    "Worker {} idle, {} URLs still outstanding",
                    worker_id,
                    shared.frontier.outstanding()
                );
                continue;
            }
        };

        state = transition(worker_id, state, WorkerState::Fetching);
        let fetched = tokio::select! {
            _ = shared.cancel.cancelled() => {
                debug!("Worker {} cancelled while fetching {}", worker_id, url);
                break;
            }
            fetched = shared.fetcher.fetch(&url) => fetched,
        };

        let body = match fetched {
            Ok(body) => body,
            Err(source) => {
                warn!("Crawl error for {}: {}", url, source);
                CrawlStats::bump(&shared.stats.fetch_errors);
                if errors.send(FetchError::new(url, source)).is_err() {
                    debug!("Worker {}: error stream closed", worker_id);
                }
                state = transition(worker_id, state, WorkerState::Idle);
                continue;
            }
        };

        let result = CrawlResult::from_page(url, extract(&body));
        CrawlStats::bump(&shared.stats.pages_fetched);
        debug!(
            "Worker {}: {} has {} links, {} assets",
            worker_id,
            result.url,
            result.links.len(),
            result.assets.len()
        );

        let page_url = result.url.clone();
        let links: Vec<String> = result.links.iter().cloned().collect();
        if results.send(result).is_err() {
            debug!("Worker {}: result stream closed", worker_id);
        }

        state = transition(worker_id, state, WorkerState::Expanding);
        let ticket = Arc::new(ticket);
        for link in links {
            let permit = tokio::select! {
                _ = shared.cancel.cancelled() => break,
                permit = shared.expansion_permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let expansions = shared.expansions.clone();
            let shared = shared.clone();
            let ticket = ticket.clone();
            let page_url = page_url.clone();
            expansions.spawn(async move {
                let _permit = permit;
                expand(&shared, &page_url, &link).await;
                // the child (if any) is on the frontier before the parent completes
                drop(ticket);
            });
        }
        drop(ticket);
        state = transition(worker_id, state, WorkerState::Idle);
    }

    transition(worker_id, state, WorkerState::Stopped);
    debug!("Worker {} finished", worker_id);
}

async fn expand<F>(shared: &Shared<F>, page_url: &str, link: &str) {
    if shared.cancel.is_cancelled() {
        return;
    }

    match expand_link(page_url, link, &shared.config.allowed_host, &shared.visited).await {
        Expansion::Admitted(url) => {
            debug!("Queuing {} (found on {})", url, page_url);
            match shared.frontier.push(url.into()) {
                Ok(()) => CrawlStats::bump(&shared.stats.links_admitted),
                Err(FrontierClosed(url)) => {
                    warn!("Frontier closed, dropping {} found on {}", url, page_url);
                    CrawlStats::bump(&shared.stats.dropped_after_shutdown);
                }
            }
        }
        Expansion::Duplicate(url) => {
            trace!("Already admitted: {}", url);
            CrawlStats::bump(&shared.stats.duplicates);
        }
        Expansion::OutOfScope(url) => {
            trace!("Out of scope: {}", url);
            CrawlStats::bump(&shared.stats.out_of_scope);
        }
        Expansion::Unparseable(err) => {
            trace!("Dropping {:?} found on {}: {}", link, page_url, err);
            CrawlStats::bump(&shared.stats.unparseable);
        }
    }
}

async fn collect<S: CrawlSink>(
    mut results: UnboundedReceiver<CrawlResult>,
    mut errors: UnboundedReceiver<FetchError>,
    mut sink: S,
) -> S {
    loop {
        tokio::select! {
            Some(result) = results.recv() => sink.on_result(result),
            Some(error) = errors.recv() => sink.on_error(error),
            else => break,
        }
    }
    sink
}
