//! The shared queue of URLs waiting to be fetched.
//!
//! Every push counts one unit of outstanding work. Popping a URL hands out a
//! [`WorkTicket`] for that unit; the unit is complete when the last clone of
//! the ticket is dropped. Expansion tasks push their discovered URL before
//! releasing the parent ticket, so the counter only reaches zero when nothing
//! is queued, fetched, or expanded anywhere.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

/// Deadline used when `now + idle` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Push rejected because the frontier was closed. Hands the URL back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierClosed(pub String);

/// Outcome of waiting on the frontier.
#[derive(Debug)]
pub enum Next {
    Url(String, WorkTicket),
    /// The idle timeout elapsed without a URL arriving.
    Idle,
    Closed,
}

#[derive(Default)]
struct QueueState {
    urls: VecDeque<String>,
    closed: bool,
}

pub struct Frontier {
    state: Mutex<QueueState>,
    outstanding: AtomicUsize,
    close_when_drained: bool,
    notify: Notify,
}

impl Frontier {
    /// With `close_when_drained`, the frontier closes itself as soon as the
    /// outstanding count returns to zero.
    pub fn new(close_when_drained: bool) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState::default()),
            outstanding: AtomicUsize::new(0),
            close_when_drained,
            notify: Notify::new(),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, url: String) -> Result<(), FrontierClosed> {
        {
            let mut state = self.lock_state();
            if state.closed {
                return Err(FrontierClosed(url));
            }
            self.outstanding.fetch_add(1, Ordering::AcqRel);
            state.urls.push_back(url);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Waits for a URL. Returns [`Next::Idle`] if none arrives within `idle`.
    pub async fn next(self: &Arc<Self>, idle: Duration) -> Next {
        let now = Instant::now();
        let deadline = now.checked_add(idle).unwrap_or(now + FAR_FUTURE);

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock_state();
                if state.closed {
                    return Next::Closed;
                }
                if let Some(url) = state.urls.pop_front() {
                    return Next::Url(
                        url,
                        WorkTicket {
                            frontier: Arc::clone(self),
                        },
                    );
                }
            }

            if timeout_at(deadline, notified).await.is_err() {
                return Next::Idle;
            }
        }
    }

    /// Closes the frontier and wakes every waiter. Returns how many queued
    /// URLs were discarded.
    pub fn close(&self) -> usize {
        let discarded = {
            let mut state = self.lock_state();
            if state.closed {
                return 0;
            }
            state.closed = true;
            let discarded = state.urls.len();
            state.urls.clear();
            discarded
        };
        debug!("Frontier closed ({} queued URLs discarded)", discarded);
        self.notify.notify_waiters();
        discarded
    }

    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    /// URLs pushed whose processing has not finished yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// URLs queued and not yet picked up.
    pub fn queued(&self) -> usize {
        self.lock_state().urls.len()
    }

    fn complete(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 && self.close_when_drained {
            self.close();
        }
    }
}

/// One unit of outstanding work. Share it with `Arc` across the tasks that
/// finish the unit; dropping the last holder completes it.
#[derive(Debug)]
pub struct WorkTicket {
    frontier: Arc<Frontier>,
}

impl Drop for WorkTicket {
    fn drop(&mut self) {
        self.frontier.complete();
    }
}

impl std::fmt::Debug for Frontier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frontier")
            .field("outstanding", &self.outstanding())
            .field("close_when_drained", &self.close_when_drained)
            .finish_non_exhaustive()
    }
}
