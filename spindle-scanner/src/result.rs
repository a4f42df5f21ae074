use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::extract::Page;

/// One fetched page. Links and assets are the raw attribute values found in
/// the body, before resolution against `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Links")]
    pub links: BTreeSet<String>,
    #[serde(rename = "Assets", alias = "Asssets")]
    pub assets: BTreeSet<String>,
}

impl CrawlResult {
    pub fn new(url: String) -> Self {
        Self {
            url,
            links: BTreeSet::new(),
            assets: BTreeSet::new(),
        }
    }

    pub fn from_page(url: String, page: Page) -> Self {
        Self {
            url,
            links: page.links,
            assets: page.assets,
        }
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub seeds_admitted: usize,
    pub pages_fetched: usize,
    pub fetch_errors: usize,
    pub links_admitted: usize,
    pub duplicates: usize,
    pub out_of_scope: usize,
    pub unparseable: usize,
    pub dropped_after_shutdown: usize,
}

#[derive(Default)]
pub(crate) struct CrawlStats {
    pub seeds_admitted: AtomicUsize,
    pub pages_fetched: AtomicUsize,
    pub fetch_errors: AtomicUsize,
    pub links_admitted: AtomicUsize,
    pub duplicates: AtomicUsize,
    pub out_of_scope: AtomicUsize,
    pub unparseable: AtomicUsize,
    pub dropped_after_shutdown: AtomicUsize,
}

impl CrawlStats {
    pub fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CrawlSummary {
        CrawlSummary {
            seeds_admitted: self.seeds_admitted.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
            links_admitted: self.links_admitted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            out_of_scope: self.out_of_scope.load(Ordering::Relaxed),
            unparseable: self.unparseable.load(Ordering::Relaxed),
            dropped_after_shutdown: self.dropped_after_shutdown.load(Ordering::Relaxed),
        }
    }
}
