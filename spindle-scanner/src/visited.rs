use std::collections::HashSet;
use tokio::sync::Mutex;

/// URLs admitted to the frontier during one run. Grows only.
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url` and returns `true` the first time it is offered; `false`
    /// for every later call with the same string. Check and insert happen
    /// under one lock acquisition.
    pub async fn try_admit(&self, url: &str) -> bool {
        let mut seen = self.seen.lock().await;
        if seen.contains(url) {
            return false;
        }
        seen.insert(url.to_string())
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.seen.lock().await.contains(url)
    }

    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.seen.lock().await.is_empty()
    }
}
