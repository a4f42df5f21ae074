use crate::config::FetchOptions;
use crate::error::{FetchFailure, Result};
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Retrieves a page body. One attempt, no retry.
pub trait Fetch: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = std::result::Result<String, FetchFailure>> + Send;
}

impl<T: Fetch> Fetch for Arc<T> {
    fn fetch(&self, url: &str) -> impl Future<Output = std::result::Result<String, FetchFailure>> + Send {
        T::fetch(self, url)
    }
}

/// reqwest-backed fetcher. Any HTTP status counts as success; only transport
/// errors (connect, TLS, timeout, body read) fail.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(options: &FetchOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(options.user_agent.as_str())
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .pool_max_idle_per_host(50)
            .tcp_keepalive(std::time::Duration::from_secs(60));

        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchFailure> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await?;
        debug!("{} answered {}", url, response.status());

        Ok(response.text().await?)
    }
}
