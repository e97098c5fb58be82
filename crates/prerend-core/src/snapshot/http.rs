use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::trace;

use crate::snapshot::{FetchCause, SnapshotSource};

/// [`SnapshotSource`] that issues plain HTTP GET requests.
///
/// Bodies are read chunk by chunk and decoded as UTF-8 only once complete,
/// so multi-byte characters split across chunks survive intact.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    expect_status: BTreeMap<String, u16>,
}

impl HttpSource {
    /// Client where each request (connect through last body byte) is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("prerend/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            expect_status: BTreeMap::new(),
        }
    }

    /// Accept `status` for `route` in addition to any 2xx response.
    pub fn expect_status(mut self, route: impl Into<String>, status: u16) -> Self {
        self.expect_status.insert(route.into(), status);
        self
    }

    pub fn expect_statuses(mut self, statuses: &BTreeMap<String, u16>) -> Self {
        self.expect_status
            .extend(statuses.iter().map(|(r, s)| (r.clone(), *s)));
        self
    }

    fn accepts(&self, route: &str, status: StatusCode) -> bool {
        status.is_success() || self.expect_status.get(route) == Some(&status.as_u16())
    }
}

fn classify(err: reqwest::Error) -> FetchCause {
    if err.is_timeout() {
        FetchCause::Timeout
    } else if err.is_body() || err.is_decode() {
        FetchCause::Body(err.to_string())
    } else {
        FetchCause::Connect(err.to_string())
    }
}

#[async_trait]
impl SnapshotSource for HttpSource {
    async fn get(&self, route: &str, url: &str) -> Result<String, FetchCause> {
        let mut response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !self.accepts(route, status) {
            return Err(FetchCause::Status(status.as_u16()));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            trace!(route, chunk = chunk.len(), "body chunk");
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
