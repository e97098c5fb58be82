//! Concurrent capture of rendered pages from the running server.
mod error;
pub use error::{FetchCause, FetchError};

mod http;
pub use http::HttpSource;

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use futures::future::join_all;
use prerend_model::RouteMap;
use tracing::{debug, instrument, warn};

/// Something that can return the rendered body of a single URL.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch `url`, which serves `route`.
    async fn get(&self, route: &str, url: &str) -> Result<String, FetchCause>;
}

/// Rendered bodies keyed by route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotResult(BTreeMap<String, String>);

impl SnapshotResult {
    pub fn get(&self, route: &str) -> Option<&str> {
        self.0.get(route).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(r, b)| (r.as_str(), b.as_str()))
    }
}

impl FromIterator<(String, String)> for SnapshotResult {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Fetches every route of a [`RouteMap`] at once and joins the results.
///
/// All requests run to completion; the result is either one body per route
/// or a single [`FetchError`] naming the first failing route in route order.
#[derive(Clone)]
pub struct RouteSnapshotFetcher {
    source: Arc<dyn SnapshotSource>,
}

impl RouteSnapshotFetcher {
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self { source }
    }

    #[instrument(level = "debug", skip(self, routes), fields(routes = routes.len()))]
    pub async fn fetch_all(
        &self,
        base_url: &str,
        routes: &RouteMap,
    ) -> Result<SnapshotResult, FetchError> {
        let base = base_url.trim_end_matches('/');

        let fetches = routes.routes().map(|route| {
            let url = format!("{base}{route}");
            async move {
                let res = self.source.get(route, &url).await;
                (route, url, res)
            }
        });

        let mut pages = BTreeMap::new();
        for (route, url, res) in join_all(fetches).await {
            match res {
                Ok(body) => {
                    debug!(route, bytes = body.len(), "route captured");
                    pages.insert(route.to_string(), body);
                }
                Err(cause) => {
                    warn!(route, url = %url, error = %cause, "route capture failed");
                    return Err(FetchError {
                        route: route.to_string(),
                        url,
                        cause,
                    });
                }
            }
        }
        Ok(SnapshotResult(pages))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::Mutex,
        time::{Duration, Instant},
    };

    use super::*;

    /// Canned responses with an artificial delay per request.
    struct Canned {
        pages: HashMap<String, Result<String, u16>>,
        delay: Duration,
        seen: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(pages: &[(&str, Result<&str, u16>)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(route, res)| (route.to_string(), res.map(str::to_string)))
                    .collect(),
                delay: Duration::from_millis(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl SnapshotSource for Canned {
        async fn get(&self, route: &str, url: &str) -> Result<String, FetchCause> {
            self.seen.lock().unwrap().push(url.to_string());
            tokio::time::sleep(self.delay).await;
            match self.pages.get(route) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(code)) => Err(FetchCause::Status(*code)),
                None => Err(FetchCause::Connect("connection refused".into())),
            }
        }
    }

    fn routes(pairs: &[(&str, &str)]) -> RouteMap {
        let mut map = RouteMap::new();
        for (route, file) in pairs {
            map.insert(*route, *file).unwrap();
        }
        map
    }

    #[tokio::test]
    async fn returns_one_body_per_route() {
        let source = Arc::new(Canned::new(&[
            ("/", Ok("<h1>home</h1>")),
            ("/404", Ok("<h1>not found</h1>")),
        ]));
        let fetcher = RouteSnapshotFetcher::new(source.clone());

        let result = fetcher
            .fetch_all(
                "http://localhost:8000/",
                &routes(&[("/", "index.html"), ("/404", "404.html")]),
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.get("/"), Some("<h1>home</h1>"));
        assert_eq!(result.get("/404"), Some("<h1>not found</h1>"));

        let mut urls = source.seen.lock().unwrap().clone();
        urls.sort();
        assert_eq!(
            urls,
            vec!["http://localhost:8000/", "http://localhost:8000/404"]
        );
    }

    #[tokio::test]
    async fn one_failing_route_fails_the_whole_fetch() {
        let source = Arc::new(Canned::new(&[("/", Ok("<h1>home</h1>"))]));
        let fetcher = RouteSnapshotFetcher::new(source);

        let err = fetcher
            .fetch_all(
                "http://localhost:8000",
                &routes(&[("/", "index.html"), ("/404", "404.html")]),
            )
            .await
            .unwrap_err();

        assert_eq!(err.route, "/404");
        assert_eq!(err.url, "http://localhost:8000/404");
        assert!(matches!(err.cause, FetchCause::Connect(_)));
    }

    #[tokio::test]
    async fn never_returns_a_partial_result() {
        let pairs: Vec<(String, String)> = (0..6)
            .map(|i| (format!("/p{i}"), format!("p{i}.html")))
            .collect();
        let map = pairs.iter().fold(RouteMap::new(), |mut m, (r, f)| {
            m.insert(r.as_str(), f.as_str()).unwrap();
            m
        });

        for failing in 0..=pairs.len() {
            let pages: Vec<(&str, Result<&str, u16>)> = pairs
                .iter()
                .enumerate()
                .map(|(i, (route, _))| {
                    let res = if i == failing { Err(500) } else { Ok("ok") };
                    (route.as_str(), res)
                })
                .collect();
            let fetcher = RouteSnapshotFetcher::new(Arc::new(Canned::new(&pages)));

            match fetcher.fetch_all("http://h", &map).await {
                Ok(result) => {
                    assert_eq!(failing, pairs.len());
                    assert_eq!(result.len(), pairs.len());
                }
                Err(err) => {
                    assert!(failing < pairs.len());
                    assert_eq!(err.route, format!("/p{failing}"));
                }
            }
        }
    }

    #[tokio::test]
    async fn requests_run_concurrently() {
        let source = Arc::new(
            Canned::new(&[("/a", Ok("a")), ("/b", Ok("b")), ("/c", Ok("c"))])
                .with_delay(Duration::from_millis(200)),
        );
        let fetcher = RouteSnapshotFetcher::new(source);
        let map = routes(&[("/a", "a.html"), ("/b", "b.html"), ("/c", "c.html")]);

        let started = Instant::now();
        let result = fetcher.fetch_all("http://h", &map).await.unwrap();

        assert_eq!(result.len(), 3);
        assert!(
            started.elapsed() < Duration::from_millis(550),
            "fetches look sequential: {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn reports_first_failure_in_route_order() {
        let source = Arc::new(Canned::new(&[("/a", Err(502)), ("/b", Err(503))]));
        let fetcher = RouteSnapshotFetcher::new(source);

        let err = fetcher
            .fetch_all("http://h", &routes(&[("/b", "b.html"), ("/a", "a.html")]))
            .await
            .unwrap_err();
        assert_eq!(err.route, "/a");
        assert!(matches!(err.cause, FetchCause::Status(502)));
    }
}
