//! Async page fetching.
//!
//! Not a browser: plain HTTP GETs with redirects, a per-request timeout, and
//! a small retry budget for 5xx and transport errors.

use super::request::{Request, Response};
use crate::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = concat!(
    "crest-harvest/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/crest-harvest/crest-harvest)"
);

/// Anything that can turn a [`Request`] into a [`Response`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// [`PageFetcher`] backed by reqwest.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            client: build_client(timeout),
            max_retries,
        }
    }
}

/// Client shared by page and asset fetches.
pub fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let mut retries = 0u32;

        loop {
            match self.client.get(request.url.clone()).send().await {
                Ok(r) => {
                    let status = r.status().as_u16();

                    // Retry on 5xx
                    if status >= 500 && retries < self.max_retries {
                        retries += 1;
                        debug!(url = %request.url, status, retries, "retrying page");
                        tokio::time::sleep(Duration::from_millis(500 * 2u64.pow(retries - 1)))
                            .await;
                        continue;
                    }

                    let final_url = r.url().clone();
                    let body = r
                        .text()
                        .await
                        .map_err(|e| FetchError::Transport(e.to_string()))?;
                    return Ok(Response::new(request, final_url, status, body));
                }
                Err(e) => {
                    if retries < self.max_retries {
                        retries += 1;
                        debug!(url = %request.url, error = %e, retries, "retrying page");
                        tokio::time::sleep(Duration::from_millis(500 * 2u64.pow(retries - 1)))
                            .await;
                        continue;
                    }
                    return Err(FetchError::Transport(e.to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_keeps_token_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Bled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>Bled</html>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5), 0);
        let url = Url::parse(&format!("{}/wiki/Bled", server.uri())).unwrap();
        let response = fetcher
            .fetch(&Request::new(url).attach(EntityId(4)))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "<html>Bled</html>");
        assert_eq!(response.read(), Some(EntityId(4)));
    }

    #[tokio::test]
    async fn test_fetch_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5), 1);
        let url = Url::parse(&server.uri()).unwrap();
        let response = fetcher.fetch(&Request::new(url)).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "ok");
    }
}
