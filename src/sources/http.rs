use log::{debug, warn};
use reqwest::{Client, ClientBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::SourceFetchError;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; RecipeIngestBot/1.0)";

/// Finish a client builder, falling back to a default client (without the
/// configured timeout or headers) if the builder is rejected.
pub(crate) fn build_client(builder: ClientBuilder, purpose: &str) -> Client {
    builder.build().unwrap_or_else(|e| {
        warn!("Failed to build {purpose} HTTP client, using defaults: {e}");
        Client::new()
    })
}

/// Shared GET client for every source adapter
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Self {
        let timeout = timeout.unwrap_or(Duration::from_secs(15));
        let client = build_client(
            Client::builder().timeout(timeout).user_agent(USER_AGENT),
            "source fetch",
        );

        Self { client }
    }

    pub async fn get_text(&self, url: &str) -> Result<String, SourceFetchError> {
        let response = self.send(url, &[]).await?;
        Ok(response.text().await?)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SourceFetchError> {
        let response = self.send(url, query).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            SourceFetchError::parse_failure(format!("Unexpected JSON from {url}: {e}"))
        })
    }

    async fn send(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, SourceFetchError> {
        debug!("GET {url}");
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceFetchError::from_status(status, url));
        }
        Ok(response)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchFailureReason;
    use mockito::Server;

    #[tokio::test]
    async fn test_rejected_builder_falls_back_to_default_client() {
        let mut server = Server::new_async().await;
        let page = server
            .mock("GET", "/page")
            .with_body("ok")
            .create_async()
            .await;

        let client = build_client(Client::builder().user_agent("bad\nagent"), "test");
        let body = client
            .get(format!("{}/page", server.url()))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "ok");
        page.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_classification() {
        let mut server = Server::new_async().await;
        let missing = server.mock("GET", "/gone").with_status(404).create_async().await;
        let private = server.mock("GET", "/private").with_status(403).create_async().await;

        let fetcher = HttpFetcher::default();
        let err = fetcher
            .get_text(&format!("{}/gone", server.url()))
            .await
            .unwrap_err();
        assert_eq!(err.reason, FetchFailureReason::NotFound);

        let err = fetcher
            .get_text(&format!("{}/private", server.url()))
            .await
            .unwrap_err();
        assert_eq!(err.reason, FetchFailureReason::Blocked);

        missing.assert_async().await;
        private.assert_async().await;
    }

    #[tokio::test]
    async fn test_bad_json_is_parse_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/data")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let result: Result<serde_json::Value, _> = HttpFetcher::default()
            .get_json(&format!("{}/data", server.url()), &[])
            .await;
        assert_eq!(result.unwrap_err().reason, FetchFailureReason::ParseFailure);
    }
}
