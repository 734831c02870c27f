//! HTTP client for the people-search API
//!
//! Talks to `{api_url}/method/<name>` with the configured default parameters
//! (access token, API version) merged into every call.

use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::api::{ApiEnvelope, CandidateRecord, PeopleSearch, PhotoRecord, PhotoStream, SearchQuery};
use crate::config::PersonaConfig;
use crate::error::PersonaError;
use crate::Result;

const SEARCH_METHOD: &str = "users.search";
const PHOTOS_METHOD: &str = "photos.getProfile";

/// reqwest-backed implementation of [`PeopleSearch`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    params: BTreeMap<String, String>,
    http_client: reqwest::Client,
}

impl ApiClient {
    /// Create a client from config. Fails on an unparsable proxy URL.
    pub fn new(config: &PersonaConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout_secs));

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| PersonaError::Config(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let http_client = builder.build()?;

        Ok(ApiClient {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            params: config.params.clone(),
            http_client,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/method/{}", self.base_url, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        extra: Vec<(String, String)>,
    ) -> Result<Vec<T>> {
        let mut params = self.params.clone();
        params.extend(extra);

        debug!(method, "Calling people-search API");
        let response = self
            .http_client
            .get(self.method_url(method))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PersonaError::Http(format!(
                "{method} returned HTTP {}",
                response.status()
            )));
        }

        let envelope: ApiEnvelope<T> = response.json().await?;
        envelope.into_items().inspect_err(|e| {
            if let PersonaError::ApiError { .. } = e {
                debug!(method, error = %e, "API returned an error envelope");
            }
        })
    }
}

#[async_trait]
impl PeopleSearch for ApiClient {
    async fn search_users(&self, query: &SearchQuery) -> Result<Vec<CandidateRecord>> {
        self.call(SEARCH_METHOD, query.to_params()).await
    }

    async fn profile_photos(&self, owner_id: i64) -> Result<Vec<PhotoRecord>> {
        self.call(
            PHOTOS_METHOD,
            vec![("owner_id".to_string(), owner_id.to_string())],
        )
        .await
    }

    async fn fetch_photo(&self, url: &str) -> Result<PhotoStream> {
        let response = self.http_client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(PersonaError::Http(format!(
                "photo download returned HTTP {}",
                response.status()
            )));
        }
        let stream = response
            .bytes_stream()
            .map(|chunk| -> Result<Vec<u8>> { Ok(chunk?.to_vec()) });
        Ok(stream.boxed())
    }
}
