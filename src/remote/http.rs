use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use url::Url;

use crate::app::{LightboxError, Result};
use crate::domain::Photo;
use crate::remote::{PhotoDto, RemoteSource};

pub struct HttpRemoteSource {
    client: Client,
    base_url: Url,
}

impl HttpRemoteSource {
    /// Build a client for the catalog endpoint. The timeout bounds every
    /// fetch; a timed-out request surfaces as a transport error. The API
    /// key, when present, is attached to every request as an
    /// `Authorization` header.
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;

        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| LightboxError::Config("API key is not a valid header value".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("lightbox/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Vec<Photo>> {
        let mut url = self.base_url.join("items")?;
        if let Some(max_id) = cursor {
            url.query_pairs_mut().append_pair("max_id", max_id);
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LightboxError::Protocol(status));
        }

        let batch: Vec<PhotoDto> = response.json().await?;
        Ok(batch.into_iter().map(PhotoDto::into_photo).collect())
    }
}
