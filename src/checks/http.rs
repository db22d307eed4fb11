//! HTTP collaborator
//!
//! `GET(url) -> {status, body}` shared by the rating poller, the CRL check
//! and the HSTS lookups. Following redirects is this layer's job.

use crate::utils::HttpError;
use async_trait::async_trait;
use reqwest::{redirect, Client};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Status code and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Require a 2xx status and decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, HttpError> {
        if !self.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: self.status,
            });
        }
        serde_json::from_slice(&self.body).map_err(|e| HttpError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse, HttpError>;
}

/// [`HttpFetch`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Follow at most `max_redirects` hops; each request is bounded by `timeout`
    pub fn new(max_redirects: usize, timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .redirect(redirect::Policy::limited(max_redirects))
            .timeout(timeout)
            .user_agent(concat!("ssl-checks/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get(&self, url: &Url) -> Result<HttpResponse, HttpError> {
        debug!(%url, "HTTP GET");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(%url, status, bytes = body.len(), "HTTP response");
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        status: String,
    }

    #[test]
    fn test_json_requires_success() {
        let url = Url::parse("https://example.com/api").unwrap();
        let response = HttpResponse {
            status: 500,
            body: br#"{"status":"READY"}"#.to_vec(),
        };
        assert!(matches!(
            response.json::<Payload>(&url),
            Err(HttpError::Status { status: 500, .. })
        ));

        let response = HttpResponse {
            status: 200,
            body: br#"{"status":"READY"}"#.to_vec(),
        };
        assert_eq!(response.json::<Payload>(&url).unwrap().status, "READY");
    }

    #[test]
    fn test_json_decode_error() {
        let url = Url::parse("https://example.com/api").unwrap();
        let response = HttpResponse {
            status: 200,
            body: b"<html>".to_vec(),
        };
        assert!(matches!(
            response.json::<Payload>(&url),
            Err(HttpError::Decode { .. })
        ));
    }
}
