//! Network access for the cache manager.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::{Origin, Url};

use crate::error::{OfflineError, OfflineResult};
use crate::request::{HttpResponse, Request, RequestMode, ResponseType};

/// Performs a request against the network.
///
/// An `Err` means the network was unreachable; any HTTP status is `Ok`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> OfflineResult<HttpResponse>;
}

/// Fetches with reqwest and classifies responses relative to the app origin.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
    origin: Origin,
}

impl ReqwestFetcher {
    /// # Errors
    /// Fails if the HTTP client cannot be built.
    pub fn new(origin: &Url, timeout: Duration) -> OfflineResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OfflineError::Network {
                url: origin.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            origin: origin.origin(),
        })
    }

    fn response_type(&self, request: &Request) -> ResponseType {
        if request.url.origin() == self.origin {
            ResponseType::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &Request) -> OfflineResult<HttpResponse> {
        let network_error = |e: reqwest::Error| OfflineError::Network {
            url: request.url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(network_error)?.to_vec();

        Ok(HttpResponse {
            url,
            status,
            headers,
            body,
            response_type: self.response_type(request),
        })
    }
}
