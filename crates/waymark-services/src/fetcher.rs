//! Plain HTTP GET capability, used for http(s) content and the public gateway.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;

use crate::content_types::ByteStream;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

pub enum FetchBody {
    Buffered(Bytes),
    Streaming(ByteStream),
}

pub struct FetchedResponse {
    /// Declared content type, parameters stripped.
    pub content_type: Option<String>,
    pub length: Option<u64>,
    pub body: FetchBody,
}

impl FetchedResponse {
    pub fn declares_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("application/json"))
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url`. With `streaming` the body is handed back unbuffered.
    async fn get(&self, url: &str, streaming: bool) -> Result<FetchedResponse, FetchError>;
}

pub struct ReqwestFetcher {
    http: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
        })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn get(&self, url: &str, streaming: bool) -> Result<FetchedResponse, FetchError> {
        let request_error = |e: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        };

        let resp = self.http.get(url).send().await.map_err(request_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
        let length = resp.content_length();

        let body = if streaming {
            FetchBody::Streaming(Box::pin(resp.bytes_stream().map_err(std::io::Error::other)))
        } else {
            FetchBody::Buffered(resp.bytes().await.map_err(request_error)?)
        };

        Ok(FetchedResponse {
            content_type,
            length,
            body,
        })
    }
}
