use std::time::Instant;

use reqwest::{Client, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use crate::config::HttpCfg;
use crate::error::{CoreResult, GenClientError};
use crate::model::extract_error_message;

/// A boxed stream of body byte segments. Read failures surface as
/// `StreamRead` items; the stream ends at end-of-body.
pub type ByteStream =
    std::pin::Pin<Box<dyn futures_util::stream::Stream<Item = CoreResult<bytes::Bytes>> + Send>>;

/// Shown when a failure body carries no recognizable `detail`/`message`.
pub const FALLBACK_STATUS_MESSAGE: &str = "the generation service returned an error";

/// Thin wrapper around reqwest::Client with defaults and helpers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new_default() -> CoreResult<Self> {
        Self::from_cfg(&HttpCfg::default())
    }

    pub fn from_cfg(cfg: &HttpCfg) -> CoreResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(std::time::Duration::from_millis(cfg.connect_timeout_ms))
            .timeout(std::time::Duration::from_millis(cfg.request_timeout_ms));
        if let Some(cap) = cfg.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(cap);
        }
        let inner = builder
            .build()
            .map_err(|e| GenClientError::Other(anyhow::anyhow!("http client build failed: {e}")))?;
        Ok(Self {
            inner,
            user_agent: "genportal/0.1".to_string(),
        })
    }

    /// POST JSON, expect JSON back. Non-success statuses are mapped with
    /// the message extracted from the failure body.
    pub async fn post_json<T: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
    ) -> CoreResult<(R, u32)> {
        let start = Instant::now();
        let mut req = self
            .inner
            .post(url)
            .json(body)
            .header("User-Agent", &self.user_agent);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let resp = req.send().await.map_err(map_transport_error)?;

        let latency = start.elapsed().as_millis() as u32;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(map_status_error(status, &text));
        }

        let parsed = resp.json::<R>().await.map_err(|e| GenClientError::Other(
            anyhow::anyhow!("json decode error from {}: {e}", status.as_u16()),
        ))?;
        Ok((parsed, latency))
    }

    /// POST JSON and hand back the response body as an incremental byte
    /// stream. The failure branch reads the body whole (never as a stream)
    /// to extract a message, matching `post_json`.
    pub async fn post_stream<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
    ) -> CoreResult<ByteStream> {
        let mut req = self
            .inner
            .post(url)
            .json(body)
            .header("User-Agent", &self.user_agent);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let resp = req.send().await.map_err(map_transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(map_status_error(status, &text));
        }

        use futures_util::TryStreamExt;
        let bytes = resp.bytes_stream().map_err(|e| GenClientError::StreamRead {
            message: format!("stream read failed: {e}"),
        });
        Ok(Box::pin(bytes))
    }
}

fn map_transport_error(e: reqwest::Error) -> GenClientError {
    GenClientError::Transport {
        message: format!("request failed: {e}"),
    }
}

fn map_status_error(status: StatusCode, body: &str) -> GenClientError {
    let message =
        extract_error_message(body).unwrap_or_else(|| FALLBACK_STATUS_MESSAGE.to_string());
    GenClientError::Status {
        code: status.as_u16(),
        message,
    }
}
