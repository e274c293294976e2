//! HTTP download of job inputs.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, Url};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use qclip_media::fs_utils::{discard, promote_file, temp_sibling};

use crate::error::{WorkerError, WorkerResult};

/// Longest response body quoted in a download error.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Streams HTTP(S) resources onto local paths.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher. With `timeout`, each request (body included) is
    /// bounded by it; otherwise requests run until the host stops the job.
    pub fn new(timeout: Option<Duration>) -> WorkerResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| WorkerError::config_error(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Download `url` to `dst`, replacing any existing file.
    ///
    /// The body is streamed into a temporary sibling and moved onto `dst`
    /// only once complete. Non-2xx responses fail with the status and the
    /// start of the response body.
    pub async fn download(&self, url: &str, dst: &Path) -> WorkerResult<u64> {
        let parsed = Url::parse(url).map_err(|e| WorkerError::download(url, e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(WorkerError::download(
                url,
                format!("unsupported URL scheme '{}'", parsed.scheme()),
            ));
        }

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).await?;
        }

        debug!(url = %url, path = %dst.display(), "Starting download");
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| WorkerError::download(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(WorkerError::download(
                url,
                format!("GET {}: {}", status.as_u16(), body),
            ));
        }

        let staging = temp_sibling(dst);
        match stream_to_file(url, response, &staging).await {
            Ok(bytes) => {
                if let Err(e) = promote_file(&staging, dst).await {
                    discard(&staging).await;
                    return Err(WorkerError::download(url, e.to_string()));
                }
                info!(url = %url, path = %dst.display(), bytes, "Download complete");
                Ok(bytes)
            }
            Err(e) => {
                discard(&staging).await;
                Err(e)
            }
        }
    }
}

async fn stream_to_file(url: &str, response: reqwest::Response, path: &Path) -> WorkerResult<u64> {
    let mut file = fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let data = chunk.map_err(|e| WorkerError::download(url, e.to_string()))?;
        file.write_all(&data).await?;
        written += data.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}
