//! HTTP transport adapter for the answering service.
//!
//! Owns the raw request/response exchange in all three modes: one-shot JSON
//! for `Normal`/`Agentic`, and a pull-based chunk source for `Streamed`.
//! Every suspension point observes the turn's cancellation token; a
//! cancelled exchange yields no further chunks and resolves no response.

use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use sibyl_core::config::ServiceConfig;

use crate::error::TurnError;
use crate::types::{ChatRequest, ChatResponse, ErrorDetail, HealthStatus};

/// HTTP client for the answering service.
#[derive(Clone, Debug)]
pub struct Transport {
    http: reqwest::Client,
    base_url: String,
}

impl Transport {
    /// Builds a transport from service settings. The request timeout is a
    /// policy knob: `None` leaves a stalled exchange open until cancelled.
    pub fn new(config: &ServiceConfig) -> Result<Self, TurnError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| TurnError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Service health probe; source of the knowledge-base gate signal.
    pub async fn health(&self) -> Result<HealthStatus, TurnError> {
        let url = format!("{}/health", self.base_url);
        let response = self.http.get(&url).send().await.map_err(request_error)?;
        let response = check_status(response).await?;
        response
            .json::<HealthStatus>()
            .await
            .map_err(|e| TurnError::Transport(format!("invalid health response: {}", e)))
    }

    /// One request, one response (`Normal` and `Agentic` modes).
    pub async fn send_chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, TurnError> {
        let url = format!("{}/chat", self.base_url);
        tracing::debug!(url = %url, agentic = request.agentic_mode, "Sending chat request");

        let send = self.http.post(&url).json(request).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(TurnError::Cancelled),
            response = send => response.map_err(request_error)?,
        };
        let response = check_status(response).await?;

        let read = response.json::<ChatResponse>();
        tokio::select! {
            _ = cancel.cancelled() => Err(TurnError::Cancelled),
            body = read => {
                body.map_err(|e| TurnError::Transport(format!("invalid chat response: {}", e)))
            }
        }
    }

    /// Opens the streamed exchange (`Streamed` mode) and returns a
    /// pull-based chunk source.
    pub async fn open_stream(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChunkStream, TurnError> {
        let url = format!("{}/chat/stream", self.base_url);
        tracing::debug!(url = %url, "Opening streamed chat request");

        let send = self.http.post(&url).json(request).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(TurnError::Cancelled),
            response = send => response.map_err(request_error)?,
        };
        let response = check_status(response).await?;

        let chunks = response
            .bytes_stream()
            .map(|result| result.map(|bytes| bytes.to_vec()))
            .boxed();

        Ok(ChunkStream {
            chunks,
            cancel: cancel.clone(),
        })
    }
}

/// Pull-based view of a streamed response body.
pub struct ChunkStream {
    chunks: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    cancel: CancellationToken,
}

impl ChunkStream {
    /// Yields the next body chunk, or `None` at end-of-stream.
    ///
    /// Cancellation is observed here, at the suspension point: once the
    /// token fires, no further chunk is ever yielded.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TurnError> {
        if self.cancel.is_cancelled() {
            return Err(TurnError::Cancelled);
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(TurnError::Cancelled),
            chunk = self.chunks.next() => match chunk {
                Some(Ok(bytes)) => Ok(Some(bytes)),
                Some(Err(e)) => Err(TurnError::Transport(e.to_string())),
                None => Ok(None),
            },
        }
    }
}

impl std::fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Surfaces the service-provided error detail on non-2xx responses, else a
/// generic failure naming the status.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TurnError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response
        .json::<ErrorDetail>()
        .await
        .ok()
        .map(|body| body.detail)
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| format!("service returned status {}", status));

    tracing::warn!(status = %status, detail = %detail, "Request rejected by service");
    Err(TurnError::Transport(detail))
}

fn request_error(err: reqwest::Error) -> TurnError {
    if err.is_timeout() {
        TurnError::Transport("request timed out".to_string())
    } else if err.is_connect() {
        TurnError::Transport(format!("service unreachable: {}", err))
    } else {
        TurnError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ServiceConfig {
        ServiceConfig {
            base_url: base_url.to_string(),
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let transport = Transport::new(&config("http://127.0.0.1:5001/")).unwrap();
        assert_eq!(transport.base_url, "http://127.0.0.1:5001");
    }

    #[test]
    fn test_builds_with_and_without_timeout() {
        assert!(Transport::new(&config("http://127.0.0.1:5001")).is_ok());

        let mut with_timeout = config("http://127.0.0.1:5001");
        with_timeout.request_timeout_secs = Some(30);
        assert!(Transport::new(&with_timeout).is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_before_send_resolves_nothing() {
        let transport = Transport::new(&config("http://127.0.0.1:9")).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = crate::types::ChatRequest {
            user_id: "u".to_string(),
            thread_id: "t".to_string(),
            message: "q".to_string(),
            top_k: 5,
            save_to_file: false,
            file_name: None,
            save_as_document: false,
            retrieval_mode: Default::default(),
            answer_mode: Default::default(),
            agentic_mode: false,
            max_loops: 2,
        };

        // A pre-cancelled token wins the race against any network activity.
        let result = transport.send_chat(&request, &cancel).await;
        assert!(matches!(result, Err(TurnError::Cancelled) | Err(TurnError::Transport(_))));
    }
}
