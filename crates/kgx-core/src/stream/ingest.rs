//! Frame decoding and the cancellable stream reader.

use std::fmt;
use std::pin::pin;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::{IngestError, LineBuffer, StreamMessage};
use crate::USER_AGENT;

const DATA_PREFIX: &str = "data: ";

/// Receives everything a stream produces, in frame order.
///
/// After `on_error` or `on_complete` nothing else is delivered. A cancelled
/// stream delivers nothing further at all.
pub trait StreamHandler: Send {
    fn on_message(&mut self, message: StreamMessage);
    fn on_error(&mut self, error: IngestError);
    /// `last` is the terminal `status: "complete"` message, or `None` when
    /// the transport simply ended.
    fn on_complete(&mut self, last: Option<StreamMessage>);
}

/// Handler callbacks as values, for forwarding into an event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestEvent {
    Message(StreamMessage),
    Error(IngestError),
    Complete(Option<StreamMessage>),
}

impl StreamHandler for mpsc::UnboundedSender<IngestEvent> {
    fn on_message(&mut self, message: StreamMessage) {
        let _ = self.send(IngestEvent::Message(message));
    }

    fn on_error(&mut self, error: IngestError) {
        let _ = self.send(IngestEvent::Error(error));
    }

    fn on_complete(&mut self, last: Option<StreamMessage>) {
        let _ = self.send(IngestEvent::Complete(last));
    }
}

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Decodes one line. Non-data lines and blank payloads yield `None`;
/// malformed payloads are logged and yield `None`.
pub fn decode_frame(line: &str) -> Option<StreamMessage> {
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => match StreamMessage::try_from(value) {
            Ok(message) => Some(message),
            Err(_) => {
                warn!(frame = payload, "Skipping non-object frame");
                None
            }
        },
        Err(err) => {
            warn!(frame = payload, error = %err, "Skipping malformed frame");
            None
        }
    }
}

/// Reads `stream` to its end, delivering decoded frames to `handler`.
///
/// Stops at the first `status: "complete"` message, at EOF, at a read
/// error, or when `cancel` fires. Cancellation is checked before every read
/// and suppresses any error the aborted read produces.
pub async fn pump<S, E, H>(stream: S, cancel: &CancellationToken, handler: &mut H) -> PumpOutcome
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: fmt::Display,
    H: StreamHandler + ?Sized,
{
    let mut stream = pin!(stream);
    let mut lines = LineBuffer::new();

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Stream cancelled");
                return PumpOutcome::Cancelled;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for line in lines.push(&chunk) {
                    if let Some(outcome) = dispatch(&line, handler) {
                        return outcome;
                    }
                }
            }
            Some(Err(err)) => {
                if cancel.is_cancelled() {
                    return PumpOutcome::Cancelled;
                }
                let err = IngestError::read(format!("Stream read failed: {err}"));
                error!(kind = %err.kind, "{err}");
                handler.on_error(err);
                return PumpOutcome::Failed;
            }
            None => {
                if let Some(line) = lines.finish()
                    && let Some(outcome) = dispatch(&line, handler)
                {
                    return outcome;
                }
                debug!("Stream ended without completion message");
                handler.on_complete(None);
                return PumpOutcome::Completed;
            }
        }
    }
}

fn dispatch<H: StreamHandler + ?Sized>(line: &str, handler: &mut H) -> Option<PumpOutcome> {
    let message = decode_frame(line)?;
    if message.is_complete() {
        handler.on_complete(Some(message));
        return Some(PumpOutcome::Completed);
    }
    handler.on_message(message);
    None
}

/// Opens search streams against one endpoint.
#[derive(Debug, Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    url: String,
}

impl StreamClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, connect_timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self {
            http: builder.build().context("Failed to build HTTP client")?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Starts a stream on the current tokio runtime.
    ///
    /// The returned handle cancels the stream when dropped.
    pub fn open<T, H>(&self, request: &T, mut handler: H) -> StreamHandle
    where
        T: Serialize + ?Sized,
        H: StreamHandler + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let builder = self
            .http
            .post(&self.url)
            .header("accept", "text/event-stream")
            .json(request);
        debug!(url = %self.url, "Opening stream");

        let task = tokio::spawn(async move { run(builder, &token, &mut handler).await });
        StreamHandle {
            cancel,
            task: Some(task),
        }
    }
}

async fn run<H: StreamHandler>(
    builder: reqwest::RequestBuilder,
    cancel: &CancellationToken,
    handler: &mut H,
) -> PumpOutcome {
    let response = tokio::select! {
        biased;
        () = cancel.cancelled() => return PumpOutcome::Cancelled,
        response = builder.send() => response,
    };

    let response = match response {
        Ok(response) => response,
        Err(err) => {
            let err = IngestError::from_reqwest(&err);
            error!(kind = %err.kind, "{err}");
            handler.on_error(err);
            return PumpOutcome::Failed;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return PumpOutcome::Cancelled,
            body = response.text() => body.unwrap_or_default(),
        };
        let err = IngestError::http_status(status.as_u16(), &body);
        error!(kind = %err.kind, "{err}");
        handler.on_error(err);
        return PumpOutcome::Failed;
    }

    pump(response.bytes_stream(), cancel, handler).await
}

/// Owner of a running stream.
#[derive(Debug)]
pub struct StreamHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<PumpOutcome>>,
}

impl StreamHandle {
    /// Aborts the stream. The handler receives no further callbacks.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the reader task; `None` if it panicked.
    pub async fn wait(mut self) -> Option<PumpOutcome> {
        let task = self.task.take()?;
        task.await.ok()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel.cancel();
        }
    }
}
