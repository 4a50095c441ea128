//! Streaming chat inference.
//!
//! Sends the prompt segments as one system message plus one user message
//! per segment, then folds the newline-delimited JSON reply into a growing
//! text buffer. Failures never escape [`InferenceClient::run`]: the error
//! text becomes the output so the caller can show and cache it like any
//! other answer.

use std::sync::Arc;

use futures::StreamExt;
use serde::Deserialize;
use thiserror::Error;

use crate::models::PromptSegment;
use crate::providers::{ChatMessage, ChatRequest, ChatTransport, ProviderError};

/// Errors that end up in the review text.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error(transparent)]
    Transport(#[from] ProviderError),

    #[error("model server reported an error: {0}")]
    Server(String),
}

/// Receives streaming updates for one run.
pub trait StreamObserver: Send {
    /// Called with the full text accumulated so far.
    fn on_progress(&mut self, accumulated: &str);

    /// Called exactly once when the run ends, successfully or not.
    fn on_complete(&mut self);
}

/// Adapts a pair of closures to [`StreamObserver`].
pub struct CallbackObserver<P, C> {
    progress: P,
    complete: Option<C>,
}

impl<P, C> CallbackObserver<P, C>
where
    P: FnMut(&str) + Send,
    C: FnOnce() + Send,
{
    pub fn new(progress: P, complete: C) -> Self {
        Self {
            progress,
            complete: Some(complete),
        }
    }
}

impl<P, C> StreamObserver for CallbackObserver<P, C>
where
    P: FnMut(&str) + Send,
    C: FnOnce() + Send,
{
    fn on_progress(&mut self, accumulated: &str) {
        (self.progress)(accumulated);
    }

    fn on_complete(&mut self) {
        if let Some(complete) = self.complete.take() {
            complete();
        }
    }
}

/// Outcome of one inference call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceRun {
    /// Model output, or the error text when `failed` is set.
    pub accumulated_text: String,
    /// The stream ended without a transport failure.
    pub done: bool,
    /// Error text was written into `accumulated_text`.
    pub failed: bool,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// Drives streaming chat calls over a [`ChatTransport`].
#[derive(Clone)]
pub struct InferenceClient {
    transport: Arc<dyn ChatTransport>,
    system_prompt: String,
}

impl InferenceClient {
    pub fn new(transport: Arc<dyn ChatTransport>, system_prompt: impl Into<String>) -> Self {
        Self {
            transport,
            system_prompt: system_prompt.into(),
        }
    }

    /// Build the chat request: system message first, then segments in order.
    pub fn build_request(&self, segments: &[PromptSegment], model: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(segments.len() + 1);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(segments.iter().map(|s| ChatMessage::user(s.clone())));
        ChatRequest {
            model: model.to_string(),
            messages,
            stream: true,
        }
    }

    /// Stream a completion for `segments`, reporting through `observer`.
    pub async fn run(
        &self,
        segments: &[PromptSegment],
        model: &str,
        observer: &mut dyn StreamObserver,
    ) -> InferenceRun {
        let request = self.build_request(segments, model);
        let mut run = InferenceRun::default();

        match self.stream_into(&request, &mut run, observer).await {
            Ok(()) => {
                run.done = true;
                tracing::debug!(model, chars = run.accumulated_text.len(), "inference stream finished");
            }
            Err(e) => {
                tracing::warn!(model, error = %e, "inference stream failed");
                run.failed = true;
                run.accumulated_text = e.to_string();
                observer.on_progress(&run.accumulated_text);
            }
        }

        observer.on_complete();
        run
    }

    async fn stream_into(
        &self,
        request: &ChatRequest,
        run: &mut InferenceRun,
        observer: &mut dyn StreamObserver,
    ) -> Result<(), InferenceError> {
        let mut stream = self.transport.open_chat(request).await?;
        let mut buffer = LineBuffer::default();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for line in buffer.push(&chunk) {
                apply_record(&line, run, observer);
            }
        }
        if let Some(line) = buffer.finish() {
            apply_record(&line, run, observer);
        }
        Ok(())
    }
}

/// Decode one NDJSON record and fold it into `run`.
///
/// An `error` record is appended to the text and the stream keeps going.
fn apply_record(line: &[u8], run: &mut InferenceRun, observer: &mut dyn StreamObserver) {
    if line.iter().all(u8::is_ascii_whitespace) {
        return;
    }

    let record: ChatChunk = match serde_json::from_slice(line) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(error = %e, "skipping undecodable stream record");
            return;
        }
    };

    if let Some(error) = record.error {
        let error = InferenceError::Server(error);
        tracing::warn!(error = %error, "model server reported an error mid-stream");
        if !run.accumulated_text.is_empty() {
            run.accumulated_text.push_str("\n\n");
        }
        run.accumulated_text.push_str(&error.to_string());
        run.failed = true;
        observer.on_progress(&run.accumulated_text);
        return;
    }

    let Some(message) = record.message else {
        tracing::debug!(done = record.done, "skipping stream record without message");
        return;
    };

    run.accumulated_text.push_str(&message.content);
    observer.on_progress(&run.accumulated_text);
}

/// Splits a byte stream into lines, holding partial lines across chunks.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            lines.push(line);
        }
        lines
    }

    /// The trailing record when the body did not end in a newline.
    fn finish(&mut self) -> Option<Vec<u8>> {
        let rest = std::mem::take(&mut self.pending);
        (!rest.is_empty()).then_some(rest)
    }
}
