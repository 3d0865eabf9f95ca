//! Deferred response for streaming mode
//!
//! The aggregate is only known once the event stream has been driven to
//! the end. [`DeferredResponse`] resolves then, or rejects with
//! [`ClientError::Aborted`] if the stream is dropped first.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::BoxStream;
use tokio::sync::oneshot;

use crate::aggregate::AggregatedResponse;
use crate::error::ClientError;
use crate::events::StreamEvent;

pub(crate) type ResponseSender = oneshot::Sender<Result<AggregatedResponse, ClientError>>;

/// Final response of a streaming run
#[derive(Debug)]
pub struct DeferredResponse {
    rx: oneshot::Receiver<Result<AggregatedResponse, ClientError>>,
}

impl DeferredResponse {
    pub(crate) fn channel() -> (ResponseSender, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }
}

impl Future for DeferredResponse {
    type Output = Result<AggregatedResponse, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ClientError::Aborted)))
    }
}

/// Streaming-mode result: the event sequence plus the deferred aggregate
///
/// Drive `events` to completion before awaiting `response`.
pub struct ChatStream {
    pub events: BoxStream<'static, StreamEvent>,
    pub response: DeferredResponse,
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream").finish_non_exhaustive()
    }
}
