//! Fake transport for testing
//!
//! Replays scripted responses instead of making HTTP calls. Each call to
//! `send` consumes the next scripted round, so a multi-round conversation is
//! scripted as a queue of bodies.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use crate::transport::transport_types::{ByteStream, OutboundRequest, Transport, TransportError};

/// One scripted response
#[derive(Debug, Clone)]
pub enum FakeRound {
    /// Body delivered as these exact chunks, optionally failing after them
    Chunks {
        chunks: Vec<Bytes>,
        fail_with: Option<TransportError>,
    },
    /// `send` itself fails (connection refused, non-success status)
    Fail(TransportError),
}

/// Fake transport for testing (uses fixture strings)
#[derive(Debug, Default)]
pub struct FakeTransport {
    rounds: Mutex<VecDeque<FakeRound>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl FakeTransport {
    /// Create fake transport with no scripted rounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a round whose whole body arrives in one read
    pub fn with_round(self, body: &str) -> Self {
        self.with_chunked_round(vec![body])
    }

    /// Script a round delivered as the given chunks
    pub fn with_chunked_round<S: AsRef<[u8]>>(self, chunks: Vec<S>) -> Self {
        self.push(FakeRound::Chunks {
            chunks: chunks
                .into_iter()
                .map(|c| Bytes::copy_from_slice(c.as_ref()))
                .collect(),
            fail_with: None,
        })
    }

    /// Script a round that drops after delivering `body`
    pub fn with_failing_round(self, body: &str, error: TransportError) -> Self {
        self.push(FakeRound::Chunks {
            chunks: vec![Bytes::copy_from_slice(body.as_bytes())],
            fail_with: Some(error),
        })
    }

    /// Script a round where `send` itself fails
    pub fn with_error(self, error: TransportError) -> Self {
        self.push(FakeRound::Fail(error))
    }

    fn push(self, round: FakeRound) -> Self {
        self.rounds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(round);
        self
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scripted rounds not yet consumed
    pub fn remaining_rounds(&self) -> usize {
        self.rounds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<ByteStream, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let next = self
            .rounds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            None => Err(TransportError::Network(
                "no scripted response left".to_string(),
            )),
            Some(FakeRound::Fail(err)) => Err(err),
            Some(FakeRound::Chunks { chunks, fail_with }) => {
                let items = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(fail_with.into_iter().map(Err));
                Ok(futures::stream::iter(items).boxed())
            }
        }
    }
}
