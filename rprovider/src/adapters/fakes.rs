//! In-memory transport double shared by adapter tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use futures_util::stream;
use serde_json::Value;

use crate::{ProviderError, ProviderFuture, SseEvent, SseStream, Transport, TransportRequest};

#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    pub requests: Mutex<Vec<TransportRequest>>,
    responses: Mutex<VecDeque<Result<Value, ProviderError>>>,
    streams: Mutex<VecDeque<Vec<Result<SseEvent, ProviderError>>>>,
}

impl FakeTransport {
    pub fn with_response(self, response: Result<Value, ProviderError>) -> Self {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(response);
        self
    }

    pub fn with_stream(self, events: Vec<Result<SseEvent, ProviderError>>) -> Self {
        self.streams.lock().expect("streams lock").push_back(events);
        self
    }

    pub fn sent(&self) -> Vec<TransportRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn record(&self, request: TransportRequest) {
        self.requests.lock().expect("requests lock").push(request);
    }
}

impl Transport for FakeTransport {
    fn send<'a>(
        &'a self,
        request: TransportRequest,
    ) -> ProviderFuture<'a, Result<Value, ProviderError>> {
        Box::pin(async move {
            self.record(request);
            self.responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::other("no scripted response")))
        })
    }

    fn stream<'a>(
        &'a self,
        request: TransportRequest,
    ) -> ProviderFuture<'a, Result<SseStream<'a>, ProviderError>> {
        Box::pin(async move {
            self.record(request);
            let events = self
                .streams
                .lock()
                .expect("streams lock")
                .pop_front()
                .ok_or_else(|| ProviderError::other("no scripted stream"))?;
            Ok(Box::pin(stream::iter(events)) as SseStream<'a>)
        })
    }
}

pub(crate) fn data_events(chunks: &[Value]) -> Vec<Result<SseEvent, ProviderError>> {
    chunks
        .iter()
        .map(|chunk| Ok(SseEvent::data(chunk.to_string())))
        .collect()
}
