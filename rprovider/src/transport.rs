//! Transport collaborator contract and reqwest-based HTTP implementation.
//!
//! Mappers and adapters only need "POST a JSON body, receive one JSON document or a
//! sequence of named text events". Anything that can do that implements [`Transport`].

use std::pin::Pin;

use futures_core::Stream;
use serde_json::Value;

use crate::{ProviderError, ProviderFuture, SecretString};

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub path: String,
    pub body: Value,
    pub auth: Option<SecretString>,
    pub headers: Vec<(String, String)>,
}

impl TransportRequest {
    pub fn new(path: impl Into<String>, body: Value) -> Self {
        Self {
            path: path.into(),
            body,
            auth: None,
            headers: Vec::new(),
        }
    }

    pub fn with_auth(mut self, auth: Option<SecretString>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// One server-sent event. `event` is `"message"` when the server did not name it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

impl SseEvent {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }

    pub fn data(data: impl Into<String>) -> Self {
        Self::new("message", data)
    }
}

pub type SseStream<'a> = Pin<Box<dyn Stream<Item = Result<SseEvent, ProviderError>> + Send + 'a>>;

pub trait Transport: Send + Sync + std::fmt::Debug {
    fn send<'a>(&'a self, request: TransportRequest) -> ProviderFuture<'a, Result<Value, ProviderError>>;

    fn stream<'a>(
        &'a self,
        request: TransportRequest,
    ) -> ProviderFuture<'a, Result<SseStream<'a>, ProviderError>>;
}

/// Pulls a human-readable message out of the error envelopes backends commonly return.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| value.get("message").and_then(Value::as_str))
        .or_else(|| value.get("error").and_then(Value::as_str))
        .map(ToString::to_string)
}

#[cfg(feature = "http")]
pub use http_transport::HttpTransport;

#[cfg(feature = "http")]
mod http_transport {
    use eventsource_stream::Eventsource;
    use futures_util::StreamExt;
    use reqwest::{Client, RequestBuilder, Response};
    use serde_json::Value;

    use super::{SseEvent, SseStream, Transport, TransportRequest, extract_error_message};
    use crate::{ProviderError, ProviderFuture};

    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: Client,
        base_url: String,
        headers: Vec<(String, String)>,
    }

    impl HttpTransport {
        pub fn new(client: Client, base_url: impl Into<String>) -> Self {
            Self {
                client,
                base_url: base_url.into(),
                headers: Vec::new(),
            }
        }

        pub fn with_default_header(
            mut self,
            name: impl Into<String>,
            value: impl Into<String>,
        ) -> Self {
            self.headers.push((name.into(), value.into()));
            self
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }

        fn endpoint(&self, path: &str) -> String {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        }

        fn build(&self, request: &TransportRequest) -> RequestBuilder {
            let mut builder = self
                .client
                .post(self.endpoint(&request.path))
                .json(&request.body);

            if let Some(auth) = &request.auth {
                builder = builder.bearer_auth(auth.expose());
            }

            for (name, value) in self.headers.iter().chain(request.headers.iter()) {
                builder = builder.header(name.as_str(), value.as_str());
            }

            builder
        }

        async fn execute(&self, request: &TransportRequest) -> Result<Response, ProviderError> {
            let response = self.build(request).send().await.map_err(map_reqwest_error)?;

            if !response.status().is_success() {
                return Err(parse_error(response).await);
            }

            Ok(response)
        }
    }

    fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            ProviderError::connection(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::from_status(status.as_u16(), err.to_string())
        } else {
            ProviderError::connection(err.to_string())
        }
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("backend request failed with status {status}"));

        ProviderError::from_status(status.as_u16(), message)
    }

    impl Transport for HttpTransport {
        fn send<'a>(
            &'a self,
            request: TransportRequest,
        ) -> ProviderFuture<'a, Result<Value, ProviderError>> {
            Box::pin(async move {
                let response = self.execute(&request).await?;
                response
                    .json::<Value>()
                    .await
                    .map_err(|err| ProviderError::protocol(format!("invalid JSON body: {err}")))
            })
        }

        fn stream<'a>(
            &'a self,
            request: TransportRequest,
        ) -> ProviderFuture<'a, Result<SseStream<'a>, ProviderError>> {
            Box::pin(async move {
                let response = self.execute(&request).await?;
                let events = response.bytes_stream().eventsource().map(|item| match item {
                    Ok(event) => Ok(SseEvent::new(event.event, event.data)),
                    Err(err) => Err(ProviderError::connection(format!(
                        "event stream interrupted: {err}"
                    ))),
                });

                Ok(Box::pin(events) as SseStream<'a>)
            })
        }
    }
}
