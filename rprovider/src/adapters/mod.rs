//! Backend adapters. Each pairs a pure mapper with a [`ChatProvider`](crate::ChatProvider)
//! that drives the transport.

#[cfg(feature = "provider-openai")]
pub mod openai;

#[cfg(feature = "provider-openai-assistants")]
pub mod assistants;

#[cfg(feature = "provider-cohere")]
pub mod cohere;

#[cfg(feature = "provider-ollama")]
pub mod ollama;

#[cfg(test)]
pub(crate) mod fakes;
