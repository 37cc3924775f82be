//! Pure translation between the canonical model and one backend's wire format.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{ChatRequest, ChatResponse, ProviderError};

/// Both directions are pure: no I/O, no shared state.
///
/// Messages whose kind has no wire role are dropped by `map_request`, never rejected.
pub trait ProviderMapper {
    type WireRequest: Serialize;
    type WireResponse: DeserializeOwned;

    fn map_request(&self, request: &ChatRequest) -> Result<Self::WireRequest, ProviderError>;

    fn map_response(&self, response: Self::WireResponse) -> Result<ChatResponse, ProviderError>;

    fn encode_request(&self, request: &ChatRequest) -> Result<Value, ProviderError> {
        encode(&self.map_request(request)?)
    }

    fn decode_response(&self, body: Value) -> Result<ChatResponse, ProviderError> {
        self.map_response(decode(body)?)
    }
}

pub fn encode<T: Serialize>(value: &T) -> Result<Value, ProviderError> {
    serde_json::to_value(value)
        .map_err(|err| ProviderError::mapping(format!("failed to encode wire request: {err}")))
}

pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ProviderError> {
    serde_json::from_value(value)
        .map_err(|err| ProviderError::protocol(format!("unexpected wire response: {err}")))
}
