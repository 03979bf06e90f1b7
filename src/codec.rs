//! Body codecs. A codec turns a decoded response body into the bytes kept in
//! the cache store and back. The declared body type is the type parameter.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CallError;
use crate::Result;

pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<Vec<u8>>;
    fn decode(&self, data: &[u8]) -> Result<T>;
}

/// JSON through serde.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl<T: Serialize + DeserializeOwned> Codec<T> for JsonCodec {
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|err| CallError::CodecError(err.to_string()).into())
    }

    fn decode(&self, data: &[u8]) -> Result<T> {
        serde_json::from_slice(data).map_err(|err| CallError::CodecError(err.to_string()).into())
    }
}

/// Plain text bodies. Decoding rejects invalid UTF-8.
#[derive(Clone, Copy, Debug, Default)]
pub struct Utf8Codec;

impl Codec<String> for Utf8Codec {
    fn encode(&self, value: &String) -> Result<Vec<u8>> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, data: &[u8]) -> Result<String> {
        String::from_utf8(data.to_vec())
            .map_err(|err| CallError::CodecError(err.to_string()).into())
    }
}

/// Raw bytes, stored as they came off the wire.
#[derive(Clone, Copy, Debug, Default)]
pub struct BytesCodec;

impl Codec<Vec<u8>> for BytesCodec {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}
