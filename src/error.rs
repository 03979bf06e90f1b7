use std::fmt::Display;

use anyhow::{anyhow, Context, Result};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallError {
    #[error("Already executed")]
    AlreadyExecuted,
    #[error("Call canceled")]
    Canceled,
    #[error("Http transport error: {0}")]
    HttpTransportError(String),
    #[error("Codec error: {0}")]
    CodecError(String),
    #[error("Cache store error: {0}")]
    CacheStoreError(String),
    #[error("Unsuccessful response with status code {0}")]
    UnsuccessfulResponse(u16),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

pub trait AddContext<T, E>: Context<T, E> {
    fn err_context<C: Display + Send + Sync + 'static>(self, msg: C) -> Result<T, anyhow::Error>
    where
        Self: Sized,
    {
        self.with_context(|| msg.to_string())
    }
}

impl<U, T, E> AddContext<T, E> for U where U: Context<T, E> {}

pub fn gen<T: AsRef<str>>(msg: T) -> anyhow::Error {
    anyhow!(msg.as_ref().to_string())
}

/// True if the error, or any error in its chain, is a cancellation.
pub fn is_canceled(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<CallError>(),
            Some(CallError::Canceled)
        )
    })
}

pub fn is_already_executed(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<CallError>(),
        Some(CallError::AlreadyExecuted)
    )
}
