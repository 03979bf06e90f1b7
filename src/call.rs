use crate::http::{Request, Response};
use crate::Result;

/// Receives the outcome of an asynchronous call. Being `FnOnce`, it can be
/// invoked at most once.
pub type Callback<T> = Box<dyn FnOnce(Result<Response<T>>) + Send + 'static>;

/// Receives only the decoded body. Non-2xx responses arrive as errors.
pub type BodyCallback<T> = Box<dyn FnOnce(Result<T>) + Send + 'static>;

/// A one-shot network call. It can be executed or enqueued exactly once;
/// `clone_call` produces a fresh, unexecuted call for the same request.
/// Implementors decide where `enqueue` runs and on which thread the callback
/// fires.
pub trait NetworkCall<T>: Send + Sync {
    /// The resolved request this call will send.
    fn request(&self) -> &Request;
    fn execute(&self) -> Result<Response<T>>;
    fn enqueue(&self, callback: Callback<T>);
    fn cancel(&self);
    fn is_canceled(&self) -> bool;
    fn is_executed(&self) -> bool;
    fn clone_call(&self) -> Box<dyn NetworkCall<T>>;
}
