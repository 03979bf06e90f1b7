//! Blocking HTTP transport on top of `ureq`, exposed as one-shot
//! [`NetworkCall`]s. Asynchronous calls run on the shared worker pool and
//! complete on the worker thread that performed them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, RequestBuilder};

use crate::call::{Callback, NetworkCall};
use crate::codec::Codec;
use crate::error::CallError;
use crate::exec::WorkerPool;
use crate::http::{Headers, Method, Request, Response};
use crate::{log_debug, log_error, Result};

#[derive(Clone)]
pub struct Client {
    agent: Agent,
    pool: Arc<WorkerPool>,
}

impl Client {
    pub fn new(pool: Arc<WorkerPool>, timeout: Duration) -> Self {
        // Non 2xx statuses are responses, not errors. The cache layer needs
        // to see them to decide on invalidation.
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();
        Client {
            agent: config.into(),
            pool,
        }
    }

    pub fn call<T: Send + 'static>(
        &self,
        request: Request,
        codec: Arc<dyn Codec<T>>,
    ) -> HttpCall<T> {
        HttpCall {
            agent: self.agent.clone(),
            pool: self.pool.clone(),
            request,
            codec,
            executed: AtomicBool::new(false),
            canceled: Arc::new(AtomicBool::new(false)),
        }
    }
}

pub struct HttpCall<T> {
    agent: Agent,
    pool: Arc<WorkerPool>,
    request: Request,
    codec: Arc<dyn Codec<T>>,
    executed: AtomicBool,
    canceled: Arc<AtomicBool>,
}

impl<T: Send + 'static> NetworkCall<T> for HttpCall<T> {
    fn request(&self) -> &Request {
        &self.request
    }

    fn execute(&self) -> Result<Response<T>> {
        if self.executed.swap(true, Ordering::SeqCst) {
            return Err(CallError::AlreadyExecuted.into());
        }
        perform(&self.agent, &self.request, self.codec.as_ref(), &self.canceled)
    }

    fn enqueue(&self, callback: Callback<T>) {
        if self.executed.swap(true, Ordering::SeqCst) {
            callback(Err(CallError::AlreadyExecuted.into()));
            return;
        }
        let agent = self.agent.clone();
        let request = self.request.clone();
        let codec = self.codec.clone();
        let canceled = self.canceled.clone();
        self.pool.spawn(Box::new(move || {
            callback(perform(&agent, &request, codec.as_ref(), &canceled));
        }));
    }

    fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    fn is_executed(&self) -> bool {
        self.executed.load(Ordering::SeqCst)
    }

    fn clone_call(&self) -> Box<dyn NetworkCall<T>> {
        Box::new(HttpCall {
            agent: self.agent.clone(),
            pool: self.pool.clone(),
            request: self.request.clone(),
            codec: self.codec.clone(),
            executed: AtomicBool::new(false),
            canceled: Arc::new(AtomicBool::new(false)),
        })
    }
}

fn with_headers<B>(builder: RequestBuilder<B>, headers: &Headers) -> RequestBuilder<B> {
    headers
        .iter()
        .fold(builder, |req, (key, value)| req.header(key.as_str(), value.as_str()))
}

fn call(
    builder: RequestBuilder<WithoutBody>,
    headers: &Headers,
) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    with_headers(builder, headers).call()
}

fn send(
    builder: RequestBuilder<WithBody>,
    request: &Request,
) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    let builder = with_headers(builder, &request.headers);
    match request.body.as_ref() {
        Some(body) => builder.send(&body[..]),
        None => builder.send_empty(),
    }
}

fn perform<T>(
    agent: &Agent,
    request: &Request,
    codec: &dyn Codec<T>,
    canceled: &AtomicBool,
) -> Result<Response<T>> {
    if canceled.load(Ordering::SeqCst) {
        return Err(CallError::Canceled.into());
    }
    log_debug!("{} {}", request.method, request.url);
    let url = request.url.as_str();
    let result = match request.method {
        Method::GET => call(agent.get(url), &request.headers),
        Method::HEAD => call(agent.head(url), &request.headers),
        Method::DELETE => call(agent.delete(url), &request.headers),
        Method::POST => send(agent.post(url), request),
        Method::PUT => send(agent.put(url), request),
        Method::PATCH => send(agent.patch(url), request),
    };
    let mut response = match result {
        Ok(response) => response,
        Err(err) => {
            log_error!("{} {} failed: {}", request.method, request.url, err);
            return Err(CallError::HttpTransportError(err.to_string()).into());
        }
    };
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .fold(Headers::new(), |mut headers, (name, value)| {
            if let Ok(value) = value.to_str() {
                headers.set(name.as_str(), value);
            }
            headers
        });
    let data = response
        .body_mut()
        .read_to_vec()
        .map_err(|err| CallError::HttpTransportError(err.to_string()))?;
    if canceled.load(Ordering::SeqCst) {
        return Err(CallError::Canceled.into());
    }
    log_debug!("{} {} -> {}", request.method, request.url, status);
    if (200..300).contains(&status) {
        Ok(Response {
            status,
            body: Some(codec.decode(&data)?),
            headers,
            error_body: None,
        })
    } else {
        Ok(Response {
            status,
            body: None,
            headers,
            error_body: Some(data),
        })
    }
}
