use std::collections::{hash_map, HashMap};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::{self, CallError};
use crate::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    GET,
    HEAD,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::DELETE => "DELETE",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "PATCH" => Ok(Method::PATCH),
            "DELETE" => Ok(Method::DELETE),
            _ => Err(error::gen(format!("Unsupported HTTP method: {s}"))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Headers(HashMap::new())
    }

    /// Header names are stored lower-cased.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.insert(key.into().to_lowercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.0.get(&key.to_lowercase())
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A fully resolved request: everything the cache layer needs to know about
/// an outgoing call without inspecting the transport.
#[derive(Builder, Clone, Debug)]
#[builder(pattern = "owned")]
pub struct Request {
    #[builder(default)]
    pub method: Method,
    #[builder(setter(into))]
    pub url: String,
    #[builder(default)]
    pub headers: Headers,
    #[builder(setter(into, strip_option), default)]
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn new(url: &str, method: Method) -> Self {
        Request {
            method,
            url: url.to_string(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn set_header(&mut self, key: &str, value: &str) {
        self.headers.set(key, value);
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }
}

/// Outcome of an HTTP exchange that reached the server. Successful (2xx)
/// responses carry a decoded body, unsuccessful ones keep the raw error body.
/// Transport failures never produce a `Response`.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(pattern = "owned")]
pub struct Response<T> {
    #[builder(default = "200")]
    pub status: u16,
    #[builder(setter(into, strip_option), default)]
    pub body: Option<T>,
    #[builder(default)]
    pub headers: Headers,
    #[builder(setter(into, strip_option), default)]
    pub error_body: Option<Vec<u8>>,
}

impl<T> Response<T> {
    pub fn builder() -> ResponseBuilder<T> {
        ResponseBuilder::default()
    }

    /// Synthesizes a 200 response around an already decoded body.
    pub fn success(body: T) -> Self {
        Response {
            status: 200,
            body: Some(body),
            headers: Headers::new(),
            error_body: None,
        }
    }

    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|s| s.as_str())
    }

    /// Unwraps the decoded body of a successful response.
    pub fn into_body(self) -> Result<T> {
        if !self.is_successful() {
            return Err(CallError::UnsuccessfulResponse(self.status).into());
        }
        self.body
            .ok_or_else(|| CallError::UnsuccessfulResponse(self.status).into())
    }
}
