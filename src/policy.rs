use serde::Deserialize;

use crate::http::Method;
use crate::key::KeyScheme;

/// Decides whether a call takes part in caching. An explicit per-operation
/// override wins over the method based default, which only caches GETs.
pub fn is_cacheable(method: Method, explicit_override: Option<bool>) -> bool {
    explicit_override.unwrap_or(method == Method::GET)
}

/// Knobs shared by every cached call created from the same factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    pub key_scheme: KeyScheme,
    /// Drop the cached entry when a refresh gets a non-2xx response or a
    /// transport error.
    pub invalidate_on_refresh_failure: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy {
            key_scheme: KeyScheme::MethodAndUrl,
            invalidate_on_refresh_failure: true,
        }
    }
}
