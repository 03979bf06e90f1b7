//! Cache key derivation.
//!
//! Keys are the lower-case hex SHA-256 digest of the request identity. Two
//! schemes exist: `MethodAndUrl` hashes `method ++ url`, `UrlOnly` hashes the
//! URL alone and therefore shares one entry between methods on the same URL.

use std::fmt::{self, Display, Formatter};

use serde::Deserialize;
use sha2::{Digest, Sha256};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScheme {
    #[default]
    MethodAndUrl,
    UrlOnly,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn derive_key(scheme: KeyScheme, method: &str, url: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    if scheme == KeyScheme::MethodAndUrl {
        hasher.update(method);
    }
    hasher.update(url);
    let hash = hasher.finalize();
    CacheKey(format!("{hash:x}"))
}
