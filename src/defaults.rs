// Worker threads running cache lookups and network calls of async requests.
pub const DEFAULT_WORKERS: usize = 4;

// Global timeout of a single HTTP exchange, connection included.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

pub const CONFIG_FILE_NAME: &str = "cachecall.toml";
