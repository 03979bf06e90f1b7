use env_logger::Env;

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => (
        {
            info!($($arg)*);
        }
    );
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => (
        {
            debug!($($arg)*);
        }
    );
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => (
        {
            error!($($arg)*);
        }
    );
}

/// Maps the number of `-v` flags to a default log filter. `RUST_LOG` still
/// wins when set.
pub fn default_filter(verbosity: u8) -> Option<&'static str> {
    match verbosity {
        0 => None,
        1 => Some("info"),
        _ => Some("debug"),
    }
}

/// Installs `env_logger`. Only binaries call this, the library never
/// installs a logger on its own.
pub fn init(verbosity: u8) {
    if let Some(filter) = default_filter(verbosity) {
        let env = Env::default().default_filter_or(filter);
        env_logger::init_from_env(env);
    } else {
        env_logger::init_from_env(Env::default());
    }
}
