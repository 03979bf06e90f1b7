pub mod cache;
pub mod call;
pub mod cached;
pub mod cli;
pub mod client;
pub mod codec;
pub mod config;
pub mod defaults;
pub mod error;
pub mod exec;
pub mod executor;
pub mod factory;
pub mod http;
pub mod key;
pub mod policy;
pub mod test;
pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
pub mod logging;

#[macro_use]
extern crate log;

#[macro_use]
extern crate derive_builder;
