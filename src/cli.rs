use std::io::Write;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;

use clap::{ArgAction, Args as ClapArgs, Parser};

use crate::cache::CacheStore;
use crate::cached::CachedCall;
use crate::client::Client;
use crate::codec::BytesCodec;
use crate::config::{Config, ConfigProperties};
use crate::defaults::CONFIG_FILE_NAME;
use crate::error::{self, CallError};
use crate::factory::CachedCallFactory;
use crate::http::{Method, Request, Response};
use crate::{log_debug, log_info, Result};

const CONFIG_DIR: &str = ".config/cachecall";

#[derive(Parser)]
#[command(name = "cachecall", about = "Fetch URLs through a cache-aside HTTP layer")]
struct Args {
    #[clap(subcommand)]
    pub command: Command,
    /// Verbose mode. -v info, -vv debug
    #[clap(long, short, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Path to the TOML config file
    #[clap(long, global = true, value_name = "FILE")]
    pub config: Option<String>,
    /// Directory of the file cache. Overrides the config file
    #[clap(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<String>,
}

#[derive(Parser)]
enum Command {
    #[clap(about = "Fetch a URL, answering from the cache when possible")]
    Get(GetCommand),
    #[clap(about = "Fetch a URL from the network and update the cache")]
    Refresh(RequestArgs),
    #[clap(about = "Remove the cached entry of a URL")]
    Remove(RequestArgs),
    #[clap(about = "Remove every cached entry")]
    Clear,
}

#[derive(ClapArgs, Clone, Debug)]
pub struct RequestArgs {
    /// Absolute URL, query string included
    pub url: String,
    /// HTTP method
    #[clap(long, short = 'X', default_value = "GET")]
    pub method: String,
    /// Extra request header, as `Name: value`. Can be repeated
    #[clap(long = "header", short = 'H', value_name = "HEADER")]
    pub headers: Vec<String>,
}

#[derive(Parser)]
struct GetCommand {
    #[clap(flatten)]
    request: RequestArgs,
    /// Cache the call whatever its method
    #[clap(long, conflicts_with = "no_cache")]
    cache: bool,
    /// Bypass the cache entirely
    #[clap(long)]
    no_cache: bool,
}

#[derive(Clone, Debug)]
pub struct GetOptions {
    pub request: RequestArgs,
    pub caching: Option<bool>,
}

impl From<GetCommand> for GetOptions {
    fn from(command: GetCommand) -> Self {
        let caching = match (command.cache, command.no_cache) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        GetOptions {
            request: command.request,
            caching,
        }
    }
}

#[derive(Clone, Debug)]
pub enum CliOptions {
    Get(GetOptions),
    Refresh(RequestArgs),
    Remove(RequestArgs),
    Clear,
}

#[derive(Clone, Debug, Default)]
pub struct CliArgs {
    pub verbose: u8,
    pub config: Option<String>,
    pub cache_dir: Option<String>,
}

impl CliArgs {
    pub fn new(verbose: u8, config: Option<String>, cache_dir: Option<String>) -> Self {
        CliArgs {
            verbose,
            config,
            cache_dir,
        }
    }
}

pub struct OptionArgs {
    pub cli_options: CliOptions,
    pub cli_args: CliArgs,
}

impl From<Args> for OptionArgs {
    fn from(args: Args) -> Self {
        let cli_options = match args.command {
            Command::Get(command) => CliOptions::Get(command.into()),
            Command::Refresh(request) => CliOptions::Refresh(request),
            Command::Remove(request) => CliOptions::Remove(request),
            Command::Clear => CliOptions::Clear,
        };
        OptionArgs {
            cli_options,
            cli_args: CliArgs::new(args.verbose, args.config, args.cache_dir),
        }
    }
}

pub fn parse_cli() -> OptionArgs {
    Args::parse().into()
}

/// An explicit `--config` must exist. Otherwise the file under the home
/// directory is used when present, and defaults when not.
pub fn read_config(cli_args: &CliArgs) -> Result<Config> {
    let config = match &cli_args.config {
        Some(path) => Config::from_file(path)?,
        None => match std::env::var("HOME") {
            Ok(home) => {
                let path = Path::new(&home).join(CONFIG_DIR).join(CONFIG_FILE_NAME);
                if path.is_file() {
                    log_debug!("Reading config from {}", path.display());
                    Config::from_file(path)?
                } else {
                    Config::default()
                }
            }
            Err(_) => Config::default(),
        },
    };
    Ok(config.with_cache_location(cli_args.cache_dir.clone()))
}

fn parse_header(header: &str) -> Result<(&str, &str)> {
    match header.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => Err(error::gen(format!(
            "Invalid header {header}, expected `Name: value`"
        ))),
    }
}

fn build_request(args: &RequestArgs) -> Result<Request> {
    let mut request = Request::new(&args.url, args.method.parse::<Method>()?);
    for header in &args.headers {
        let (name, value) = parse_header(header)?;
        request.set_header(name, value);
    }
    Ok(request)
}

fn adapt(
    factory: &CachedCallFactory,
    client: &Client,
    args: &RequestArgs,
    caching: Option<bool>,
) -> Result<CachedCall<Vec<u8>>> {
    let request = build_request(args)?;
    let call = client.call(request, Arc::new(BytesCodec));
    Ok(factory.adapt_with(Box::new(call), Arc::new(BytesCodec), caching))
}

fn write_response<W: Write>(response: Response<Vec<u8>>, writer: &mut W) -> Result<()> {
    if !response.is_successful() {
        if let Some(error_body) = response.error_body.as_ref() {
            writer.write_all(error_body)?;
        }
        return Err(CallError::UnsuccessfulResponse(response.status).into());
    }
    writer.write_all(&response.into_body()?)?;
    writer.flush()?;
    Ok(())
}

pub fn execute<W: Write>(options: CliOptions, config: Config, writer: &mut W) -> Result<()> {
    let factory = CachedCallFactory::from_config(&config)?;
    let client = Client::new(factory.pool(), config.timeout());
    match options {
        CliOptions::Get(options) => {
            let call = adapt(&factory, &client, &options.request, options.caching)?;
            write_response(call.execute()?, writer)
        }
        CliOptions::Refresh(args) => {
            let call = adapt(&factory, &client, &args, Some(true))?;
            let (sender, receiver) = mpsc::channel();
            call.refresh(Box::new(move |result| {
                let _ = sender.send(result);
            }))?;
            let result = receiver
                .recv()
                .map_err(|_| error::gen("Refresh finished without a result"))?;
            write_response(result?, writer)
        }
        CliOptions::Remove(args) => {
            let call = adapt(&factory, &client, &args, Some(true))?;
            call.remove()?;
            log_info!("Removed cache entry {}", call.key());
            Ok(())
        }
        CliOptions::Clear => {
            let store: Arc<dyn CacheStore> = factory.store();
            let size = store.size()?;
            store.clear()?;
            log_info!("Removed {} cache entries", size);
            Ok(())
        }
    }
}
