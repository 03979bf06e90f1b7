use cachecall::{
    cli::{self, parse_cli},
    logging, Result,
};

fn main() -> Result<()> {
    let option_args = parse_cli();
    let cli_args = option_args.cli_args;
    logging::init(cli_args.verbose);
    let config = cli::read_config(&cli_args)?;
    let mut stdout = std::io::stdout().lock();
    cli::execute(option_args.cli_options, config, &mut stdout)
}
