mod server;

use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::info;

use crate::args::ServerArgs;
use crate::config::{apply_config, load_config};
use crate::error::AppResult;
use server::run_server;

pub(crate) fn run() -> AppResult<()> {
    let (mut args, matches) = parse_args()?;
    let config_path = args.config.clone();
    let config = load_config(config_path.as_deref())?;
    if let Some(config) = config.as_ref() {
        apply_config(&mut args, &matches, config)?;
    }

    crate::system::logger::init_logging(args.verbose, args.no_color);
    if config.is_some() {
        info!(
            "Loaded config {}",
            config_path.as_deref().unwrap_or("from working directory")
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_server(args))
}

fn parse_args() -> AppResult<(ServerArgs, ArgMatches)> {
    let matches = ServerArgs::command().get_matches();
    let args = ServerArgs::from_arg_matches(&matches)?;
    Ok((args, matches))
}
