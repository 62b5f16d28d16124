mod normalize;
mod profile;

use anyhow::Result;
use clap::Command;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "lociprof";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Binned signal profiles over gene bodies, TSS windows and arbitrary regions.")
        .subcommand_required(true)
        .subcommand(profile::cli::create_profile_cli())
        .subcommand(normalize::cli::create_normalize_cli())
}

fn main() -> Result<()> {
    // RUST_LOG overrides the default level
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();

    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        //
        // PROFILE
        //
        Some((profile::cli::PROFILE_CMD, matches)) => {
            profile::handlers::run_profile(matches)?;
        }

        //
        // NORMALIZE
        //
        Some((normalize::cli::NORMALIZE_CMD, matches)) => {
            normalize::handlers::run_normalize(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
