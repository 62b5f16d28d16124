use clap::{Arg, Command, arg, value_parser};

pub const NORMALIZE_CMD: &str = "normalize";

pub fn create_normalize_cli() -> Command {
    Command::new(NORMALIZE_CMD)
        .about("Rescale a profile table written by `profile`.")
        .arg(Arg::new("table").required(true).help("Profile table to rescale"))
        .arg(
            arg!(--output <OUTPUT>)
                .required(false)
                .help("Output table path (default: stdout)"),
        )
        .arg(
            Arg::new("genome-norm")
                .long("genome-norm")
                .required(false)
                .value_parser(value_parser!(f64))
                .help("Scale so the top 1% of bin scores saturate at this value"),
        )
        .arg(
            Arg::new("gene-norm")
                .long("gene-norm")
                .required(false)
                .value_parser(value_parser!(f64))
                .help("Scale each row so its maximum equals this value"),
        )
}
