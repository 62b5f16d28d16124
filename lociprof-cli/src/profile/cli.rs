use clap::{Arg, ArgAction, Command, arg, value_parser};

pub const PROFILE_CMD: &str = "profile";

pub const FORMAT_BEDGRAPH: &str = "bedgraph";
pub const FORMAT_BED: &str = "bed";

fn bp(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .required(false)
        .value_parser(value_parser!(u32))
        .help(help)
}

fn bins(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .required(false)
        .value_parser(value_parser!(i64))
        .help(help)
}

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue).help(help)
}

pub fn create_profile_cli() -> Command {
    Command::new(PROFILE_CMD)
        .about("Aggregate a sorted coverage track into one row of binned averages per locus.")
        .arg(
            arg!(--coverage <COVERAGE>)
                .required(true)
                .help("Sorted bedGraph (or BED reads with --input-format bed); '-' reads stdin"),
        )
        .arg(
            Arg::new("input-format")
                .long("input-format")
                .value_parser([FORMAT_BEDGRAPH, FORMAT_BED])
                .default_value(FORMAT_BEDGRAPH)
                .help("bedgraph is read as-is, bed is converted to read depth first"),
        )
        .arg(
            arg!(--output <OUTPUT>)
                .required(false)
                .help("Output table path (default: stdout)"),
        )
        .arg(
            arg!(--config <CONFIG>)
                .required(false)
                .help("TOML file with run options; flags given here take precedence"),
        )
        .arg(arg!(--region <BED>).required(false).help("BED file of regions to profile"))
        .arg(arg!(--gtf <GTF>).required(false).help("GTF/GTF.gz gene model to profile"))
        .arg(
            Arg::new("gene-list")
                .long("gene-list")
                .required(false)
                .help("Only keep loci whose gene or transcript name is listed in this file"),
        )
        .arg(bins("region-bins", "Bins per region"))
        .arg(flag("tss", "Profile windows around each TSS instead of gene bodies"))
        .arg(bp("tss-up", "Bases upstream of the TSS"))
        .arg(bp("tss-down", "Bases downstream of the TSS"))
        .arg(bins("tss-bins", "Bins per TSS window"))
        .arg(bp("upstream", "Bases of flank before the gene start"))
        .arg(bins("up-bins", "Bins in the upstream flank"))
        .arg(bp("downstream", "Bases of flank after the gene end"))
        .arg(bins("down-bins", "Bins in the downstream flank"))
        .arg(bins("gene-bins", "Bins across the gene body"))
        .arg(flag("transcript", "One row per transcript instead of one per gene"))
        .arg(flag("position", "Prefix each row with chr, start and end"))
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
        .arg(
            Arg::new("chrom-sizes")
                .long("chrom-sizes")
                .required(false)
                .help("Path to chrom.sizes file"),
        )
        .arg(
            arg!(--genome <GENOME>)
                .required(false)
                .help("Genome name, resolved to <genome-dir>/<GENOME>.chrom.sizes"),
        )
        .arg(
            Arg::new("genome-dir")
                .long("genome-dir")
                .required(false)
                .help("Directory holding <genome>.chrom.sizes files"),
        )
        .arg(flag("ucsc-names", "Rename Ensembl chromosomes in the GTF (1, MT) to UCSC style (chr1, chrM)"))
        .arg(flag("check-sorted", "Verify the coverage file is sorted before aggregating"))
}
