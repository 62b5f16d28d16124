use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::ArgMatches;

use lociprof_profile::pipeline::normalize_file;

pub fn run_normalize(matches: &ArgMatches) -> Result<()> {
    let table = matches
        .get_one::<String>("table")
        .context("A path to a profile table is required.")?;

    let genome_norm = matches.get_one::<f64>("genome-norm").copied();
    let gene_norm = matches.get_one::<f64>("gene-norm").copied();
    if genome_norm.is_none() && gene_norm.is_none() {
        bail!("Nothing to do, pass --genome-norm and/or --gene-norm");
    }
    for value in [genome_norm, gene_norm].into_iter().flatten() {
        if !(value.is_finite() && value > 0.0) {
            bail!("Target scale must be positive, got {value}");
        }
    }

    let normalized = normalize_file(Path::new(table), genome_norm, gene_norm)
        .with_context(|| format!("Failed to normalize {table}"))?;

    let writer: Box<dyn Write> = match matches.get_one::<String>("output") {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create output file {path}"))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    normalized.write_to(BufWriter::new(writer))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use pretty_assertions::assert_eq;

    use crate::normalize::cli::create_normalize_cli;

    #[test]
    fn test_gene_norm_round_trip_keeps_positions() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("profile.txt");
        let output = dir.path().join("normalized.txt");
        fs::write(
            &input,
            "chr\tstart\tend\tgene_name\t1\t2\nchr1\t0\t10\tg1\t1.00\t4.00\nchr2\t5\t9\tg2\t0.00\t0.00\n",
        )
        .unwrap();

        let matches = create_normalize_cli()
            .try_get_matches_from([
                "normalize",
                input.to_str().unwrap(),
                "--gene-norm",
                "2",
                "--output",
                output.to_str().unwrap(),
            ])
            .unwrap();
        run_normalize(&matches).unwrap();

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "chr\tstart\tend\tgene_name\t1\t2\nchr1\t0\t10\tg1\t0.50\t2.00\nchr2\t5\t9\tg2\t0.00\t0.00\n"
        );
    }

    #[test]
    fn test_requires_a_pass() {
        let matches = create_normalize_cli()
            .try_get_matches_from(["normalize", "profile.txt"])
            .unwrap();
        assert!(run_normalize(&matches).is_err());
    }
}
