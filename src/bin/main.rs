use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use itertools::Itertools;
use log::{info, warn};

use vcf_filter::{FilterKind, Header, HeaderRef, Variant, VariantFilter};

/// Filters VCF records and genotypes with expressions such as `DP > 10 & AF < 0.5`.
#[derive(Debug, Parser)]
#[command(name = "vcf-filter", version, about)]
struct Args {
    /// Input VCF, plain or gzipped
    path: PathBuf,

    /// Record filter over INFO, QUAL and FILTER; records failing any of them are dropped
    #[arg(short = 'f', long = "filter")]
    filters: Vec<String>,

    /// Sample filter over FORMAT fields; genotypes failing any of them are set to missing
    #[arg(short = 'g', long = "genotype-filter")]
    genotype_filters: Vec<String>,

    /// Add this tag to FILTER of failing records instead of dropping them
    #[arg(short = 't', long)]
    tag: Option<String>,

    /// Samples to write, in order (comma-separated)
    #[arg(short = 's', long, value_delimiter = ',')]
    samples: Vec<String>,
}

struct Filters {
    records: Vec<VariantFilter>,
    genotypes: Vec<VariantFilter>,
    tag: Option<String>,
}

impl Filters {
    /// Applies all filters to `variant`; `false` if the record is to be dropped.
    fn apply(&self, variant: &mut Variant) -> vcf_filter::Result<bool> {
        for filter in &self.records {
            if !filter.passes_record(variant)? {
                match &self.tag {
                    Some(tag) => {
                        variant.add_filter(tag);
                        break;
                    }
                    None => return Ok(false),
                }
            }
        }
        for filter in &self.genotypes {
            variant.remove_filtered_genotypes(filter)?;
        }
        Ok(true)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let (reader, _format) = niffler::from_path(&args.path)
        .with_context(|| format!("cannot open {}", args.path.display()))?;
    let mut lines = BufReader::new(reader).lines();

    let mut header = Header::new();
    let mut header_lines = Vec::new();
    let mut first_record = None;
    for line in &mut lines {
        let line = line?;
        if line.starts_with('#') {
            header.add_line(&line)?;
            header_lines.push(line);
        } else {
            first_record = Some(line);
            break;
        }
    }
    let header = HeaderRef::new(header);

    let compile = |specs: &[String], kind: FilterKind| -> Result<Vec<VariantFilter>> {
        specs
            .iter()
            .map(|spec| {
                VariantFilter::from_header(spec, kind, &header)
                    .with_context(|| format!("invalid {} filter '{}'", kind, spec))
            })
            .collect()
    };
    let filters = Filters {
        records: compile(&args.filters, FilterKind::Record)?,
        genotypes: compile(&args.genotype_filters, FilterKind::Sample)?,
        tag: args.tag.clone(),
    };

    let mut variant = Variant::new(header.clone());
    if !args.samples.is_empty() {
        variant.set_output_sample_names(args.samples.clone())?;
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for line in &header_lines {
        if line.starts_with("#CHROM") && !args.samples.is_empty() {
            let mut columns = line.split('\t').take(9).chain(args.samples.iter().map(String::as_str));
            writeln!(out, "{}", columns.join("\t"))?;
        } else {
            writeln!(out, "{}", line)?;
        }
    }

    let (mut written, mut dropped, mut skipped) = (0usize, 0usize, 0usize);
    for (i, line) in first_record.map(Ok).into_iter().chain(lines).enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let keep = variant.parse(&line).and_then(|_| filters.apply(&mut variant));
        match keep {
            Ok(true) => {
                writeln!(out, "{}", variant)?;
                written += 1;
            }
            Ok(false) => dropped += 1,
            Err(e) => {
                warn!("skipping record {}: {}", i + 1, e);
                skipped += 1;
            }
        }
    }
    out.flush()?;
    info!(
        "{} records written, {} filtered, {} skipped",
        written, dropped, skipped
    );
    Ok(())
}
