use anyhow::Context;
use clap::Parser;
use kmer_mirror::*;
use std::path::PathBuf;

/// Count the k-mers of FASTA/FASTQ reads that appear in an existing index.
///
/// The output reuses the reference's hash geometry, so its records come out
/// in the same slot order.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Reference index whose key set is counted
    #[arg(short = 'j', long = "jf")]
    reference: PathBuf,

    /// FASTA/FASTQ(.gz) file(s) to count, processed one after another
    #[arg(short, long, num_args = 1.., required = true)]
    input: Vec<PathBuf>,

    /// Output index path
    #[arg(short, long)]
    output: PathBuf,

    /// Bytes per count in the output (ignored when --limit is set)
    #[arg(long, default_value_t = 4)]
    out_counter: usize,

    /// Worker threads
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    /// Saturate counts at this value (0 = no limit)
    #[arg(short, long, default_value_t = 0)]
    limit: u64,

    /// Count each k-mer together with its reverse complement
    #[arg(long, default_value_t = false)]
    canonical: bool,

    /// Reads handed to a worker at a time
    #[arg(long, default_value_t = 4096)]
    batch_size: usize,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .with_writer(std::io::stderr)
        .init();

    let cfg = CountConfig::default()
        .threads(args.threads)
        .canonical(args.canonical)
        .limit(args.limit)
        .batch_size(args.batch_size);

    let summary = mirror_count_files(
        &args.reference,
        args.input,
        &args.output,
        cfg,
        args.out_counter,
    )
    .with_context(|| format!("mirroring {}", args.reference.display()))?;

    eprintln!(
        "Mirrored {} keys: {} reads, {} k-mers ({} hits, {} saturated, {} absent), {} records written to {}",
        summary.primed_keys,
        summary.count.records,
        summary.count.kmers,
        summary.count.hits,
        summary.count.saturated,
        summary.count.absent,
        summary.dump.records,
        args.output.display()
    );

    Ok(())
}
