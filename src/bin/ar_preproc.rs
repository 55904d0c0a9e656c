use std::{fs::File, io::{self, BufReader, BufWriter, Write}, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use marker_preproc::{
    transport::{JsonLinesSink, JsonLinesSource},
    DetectionBatch, MarkerBatch, PipelineBuilder, PipelineConfig, Publisher, PreprocNode, SpinOutcome, Subscriber,
};

/// Convert fiducial marker batches into labelled detections in a common frame.
///
/// Reads one JSON marker batch per line and writes one JSON detection batch
/// per line.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// YAML parameter file
    #[arg(short, long)]
    config: PathBuf,
    /// Read marker batches from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Write detection batches to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Override the configured common frame
    #[arg(long)]
    common_frame: Option<String>,
    /// Override the configured detection cap
    #[arg(long)]
    max_detections: Option<usize>,
    /// Print per-stage timing when done
    #[arg(short, long, default_value_t=false)]
    profile: bool,
    /// Reduce output
    #[arg(short, long, default_value_t=false)]
    quiet: bool,
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_yaml_file(&args.config)
        .with_context(|| format!("failed to load parameters from {}", args.config.display()))?;
    if let Some(frame) = &args.common_frame {
        config.common_frame = frame.clone();
    }
    if let Some(max_detections) = args.max_detections {
        config.max_detections = max_detections;
    }
    Ok(config)
}

fn run<S, P>(config: PipelineConfig, subscriber: S, publisher: P, args: &Args) -> Result<()>
where
    S: Subscriber<MarkerBatch>,
    P: Publisher<DetectionBatch>,
{
    let pipeline = PipelineBuilder::new(config)
        .build_with_buffer()
        .context("invalid configuration")?;

    let mut node = PreprocNode::new(pipeline, subscriber, publisher);
    if args.profile {
        node = node.with_profiling();
    }

    // File and stdin inputs block on read, so idle only happens on a closed input
    while node.spin_until_idle() != SpinOutcome::Closed {}

    let stats = node.stats();
    if !args.quiet {
        eprintln!(
            "batches: {} received, {} published, {} detections, {} publish failures, {} bad inputs",
            stats.received, stats.published, stats.detections, stats.publish_failures, stats.receive_errors,
        );
    }
    if let Some(profile) = node.profile() {
        eprint!("{profile}");
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let input: Box<dyn io::BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let subscriber = JsonLinesSource::new(config.input_topic.clone(), input);
    let publisher = JsonLinesSink::new(output);
    run(config, subscriber, publisher, &args)
}
