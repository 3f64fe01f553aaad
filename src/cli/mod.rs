//! # CLI Module
//!
//! Command-line interface for the hash-signing pipeline.
//!
//! ## Usage
//! ```bash
//! # Sign items given as arguments
//! signer sign 0 1
//!
//! # Sign one item per stdin line
//! seq 0 99 | signer sign
//!
//! # Readable output from the label provider
//! signer sign 0 1 --provider label --output minimal
//!
//! # Settings from a JSON file, overridden by flags
//! signer sign 0 1 --config signer.json --relay-capacity 10
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use hash_signer::core::hasher::{
    Crc32Md5Provider, HashProvider, LabelHashProvider, XxHashProvider,
};
use hash_signer::core::pipeline::{PipelineConfig, Signer};
use hash_signer::error::{Result, SignerError};
use hash_signer::events::{Event, EventChannel, PipelineEvent, StageEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Hash Signer - deterministic signatures from a concurrent pipeline
#[derive(Parser, Debug)]
#[command(name = "signer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign items into one combined signature
    Sign {
        /// Items to sign (read from stdin, one per line, when omitted)
        items: Vec<String>,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Relay capacity between stages
        #[arg(long)]
        relay_capacity: Option<usize>,

        /// Number of indexed fast hashes per item
        #[arg(long)]
        sextet_width: Option<usize>,

        /// Give up once no slow-hash permit has been released for this many milliseconds
        #[arg(long, conflicts_with = "no_throttle_timeout")]
        throttle_timeout_ms: Option<u64>,

        /// Wait for slow-hash permits indefinitely
        #[arg(long)]
        no_throttle_timeout: bool,

        /// Hash provider
        #[arg(short, long, default_value = "xxh3")]
        provider: Provider,

        /// Simulated cost of each slow hash, in milliseconds (xxh3 and crc32-md5)
        #[arg(long, default_value = "10")]
        slow_cost_ms: u64,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Provider {
    /// xxh3 fast hash, xxh3-128 slow hash with simulated cost
    Xxh3,
    /// CRC-32 fast hash, MD5 slow hash with simulated cost
    #[value(name = "crc32-md5")]
    Crc32Md5,
    /// "A:" / "B:" prefixes, handy for reading the pipeline's shape
    Label,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// The signature only
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign {
            items,
            config,
            relay_capacity,
            sextet_width,
            throttle_timeout_ms,
            no_throttle_timeout,
            provider,
            slow_cost_ms,
            output,
        } => {
            let config = resolve_config(
                config.as_deref(),
                relay_capacity,
                sextet_width,
                throttle_timeout_ms,
                no_throttle_timeout,
            )?;

            let provider: Arc<dyn HashProvider> = match provider {
                Provider::Xxh3 => Arc::new(
                    XxHashProvider::new().slow_cost(Duration::from_millis(slow_cost_ms)),
                ),
                Provider::Crc32Md5 => Arc::new(
                    Crc32Md5Provider::new().slow_cost(Duration::from_millis(slow_cost_ms)),
                ),
                Provider::Label => Arc::new(LabelHashProvider),
            };

            let items = if items.is_empty() {
                read_stdin_items()?
            } else {
                items
            };

            run_sign(items, config, provider, output)
        }
    }
}

/// Config file (or defaults) with command-line overrides applied
fn resolve_config(
    path: Option<&Path>,
    relay_capacity: Option<usize>,
    sextet_width: Option<usize>,
    throttle_timeout_ms: Option<u64>,
    no_throttle_timeout: bool,
) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(capacity) = relay_capacity {
        config.relay_capacity = capacity;
    }
    if let Some(width) = sextet_width {
        config.sextet_width = width;
    }
    if let Some(timeout_ms) = throttle_timeout_ms {
        config.throttle_timeout_ms = Some(timeout_ms);
    }
    if no_throttle_timeout {
        config.throttle_timeout_ms = None;
    }
    Ok(config)
}

fn read_stdin_items() -> Result<Vec<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(SignerError::Input(
            "no items given and stdin is a terminal".to_string(),
        ));
    }

    let lines: Vec<String> = stdin
        .lock()
        .lines()
        .collect::<io::Result<_>>()
        .map_err(|e| SignerError::Input(format!("failed to read items from stdin: {e}")))?;

    Ok(lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

fn run_sign(
    items: Vec<String>,
    config: PipelineConfig,
    provider: Arc<dyn HashProvider>,
    output: OutputFormat,
) -> Result<()> {
    let term = Term::stderr();
    let item_count = items.len();
    let provider_kind = provider.kind();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Hash Signer").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line(&format!(
            "{} {}",
            style("Provider:").dim(),
            provider_kind.description()
        ))
        .ok();
        term.write_line("").ok();
    }

    let signer = Signer::builder().config(config).provider(provider).build()?;

    let (sender, receiver) = EventChannel::new();

    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(item_count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Stage(StageEvent::ItemEmitted { stage }) if stage == "sextet-hash" => {
                    pb.inc(1);
                }
                Event::Pipeline(PipelineEvent::StageFinished { name, .. }) => {
                    pb.set_message(format!("{name} done"));
                }
                Event::Pipeline(
                    PipelineEvent::Completed { .. }
                    | PipelineEvent::Cancelled
                    | PipelineEvent::Error { .. },
                ) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let start_time = Instant::now();
    let result = signer.sign_with_events(items, &sender);
    let duration_ms = start_time.elapsed().as_millis() as u64;

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    let signature = result?;

    match output {
        OutputFormat::Pretty => {
            term.write_line(&format!("{} Signed", style("✓").green().bold()))
                .ok();
            term.write_line(&format!(
                "  {} items in {:.1}s using {}",
                style(item_count).cyan(),
                duration_ms as f64 / 1000.0,
                style(provider_kind).yellow()
            ))
            .ok();
            term.write_line("").ok();
            println!("{signature}");
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "items": item_count,
                "provider": provider_kind,
                "duration_ms": duration_ms,
                "signature": signature,
            });
            let rendered = serde_json::to_string_pretty(&output)
                .map_err(|e| SignerError::Input(format!("failed to render JSON: {e}")))?;
            println!("{rendered}");
        }
        OutputFormat::Minimal => println!("{signature}"),
    }

    Ok(())
}
