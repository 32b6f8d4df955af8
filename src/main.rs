use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use review_insight::aggregate::bucket::Granularity;
use review_insight::aggregate::finalize::SortOrder;
use review_insight::config::Config;
use review_insight::pipeline::{self, GenresInput};
use review_insight::sample::SamplingPolicy;

/// Streaming statistics over large book-review datasets.
#[derive(Parser)]
#[command(name = "review-insight", about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    /// Overrides `log_level` from the config file.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Review count and average score per title.
    Titles(TitlesArgs),
    /// Review volume and average score per calendar bucket.
    Timeline(TimelineArgs),
    /// Count-weighted average score per primary genre.
    Genres(GenresArgs),
    /// Word frequencies of positive and negative sampled reviews.
    Sentiment(SentimentArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Args)]
struct TitlesArgs {
    /// Reviews CSV.
    input: PathBuf,
    /// Output CSV.
    output: PathBuf,
    /// Also write the distribution of per-title averages here.
    #[arg(long)]
    histogram: Option<PathBuf>,
    #[arg(long)]
    chunk_size: Option<usize>,
    #[arg(long, value_enum)]
    order: Option<SortOrder>,
}

#[derive(Args)]
struct TimelineArgs {
    /// Reviews CSV.
    input: PathBuf,
    /// Output CSV.
    output: PathBuf,
    #[arg(long)]
    chunk_size: Option<usize>,
    #[arg(long, value_enum)]
    granularity: Option<Granularity>,
}

#[derive(Args)]
#[command(group(clap::ArgGroup::new("totals").required(true).args(["reviews", "titles"])))]
struct GenresArgs {
    /// Reviews CSV, aggregated by title on the fly.
    #[arg(long)]
    reviews: Option<PathBuf>,
    /// Table written by the `titles` command.
    #[arg(long)]
    titles: Option<PathBuf>,
    /// Books metadata CSV with the category column.
    #[arg(long)]
    metadata: PathBuf,
    /// Output CSV.
    output: PathBuf,
    #[arg(long)]
    chunk_size: Option<usize>,
    #[arg(long)]
    min_members: Option<u64>,
    #[arg(long, conflicts_with = "all_groups")]
    top_groups: Option<usize>,
    /// Keep every genre above the member threshold.
    #[arg(long)]
    all_groups: bool,
}

#[derive(Args)]
struct SentimentArgs {
    /// Reviews CSV.
    input: PathBuf,
    /// Directory receiving the word and summary tables.
    out_dir: PathBuf,
    #[arg(long)]
    chunk_size: Option<usize>,
    #[arg(long)]
    sample_size: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, value_enum)]
    policy: Option<SamplingPolicy>,
    /// `word,polarity` CSV extending the built-in lexicon.
    #[arg(long)]
    lexicon: Option<PathBuf>,
    #[arg(long)]
    top_words: Option<usize>,
}

/// Build-time version info, injected via the environment.
mod version {
    /// Release version string (set at build time).
    pub const RELEASE: &str = env!("CARGO_PKG_VERSION");

    /// Git commit hash (set at build time via env, or "unknown").
    pub fn git_commit() -> &'static str {
        option_env!("GIT_COMMIT").unwrap_or("unknown")
    }

    /// Full version string with platform info.
    pub fn full() -> String {
        format!(
            "{} (commit: {}, {}/{})",
            RELEASE,
            git_commit(),
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::Version = cli.command {
        println!("review-insight {}", version::full());
        return Ok(());
    }

    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    let log_level = cli.log_level.as_deref().unwrap_or(&cfg.log_level);
    let filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("invalid log level: {log_level}"))?;

    fmt().with_env_filter(filter).with_target(true).init();

    info!(
        version = version::RELEASE,
        commit = version::git_commit(),
        "starting review-insight",
    );

    run(&mut cfg, cli.command)
}

fn run(cfg: &mut Config, command: Command) -> Result<()> {
    match command {
        Command::Titles(args) => {
            override_opt(&mut cfg.titles.chunk_size, args.chunk_size);
            override_opt(&mut cfg.titles.order, args.order);
            cfg.validate()?;

            let report =
                pipeline::run_titles(cfg, &args.input, &args.output, args.histogram.as_deref())?;
            info!(
                windows = report.scan.windows,
                records = report.scan.records,
                malformed = report.scan.malformed,
                dropped = report.scan.dropped,
                rows = report.rows_written,
                omitted_zero_count = report.omitted_zero_count,
                histogram_titles = ?report.histogram_titles,
                output = %args.output.display(),
                "titles complete",
            );
        }
        Command::Timeline(args) => {
            override_opt(&mut cfg.timeline.chunk_size, args.chunk_size);
            override_opt(&mut cfg.timeline.granularity, args.granularity);
            cfg.validate()?;

            let report = pipeline::run_timeline(cfg, &args.input, &args.output)?;
            info!(
                windows = report.scan.windows,
                records = report.scan.records,
                malformed = report.scan.malformed,
                dropped = report.scan.dropped,
                rows = report.rows_written,
                output = %args.output.display(),
                "timeline complete",
            );
        }
        Command::Genres(args) => {
            override_opt(&mut cfg.genres.chunk_size, args.chunk_size);
            override_opt(&mut cfg.genres.min_members, args.min_members);
            if args.all_groups {
                cfg.genres.top_groups = None;
            } else if args.top_groups.is_some() {
                cfg.genres.top_groups = args.top_groups;
            }
            cfg.validate()?;

            let input = match (&args.reviews, &args.titles) {
                (Some(path), _) => GenresInput::Reviews(path),
                (None, Some(path)) => GenresInput::Titles(path),
                (None, None) => anyhow::bail!("one of --reviews or --titles is required"),
            };

            let report = pipeline::run_genres(cfg, input, &args.metadata, &args.output)?;
            info!(
                titles = report.titles,
                metadata_rows = report.side_table.rows,
                matched = report.join.matched,
                rows = report.rows_written,
                output = %args.output.display(),
                "genres complete",
            );
        }
        Command::Sentiment(args) => {
            let sc = &mut cfg.sentiment;
            override_opt(&mut sc.chunk_size, args.chunk_size);
            override_opt(&mut sc.sample_size, args.sample_size);
            override_opt(&mut sc.seed, args.seed);
            override_opt(&mut sc.policy, args.policy);
            override_opt(&mut sc.top_words, args.top_words);
            if args.lexicon.is_some() {
                sc.lexicon = args.lexicon;
            }
            cfg.validate()?;

            let report = pipeline::run_sentiment(cfg, &args.input, &args.out_dir)?;
            info!(
                sampled = report.sampled,
                seen = report.seen,
                windows = report.windows_consumed,
                fallbacks = report.fallbacks,
                positive_words = report.positive_words,
                negative_words = report.negative_words,
                out_dir = %args.out_dir.display(),
                "sentiment complete",
            );
        }
        Command::Version => {}
    }

    Ok(())
}

fn override_opt<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}
