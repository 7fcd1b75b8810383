use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use logmill::commit::Commit;
use logmill::config::Config;
use logmill::source::CommitSource;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

/// Consecutive empty polls before the loop starts sleeping
const SPIN_POLLS: u32 = 64;
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Merge the commit history of repositories and logs into one time-ordered
/// stream on stdout.
#[derive(Parser)]
#[command(name = "logmill", version = VERSION)]
struct Cli {
    /// Configuration file (TOML). Defaults to the platform config directory.
    #[arg(long, env = "LOGMILL_CONFIG")]
    config: Option<PathBuf>,

    /// Walk each repository once instead of following new revisions
    #[arg(long)]
    once: bool,

    /// Emit commits even when the filters reject them
    #[arg(long)]
    no_validate: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Custom)]
    format: OutputFormat,

    /// Report hot-path timings as trace events
    #[arg(long)]
    timing: bool,

    /// Repository directories, log files, or `-` for standard input
    #[arg(required = true)]
    locations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `timestamp|username|action|path|colour`, one line per file
    Custom,
    /// One JSON object per commit
    Json,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default()?,
    };
    config.apply_env_overrides();

    if cli.once {
        config.sources.follow = false;
    }
    if cli.timing {
        config.timing.enabled = true;
    }

    config.validate()?;
    Ok(config)
}

fn write_commit(out: &mut impl Write, commit: &Commit, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Custom => out.write_all(commit.to_custom_log().as_bytes())?,
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, commit)?;
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the commit stream, so logs go to stderr
    let default_filter = if cli.timing {
        "warn,logmill::timing=trace"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let mut merged = logmill::mill::open_sources(&cli.locations, &config)?;
    let validate = !cli.no_validate;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut empty_polls = 0u32;
    let mut emitted = 0usize;

    while !merged.is_finished() {
        match merged.next_commit(validate) {
            Some(commit) => {
                commit.debug();
                write_commit(&mut out, &commit, cli.format)?;
                emitted += 1;
                empty_polls = 0;
            }
            None => {
                empty_polls = empty_polls.saturating_add(1);
                if empty_polls > SPIN_POLLS {
                    out.flush()?;
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }

    out.flush()?;
    tracing::info!("Wrote {} commit(s)", emitted);
    Ok(())
}
