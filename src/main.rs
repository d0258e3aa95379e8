use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mimic::config::DEFAULT_CHUNK_LEN_MS;
use mimic::{audio, AppContext, Config};

/// Mimic - Discord companion bot with a voice-clone training pipeline
#[derive(Parser)]
#[command(name = "mimic", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Split a WAV file into fixed-length chunks
    Split {
        /// Source recording
        input: PathBuf,

        /// Directory to write chunks into
        #[arg(short, long, default_value = "chunks")]
        out_dir: PathBuf,

        /// Chunk length in milliseconds
        #[arg(long, default_value_t = DEFAULT_CHUNK_LEN_MS)]
        chunk_len_ms: u64,
    },
    /// Report the duration of a WAV file
    Duration {
        /// Recording to inspect
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,mimic=info",
        1 => "info,mimic=debug",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Offline utilities work without any credentials
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Split {
                input,
                out_dir,
                chunk_len_ms,
            } => cmd_split(&input, &out_dir, chunk_len_ms),
            Command::Duration { input } => cmd_duration(&input),
        };
    }

    let config = Config::load()?;
    tracing::info!(
        recordings_dir = %config.recordings_dir.display(),
        chunk_len_ms = config.capture.chunk_len_ms,
        min_training_secs = config.capture.min_training_secs,
        "starting mimic"
    );

    let (app, writer_task) = AppContext::new(config)?;
    let result = mimic::bot::run(app).await;

    // Client stopped; dropping the context closes the writer channel
    writer_task.abort();
    result?;
    Ok(())
}

fn cmd_split(input: &PathBuf, out_dir: &PathBuf, chunk_len_ms: u64) -> anyhow::Result<()> {
    let count = audio::chunker::split(input, out_dir, chunk_len_ms)?;
    println!(
        "wrote {count} chunks of {chunk_len_ms}ms to {}",
        out_dir.display()
    );
    Ok(())
}

fn cmd_duration(input: &PathBuf) -> anyhow::Result<()> {
    let secs = audio::inspect::duration_secs(input)?;
    println!("{}: {secs:.2}s", input.display());
    Ok(())
}
