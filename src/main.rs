//! Chanlog
//!
//! Exports a chat channel's message history to a CSV file, streaming rows
//! as they arrive and pausing periodically on long histories.
//!
//! # Usage
//!
//! ```bash
//! # Export a dump, leaving out bot messages
//! chanlog export --input general.jsonl --channel-id 1234 --channel-name general --exclude-bots
//! ```

use std::fs::OpenOptions;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use chanlog::cli::{CliInterface, ExportArgs};
use chanlog::error::{ExportError, Result};
use chanlog::export::{ExportPipeline, ExportResult, JsonlSource, MessageSource, TerminalProgress};

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments
/// 2. Load configuration
/// 3. Initialize logging
/// 4. Handle subcommands or run the export
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli)?;

    if cli.handle_subcommand()? {
        return Ok(());
    }

    match cli.export_args() {
        Some(args) => run_export(&cli, args).await,
        None => Ok(()),
    }
}

/// Run the export subcommand until the dump is exhausted or Ctrl+C
async fn run_export(cli: &CliInterface, args: &ExportArgs) -> Result<()> {
    let config = &cli.config().export;
    let mut source = JsonlSource::open(&args.input, args.channel_name(), config.page_size)
        .await
        .map_err(ExportError::from)?;

    let cancel_token = CancellationToken::new();
    let cancel_token_clone = cancel_token.clone();
    let ctrl_c_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => cancel_token_clone.cancel(),
            Err(err) => eprintln!("Failed to listen for Ctrl+C: {}", err),
        }
    });

    let options = args.options();
    let show_progress = !args.no_progress && !cli.args().quiet;
    let progress = TerminalProgress::new(options.limit, show_progress);
    let pipeline = ExportPipeline::from_config(config).with_cancellation(cancel_token);

    info!(
        "Exporting {} from {}",
        source.channel_name(),
        args.input.display()
    );
    let result = pipeline
        .export_channel(
            &mut source,
            &config.output_dir,
            &args.channel_id,
            &options,
            &progress,
        )
        .await;

    ctrl_c_handle.abort();

    let result = result?;
    if !cli.args().quiet {
        print_summary(&result);
    }
    Ok(())
}

/// Print the outcome of an export
fn print_summary(result: &ExportResult) {
    let status = if result.cancelled {
        "Export cancelled"
    } else {
        "Export completed"
    };
    println!(
        "{}: {} messages written to {} ({} bytes, {} ms)",
        status,
        result.emitted_count,
        result.output_path.display(),
        result.file_size_bytes,
        result.elapsed_ms
    );
}

/// Initialize logging system from the effective configuration
///
/// # Arguments
/// * `cli` - CLI interface holding the merged logging settings
fn initialize_logging(cli: &CliInterface) -> Result<()> {
    let logging = &cli.config().logging;
    let level = logging.level.to_tracing_level();

    let (writer, ansi) = match logging.file_path {
        Some(ref path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(writer);

    if logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
    Ok(())
}
