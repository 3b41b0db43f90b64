use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use arscene::{
    ArSceneConfig, ChannelSink, Classifier, EventFilter, EventMetrics, EventReceiver, HostEvent,
    HostInput, SessionRuntime, StaticCatalog, StaticClassifier, TrackingSession,
};

#[derive(Parser, Debug)]
#[command(name = "arscene")]
#[command(about = "Replay recorded tracking sessions through the motion-gated scene pipeline")]
#[command(version)]
#[command(long_about = "Reads a JSON-lines recording of tracking host notifications (frames, \
anchor lifecycle, tracking state, host commands), runs it through the tracking session and \
writes the resulting host events as JSON lines.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "arscene.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Recording to replay
    #[arg(short, long, default_value = "-", help = "JSON-lines recording to replay, '-' for stdin")]
    input: String,

    /// Where to write host events
    #[arg(short, long, value_name = "PATH", help = "Write host events to a file instead of stdout")]
    output: Option<PathBuf>,

    /// Keep camera image bytes in the output
    #[arg(long, help = "Include camera image bytes in onCameraImageUpdate output")]
    include_image_data: bool,

    /// Only write these host methods
    #[arg(long, value_delimiter = ',', value_name = "METHODS", help = "Comma-separated host methods to write")]
    events: Vec<String>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without replaying")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Write logs to a file instead of stderr
    #[arg(long, value_name = "PATH", help = "Write logs to this file")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting arscene v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match ArSceneConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match config.validate() {
        Ok(()) if args.validate_config => {
            info!("Configuration validation successful");
            println!("✓ Configuration is valid");
            return Ok(());
        }
        Ok(()) => {}
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
    }

    replay(&args, config).await
}

async fn replay(args: &Args, config: ArSceneConfig) -> Result<()> {
    let started = Utc::now();

    let (sink, events) = ChannelSink::new();
    let filter = if args.events.is_empty() {
        EventFilter::All
    } else {
        EventFilter::Methods(args.events.clone())
    };
    let receiver = EventReceiver::new(events, filter, "replay_output".to_string());

    let output: Box<dyn AsyncWrite + Unpin + Send> = match &args.output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create output file {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };
    let writer = tokio::spawn(write_events(receiver, output, args.include_image_data));

    let mut builder = TrackingSession::builder()
        .config(config.clone())
        .sink(Arc::new(sink))
        .catalog(Arc::new(StaticCatalog::new()));
    if let Some(label) = &config.classifier.static_label {
        info!("Using static classifier with label '{}'", label);
        let classifier: Arc<dyn Classifier> =
            Arc::new(StaticClassifier::new(label.as_str(), config.classifier.static_confidence));
        builder = builder.classifier(classifier);
    }
    let session = builder.build()?;

    let runtime = SessionRuntime::spawn(session, config.events.channel_capacity);

    let input = open_input(&args.input).await?;
    let mut lines = input.lines();
    let mut line_number = 0usize;
    let mut skipped = 0usize;

    while let Some(line) = lines.next_line().await.context("Failed to read recording")? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let input: HostInput = match serde_json::from_str(line) {
            Ok(input) => input,
            Err(e) => {
                warn!("Skipping malformed line {}: {}", line_number, e);
                skipped += 1;
                continue;
            }
        };

        match input {
            HostInput::Command { method, arguments } => {
                match runtime.request(&method, arguments).await {
                    Ok(reply) if !reply.is_null() => info!("{} -> {}", method, reply),
                    Ok(_) => debug!("{} completed", method),
                    Err(e) => warn!("Command '{}' at line {} failed: {}", method, line_number, e),
                }
            }
            other => runtime.send(other).await?,
        }
    }

    info!("Recording finished after {} lines ({} skipped)", line_number, skipped);

    let session = runtime.shutdown().await?;
    let stats = session.stats().clone();
    drop(session);

    let metrics = writer.await.context("Event writer task failed")??;
    metrics.log_summary();

    info!(
        "Replay finished in {} ms: {} frames, {} markers, {} labels",
        (Utc::now() - started).num_milliseconds(),
        stats.frames_received,
        stats.markers_placed,
        stats.labels_placed
    );

    Ok(())
}

async fn open_input(input: &str) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if input == "-" {
        info!("Reading recording from stdin");
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }

    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open recording {}", input))?;
    info!("Reading recording from {}", input);
    Ok(Box::new(BufReader::new(file)))
}

async fn write_events(
    mut receiver: EventReceiver,
    mut output: Box<dyn AsyncWrite + Unpin + Send>,
    include_image_data: bool,
) -> Result<EventMetrics> {
    let mut metrics = EventMetrics::default();

    while let Some(event) = receiver.recv().await {
        let mut message = event.to_message();
        if let HostEvent::CameraImageUpdate { data } = &event {
            if !include_image_data {
                message.arguments = json!({ "dataLength": data.len() });
            }
        }

        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');

        if let Err(e) = output.write_all(&line).await {
            metrics.record_error();
            error!("Failed to write {} event: {}", event.method(), e);
            continue;
        }
        metrics.record_event(&event);
    }

    output.flush().await?;
    Ok(metrics)
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("arscene={}", log_level)));

    // stdout may carry host events, so logs go to stderr or a file
    let (writer, guard) = match &args.log_file {
        Some(path) => {
            let directory = path.parent().filter(|dir| !dir.as_os_str().is_empty());
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path {}", path.display()))?;
            let appender =
                tracing_appender::rolling::never(directory.unwrap_or(Path::new(".")), file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };
    let ansi = args.log_file.is_none();

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# arscene configuration file");
    println!("# Every option below is shown with its default value");
    println!("# Environment overrides use the ARSCENE_ prefix, e.g. ARSCENE_MOTION__MAX_VELOCITY=1.5");
    println!();
    println!("{}", ArSceneConfig::default().to_toml()?);
    Ok(())
}
