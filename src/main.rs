//! pipewatch - Pipeline Integrity Monitor Binary
//!
//! Runs a simulated monitoring session with a web dashboard, a headless
//! watcher, or a one-shot snapshot.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use futures_util::StreamExt;
use pipewatch::{
    assess, start_web_server, Assessment, MonitorConfig, NarrationOutcome, NarrativeReporter,
    OfflineGenerator, OpenAiGenerator, ProfileKind, Reading, SamplerProfile, SensorSampler,
    Session, SessionEvent, SessionHandle, TextGenerator, TickReport, WebConfig, DEFAULT_WEB_PORT,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "pipewatch")]
#[command(about = "Pipeline integrity monitor with safe-range checks and narrated analysis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds between readings
    #[arg(short, long)]
    interval: Option<f64>,

    /// Completion budget for each narration
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Narrate every n-th reading
    #[arg(long)]
    narrate_every: Option<u32>,

    /// Simulation profile
    #[arg(long, value_enum)]
    profile: Option<Profile>,

    /// Seed for a reproducible simulation
    #[arg(long)]
    seed: Option<u64>,

    /// Chat model used for narration
    #[arg(long)]
    model: Option<String>,

    /// Never call a hosted language model
    #[arg(long)]
    offline: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Profile {
    Standard,
    OilTransmission,
    LeakDetection,
}

impl From<Profile> for ProfileKind {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Standard => ProfileKind::Standard,
            Profile::OilTransmission => ProfileKind::OilTransmission,
            Profile::LeakDetection => ProfileKind::LeakDetection,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session with the web dashboard (default)
    Serve(ServeArgs),

    /// Run a session and print readings to the terminal
    Watch(WatchArgs),

    /// Take a single reading and exit
    Snapshot(SnapshotArgs),

    /// Show the effective safe ranges
    Ranges,
}

#[derive(Args)]
struct ServeArgs {
    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Directory with a custom dashboard
    #[arg(long)]
    static_dir: Option<String>,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Maximum WebSocket connections
    #[arg(long, default_value_t = 100)]
    max_connections: usize,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_WEB_PORT,
            static_dir: None,
            no_cors: false,
            max_connections: 100,
        }
    }
}

#[derive(Args)]
struct WatchArgs {
    /// Stop after this many readings
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    ticks: Option<u64>,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,

    /// Also request a narration for the reading
    #[arg(long)]
    narrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = build_config(&cli)?;

    if matches!(cli.command, None | Some(Commands::Serve(_)) | Some(Commands::Watch(_))) {
        print_banner();
    }

    match &cli.command {
        Some(Commands::Serve(args)) => serve_command(&cli, config, args).await?,
        Some(Commands::Watch(args)) => watch_command(&cli, config, args).await?,
        Some(Commands::Snapshot(args)) => snapshot_command(&cli, config, args).await?,
        Some(Commands::Ranges) => ranges_command(&config),
        None => serve_command(&cli, config, &ServeArgs::default()).await?,
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn print_banner() {
    println!("pipewatch - Pipeline Integrity Monitor");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

fn build_config(cli: &Cli) -> anyhow::Result<MonitorConfig> {
    let profile = cli.profile.map(ProfileKind::from);
    let mut config = match &cli.config {
        Some(path) => MonitorConfig::load_with_profile(path, profile)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => match profile {
            Some(profile) => MonitorConfig::default().with_profile(profile),
            None => MonitorConfig::default(),
        },
    };

    if let Some(interval) = cli.interval {
        config = config.with_interval_secs(interval);
    }
    if let Some(max) = cli.max_tokens {
        config = config.with_max_output_tokens(max);
    }
    if let Some(every) = cli.narrate_every {
        config = config.with_narration_every_ticks(every);
    }
    if let Some(seed) = cli.seed {
        config = config.with_seed(Some(seed));
    }
    if let Some(model) = &cli.model {
        config.narration.model = model.clone();
    }
    if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
        config.narration.base_url = base_url;
    }

    config.validate()?;
    Ok(config)
}

fn build_reporter(cli: &Cli, config: &MonitorConfig) -> anyhow::Result<NarrativeReporter> {
    let generator: Arc<dyn TextGenerator> = if cli.offline {
        info!("Offline mode, narration disabled");
        Arc::new(OfflineGenerator)
    } else {
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                let generator = OpenAiGenerator::new(
                    key,
                    config.narration.base_url.clone(),
                    config.narration.model.clone(),
                )?;
                info!(model = generator.model(), "Narration via chat completions");
                Arc::new(generator)
            }
            _ => {
                warn!("OPENAI_API_KEY not set, narration disabled");
                Arc::new(OfflineGenerator)
            }
        }
    };

    Ok(NarrativeReporter::new(generator)
        .with_system_context(config.narration.system_context.clone())
        .with_max_output_tokens(config.max_output_tokens))
}

/// Stop the session on Ctrl-C.
fn stop_on_ctrl_c(handle: SessionHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping session");
            handle.stop();
        }
    });
}

async fn serve_command(cli: &Cli, config: MonitorConfig, args: &ServeArgs) -> anyhow::Result<()> {
    info!("Starting pipewatch monitor...");

    let reporter = build_reporter(cli, &config)?;
    let session = Session::simulated(config, reporter)?;
    let handle = session.handle();
    info!(
        "Session {} ticking every {}s",
        session.id(),
        session.config().sample_interval_secs
    );

    let web_config = WebConfig::new(&args.host, args.port)
        .with_static_path(args.static_dir.clone())
        .with_cors(!args.no_cors)
        .with_max_websocket_connections(args.max_connections);

    info!("Web server configuration:");
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - CORS enabled: {}", web_config.enable_cors);
    info!(
        "  - Max WebSocket connections: {}",
        web_config.max_websocket_connections
    );

    let runner = tokio::spawn(session.run());
    stop_on_ctrl_c(handle.clone());

    let served = start_web_server(web_config, handle.clone()).await;
    // A server that failed to start must not leave the session running.
    handle.stop();
    let ticks = runner.await?;
    info!("Session finished after {} readings", ticks);

    served?;
    Ok(())
}

async fn watch_command(cli: &Cli, config: MonitorConfig, args: &WatchArgs) -> anyhow::Result<()> {
    let reporter = build_reporter(cli, &config)?;
    let session = Session::simulated(config.clone(), reporter)?;
    let handle = session.handle();
    let mut events = handle.stream();

    let runner = tokio::spawn(session.run());
    stop_on_ctrl_c(handle.clone());

    println!("Monitoring pipeline (Ctrl-C to stop)");
    println!();

    while let Some(event) = events.next().await {
        match event {
            SessionEvent::Tick(report) => {
                print_tick(&report);
                if args.ticks == Some(report.sequence()) && !config.narrates_on(report.sequence()) {
                    handle.stop();
                }
            }
            SessionEvent::Narration(record) => {
                print_narration(&record.outcome);
                if args.ticks == Some(record.sequence) {
                    handle.stop();
                }
            }
            SessionEvent::Stopped { ticks } => {
                println!("Stopped after {} readings.", ticks);
                break;
            }
        }
    }

    runner.await?;
    Ok(())
}

async fn snapshot_command(
    cli: &Cli,
    config: MonitorConfig,
    args: &SnapshotArgs,
) -> anyhow::Result<()> {
    let profile = SamplerProfile::for_kind(config.profile);
    let mut sampler = match config.seed {
        Some(seed) => SensorSampler::with_seed(profile, seed)?,
        None => SensorSampler::new(profile)?,
    };
    let reading = sampler.sample().with_sequence(1);
    let assessment = assess(&reading, &config.safe_ranges);

    let narration = if args.narrate {
        let reporter = build_reporter(cli, &config)?;
        let prompt = reporter.build_prompt(&reading, &config.safe_ranges);
        Some(match reporter.report(&prompt).await {
            Ok(text) => NarrationOutcome::Text { text },
            Err(e) => NarrationOutcome::Failed {
                error: e.to_string(),
            },
        })
    } else {
        None
    };

    match args.format.as_str() {
        "json" => {
            let json = serde_json::json!({
                "reading": reading,
                "assessment": assessment,
                "narration": narration,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        "pretty" => {
            print_reading(&reading, &assessment);
            if let Some(outcome) = &narration {
                print_narration(outcome);
            }
        }
        other => {
            anyhow::bail!("Unsupported format: {}. Use 'json' or 'pretty'", other);
        }
    }

    Ok(())
}

fn ranges_command(config: &MonitorConfig) {
    println!("Safe ranges ({} channels)", config.safe_ranges.len());
    println!("==========================");
    for (channel, range) in config.safe_ranges.iter() {
        println!(
            "  {:<12} {:>10.2} .. {:<10.2} {}",
            channel.name(),
            range.min,
            range.max,
            channel.unit().unwrap_or("")
        );
    }
    println!();
    println!("Interval: {}s", config.sample_interval_secs);
    println!(
        "Narration: every {} reading(s), {} tokens",
        config.narration_every_ticks, config.max_output_tokens
    );
}

fn print_tick(report: &TickReport) {
    print_reading(&report.reading, &report.assessment);
    if let Some(energy) = &report.energy {
        println!(
            "  Energy: {:.2} kWh used, {:.2} kWh from grid, {:.2} kg CO2",
            energy.consumed_kwh, energy.grid_kwh, energy.carbon_kg
        );
    }
}

fn print_reading(reading: &Reading, assessment: &Assessment) {
    println!(
        "Reading #{} ({})",
        reading.sequence,
        chrono::DateTime::from_timestamp_millis(reading.timestamp as i64)
            .unwrap_or_default()
            .format("%Y-%m-%d %H:%M:%S UTC")
    );
    for c in &assessment.channels {
        println!(
            "  {:<12} {:>10.2} {:<4} [{:.2}, {:.2}] {}",
            c.channel.name(),
            c.value,
            c.channel.unit().unwrap_or(""),
            c.range.min,
            c.range.max,
            if c.status.is_normal() { "ok" } else { "ABNORMAL" }
        );
    }
    for (channel, value) in reading.iter() {
        if assessment.channel_status(channel).is_none() {
            println!("  {:<12} {:>10.2} (no safe range)", channel.name(), value);
        }
    }
    println!("  Pipeline: {}", assessment.status.to_string().to_uppercase());
}

fn print_narration(outcome: &NarrationOutcome) {
    match outcome {
        NarrationOutcome::Text { text } => println!("  Analysis: {}", text),
        NarrationOutcome::Failed { error } => println!("  Analysis unavailable: {}", error),
    }
    println!();
}
