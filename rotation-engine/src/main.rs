//! Rotation Engine - command line entry point
//!
//! Offline tooling around the rotation pipeline: check a channel pair before
//! rotating it, print the content-addressed names of derived channels, and
//! replay a reconciliation transaction against a saved state.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rotation_common::config::RotationConfig;
use rotation_common::events::EventBus;
use rotation_common::model::{Channel, FilterDefinition, MaskAndRotate2dResult, Station};
use rotation_engine::naming::{
    build_masked_channel_name, channel_hash_input, generate_channel_hash, ChannelFactory,
};
use rotation_engine::reconciliation::{
    DataState, ReconciliationConfig, RotationTransaction, SdHypothesisArgs,
};
use rotation_engine::validation::{validate_channel_inputs, ToleranceSet};

/// Command-line arguments for rotation-engine
#[derive(Parser, Debug)]
#[command(name = "rotation-engine")]
#[command(about = "Horizontal channel rotation and reconciliation tooling")]
#[command(version)]
struct Args {
    /// Config file (overrides ROTATION_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a channel pair (JSON array of two channels) and list warnings
    CheckPair {
        channels: PathBuf,

        #[arg(long, default_value_t = 0.5)]
        sample_rate_tolerance_hz: f64,

        #[arg(long, default_value_t = 5.0)]
        orientation_angle_tolerance_deg: f64,

        #[arg(long, default_value_t = 0.1)]
        location_tolerance_km: f64,
    },

    /// Print the name a derived channel would get
    ChannelName {
        /// Channel JSON (a station JSON for `temporary`)
        input: PathBuf,

        #[arg(long, value_enum)]
        kind: NameKind,

        /// Filter definition JSON, required for `filtered`
        #[arg(long)]
        filter: Option<PathBuf>,
    },

    /// Print the content hash of a channel and the JSON it was computed over
    Hash { channel: PathBuf },

    /// Commit rotation results against a saved state and print the new state
    Reconcile { request: PathBuf },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NameKind {
    Masked,
    Filtered,
    Temporary,
}

/// Body of a `reconcile` request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReconcileRequest {
    #[serde(default)]
    state: DataState,
    results: Vec<MaskAndRotate2dResult>,
    sd_hypothesis_args: SdHypothesisArgs,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn check_pair(path: &Path, tolerances: ToleranceSet) -> Result<()> {
    let channels: Vec<Channel> = read_json(path)?;
    let warnings = validate_channel_inputs(&channels, &tolerances)?;
    if warnings.is_empty() {
        info!("Channel pair is rotatable");
        println!("OK");
    }
    for warning in warnings {
        warn!(%warning, "Channel pair warning");
        println!("{}", warning);
    }
    Ok(())
}

fn channel_name(
    input: &Path,
    kind: NameKind,
    filter: Option<&Path>,
    events: EventBus,
) -> Result<String> {
    let factory = ChannelFactory::new(events);
    let name = match kind {
        NameKind::Masked => build_masked_channel_name(&read_json::<Channel>(input)?)?,
        NameKind::Filtered => {
            let Some(filter) = filter else {
                bail!("--filter is required for filtered channel names");
            };
            let filter: FilterDefinition = read_json(filter)?;
            factory.create_filtered(&read_json::<Channel>(input)?, &filter)?.name
        }
        NameKind::Temporary => factory.create_temporary(&read_json::<Station>(input)?)?.name,
    };
    Ok(name)
}

fn reconcile(path: &Path, config: &RotationConfig) -> Result<()> {
    let request: ReconcileRequest = read_json(path)?;
    let transaction = RotationTransaction::new(
        request.results,
        ReconciliationConfig {
            rotation_replacement_azimuth_tolerance_deg: config
                .rotation_replacement_azimuth_tolerance_deg,
        },
        request.sd_hypothesis_args,
    );
    let state = transaction
        .commit(request.state)
        .context("Reconciliation failed")?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = RotationConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing on stderr so stdout stays machine readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting rotation-engine v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match args.command {
        Command::CheckPair {
            channels,
            sample_rate_tolerance_hz,
            orientation_angle_tolerance_deg,
            location_tolerance_km,
        } => check_pair(
            &channels,
            ToleranceSet {
                sample_rate_tolerance_hz,
                orientation_angle_tolerance_deg,
                location_tolerance_km,
            },
        ),
        Command::ChannelName {
            input,
            kind,
            filter,
        } => {
            let events = EventBus::new(config.event_bus_capacity);
            println!("{}", channel_name(&input, kind, filter.as_deref(), events)?);
            Ok(())
        }
        Command::Hash { channel } => {
            let channel: Channel = read_json(&channel)?;
            println!("{}", generate_channel_hash(&channel)?);
            println!("{}", channel_hash_input(&channel)?);
            Ok(())
        }
        Command::Reconcile { request } => reconcile(&request, &config),
    }
}
