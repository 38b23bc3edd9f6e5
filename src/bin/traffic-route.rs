use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use traffic_route::polyline::Polyline;
use traffic_route::{Coordinate, EngineConfig, RouteEngine};

#[derive(Parser, Debug)]
#[command(name = "traffic-route", author, version, about, long_about = None)]
struct Cli {
    /// JSON engine config; defaults apply to anything it omits
    #[arg(long, env = "TRAFFIC_ROUTE_CONFIG")]
    config: Option<PathBuf>,

    /// Routing provider base URL
    #[arg(long, env = "ORS_BASE_URL")]
    base_url: Option<String>,

    /// Routing provider API key
    #[arg(long, env = "ORS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute a traffic-annotated route and print it as JSON
    Route {
        /// Origin as LAT,LNG
        #[arg(long)]
        from: Coordinate,
        /// Destination as LAT,LNG
        #[arg(long)]
        to: Coordinate,
        /// Ask the provider for alternative routes
        #[arg(long)]
        alternatives: bool,
        /// Departure time, "YYYY-MM-DD HH:MM" local; defaults to now
        #[arg(long, value_parser = parse_departure)]
        at: Option<NaiveDateTime>,
    },
    /// Decode an encoded polyline and print its coordinates
    Decode { polyline: String },
}

fn parse_departure(input: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M").map_err(|e| e.to_string())
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config at {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.provider.base_url = base_url.clone();
    }
    if cli.api_key.is_some() {
        config.provider.api_key = cli.api_key.clone();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Route {
            from,
            to,
            alternatives,
            at,
        } => {
            let config = load_config(&cli)?;
            info!(provider = %config.provider.directions_url(), "routing");
            let engine = RouteEngine::from_config(&config).context("Failed to build provider client")?;
            let result = match at {
                Some(at) => engine.route_at(*from, *to, *alternatives, *at),
                None => engine.route(*from, *to, *alternatives),
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Decode { polyline } => {
            let decoded = Polyline::decode(polyline).context("Invalid polyline")?;
            println!("{}", serde_json::to_string_pretty(decoded.points())?);
        }
    }

    Ok(())
}
